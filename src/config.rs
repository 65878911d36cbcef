use serde::Deserialize;
use url::Url;

const DEFAULT_API_URL: &str = "https://api.github.com/";

#[derive(Debug, Clone, Deserialize)]
pub struct MarvinConfig {
    /// Secret shared with GitHub, used to check the signature of webhook deliveries
    pub github_secret: String,
    /// Token sent with every GitHub API call
    pub github_token: String,
    /// Base URL of the GitHub API, for search and installation endpoints
    #[serde(default = "default_api_url")]
    pub github_api_url: Url,
    /// User agent sent to GitHub, which rejects requests without one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// When set, the bot only acts on issues and pull requests carrying this label
    #[serde(default)]
    pub opt_in_label: Option<String>,
}

fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("default API URL is valid")
}

fn default_user_agent() -> String {
    "marvin".to_string()
}
