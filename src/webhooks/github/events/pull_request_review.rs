use serde::Deserialize;
use url::Url;

use crate::webhooks::github::events::{GitHubUser, PullRequest, Repository};

/// Review state GitHub reports when a reviewer asks for changes.
pub const CHANGES_REQUESTED: &str = "changes_requested";

#[derive(Debug, Deserialize)]
pub struct PullRequestReviewEvent {
    pub repository: Option<Repository>,
    pub sender: Option<GitHubUser>,
    pub pull_request: PullRequest,
    pub review: Review,
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct Review {
    /// `approved`, `changes_requested`, `commented` or `dismissed`.
    pub state: String,
    /// Reviews submitted without a summary carry a `null` body.
    pub body: Option<String>,
    pub user: GitHubUser,
    pub html_url: Option<Url>,
}

impl Review {
    pub fn requests_changes(&self) -> bool {
        self.state.eq_ignore_ascii_case(CHANGES_REQUESTED)
    }
}
