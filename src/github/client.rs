use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, Stream, TryStreamExt};
use reqwest::{header::ACCEPT, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::github::{pagination::next_page, ApiError, GitHubApi};
use crate::webhooks::github::{Issue, Repository};

const ACCEPT_V3: &str = "application/vnd.github.v3+json";
const ACCEPT_MACHINE_MAN_PREVIEW: &str = "application/vnd.github.machine-man-preview+json";

/// GitHub API client backed by [`reqwest`].
///
/// Label and review-request URLs come straight from webhook payloads; search and installation
/// endpoints are resolved against the configured API base URL.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
struct LabelsBody<'a> {
    labels: [&'a str; 1],
}

#[derive(Serialize)]
struct ReviewersBody<'a> {
    reviewers: [&'a str; 1],
}

#[derive(Deserialize)]
struct SearchPage {
    total_count: u64,
    #[serde(default)]
    items: Vec<Issue>,
}

#[derive(Deserialize)]
struct InstallationRepositories {
    total_count: Option<u64>,
    repositories: Vec<Repository>,
}

impl InstallationRepositories {
    /// How many repositories were left off this page, according to `total_count`.
    fn unlisted(&self) -> u64 {
        self.total_count
            .map_or(0, |total| total.saturating_sub(self.repositories.len() as u64))
    }
}

impl GitHubClient {
    pub fn new(mut base_url: Url, user_agent: &str) -> Result<Self, ApiError> {
        // keep the path of e.g. `https://ghe.example.com/api/v3` when joining endpoints onto it
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    fn search_url(&self, query_terms: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.endpoint("search/issues")?;
        // spaces are encoded as `+`, which is how GitHub expects qualifiers to be separated
        url.query_pairs_mut()
            .append_pair("q", &query_terms.join(" "));
        Ok(url)
    }

    /// Sends the request and turns any non-2xx response into an [`ApiError::Status`].
    async fn send(&self, request: RequestBuilder, token: &str) -> Result<Response, ApiError> {
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("couldn't read body of {} response: {}", status, e);
                String::new()
            }
        };
        debug!("GitHub API answered {}: {}", status, body);
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Number of issues and pull requests matching the search qualifiers.
    pub async fn search_issue_count(
        &self,
        query_terms: &[&str],
        token: &str,
    ) -> Result<u64, ApiError> {
        let url = self.search_url(query_terms)?;
        let request = self.http.get(url).header(ACCEPT, ACCEPT_V3);
        let page: SearchPage = self.send(request, token).await?.json().await?;

        Ok(page.total_count)
    }

    /// Searches issues and pull requests, following pagination.
    ///
    /// A common query is `repo:NixOS/nixpkgs`. Pages are fetched one at a time as the stream is
    /// polled; calling this again restarts the search from the first page.
    pub fn search_issues<'a>(
        &'a self,
        query_terms: &[&str],
        token: &'a str,
    ) -> impl Stream<Item = Result<Issue, ApiError>> + 'a {
        let first_page = self.search_url(query_terms);

        stream::try_unfold(Some(first_page), move |page| async move {
            let url = match page {
                Some(url) => url?,
                None => return Ok::<_, ApiError>(None),
            };

            debug!("fetching search page {}", url);
            let request = self.http.get(url).header(ACCEPT, ACCEPT_V3);
            let response = self.send(request, token).await?;
            let next = next_page(response.headers())?;
            let page: SearchPage = response.json().await?;

            Ok(Some((page.items, next.map(Ok))))
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<Issue, ApiError>)))
        .try_flatten()
    }

    /// Repositories the installation behind `token` has access to.
    ///
    /// This endpoint paginates, but only its first page is fetched.
    pub async fn installation_repositories(
        &self,
        token: &str,
    ) -> Result<Vec<Repository>, ApiError> {
        let url = self.endpoint("installation/repositories")?;
        let request = self
            .http
            .get(url)
            .header(ACCEPT, ACCEPT_MACHINE_MAN_PREVIEW);
        let result: InstallationRepositories = self.send(request, token).await?.json().await?;

        let unlisted = result.unlisted();
        if unlisted > 0 {
            warn!(
                "installation has {} more repositories than the {} listed",
                unlisted,
                result.repositories.len()
            );
        }

        Ok(result.repositories)
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn add_label(&self, issue_url: &str, label: &str, token: &str) -> Result<(), ApiError> {
        info!("adding label `{}` to {}", label, issue_url);
        let request = self
            .http
            .post(format!("{}/labels", issue_url))
            .header(ACCEPT, ACCEPT_V3)
            .json(&LabelsBody { labels: [label] });
        self.send(request, token).await?;

        Ok(())
    }

    async fn remove_label(
        &self,
        issue_url: &str,
        label: &str,
        token: &str,
    ) -> Result<(), ApiError> {
        info!("removing label `{}` from {}", label, issue_url);
        let request = self
            .http
            .delete(format!("{}/labels/{}", issue_url, label))
            .header(ACCEPT, ACCEPT_V3);
        self.send(request, token).await?;

        Ok(())
    }

    async fn request_review(
        &self,
        pull_url: &str,
        reviewer: &str,
        token: &str,
    ) -> Result<(), ApiError> {
        info!("requesting review from {} on {}", reviewer, pull_url);
        let request = self
            .http
            .post(format!("{}/requested_reviewers", pull_url))
            .header(ACCEPT, ACCEPT_V3)
            .json(&ReviewersBody {
                reviewers: [reviewer],
            });
        self.send(request, token).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, header, method, path, query_param, query_param_is_missing},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    const TOKEN: &str = "fake-token";

    fn client(server: &MockServer) -> GitHubClient {
        GitHubClient::new(Url::parse(&server.uri()).unwrap(), "marvin-tests").unwrap()
    }

    fn issue(number: u64) -> serde_json::Value {
        json!({
            "url": format!("https://api.github.com/repos/NixOS/nixpkgs/issues/{}", number),
            "number": number,
            "html_url": format!("https://github.com/NixOS/nixpkgs/issues/{}", number),
            "title": format!("issue {}", number),
            "user": {"id": 42, "login": "somebody"},
            "labels": [],
        })
    }

    fn search_page(server: &MockServer, numbers: &[u64], next: Option<u32>) -> ResponseTemplate {
        let body = json!({
            "total_count": 7,
            "incomplete_results": false,
            "items": numbers.iter().map(|&n| issue(n)).collect::<Vec<_>>(),
        });
        let template = ResponseTemplate::new(200).set_body_json(body);

        match next {
            Some(page) => template.insert_header(
                "Link",
                format!(
                    r#"<{}/search/issues?q=repo%3ANixOS%2Fnixpkgs+is%3Aopen&page={}>; rel="next", <{}/search/issues?q=repo%3ANixOS%2Fnixpkgs+is%3Aopen&page=3>; rel="last""#,
                    server.uri(),
                    page,
                    server.uri()
                ),
            ),
            None => template,
        }
    }

    #[tokio::test]
    async fn test_search_issues_follows_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("q", "repo:NixOS/nixpkgs is:open"))
            .and(query_param_is_missing("page"))
            .and(header("authorization", "Bearer fake-token"))
            .respond_with(search_page(&server, &[1, 2, 3], Some(2)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("page", "2"))
            .respond_with(search_page(&server, &[4, 5, 6], Some(3)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("page", "3"))
            .respond_with(search_page(&server, &[7], None))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let issues: Vec<Issue> = client
            .search_issues(&["repo:NixOS/nixpkgs", "is:open"], TOKEN)
            .try_collect()
            .await
            .unwrap();

        let numbers: Vec<u64> = issues.iter().filter_map(|issue| issue.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn test_search_issues_is_lazy() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param_is_missing("page"))
            .respond_with(search_page(&server, &[1, 2], Some(2)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("page", "2"))
            .respond_with(search_page(&server, &[3], None))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server);
        let issues = client.search_issues(&["repo:NixOS/nixpkgs", "is:open"], TOKEN);
        futures::pin_mut!(issues);

        let first = issues.try_next().await.unwrap().expect("first item");
        assert_eq!(first.number, Some(1));
    }

    #[tokio::test]
    async fn test_search_error_ends_stream() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .respond_with(ResponseTemplate::new(422).set_body_string("Validation Failed"))
            .mount(&server)
            .await;

        let client = client(&server);
        let result: Result<Vec<Issue>, ApiError> =
            client.search_issues(&["is:nonsense"], TOKEN).try_collect().await;

        match result {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status, 422);
                assert_eq!(body, "Validation Failed");
            }
            other => panic!("expected a status error, got {:?}", other.map(|v| v.len())),
        }
    }

    #[tokio::test]
    async fn test_search_issue_count() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("q", "repo:NixOS/nixpkgs label:needs_merger"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1347,
                "incomplete_results": false,
                "items": [issue(1)],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let count = client(&server)
            .search_issue_count(&["repo:NixOS/nixpkgs", "label:needs_merger"], TOKEN)
            .await
            .unwrap();
        assert_eq!(count, 1347);
    }

    #[tokio::test]
    async fn test_installation_repositories() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/installation/repositories"))
            .and(header("accept", ACCEPT_MACHINE_MAN_PREVIEW))
            .and(header("authorization", "Bearer fake-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 2,
                "repositories": [
                    {
                        "name": "nixpkgs",
                        "full_name": "NixOS/nixpkgs",
                        "html_url": "https://github.com/NixOS/nixpkgs",
                    },
                    {
                        "name": "marvin",
                        "full_name": "timokau/marvin",
                        "html_url": "https://github.com/timokau/marvin",
                    },
                ],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let repositories = client(&server)
            .installation_repositories(TOKEN)
            .await
            .unwrap();
        let names: Vec<&str> = repositories
            .iter()
            .map(|repo| repo.full_name.as_str())
            .collect();
        assert_eq!(names, vec!["NixOS/nixpkgs", "timokau/marvin"]);
    }

    #[tokio::test]
    async fn test_installation_repositories_first_page_only() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/installation/repositories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 3,
                "repositories": [
                    {
                        "name": "nixpkgs",
                        "full_name": "NixOS/nixpkgs",
                        "html_url": "https://github.com/NixOS/nixpkgs",
                    },
                    {
                        "name": "marvin",
                        "full_name": "timokau/marvin",
                        "html_url": "https://github.com/timokau/marvin",
                    },
                ],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let repositories = client(&server)
            .installation_repositories(TOKEN)
            .await
            .unwrap();
        assert_eq!(repositories.len(), 2);
    }

    #[test]
    fn test_unlisted_repositories() {
        let page: InstallationRepositories = serde_json::from_value(json!({
            "total_count": 3,
            "repositories": [{
                "name": "nixpkgs",
                "full_name": "NixOS/nixpkgs",
                "html_url": "https://github.com/NixOS/nixpkgs",
            }],
        }))
        .unwrap();
        assert_eq!(page.unlisted(), 2);

        let page: InstallationRepositories =
            serde_json::from_value(json!({ "repositories": [] })).unwrap();
        assert_eq!(page.unlisted(), 0);
    }

    #[tokio::test]
    async fn test_base_url_path_is_kept() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/installation/repositories"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "repositories": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let base_url = Url::parse(&format!("{}/api/v3", server.uri())).unwrap();
        let client = GitHubClient::new(base_url, "marvin-tests").unwrap();
        assert!(client
            .installation_repositories(TOKEN)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_label_mutations() {
        let server = MockServer::start().await;
        let issue_url = format!("{}/repos/NixOS/nixpkgs/issues/1347", server.uri());

        Mock::given(method("POST"))
            .and(path("/repos/NixOS/nixpkgs/issues/1347/labels"))
            .and(body_json(json!({ "labels": ["needs_review"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/repos/NixOS/nixpkgs/issues/1347/labels/needs_work"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        client
            .add_label(&issue_url, "needs_review", TOKEN)
            .await
            .unwrap();
        client
            .remove_label(&issue_url, "needs_work", TOKEN)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_request_review() {
        let server = MockServer::start().await;
        let pull_url = format!("{}/repos/NixOS/nixpkgs/pulls/1347", server.uri());

        Mock::given(method("POST"))
            .and(path("/repos/NixOS/nixpkgs/pulls/1347/requested_reviewers"))
            .and(body_json(json!({ "reviewers": ["somebody"] })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .request_review(&pull_url, "somebody", TOKEN)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_success_is_an_api_error() {
        let server = MockServer::start().await;
        let issue_url = format!("{}/repos/NixOS/nixpkgs/issues/1347", server.uri());

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"Label does not exist"}"#))
            .mount(&server)
            .await;

        let error = client(&server)
            .remove_label(&issue_url, "needs_work", TOKEN)
            .await
            .unwrap_err();
        assert_eq!(error.status(), Some(404));
        assert!(error.to_string().contains("Label does not exist"));
    }
}
