use std::fmt::{self, Display};

use serde::Deserialize;
use url::Url;

use crate::bot::utils::shorten_content;

mod issue_comment;
mod ping;
mod pull_request_review;

pub use issue_comment::*;
pub use ping::*;
pub use pull_request_review::*;

/// Event types GitHub announces in the `X-GitHub-Event` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubEventType {
    IssueComment,
    PullRequestReview,
    Ping,
    /// Anything the bot has no payload type for. These deliveries are acknowledged and dropped.
    Unsupported(String),
}

impl GitHubEventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::IssueComment => "issue_comment",
            Self::PullRequestReview => "pull_request_review",
            Self::Ping => "ping",
            Self::Unsupported(name) => name,
        }
    }
}

impl From<&str> for GitHubEventType {
    fn from(name: &str) -> Self {
        match name {
            "issue_comment" => Self::IssueComment,
            "pull_request_review" => Self::PullRequestReview,
            "ping" => Self::Ping,
            other => Self::Unsupported(other.to_owned()),
        }
    }
}

impl Display for GitHubEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum GitHubEvent {
    IssueComment(IssueCommentEvent),
    Ping(PingEvent),
    PullRequestReview(PullRequestReviewEvent),
}

impl GitHubEvent {
    /// Decodes a webhook payload according to the event type from the delivery headers.
    ///
    /// Returns `Ok(None)` for event types the bot doesn't know about.
    pub fn from_payload(
        event_type: &GitHubEventType,
        payload: &str,
    ) -> Result<Option<Self>, serde_json::Error> {
        let event = match event_type {
            GitHubEventType::IssueComment => Self::IssueComment(serde_json::from_str(payload)?),
            GitHubEventType::PullRequestReview => {
                Self::PullRequestReview(serde_json::from_str(payload)?)
            }
            GitHubEventType::Ping => Self::Ping(serde_json::from_str(payload)?),
            GitHubEventType::Unsupported(_) => return Ok(None),
        };

        Ok(Some(event))
    }

    pub fn kind(&self) -> GitHubEventType {
        match self {
            Self::IssueComment(_) => GitHubEventType::IssueComment,
            Self::Ping(_) => GitHubEventType::Ping,
            Self::PullRequestReview(_) => GitHubEventType::PullRequestReview,
        }
    }

    /// The payload's `action` field. `ping` deliveries don't have one.
    pub fn action(&self) -> Option<&str> {
        match self {
            Self::IssueComment(event) => Some(&event.action),
            Self::Ping(_) => None,
            Self::PullRequestReview(event) => Some(&event.action),
        }
    }

    /// Labels of the issue or pull request the event is about, if any.
    pub fn labels(&self) -> Option<&[Label]> {
        match self {
            Self::IssueComment(event) => Some(&event.issue.labels),
            Self::Ping(_) => None,
            Self::PullRequestReview(event) => Some(&event.pull_request.labels),
        }
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels()
            .is_some_and(|labels| labels.iter().any(|label| label.name == name))
    }
}

#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub html_url: Url,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

/// Where label mutations for an issue or a pull request must be sent.
///
/// GitHub models pull requests as issues, but only some payloads say so. This is resolved once
/// when the payload is read instead of re-inspecting the JSON at each call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueRef {
    Issue {
        url: String,
    },
    PullRequest {
        url: String,
        issue_url: Option<String>,
    },
}

impl IssueRef {
    /// The issue API URL, falling back to the object's own URL.
    pub fn labels_url(&self) -> &str {
        match self {
            Self::Issue { url } => url,
            Self::PullRequest {
                issue_url: Some(issue_url),
                ..
            } => issue_url,
            Self::PullRequest { url, .. } => url,
        }
    }
}

/// Issue as found in webhook payloads and search results.
///
/// Only `url`, `user` and `labels` are relied upon; the rest is for logging.
#[derive(Debug, Deserialize)]
pub struct Issue {
    pub url: String,
    pub number: Option<u64>,
    pub html_url: Option<Url>,
    pub title: Option<String>,
    pub user: GitHubUser,
    #[serde(default)]
    pub labels: Vec<Label>,
    // an issue can be a PR, in this case the object contains a `pull_request` key with urls to the
    // PR
    pub pull_request: Option<PullRequestLinks>,
}

impl Issue {
    pub fn issue_ref(&self) -> IssueRef {
        match &self.pull_request {
            // the issue's own URL already points at the issues API
            Some(links) => IssueRef::PullRequest {
                url: links.url.clone(),
                issue_url: Some(self.url.clone()),
            },
            None => IssueRef::Issue {
                url: self.url.clone(),
            },
        }
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.number, &self.title) {
            (Some(number), Some(title)) => write!(f, "#{} ({})", number, shorten_content(title)),
            (Some(number), None) => write!(f, "#{}", number),
            (None, _) => f.write_str(&self.url),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Comment {
    pub html_url: Option<Url>,
    pub body: String,
    pub user: GitHubUser,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub url: String,
    pub issue_url: Option<String>,
    pub number: Option<u64>,
    pub html_url: Option<Url>,
    pub title: Option<String>,
    pub user: GitHubUser,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl PullRequest {
    pub fn issue_ref(&self) -> IssueRef {
        IssueRef::PullRequest {
            url: self.url.clone(),
            issue_url: self.issue_url.clone(),
        }
    }
}

impl Display for PullRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.number, &self.title) {
            (Some(number), Some(title)) => write!(
                f,
                "PR #{}: {} by {}",
                number,
                shorten_content(title),
                self.user.login
            ),
            (Some(number), None) => write!(f, "PR #{} by {}", number, self.user.login),
            (None, _) => write!(f, "PR {} by {}", self.url, self.user.login),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PullRequestLinks {
    pub url: String,
    pub html_url: Option<Url>,
}
