//! Typed access to the GitHub REST API.
//!
//! Every call takes the bearer token it must authenticate with: tokens are owned and refreshed by
//! whoever drives the bot, never stored here.

use async_trait::async_trait;

mod client;
mod error;
mod pagination;
#[cfg(test)]
pub(crate) mod testing;

pub use client::GitHubClient;
pub use error::ApiError;

/// The mutating part of the API the bot's handlers rely on.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// `POST {issue_url}/labels`
    async fn add_label(&self, issue_url: &str, label: &str, token: &str) -> Result<(), ApiError>;

    /// `DELETE {issue_url}/labels/{label}`
    async fn remove_label(&self, issue_url: &str, label: &str, token: &str)
        -> Result<(), ApiError>;

    /// Asks `reviewer` to review the pull request at `pull_url`.
    async fn request_review(
        &self,
        pull_url: &str,
        reviewer: &str,
        token: &str,
    ) -> Result<(), ApiError>;
}
