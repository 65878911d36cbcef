use anyhow::Context;
use async_trait::async_trait;
use tracing::{info, trace};

use crate::bot::command::Command;
use crate::bot::router::Handler;
use crate::bot::status::{set_issue_status, StatusLabel, StatusTarget};
use crate::github::GitHubApi;
use crate::webhooks::github::GitHubEvent;

/// Reacts to submitted pull request reviews.
///
/// Requesting changes moves the pull request to `needs_work`. A `/status` command in the review
/// summary is applied afterwards, on top of that transition.
pub struct ReviewSubmitted;

#[async_trait]
impl Handler for ReviewSubmitted {
    fn name(&self) -> &'static str {
        "review_submitted"
    }

    async fn handle(
        &self,
        event: &GitHubEvent,
        github: &dyn GitHubApi,
        token: &str,
    ) -> anyhow::Result<()> {
        let GitHubEvent::PullRequestReview(event) = event else {
            trace!("not a pull request review, nothing to do");
            return Ok(());
        };

        let pull_request = &event.pull_request;
        let mut target = StatusTarget::from(pull_request);

        if event.review.requests_changes() {
            info!(
                "{} requested changes on {}",
                event.review.user.login, pull_request
            );
            set_issue_status(&mut target, StatusLabel::NeedsWork, github, token)
                .await
                .with_context(|| format!("couldn't mark {} as needing work", pull_request))?;
        }

        let Some(command) = event.review.body.as_deref().and_then(Command::parse) else {
            trace!("review on {} has no command", pull_request);
            return Ok(());
        };

        info!(
            "{} reviewed {} with `{}`",
            event.review.user.login, pull_request, command
        );

        match command {
            Command::SetStatus(status) => set_issue_status(&mut target, status, github, token)
                .await
                .with_context(|| format!("couldn't set status {} on {}", status, pull_request))?,
        }

        Ok(())
    }
}
