use anyhow::Context;
use async_trait::async_trait;
use tracing::{info, trace};

use crate::bot::command::Command;
use crate::bot::router::Handler;
use crate::bot::status::{set_issue_status, StatusTarget};
use crate::github::GitHubApi;
use crate::webhooks::github::GitHubEvent;

/// Applies `/status` commands posted as issue or pull request comments.
pub struct StatusCommand;

#[async_trait]
impl Handler for StatusCommand {
    fn name(&self) -> &'static str {
        "status_command"
    }

    async fn handle(
        &self,
        event: &GitHubEvent,
        github: &dyn GitHubApi,
        token: &str,
    ) -> anyhow::Result<()> {
        let GitHubEvent::IssueComment(event) = event else {
            trace!("not an issue comment, nothing to do");
            return Ok(());
        };

        let Some(command) = Command::parse(&event.comment.body) else {
            trace!("comment on {} has no command", event.issue);
            return Ok(());
        };

        info!(
            "{} commented `{}` on {}",
            event.comment.user.login, command, event.issue
        );

        let mut target = StatusTarget::from(&event.issue);
        match command {
            Command::SetStatus(status) => set_issue_status(&mut target, status, github, token)
                .await
                .with_context(|| format!("couldn't set status {} on {}", status, event.issue))?,
        }

        Ok(())
    }
}
