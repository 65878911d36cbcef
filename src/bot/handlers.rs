use crate::bot::router::Router;
use crate::webhooks::github::{GitHubEvent, GitHubEventType};

mod review;
mod status_command;

pub use review::ReviewSubmitted;
pub use status_command::StatusCommand;

/// The bot's routing table.
///
/// With an `opt_in_label`, only issues and pull requests carrying that label are acted upon.
pub fn routes(opt_in_label: Option<&str>) -> Router {
    let builder = Router::builder();

    let builder = match opt_in_label {
        Some(label) => builder
            .register_if(
                GitHubEventType::IssueComment,
                "created",
                opted_in(label),
                StatusCommand,
            )
            .register_if(
                GitHubEventType::PullRequestReview,
                "submitted",
                opted_in(label),
                ReviewSubmitted,
            ),
        None => builder
            .register(GitHubEventType::IssueComment, "created", StatusCommand)
            .register(GitHubEventType::PullRequestReview, "submitted", ReviewSubmitted),
    };

    builder.build()
}

fn opted_in(label: &str) -> impl Fn(&GitHubEvent) -> bool + Send + Sync + 'static {
    let label = label.to_owned();
    move |event| event.has_label(&label)
}
