//! Status labels and their reconciliation.
//!
//! An issue or pull request carries at most one status label. Setting a status removes every
//! other status label first, then adds the requested one; labels outside the status vocabulary
//! are never touched.

use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, trace};

use crate::github::{ApiError, GitHubApi};
use crate::webhooks::github::{Issue, IssueRef, Label, PullRequest};

/// The mutually exclusive status labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusLabel {
    NeedsReview,
    NeedsWork,
    NeedsMerge,
    NeedsReviewer,
    AwaitingReviewer,
    AwaitingChanges,
    NeedsMerger,
    AwaitingMerger,
}

impl StatusLabel {
    pub const ALL: [StatusLabel; 8] = [
        Self::NeedsReview,
        Self::NeedsWork,
        Self::NeedsMerge,
        Self::NeedsReviewer,
        Self::AwaitingReviewer,
        Self::AwaitingChanges,
        Self::NeedsMerger,
        Self::AwaitingMerger,
    ];

    /// Name of the label on GitHub.
    pub fn name(self) -> &'static str {
        match self {
            Self::NeedsReview => "needs_review",
            Self::NeedsWork => "needs_work",
            Self::NeedsMerge => "needs_merge",
            Self::NeedsReviewer => "needs_reviewer",
            Self::AwaitingReviewer => "awaiting_reviewer",
            Self::AwaitingChanges => "awaiting_changes",
            Self::NeedsMerger => "needs_merger",
            Self::AwaitingMerger => "awaiting_merger",
        }
    }

    /// The status label called `name`, if it is one.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.name() == name)
    }
}

impl Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("`{0}` is not a status label")]
pub struct UnknownStatus(pub String);

impl FromStr for StatusLabel {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

/// One label operation needed to reach a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelChange {
    Remove(StatusLabel),
    Add(StatusLabel),
}

/// Issue or pull request whose status is being changed, with the labels it is known to carry.
///
/// The labels start out as the snapshot from the webhook payload and are kept up to date as
/// changes are applied, so several transitions during one delivery see each other.
#[derive(Debug, Clone)]
pub struct StatusTarget {
    pub issue: IssueRef,
    pub labels: Vec<String>,
}

impl StatusTarget {
    pub fn new(issue: IssueRef, labels: &[Label]) -> Self {
        Self {
            issue,
            labels: labels.iter().map(|label| label.name.clone()).collect(),
        }
    }

    /// Status labels currently attached, in label order.
    pub fn statuses(&self) -> Vec<StatusLabel> {
        let mut statuses = Vec::new();
        for status in self.labels.iter().filter_map(|name| StatusLabel::from_name(name)) {
            if !statuses.contains(&status) {
                statuses.push(status);
            }
        }
        statuses
    }
}

impl From<&Issue> for StatusTarget {
    fn from(issue: &Issue) -> Self {
        Self::new(issue.issue_ref(), &issue.labels)
    }
}

impl From<&PullRequest> for StatusTarget {
    fn from(pull_request: &PullRequest) -> Self {
        Self::new(pull_request.issue_ref(), &pull_request.labels)
    }
}

/// Computes the label changes that leave `status` as the only status label.
///
/// Removals come first. Nothing is returned when `status` already is the only status label.
pub fn plan_status_change(current: &[StatusLabel], status: StatusLabel) -> Vec<LabelChange> {
    // there should never be more than one, but clear all of them if an external edit left some
    let mut changes: Vec<LabelChange> = current
        .iter()
        .filter(|&&label| label != status)
        .map(|&label| LabelChange::Remove(label))
        .collect();

    if !current.contains(&status) {
        changes.push(LabelChange::Add(status));
    }

    changes
}

/// Sets the status of an issue or pull request, clearing any other status label.
///
/// Stops at the first failing API call; the labels of `target` then reflect the changes that did
/// go through.
pub async fn set_issue_status(
    target: &mut StatusTarget,
    status: StatusLabel,
    github: &dyn GitHubApi,
    token: &str,
) -> Result<(), ApiError> {
    let changes = plan_status_change(&target.statuses(), status);
    if changes.is_empty() {
        trace!("{} already has status {}", target.issue.labels_url(), status);
        return Ok(());
    }

    debug!(
        "setting status {} on {}: {:?}",
        status,
        target.issue.labels_url(),
        changes
    );

    for change in changes {
        let url = target.issue.labels_url();
        match change {
            LabelChange::Remove(label) => {
                github.remove_label(url, label.name(), token).await?;
                target.labels.retain(|name| name != label.name());
            }
            LabelChange::Add(label) => {
                github.add_label(url, label.name(), token).await?;
                target.labels.push(label.name().to_owned());
            }
        }
    }

    Ok(())
}
