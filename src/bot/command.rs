use std::fmt::{self, Display};
use std::sync::LazyLock;

use regex::Regex;

use crate::bot::status::StatusLabel;

/// `/status <token>` at the start of a line.
static STATUS_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*/status\s+(\S+)").expect("status command regex is valid"));

/// Tokens accepted after `/status`, and the label each one sets.
const STATUS_TOKENS: &[(&str, StatusLabel)] = &[
    ("needs_review", StatusLabel::NeedsReview),
    ("needs_work", StatusLabel::NeedsWork),
    ("needs_merge", StatusLabel::NeedsMerge),
    ("needs_reviewer", StatusLabel::NeedsReviewer),
    ("awaiting_reviewer", StatusLabel::AwaitingReviewer),
    ("awaiting_changes", StatusLabel::AwaitingChanges),
    ("needs_merger", StatusLabel::NeedsMerger),
    ("awaiting_merger", StatusLabel::AwaitingMerger),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetStatus(StatusLabel),
}

impl Command {
    /// Finds the first recognized command in a comment or review body.
    ///
    /// Bodies without a command, or with an unknown status token, give `None`.
    pub fn parse(body: &str) -> Option<Self> {
        body.lines().find_map(|line| {
            let token = STATUS_COMMAND.captures(line)?.get(1)?.as_str();
            STATUS_TOKENS
                .iter()
                .find(|(name, _)| *name == token)
                .map(|&(_, status)| Command::SetStatus(status))
        })
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetStatus(status) => write!(f, "/status {}", status),
        }
    }
}
