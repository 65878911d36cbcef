use std::sync::Mutex;

use async_trait::async_trait;

use crate::github::{ApiError, GitHubApi};

/// A call made through [`RecordingGitHub`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ApiCall {
    /// `POST {url}/labels`, the label it carried
    AddLabel { url: String, label: String },
    /// `DELETE {url}/labels/{label}`
    RemoveLabel { url: String, label: String },
    RequestReview { url: String, reviewer: String },
}

impl ApiCall {
    pub(crate) fn add(url: &str, label: &str) -> Self {
        Self::AddLabel {
            url: url.to_owned(),
            label: label.to_owned(),
        }
    }

    pub(crate) fn remove(url: &str, label: &str) -> Self {
        Self::RemoveLabel {
            url: url.to_owned(),
            label: label.to_owned(),
        }
    }
}

/// In-memory [`GitHubApi`] recording every call in order.
#[derive(Default)]
pub(crate) struct RecordingGitHub {
    calls: Mutex<Vec<ApiCall>>,
    failing_label: Option<String>,
}

impl RecordingGitHub {
    /// Answers `422` to any call touching `label`, after recording it.
    pub(crate) fn failing_on(label: &str) -> Self {
        Self {
            failing_label: Some(label.to_owned()),
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Labels added, in order.
    pub(crate) fn added(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::AddLabel { label, .. } => Some(label),
                _ => None,
            })
            .collect()
    }

    /// Labels removed, in order.
    pub(crate) fn removed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::RemoveLabel { label, .. } => Some(label),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ApiCall, label: &str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);

        match &self.failing_label {
            Some(failing) if failing == label => Err(ApiError::Status {
                status: 422,
                body: format!("refusing to touch `{}`", label),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl GitHubApi for RecordingGitHub {
    async fn add_label(&self, issue_url: &str, label: &str, _token: &str) -> Result<(), ApiError> {
        self.record(ApiCall::add(issue_url, label), label)
    }

    async fn remove_label(
        &self,
        issue_url: &str,
        label: &str,
        _token: &str,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::remove(issue_url, label), label)
    }

    async fn request_review(
        &self,
        pull_url: &str,
        reviewer: &str,
        _token: &str,
    ) -> Result<(), ApiError> {
        let call = ApiCall::RequestReview {
            url: pull_url.to_owned(),
            reviewer: reviewer.to_owned(),
        };
        self.record(call, "")
    }
}
