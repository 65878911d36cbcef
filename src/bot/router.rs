//! Routing of webhook events to handlers.
//!
//! The routing table is built once at startup with [`RouterBuilder`] and never changes
//! afterwards. A delivery runs every handler registered for its event type and action, in
//! registration order.

use std::fmt::{self, Display};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::github::GitHubApi;
use crate::webhooks::github::{GitHubEvent, GitHubEventType};

/// One bot behavior reacting to webhook events.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Short name used in logs and error reports.
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        event: &GitHubEvent,
        github: &dyn GitHubApi,
        token: &str,
    ) -> anyhow::Result<()>;
}

type Predicate = Box<dyn Fn(&GitHubEvent) -> bool + Send + Sync>;

struct Route {
    event_type: GitHubEventType,
    action: String,
    predicate: Option<Predicate>,
    handler: Box<dyn Handler>,
}

impl Route {
    fn matches(&self, event: &GitHubEvent) -> bool {
        self.event_type == event.kind()
            && event.action() == Some(self.action.as_str())
            && self.predicate.as_ref().map_or(true, |accepts| accepts(event))
    }
}

#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
}

impl RouterBuilder {
    /// Runs `handler` for every `event_type` event with the given `action`.
    pub fn register(
        self,
        event_type: GitHubEventType,
        action: &str,
        handler: impl Handler + 'static,
    ) -> Self {
        self.push(event_type, action, None, Box::new(handler))
    }

    /// Like [`RouterBuilder::register`], for the events `predicate` accepts.
    pub fn register_if(
        self,
        event_type: GitHubEventType,
        action: &str,
        predicate: impl Fn(&GitHubEvent) -> bool + Send + Sync + 'static,
        handler: impl Handler + 'static,
    ) -> Self {
        self.push(
            event_type,
            action,
            Some(Box::new(predicate)),
            Box::new(handler),
        )
    }

    fn push(
        mut self,
        event_type: GitHubEventType,
        action: &str,
        predicate: Option<Predicate>,
        handler: Box<dyn Handler>,
    ) -> Self {
        debug!(
            "registering {} for {}/{}",
            handler.name(),
            event_type,
            action
        );
        self.routes.push(Route {
            event_type,
            action: action.to_owned(),
            predicate,
            handler,
        });
        self
    }

    pub fn build(self) -> Router {
        Router {
            routes: self.routes,
        }
    }
}

pub struct Router {
    routes: Vec<Route>,
}

#[derive(Debug)]
pub struct HandlerFailure {
    pub handler: &'static str,
    pub error: anyhow::Error,
}

impl Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.handler, self.error)
    }
}

/// Every handler that failed during one dispatch.
#[derive(Debug, Error)]
#[error("{} of {} handlers failed: {}", .failures.len(), .attempted, summary(.failures))]
pub struct DispatchError {
    pub attempted: usize,
    pub failures: Vec<HandlerFailure>,
}

fn summary(failures: &[HandlerFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Runs every matching handler and returns how many ran.
    ///
    /// A failing handler doesn't keep the next ones from running.
    pub async fn dispatch(
        &self,
        event: &GitHubEvent,
        github: &dyn GitHubApi,
        token: &str,
    ) -> Result<usize, DispatchError> {
        let mut attempted = 0;
        let mut failures = Vec::new();

        for route in self.routes.iter().filter(|route| route.matches(event)) {
            attempted += 1;
            let name = route.handler.name();
            trace!("running {} for {}", name, event.kind());

            if let Err(error) = route.handler.handle(event, github, token).await {
                warn!("{} failed: {:#}", name, error);
                failures.push(HandlerFailure {
                    handler: name,
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(attempted)
        } else {
            Err(DispatchError {
                attempted,
                failures,
            })
        }
    }
}
