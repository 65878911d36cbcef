use anyhow::anyhow;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use tracing::{debug, info, trace, warn};

pub mod events;
pub use events::*;

mod signing;
use signing::SignedGitHubPayload;

use crate::webhooks::{Event, EventSender};

const X_GITHUB_EVENT: &str = "X-GitHub-Event";

pub struct GitHubSecret(pub String);

#[rocket::post("/api/webhooks/github", data = "<payload>")]
pub fn github_webhook(
    event: GitHubEventType,
    payload: SignedGitHubPayload,
    sender: &State<EventSender>,
) -> Result<&'static str, Status> {
    info!("received event {}", event);
    trace!("payload:\n{}", payload.0);

    let event = match GitHubEvent::from_payload(&event, &payload.0) {
        Ok(Some(event)) => event,
        Ok(None) => {
            debug!("no handling for `{}` events, ignoring delivery", event);
            return Ok("ignored");
        }
        Err(e) => {
            warn!("couldn't decode `{}` payload: {}", event, e);
            return Err(Status::BadRequest);
        }
    };

    if let GitHubEvent::Ping(ping) = &event {
        info!("pinged by GitHub: {}", ping.zen);
    }

    sender.0.send(Event::GitHub(event)).map_err(|_| {
        warn!("event channel was closed, dropping delivery");
        Status::ServiceUnavailable
    })?;

    Ok("OK")
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for GitHubEventType {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let event_types = request.headers().get(X_GITHUB_EVENT).collect::<Vec<_>>();
        if event_types.len() != 1 {
            return Outcome::Error((
                Status::BadRequest,
                anyhow!("request header needs exactly one event type"),
            ));
        }

        Outcome::Success(GitHubEventType::from(event_types[0]))
    }
}
