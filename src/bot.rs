use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, trace, warn};

use crate::{
    config::MarvinConfig,
    github::{GitHubApi, GitHubClient},
    webhooks::Event,
};

pub mod command;
pub mod handlers;
pub mod router;
pub mod status;

pub(crate) mod utils;

use router::Router;

pub struct Marvin {
    github: Arc<GitHubClient>,
    router: Arc<Router>,
    token: Arc<str>,
}

impl Marvin {
    /// Creates a new [`Marvin`] bot, building its GitHub client and routing table from the
    /// provided [`MarvinConfig`].
    pub fn new(config: &MarvinConfig) -> anyhow::Result<Self> {
        let github = GitHubClient::new(config.github_api_url.clone(), &config.user_agent)
            .context("couldn't build GitHub client")?;
        let router = handlers::routes(config.opt_in_label.as_deref());

        Ok(Self {
            github: Arc::new(github),
            router: Arc::new(router),
            token: Arc::from(config.github_token.as_str()),
        })
    }

    /// Handles events until every sender of the channel is dropped.
    ///
    /// Each delivery gets its own task, so a slow one doesn't hold up the others.
    pub async fn run(&self, mut events: UnboundedReceiver<Event>) {
        debug!("running...");

        loop {
            let event = match events.recv().await {
                Some(event) => event,
                None => {
                    info!("all channel senders were dropped, exiting receive loop");
                    break;
                }
            };
            trace!("received event: {:?}", event);

            let github = Arc::clone(&self.github);
            let router = Arc::clone(&self.router);
            let token = Arc::clone(&self.token);
            tokio::spawn(async move {
                if let Err(e) = Self::handle_event(event, &router, github.as_ref(), &token).await {
                    warn!("encountered error while handling event: {:#}", e);
                }
            });
        }
    }

    async fn handle_event(
        event: Event,
        router: &Router,
        github: &dyn GitHubApi,
        token: &str,
    ) -> anyhow::Result<()> {
        match event {
            Event::GitHub(event) => {
                let handled = router.dispatch(&event, github, token).await?;
                if handled == 0 {
                    // event doesn't concern the bot
                    trace!("no handler for {} event", event.kind());
                }
            }
        }

        Ok(())
    }
}
