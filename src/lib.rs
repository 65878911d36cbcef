//! A GitHub bot keeping the status labels of issues and pull requests in order.
//!
//! Webhook deliveries are received by the rocket routes in [`webhooks`], turned into
//! [`webhooks::GitHubEvent`]s and dispatched by the [`bot::Marvin`] runtime to the handlers in
//! [`bot::handlers`]. Handlers parse `/status` commands and reconcile labels through the
//! [`github`] API client.

pub mod bot;
pub mod config;
pub mod github;
pub mod webhooks;
