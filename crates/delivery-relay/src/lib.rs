//! HTTP relay implementation of [`redemption_engine::DeliveryChannel`].
//!
//! The relay is the chat-platform side that turns a POST into a private
//! message. This crate makes exactly one attempt per send.

mod webhook;

pub use webhook::{RelayError, WebhookConfig, WebhookDelivery};
