//! Decision core of a pull-request review-trigger bot.
//!
//! Webhook transport, the concrete platform HTTP client, and the
//! owners-cache RPC client live outside this crate; the core consumes
//! them through the [`platform::PlatformClient`] and
//! [`owners::OwnersClient`] traits and derives every decision from the
//! PR's current labels and comment history.

pub mod ci;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod labels;
pub mod notification;
pub mod owners;
pub mod platform;
pub mod post_action;
pub mod pull_request;
pub mod robot;
pub mod suggestion;
pub mod tally;
pub mod verdict;
