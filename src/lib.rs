//! Messaging client library.
//!
//! Keeps a conversation list and one open conversation in sync with the
//! messaging REST API by explicit refetches: paged timelines, read receipts,
//! pinned messages, typing indicators and message composition.

pub mod cli;
pub mod composer;
pub mod config;
pub mod controllers;
pub mod error;
pub mod grouping;
pub mod logging;
pub mod models;
pub mod services;
pub mod timeline;
pub mod typing;

pub use error::{AppError, AppResult};
