//! hrbot - HR FAQ assistant
//!
//! Answers free-text HR questions by fuzzy-matching them against a fixed
//! catalog of canonical questions, and records usage and feedback for the
//! dashboard.

pub mod analytics;
pub mod catalog;
pub mod chatbot;
pub mod config;
pub mod error;
pub mod search;
pub mod session;

pub use catalog::{Catalog, CatalogEntry};
pub use chatbot::{Chatbot, Response, Suggestion};
pub use config::ChatbotConfig;
pub use error::{HrBotError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
