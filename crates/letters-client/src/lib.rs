//! Letters register API client.
//!
//! This crate provides:
//! - Session state with pluggable persistence (memory and JSON file stores)
//! - A request executor that attaches bearer credentials
//! - A refresh coordinator that renews expired access tokens once for all
//!   concurrent callers and replays each failed request
//! - Typed operations for login, signup, password reset, and letters
//! - Display helpers for ordering and searching fetched letters

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod register;
pub mod session;

pub use client::{LettersClient, RefreshCoordinator, RefreshState};
pub use config::ClientConfig;
pub use error::ApiError;
pub use models::{Letter, TokenPair};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionListener, SessionStore};
