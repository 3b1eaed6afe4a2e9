//! Shared helpers for letters client integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use letters_client::session::SessionListener;
use letters_client::{ClientConfig, LettersClient, MemorySessionStore, Session, TokenPair};
use wiremock::{Match, MockServer, Request};

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Counts session lifecycle events.
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub logins: AtomicUsize,
    pub logouts: AtomicUsize,
    pub expirations: AtomicUsize,
}

impl RecordingListener {
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn expirations(&self) -> usize {
        self.expirations.load(Ordering::SeqCst)
    }
}

impl SessionListener for RecordingListener {
    fn on_login(&self, _tokens: &TokenPair, _username: &str) {
        self.logins.fetch_add(1, Ordering::SeqCst);
    }

    fn on_logout(&self) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_session_expired(&self) {
        self.expirations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Matches requests that carry no `Authorization` header.
pub struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

pub struct Harness {
    pub client: LettersClient,
    pub store: Arc<MemorySessionStore>,
    pub listener: Arc<RecordingListener>,
}

/// Client against `server` with an empty session.
pub fn anonymous(server: &MockServer) -> Harness {
    with_session(server, Session::empty())
}

/// Client against `server`, logged in as alice with the given tokens.
pub fn logged_in(server: &MockServer, access: &str, refresh: &str) -> Harness {
    let tokens = TokenPair {
        access: access.to_string(),
        refresh: refresh.to_string(),
    };
    with_session(server, Session::new(&tokens, "alice"))
}

fn with_session(server: &MockServer, session: Session) -> Harness {
    let store = Arc::new(MemorySessionStore::with_session(session));
    let listener = Arc::new(RecordingListener::default());
    let client = LettersClient::with_listener(
        &ClientConfig::new(&server.uri()),
        store.clone(),
        listener.clone(),
    )
    .expect("build client");

    Harness {
        client,
        store,
        listener,
    }
}

pub fn letters_json() -> serde_json::Value {
    serde_json::json!([
        {
            "id": 2,
            "number": 2,
            "subject": "Policy renewal",
            "addressee": "ACME Ltd",
            "registered_at": "2024-03-05T09:30:00Z",
            "registered_by_username": "alice",
            "isCancelled": false
        },
        {
            "id": 1,
            "number": 1,
            "subject": "Claim settlement",
            "addressee": "Blue Harbour",
            "registered_at": "2024-03-04T16:10:00Z",
            "registered_by_username": "bob",
            "isCancelled": true
        }
    ])
}
