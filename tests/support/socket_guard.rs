//! Skips mock-server tests on hosts where localhost cannot be bound.
//!
//! CI sets `DIRGRAB_REQUIRE_SOCKET_TESTS=1` so a skip becomes a failure there.

use std::net::TcpListener;

use wiremock::MockServer;

const REQUIRE_ENV: &str = "DIRGRAB_REQUIRE_SOCKET_TESTS";

fn sockets_required() -> bool {
    std::env::var(REQUIRE_ENV).is_ok_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        )
    })
}

/// Starts a mock listing server, or returns `None` when the calling test
/// should return early.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return Some(MockServer::start().await);
    }

    let test = std::thread::current()
        .name()
        .unwrap_or("unnamed test")
        .to_string();
    assert!(
        !sockets_required(),
        "{test}: localhost cannot be bound and {REQUIRE_ENV} is set"
    );
    eprintln!("{test}: skipped, localhost cannot be bound (set {REQUIRE_ENV}=1 to fail instead)");
    None
}
