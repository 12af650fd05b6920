use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::Client;

use crate::config::CONFIG;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("facestyle/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(CONFIG.gemini_timeout_seconds.max(1) + 30))
        .build()
        .expect("Failed to build HTTP client")
});

/// Shared client for provider calls and for the workflow's HTTP service.
pub fn get_http_client() -> &'static Client {
    &HTTP_CLIENT
}
