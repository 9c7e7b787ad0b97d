use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;

use crate::constants;

/// HTTP client with a bounded timeout and browser-like headers. Upstream
/// rate pages reject obvious bot user agents.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(constants::extract::ACCEPT_LANGUAGE),
    );

    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(constants::extract::USER_AGENT)
        .default_headers(headers)
        .build()
}
