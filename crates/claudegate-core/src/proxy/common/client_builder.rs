use std::time::Duration;

use crate::error::AppResult;

/// Build the backend HTTP client with the configured timeout.
pub fn build_http_client(timeout_secs: u64) -> AppResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(5)))
        .connect_timeout(Duration::from_secs(30))
        .tcp_nodelay(true)
        .build()?;
    Ok(client)
}
