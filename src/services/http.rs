//! Blocking HTTP plumbing shared by the image sources and the backend
//! clients. Callers run these off the UI thread.
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub fn client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// Joins an API base URL and a path with exactly one slash between them.
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn with_bearer(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

pub fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> reqwest::Result<T> {
    client.get(url).send()?.error_for_status()?.json()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalizes_slashes() {
        assert_eq!(
            endpoint("http://localhost:8000/", "/game/save"),
            "http://localhost:8000/game/save"
        );
        assert_eq!(
            endpoint("http://localhost:8000", "memory/top-scores"),
            "http://localhost:8000/memory/top-scores"
        );
    }
}
