//! Shared plumbing for provider clients: one `reqwest::Client` per provider
//! class, retried sends, status checks and JSON decoding.

use std::future::Future;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::config::EndpointConfig;
use crate::error::{NetworkError, ReqwestErrorExt};
use crate::retry::with_retry;

pub const USER_AGENT: &str = concat!("floodcast/", env!("CARGO_PKG_VERSION"));

/// Build a client carrying the endpoint's timeout.
pub fn build_client(endpoint: &EndpointConfig) -> Result<Client, NetworkError> {
    Client::builder()
        .timeout(endpoint.timeout())
        .user_agent(USER_AGENT)
        .build()
        .map_err(ReqwestErrorExt::into_network_error)
}

/// Fail on non-success status, keeping the body for diagnostics.
pub async fn check_response(response: Response) -> Result<Response, NetworkError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(NetworkError::from_status(status, body));
    }
    Ok(response)
}

/// Send with the endpoint's retry policy and decode a JSON body.
pub async fn send_json<T, F, Fut>(
    endpoint: &EndpointConfig,
    provider: &str,
    operation: F,
) -> Result<T, NetworkError>
where
    T: DeserializeOwned,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let response = with_retry(&endpoint.retry(), provider, operation)
        .await
        .map_err(ReqwestErrorExt::into_network_error)?;
    let response = check_response(response).await?;

    response
        .json::<T>()
        .await
        .map_err(|e| NetworkError::InvalidResponse(e.to_string()))
}
