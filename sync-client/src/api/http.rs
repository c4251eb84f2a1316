//! HTTP implementation of [`StateApi`] using `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use sync_types::{endpoints, Command};

use super::{ApiError, StateApi};

/// Limit on establishing the TCP/TLS connection.
///
/// Responses themselves have no deadline: a slow controller shows up as a
/// late update, not an error.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Controller API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// Create a client for the controller at `base_url` (e.g. `http://pool:4200`).
    ///
    /// Use [`with_client`](Self::with_client) to impose a request deadline.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

fn require_ok(status: StatusCode) -> Result<(), ApiError> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
        })
    }
}

fn request_error(error: reqwest::Error) -> ApiError {
    if error.is_decode() {
        ApiError::Decode(error.to_string())
    } else {
        ApiError::Request(error.to_string())
    }
}

#[async_trait]
impl StateApi for HttpApi {
    async fn fetch_state(&self) -> Result<Value, ApiError> {
        let response = self
            .client
            .get(self.url(endpoints::STATE_ALL))
            .send()
            .await
            .map_err(request_error)?;
        require_ok(response.status())?;

        let document = response.json::<Value>().await.map_err(request_error)?;
        tracing::trace!("fetched full state");
        Ok(document)
    }

    async fn send_command(&self, command: &Command) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url(command.endpoint()))
            .json(&command.body())
            .send()
            .await
            .map_err(request_error)?;
        require_ok(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // ===========================================
    // Full-state fetch
    // ===========================================

    #[tokio::test]
    async fn fetch_state_returns_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/state/all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "circuits": [{"id": 6, "isOn": true}],
                "temps": {"air": 71}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpApi::new(&server.uri()).unwrap();
        let document = api.fetch_state().await.unwrap();

        assert_eq!(document["circuits"][0]["id"], 6);
        assert_eq!(document["temps"]["air"], 71);
    }

    #[tokio::test]
    async fn fetch_state_non_200_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/state/all"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = HttpApi::new(&server.uri()).unwrap();
        let result = api.fetch_state().await;

        assert_eq!(result, Err(ApiError::Status { status: 500 }));
    }

    #[tokio::test]
    async fn fetch_state_other_success_code_is_still_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let api = HttpApi::new(&server.uri()).unwrap();
        assert_eq!(
            api.fetch_state().await,
            Err(ApiError::Status { status: 204 })
        );
    }

    #[tokio::test]
    async fn fetch_state_bad_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/state/all"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let api = HttpApi::new(&server.uri()).unwrap();
        let result = api.fetch_state().await;

        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn slow_controller_is_late_not_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/state/all"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"marker": 1}))
                    .set_delay(Duration::from_secs(CONNECT_TIMEOUT_SECS + 1)),
            )
            .mount(&server)
            .await;

        let api = HttpApi::new(&server.uri()).unwrap();
        let document = api.fetch_state().await.unwrap();

        assert_eq!(document, json!({"marker": 1}));
    }

    #[tokio::test]
    async fn caller_supplied_client_can_set_a_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let api = HttpApi::with_client(client, &server.uri());

        assert!(matches!(api.fetch_state().await, Err(ApiError::Request(_))));
    }

    #[tokio::test]
    async fn unreachable_controller_is_request_error() {
        let api = HttpApi::new("http://127.0.0.1:1").unwrap();
        let result = api.fetch_state().await;
        assert!(matches!(result, Err(ApiError::Request(_))));
    }

    // ===========================================
    // Commands
    // ===========================================

    #[tokio::test]
    async fn send_command_puts_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/state/circuit/setState"))
            .and(body_json(json!({"id": 6, "state": true})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpApi::new(&server.uri()).unwrap();
        api.send_command(&Command::circuit_state(6, true))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_command_rejection_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let api = HttpApi::new(&server.uri()).unwrap();
        let result = api.send_command(&Command::pump_speed(1, 2500)).await;

        assert_eq!(result, Err(ApiError::Status { status: 400 }));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let api = HttpApi::with_client(reqwest::Client::new(), "http://pool:4200/");
        assert_eq!(api.url("/state/all"), "http://pool:4200/state/all");
    }
}
