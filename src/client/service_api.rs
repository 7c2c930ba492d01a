//! Service API client.
//!
//! Every operation runs through the same chain:
//! circuit breaker gate → retry executor → one raw HTTP attempt.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::error::ClientError;
use crate::client::transport::build_http_client;
use crate::client::types::{CreateServiceRequest, CreateServiceResponse, ServiceResponse};
use crate::config::ClientConfig;
use crate::observability::metrics;
use crate::resilience::timeouts::within;
use crate::resilience::{default_retry_policy, CircuitBreaker, RetryExecutor, TransportTimeouts};

/// Operations offered by the downstream service API.
#[async_trait]
pub trait ServiceApi: Send + Sync {
    async fn create_services(
        &self,
        request: &CreateServiceRequest,
        cancel: &CancellationToken,
    ) -> Result<CreateServiceResponse, ClientError>;

    async fn retrieve_service_by_id(
        &self,
        service_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ServiceResponse, ClientError>;
}

/// HTTP implementation of [`ServiceApi`].
pub struct ServiceApiClient {
    http: reqwest::Client,
    base: Url,
    timeouts: TransportTimeouts,
    retry: RetryExecutor,
    breaker: Arc<CircuitBreaker>,
}

impl ServiceApiClient {
    pub fn new(config: &ClientConfig, breaker: Arc<CircuitBreaker>) -> Result<Self, ClientError> {
        let base = Url::parse(&config.host)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.host, e)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.host.clone()));
        }

        Ok(Self {
            http: build_http_client(config)?,
            base,
            timeouts: TransportTimeouts::from(&config.timeouts),
            retry: RetryExecutor::from_config(&config.retries),
            breaker,
        })
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// `{host}/api/services[/segment...]`, with segments percent-encoded.
    fn endpoint(&self, extra: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(["api", "services"])
            .extend(extra);
        Ok(url)
    }

    /// Run one logical operation through breaker and retries.
    async fn execute<T, B>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        build: B,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Fn() -> RequestBuilder,
    {
        let start = Instant::now();
        let build = &build;

        let result = self
            .breaker
            .call_with(
                move || {
                    self.retry.execute(
                        cancel,
                        move |_attempt| self.send_once(build()),
                        default_retry_policy,
                        move |attempt, error: &ClientError| {
                            metrics::record_retry(operation);
                            tracing::warn!(operation, attempt, error = %error, "Downstream call failed, retrying");
                        },
                    )
                },
                |error: &ClientError| !error.is_cancelled(),
            )
            .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::record_downstream_call(operation, outcome, start);
        result
    }

    /// A single HTTP attempt: send, wait for headers, check status, decode.
    async fn send_once<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = within("response headers", self.timeouts.response_header, request.send())
            .await?
            .map_err(ClientError::Transport)?;

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            let body = response.bytes().await.map_err(ClientError::Transport)?;
            return serde_json::from_slice(&body).map_err(ClientError::Decode);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            retry_after,
        })
    }
}

#[async_trait]
impl ServiceApi for ServiceApiClient {
    async fn create_services(
        &self,
        request: &CreateServiceRequest,
        cancel: &CancellationToken,
    ) -> Result<CreateServiceResponse, ClientError> {
        tracing::info!(resources = request.resources.len(), "Creating services");

        let body = serde_json::to_vec(request).map_err(ClientError::Encode)?;
        let url = self.endpoint(&[])?;

        let result: Result<CreateServiceResponse, ClientError> = self
            .execute("create_services", cancel, || {
                self.http
                    .post(url.clone())
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.clone())
            })
            .await;

        match &result {
            Ok(response) => tracing::info!(service_id = %response.data.id, "Services created successfully"),
            Err(e) => tracing::error!(error = %e, status = ?e.status(), "Failed to create services"),
        }
        result
    }

    async fn retrieve_service_by_id(
        &self,
        service_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ServiceResponse, ClientError> {
        let url = self.endpoint(&[service_id])?;

        let result: Result<ServiceResponse, ClientError> = self
            .execute("retrieve_service", cancel, || self.http.get(url.clone()))
            .await;

        if let Err(e) = &result {
            tracing::debug!(service_id, error = %e, "Failed to retrieve service");
        }
        result
    }
}
