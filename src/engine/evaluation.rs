use crate::engine::{BackendReply, EvaluationBackend, TransportFailure};
use crate::model::{CheckConfig, CheckRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;

const CHECK_PATH: &str = "api/check";

/// reqwest-backed client for `POST {base_url}/api/check`.
pub struct HttpBackend {
    http: reqwest::Client,
    check_url: Url,
}

impl HttpBackend {
    pub fn new(cfg: &CheckConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(cfg.user_agent.clone());
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build http client")?;
        let check_url = check_url(&cfg.base_url)?;
        Ok(Self { http, check_url })
    }

    pub fn check_url(&self) -> &Url {
        &self.check_url
    }
}

/// Join the check path onto a base URL, tolerating a trailing slash.
fn check_url(base_url: &str) -> Result<Url> {
    let joined = format!("{}/{}", base_url.trim_end_matches('/'), CHECK_PATH);
    Url::parse(&joined).with_context(|| format!("invalid backend URL: {base_url}"))
}

fn transport_failure(e: reqwest::Error) -> TransportFailure {
    if e.is_connect() {
        TransportFailure::unreachable()
    } else {
        TransportFailure::with_message(e.to_string())
    }
}

#[async_trait]
impl EvaluationBackend for HttpBackend {
    async fn evaluate(&self, request: &CheckRequest) -> Result<BackendReply, TransportFailure> {
        tracing::debug!(url = %self.check_url, brand = %request.brand, "posting check");
        let resp = self
            .http
            .post(self.check_url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "check request failed");
                transport_failure(e)
            })?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(transport_failure)?;
        tracing::debug!(status = status.as_u16(), len = bytes.len(), "backend replied");

        let body = match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(v) => Some(v),
            // Error statuses are still interpreted without a body.
            Err(_) if !status.is_success() => None,
            Err(e) => {
                return Err(TransportFailure::with_message(format!(
                    "invalid response body: {e}"
                )))
            }
        };

        Ok(BackendReply {
            status: status.as_u16(),
            body,
        })
    }
}
