//! JSON-over-HTTP research backend

use crate::client::ResearchBackend;
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::wire::{
    AnalysisRequest, CodeGenerationRequest, ExperimentConfigRequest, ExperimentRunRequest,
    MethodRequest, PaperSearchRequest, PaperSearchResponse, PaperWritingRequest, RunHandle,
    RunStatusReport,
};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use sage_tree::{
    AnalysisPayload, CodeGenerationPayload, ExperimentConfigPayload, MethodPayload,
    PaperWritingPayload,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Backend reached over HTTP with JSON bodies
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    /// Create client from configuration
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be
    /// built
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Self::with_client(client, &config.base_url)
    }

    /// Create from an existing client
    ///
    /// # Errors
    /// Returns error if the base URL is invalid
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, BackendError> {
        // Url::join drops the last segment of a base without a trailing slash.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized)
            .map_err(|e| BackendError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base })
    }

    /// Base URL endpoints are resolved against
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a relative endpoint path
    ///
    /// # Errors
    /// Returns error if the path does not join onto the base
    pub fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| BackendError::InvalidUrl(format!("{path}: {e}")))
    }

    fn run_endpoint(&self, run_id: &str) -> Result<Url, BackendError> {
        let mut url = self.endpoint("experiments")?;
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidUrl(self.base.to_string()))?
            .push(run_id);
        Ok(url)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "POST");
        let response = self.client.post(url).json(body).send().await?;
        decode(response).await
    }

    async fn get<R: DeserializeOwned>(&self, url: Url) -> Result<R, BackendError> {
        tracing::debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        decode(response).await
    }
}

async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, BackendError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            message: error_message(&bytes),
        });
    }
    serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Extract a human-readable message from an error body
pub(crate) fn error_message(body: &[u8]) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(body) {
        for key in ["detail", "error", "message"] {
            match map.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }
    String::from_utf8_lossy(body).trim().to_string()
}

#[async_trait]
impl ResearchBackend for HttpBackend {
    async fn search_papers(
        &self,
        request: &PaperSearchRequest,
    ) -> Result<PaperSearchResponse, BackendError> {
        self.post("papers/search", request).await
    }

    async fn generate_method(
        &self,
        request: &MethodRequest,
    ) -> Result<MethodPayload, BackendError> {
        self.post("method/generate", request).await
    }

    async fn generate_experiment_config(
        &self,
        request: &ExperimentConfigRequest,
    ) -> Result<ExperimentConfigPayload, BackendError> {
        self.post("experiment-config/generate", request).await
    }

    async fn generate_code(
        &self,
        request: &CodeGenerationRequest,
    ) -> Result<CodeGenerationPayload, BackendError> {
        self.post("code/generate", request).await
    }

    async fn start_experiment(
        &self,
        request: &ExperimentRunRequest,
    ) -> Result<RunHandle, BackendError> {
        self.post("experiments", request).await
    }

    async fn experiment_status(&self, run_id: &str) -> Result<RunStatusReport, BackendError> {
        let url = self.run_endpoint(run_id)?;
        self.get(url).await
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisPayload, BackendError> {
        self.post("analysis/generate", request).await
    }

    async fn write_paper(
        &self,
        request: &PaperWritingRequest,
    ) -> Result<PaperWritingPayload, BackendError> {
        self.post("paper/generate", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::with_client(Client::new(), base).unwrap()
    }

    #[test]
    fn endpoints_keep_base_path() {
        let b = backend("https://research.example.org/api");
        assert_eq!(
            b.endpoint("papers/search").unwrap().as_str(),
            "https://research.example.org/api/papers/search"
        );
        assert_eq!(
            b.endpoint("/paper/generate").unwrap().as_str(),
            "https://research.example.org/api/paper/generate"
        );
    }

    #[test]
    fn run_ids_are_path_encoded() {
        let b = backend("http://localhost:8000/");
        assert_eq!(
            b.run_endpoint("run 1/x").unwrap().as_str(),
            "http://localhost:8000/experiments/run%201%2Fx"
        );
    }

    #[test]
    fn rejects_unusable_base() {
        assert!(matches!(
            HttpBackend::with_client(Client::new(), "not a url"),
            Err(BackendError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpBackend::with_client(Client::new(), "mailto:someone@example.org"),
            Err(BackendError::InvalidUrl(_))
        ));
    }

    #[test]
    fn error_message_prefers_json_detail() {
        assert_eq!(error_message(br#"{"detail":"quota exceeded"}"#), "quota exceeded");
        assert_eq!(error_message(br#"{"error":{"code":7}}"#), r#"{"code":7}"#);
        assert_eq!(error_message(b"  upstream timeout \n"), "upstream timeout");
    }
}
