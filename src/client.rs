use crate::config::ServerConfig;
use crate::detection::{AnalyzeResponse, DetectionResult};
use crate::preview::SelectedFile;
use reqwest::{multipart, StatusCode, Url};
use thiserror::Error;
use tracing::instrument;

/// Multipart field the server reads the upload from.
pub const FILE_FIELD: &str = "file";

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Failed to read {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid analyze endpoint: {0}")]
    Endpoint(String),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Talks to the detection server's `/analyze` endpoint.
#[derive(Clone, Debug)]
pub struct AnalyzeClient {
    client: reqwest::Client,
    endpoint: Url,
    strict_status: bool,
}

impl AnalyzeClient {
    pub fn new(config: &ServerConfig) -> Result<Self, AnalyzeError> {
        let endpoint = Url::parse(&config.get_analyze_url())
            .map_err(|e| AnalyzeError::Endpoint(e.to_string()))?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.get_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
            strict_status: config.strict_status,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Read `file` from disk and submit it.
    pub async fn analyze_file(&self, file: &SelectedFile) -> Result<DetectionResult, AnalyzeError> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|source| AnalyzeError::Read {
                file: file.file_name.clone(),
                source,
            })?;
        self.analyze(&file.file_name, file.mime_type(), bytes).await
    }

    #[instrument(skip(self, bytes), fields(endpoint = %self.endpoint, size = bytes.len()))]
    pub async fn analyze(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<DetectionResult, AnalyzeError> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = multipart::Form::new().part(FILE_FIELD, part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%status, len = body.len(), "analyze response received");

        if self.strict_status && !status.is_success() {
            return Err(AnalyzeError::Status { status, body });
        }

        let parsed: AnalyzeResponse = serde_json::from_str(&body)?;
        Ok(parsed.result)
    }
}
