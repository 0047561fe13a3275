use std::{path::Path, time::Duration};

use async_trait::async_trait;
use common::{
    data::{AssetSource, DocumentNode, DocumentSummary, Language, SelectedAsset},
    payloads::*,
};
use futures_util::StreamExt;
use reqwest::{
    multipart::{Form, Part},
    Body, Client, Response,
};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::{backend::Backend, config::ClientConfig, error::ApiError};

/// Which artifact `download` fetches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DownloadTarget {
    Bundle,
    Presentation,
}

/// HTTP implementation of [`Backend`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Turns a non-success status code into an error carrying the body.
    async fn check(input: reqwest::Result<Response>) -> Result<Response, ApiError> {
        let res = input?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            log::debug!("request failed with {status}: {body}");
            return Err(ApiError::Status {
                code: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(res)
    }

    /// Checks the status code and decodes the JSON body.
    async fn process_response<Resp: DeserializeOwned>(
        input: reqwest::Result<Response>,
    ) -> Result<Resp, ApiError> {
        let res = Self::check(input).await?;
        let text = res.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn file_part(asset: &SelectedAsset) -> Result<Part, ApiError> {
        let part = match &asset.source {
            AssetSource::Memory(bytes) => Part::bytes(bytes.clone()),
            AssetSource::Path(path) => {
                let file = tokio::fs::File::open(path).await?;
                Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), asset.size)
            }
        };
        Ok(part.file_name(asset.name.clone()).mime_str(&asset.media_type)?)
    }

    /// Streams a result artifact to `dest`. Returns the number of bytes written.
    pub async fn download(
        &self,
        video_id: &str,
        target: DownloadTarget,
        dest: &Path,
    ) -> Result<u64, ApiError> {
        let url = match target {
            DownloadTarget::Bundle => self.download_url(video_id),
            DownloadTarget::Presentation => self.presentation_download_url(video_id),
        };
        let res = Self::check(self.client.get(url).send().await).await?;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = res.bytes_stream();
        let mut written = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

/// FastAPI reports errors as `{"detail": ...}`; anything else is shown as is.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorDetail>(body) {
        Ok(e) => e.detail,
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn upload(&self, asset: &SelectedAsset) -> Result<UploadResponse, ApiError> {
        let form = Form::new().part("file", Self::file_part(asset).await?);
        let url = self.config.endpoint(&["upload"]);
        log::debug!("uploading {} ({} bytes) to {url}", asset.name, asset.size);
        Self::process_response(self.client.post(url).multipart(form).send().await).await
    }

    async fn process(&self, video_id: &str, request: &ProcessRequest) -> Result<StatusResponse, ApiError> {
        let url = self.config.endpoint(&["process", video_id]);
        Self::process_response(self.client.post(url).json(request).send().await).await
    }

    async fn status(&self, video_id: &str) -> Result<StatusResponse, ApiError> {
        let url = self.config.endpoint(&["status", video_id]);
        Self::process_response(self.client.get(url).send().await).await
    }

    async fn create_presentation(
        &self,
        video_id: &str,
        language: Option<Language>,
    ) -> Result<PresentationResponse, ApiError> {
        let mut url = self.config.endpoint(&["create-presentation", video_id]);
        if let Some(language) = language {
            url.query_pairs_mut().append_pair("language", language.as_str());
        }
        Self::process_response(self.client.post(url).send().await).await
    }

    async fn list_directory(&self, video_id: &str, dir: &str) -> Result<Vec<DocumentNode>, ApiError> {
        let url = self.config.directory_endpoint(&["docs-list", video_id, dir]);
        Self::process_response(self.client.get(url).send().await).await
    }

    async fn fetch_file(&self, video_id: &str, path: &str) -> Result<String, ApiError> {
        let url = self.config.endpoint(&["docs", video_id, path]);
        let res = Self::check(self.client.get(url).send().await).await?;
        Ok(res.text().await?)
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>, ApiError> {
        let url = self.config.endpoint(&["fetch_api", "docs-folders"]);
        Self::process_response(self.client.get(url).send().await).await
    }

    async fn update_title(&self, video_id: &str, title: &str) -> Result<(), ApiError> {
        let url = self.config.endpoint(&["api", "docs", video_id, "update-title"]);
        let payload = UpdateTitleRequest {
            title: title.to_string(),
        };
        Self::check(self.client.patch(url).json(&payload).send().await).await?;
        Ok(())
    }

    fn download_url(&self, video_id: &str) -> String {
        self.config.download_url(video_id)
    }

    fn presentation_download_url(&self, video_id: &str) -> String {
        self.config.presentation_download_url(video_id)
    }
}
