use async_trait::async_trait;
use common::{
    data::{DocumentNode, DocumentSummary, Language, SelectedAsset},
    payloads::{PresentationResponse, ProcessRequest, StatusResponse, UploadResponse},
};

use crate::error::ApiError;

/// The documentation backend as the client sees it. [`ApiClient`] talks to
/// the real service over HTTP; tests substitute scripted fakes.
///
/// [`ApiClient`]: crate::api::ApiClient
#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST /upload`
    async fn upload(&self, asset: &SelectedAsset) -> Result<UploadResponse, ApiError>;

    /// `POST /process/{id}`
    async fn process(&self, video_id: &str, request: &ProcessRequest) -> Result<StatusResponse, ApiError>;

    /// `GET /status/{id}`
    async fn status(&self, video_id: &str) -> Result<StatusResponse, ApiError>;

    /// `POST /create-presentation/{id}?language=`
    async fn create_presentation(
        &self,
        video_id: &str,
        language: Option<Language>,
    ) -> Result<PresentationResponse, ApiError>;

    /// `GET /docs-list/{id}/{dir}`; an empty `dir` lists the root.
    async fn list_directory(&self, video_id: &str, dir: &str) -> Result<Vec<DocumentNode>, ApiError>;

    /// `GET /docs/{id}/{path}`
    async fn fetch_file(&self, video_id: &str, path: &str) -> Result<String, ApiError>;

    /// `GET /fetch_api/docs-folders`
    async fn list_documents(&self) -> Result<Vec<DocumentSummary>, ApiError>;

    /// `PATCH /api/docs/{id}/update-title`
    async fn update_title(&self, video_id: &str, title: &str) -> Result<(), ApiError>;

    fn download_url(&self, video_id: &str) -> String;

    fn presentation_download_url(&self, video_id: &str) -> String;
}
