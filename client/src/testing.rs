//! Scripted in-memory backend for unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use common::{
    data::{DocumentNode, DocumentSummary, Language, SelectedAsset},
    payloads::*,
};

use crate::{backend::Backend, error::ApiError};

const BASE: &str = "http://fake";

fn not_found(what: &str) -> ApiError {
    ApiError::Status {
        code: 404,
        message: format!("{what} not found"),
    }
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    calls: Mutex<Vec<String>>,
    process_requests: Mutex<Vec<ProcessRequest>>,
    uploads: Mutex<VecDeque<Result<UploadResponse, ApiError>>>,
    processes: Mutex<VecDeque<Result<StatusResponse, ApiError>>>,
    statuses: Mutex<VecDeque<Result<StatusResponse, ApiError>>>,
    presentations: Mutex<VecDeque<ApiError>>,
    listings: Mutex<HashMap<String, Vec<DocumentNode>>>,
    files: Mutex<HashMap<String, String>>,
    documents: Mutex<Option<Vec<DocumentSummary>>>,
    title_error: Mutex<Option<ApiError>>,
    delay: Duration,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_statuses(self, statuses: &[&str]) -> Self {
        self.statuses.lock().unwrap().extend(statuses.iter().map(|s| {
            Ok(StatusResponse {
                status: s.to_string(),
            })
        }));
        self
    }

    pub fn push_status_error(self, e: ApiError) -> Self {
        self.statuses.lock().unwrap().push_back(Err(e));
        self
    }

    pub fn fail_next_upload(self, e: ApiError) -> Self {
        self.uploads.lock().unwrap().push_back(Err(e));
        self
    }

    pub fn fail_next_process(self, e: ApiError) -> Self {
        self.processes.lock().unwrap().push_back(Err(e));
        self
    }

    pub fn fail_next_presentation(self, e: ApiError) -> Self {
        self.presentations.lock().unwrap().push_back(e);
        self
    }

    /// Listing returned for `dir` ("" is the root).
    pub fn with_listing(self, dir: &str, nodes: Vec<DocumentNode>) -> Self {
        self.listings.lock().unwrap().insert(dir.to_string(), nodes);
        self
    }

    pub fn with_file(self, path: &str, text: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), text.to_string());
        self
    }

    pub fn with_documents(self, docs: Vec<DocumentSummary>) -> Self {
        *self.documents.lock().unwrap() = Some(docs);
        self
    }

    pub fn fail_title_updates(self, e: ApiError) -> Self {
        *self.title_error.lock().unwrap() = Some(e);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn process_requests(&self) -> Vec<ProcessRequest> {
        self.process_requests.lock().unwrap().clone()
    }

    async fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn upload(&self, asset: &SelectedAsset) -> Result<UploadResponse, ApiError> {
        self.record("POST /upload".to_string()).await;
        let scripted = self.uploads.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(UploadResponse {
                video_id: "abc123".to_string(),
                filename: asset.name.clone(),
            })
        })
    }

    async fn process(&self, video_id: &str, request: &ProcessRequest) -> Result<StatusResponse, ApiError> {
        self.record(format!("POST /process/{video_id}")).await;
        self.process_requests.lock().unwrap().push(request.clone());
        let scripted = self.processes.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(StatusResponse {
                status: "processing".to_string(),
            })
        })
    }

    async fn status(&self, video_id: &str) -> Result<StatusResponse, ApiError> {
        self.record(format!("GET /status/{video_id}")).await;
        let scripted = self.statuses.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Err(ApiError::Transport("no scripted status".to_string())))
    }

    async fn create_presentation(
        &self,
        video_id: &str,
        language: Option<Language>,
    ) -> Result<PresentationResponse, ApiError> {
        let query = language.map(|l| format!("?language={l}")).unwrap_or_default();
        self.record(format!("POST /create-presentation/{video_id}{query}"))
            .await;
        if let Some(e) = self.presentations.lock().unwrap().pop_front() {
            return Err(e);
        }
        Ok(PresentationResponse {
            presentation_path: format!("output/{video_id}/presentation.pptx"),
            download_url: format!("/download-presentation/{video_id}"),
        })
    }

    async fn list_directory(&self, video_id: &str, dir: &str) -> Result<Vec<DocumentNode>, ApiError> {
        self.record(format!("GET /docs-list/{video_id}/{dir}")).await;
        let listing = self.listings.lock().unwrap().get(dir).cloned();
        listing.ok_or_else(|| not_found("directory"))
    }

    async fn fetch_file(&self, video_id: &str, path: &str) -> Result<String, ApiError> {
        self.record(format!("GET /docs/{video_id}/{path}")).await;
        let file = self.files.lock().unwrap().get(path).cloned();
        file.ok_or_else(|| not_found("file"))
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>, ApiError> {
        self.record("GET /fetch_api/docs-folders".to_string()).await;
        let docs = self.documents.lock().unwrap().clone();
        docs.ok_or_else(|| ApiError::Transport("connection refused".to_string()))
    }

    async fn update_title(&self, video_id: &str, title: &str) -> Result<(), ApiError> {
        self.record(format!("PATCH /api/docs/{video_id}/update-title {title}"))
            .await;
        if let Some(e) = self.title_error.lock().unwrap().take() {
            return Err(e);
        }
        if let Some(docs) = self.documents.lock().unwrap().as_mut() {
            for doc in docs.iter_mut().filter(|d| d.id == video_id) {
                doc.title = title.to_string();
            }
        }
        Ok(())
    }

    fn download_url(&self, video_id: &str) -> String {
        format!("{BASE}/download/{video_id}")
    }

    fn presentation_download_url(&self, video_id: &str) -> String {
        format!("{BASE}/download-presentation/{video_id}")
    }
}
