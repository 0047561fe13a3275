use serde::{Deserialize, Serialize};

use crate::data::{JobParameters, Language, Persona};

// Response payloads

/// Returned by `POST /upload`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadResponse {
    pub video_id: String,
    pub filename: String,
}

/// Returned by `POST /process/{id}` and `GET /status/{id}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

/// Returned by `POST /create-presentation/{id}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PresentationResponse {
    pub presentation_path: String,
    pub download_url: String,
}

/// Error body in the style the documentation backend uses.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorDetail {
    pub detail: String,
}

// Request payloads

/// Body of `POST /process/{id}`. Absent fields are left out of the JSON.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

impl From<&JobParameters> for ProcessRequest {
    fn from(params: &JobParameters) -> Self {
        fn non_blank(s: &Option<String>) -> Option<String> {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }
        Self {
            prompt: non_blank(&params.prompt),
            persona: params.persona,
            company_website: non_blank(&params.company_website),
            language: Some(params.language),
        }
    }
}

/// Body of `PATCH /api/docs/{id}/update-title`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UpdateTitleRequest {
    pub title: String,
}
