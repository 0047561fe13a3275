//! In-memory job table and the simulated processing pipeline.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use common::{
    dashboard::{COMPLETED, FAILED, PROCESSING},
    data::{AssetKind, DocumentNode, DocumentSummary},
    payloads::ProcessRequest,
    status::{DONE, NOT_FOUND, UPLOADED},
};

/// Stages a processed job walks through before `done`.
const STAGES: [&str; 9] = [
    "processing",
    "extracting_audio",
    "transcribing",
    "extracting_keyframes",
    "analyzing_keyframes",
    "consolidating_user_journey",
    "generating_documentation_folder_structure",
    "creating_markdown_skeletons",
    "populating_documentation_files",
];
const KEYFRAMES: u32 = 4;

#[derive(Debug, PartialEq, Eq)]
pub enum StoreError {
    NotFound(&'static str),
    NotReady(&'static str),
    BadRequest(String),
}

impl StoreError {
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::NotReady(_) => 409,
            Self::BadRequest(_) => 400,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Self::NotFound(what) => format!("{what} not found"),
            Self::NotReady(what) => format!("{what} is not ready yet"),
            Self::BadRequest(reason) => reason.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    /// Status polls spent on each stage.
    pub steps_per_stage: u32,
    /// Stage that reports `error: ...` instead of advancing.
    pub fail_at: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            steps_per_stage: 1,
            fail_at: None,
        }
    }
}

/// The status strings a processed job reports, in order, ending with `done`.
fn timeline() -> Vec<String> {
    let mut statuses = Vec::new();
    for stage in STAGES {
        if stage == "analyzing_keyframes" {
            statuses.extend((1..=KEYFRAMES).map(|i| format!("{stage}: {i}/{KEYFRAMES}")));
        } else {
            statuses.push(stage.to_string());
        }
    }
    statuses.push(DONE.to_string());
    statuses
}

fn stage_of(status: &str) -> &str {
    status.split(':').next().unwrap_or(status)
}

#[derive(Clone, Debug)]
struct Job {
    title: String,
    kind: Option<AssetKind>,
    created: DateTime<Utc>,
    request: Option<ProcessRequest>,
    /// Status polls answered since processing started.
    polls: u32,
    failed: Option<String>,
    presentation: bool,
}

impl Job {
    fn is_done(&self, steps_per_stage: u32) -> bool {
        self.failed.is_none() && self.current_status(steps_per_stage) == DONE
    }

    fn current_status(&self, steps_per_stage: u32) -> String {
        if let Some(reason) = &self.failed {
            return format!("error: {reason}");
        }
        if self.request.is_none() {
            return UPLOADED.to_string();
        }
        let timeline = timeline();
        let index = (self.polls / steps_per_stage.max(1)) as usize;
        timeline[index.min(timeline.len() - 1)].clone()
    }

    fn dashboard_status(&self, steps_per_stage: u32) -> &'static str {
        if self.failed.is_some() {
            FAILED
        } else if self.is_done(steps_per_stage) {
            COMPLETED
        } else {
            PROCESSING
        }
    }
}

/// Everything the stub backend remembers.
pub struct Store {
    settings: PipelineSettings,
    jobs: Mutex<HashMap<String, Job>>,
}

impl Store {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            settings,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_upload(&self, id: &str, file_name: &str, media_type: &str) {
        let title = file_name
            .rsplit_once('.')
            .map_or(file_name, |(stem, _)| stem)
            .to_string();
        let job = Job {
            title,
            kind: AssetKind::from_media_type(media_type),
            created: Utc::now(),
            request: None,
            polls: 0,
            failed: None,
            presentation: false,
        };
        log::info!("{id}: stored upload {file_name:?} ({media_type})");
        self.lock().insert(id.to_string(), job);
    }

    pub fn start_processing(&self, id: &str, request: ProcessRequest) -> Result<String, StoreError> {
        let mut jobs = self.lock();
        let job = jobs.get_mut(id).ok_or(StoreError::NotFound("Video"))?;
        log::info!("{id}: processing with {request:?}");
        job.request = Some(request);
        job.polls = 0;
        job.failed = None;
        job.presentation = false;
        Ok(STAGES[0].to_string())
    }

    /// The current status of `id`. Every call moves a processing job one
    /// step further.
    pub fn poll_status(&self, id: &str) -> String {
        let mut jobs = self.lock();
        let Some(job) = jobs.get_mut(id) else {
            return NOT_FOUND.to_string();
        };
        let status = job.current_status(self.settings.steps_per_stage);
        if job.request.is_none() || job.failed.is_some() || status == DONE {
            return status;
        }
        if self.settings.fail_at.as_deref() == Some(stage_of(&status)) {
            let reason = format!("{} failed", stage_of(&status));
            log::warn!("{id}: simulated failure at {status}");
            job.failed = Some(reason);
            return job.current_status(self.settings.steps_per_stage);
        }
        job.polls += 1;
        log::debug!("{id}: {status}");
        status
    }

    pub fn create_presentation(&self, id: &str) -> Result<(), StoreError> {
        let mut jobs = self.lock();
        let job = jobs.get_mut(id).ok_or(StoreError::NotFound("Video"))?;
        if !job.is_done(self.settings.steps_per_stage) {
            return Err(StoreError::NotReady("Documentation"));
        }
        job.presentation = true;
        Ok(())
    }

    pub fn has_presentation(&self, id: &str) -> Result<(), StoreError> {
        let jobs = self.lock();
        let job = jobs.get(id).ok_or(StoreError::NotFound("Video"))?;
        if !job.presentation {
            return Err(StoreError::NotReady("Presentation"));
        }
        Ok(())
    }

    /// A finished job's title, for building its documentation.
    pub fn finished_title(&self, id: &str) -> Result<String, StoreError> {
        let jobs = self.lock();
        let job = jobs.get(id).ok_or(StoreError::NotFound("Video"))?;
        if !job.is_done(self.settings.steps_per_stage) {
            return Err(StoreError::NotReady("Documentation"));
        }
        Ok(job.title.clone())
    }

    pub fn summaries(&self) -> Vec<DocumentSummary> {
        let jobs = self.lock();
        let mut docs: Vec<_> = jobs
            .iter()
            .map(|(id, job)| DocumentSummary {
                id: id.clone(),
                title: job.title.clone(),
                kind: job.kind.map_or("unknown".to_string(), |k| k.to_string()),
                status: job.dashboard_status(self.settings.steps_per_stage).to_string(),
                date: job.created.format("%Y-%m-%d").to_string(),
            })
            .collect();
        // ids are uuidv7, so this is creation order
        docs.sort_by(|a, b| b.id.cmp(&a.id));
        docs
    }

    pub fn rename(&self, id: &str, title: &str) -> Result<(), StoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::BadRequest("Title cannot be empty.".to_string()));
        }
        let mut jobs = self.lock();
        let job = jobs.get_mut(id).ok_or(StoreError::NotFound("Document"))?;
        log::info!("{id}: renamed {:?} to {title:?}", job.title);
        job.title = title.to_string();
        Ok(())
    }
}

/// The files every finished job gets, keyed by path.
pub fn documentation(title: &str) -> Vec<(&'static str, String)> {
    vec![
        (
            "README.md",
            format!("# {title}\n\nGenerated from the uploaded recording.\n\n- [Overview](guide/overview.md)\n- [Steps](guide/steps.md)\n"),
        ),
        (
            "guide/overview.md",
            format!("# Overview\n\nWhat **{title}** shows and who it is for.\n"),
        ),
        (
            "guide/steps.md",
            "# Steps\n\n1. Open the application.\n2. Follow the highlighted controls.\n3. Save your work.\n".to_string(),
        ),
        (
            "reference/faq.md",
            "# FAQ\n\n> Ask your administrator for access.\n".to_string(),
        ),
    ]
}

/// Immediate children of `dir` ("" is the root). Folders are returned
/// without children so clients list them separately.
pub fn list_directory(files: &[(&str, String)], dir: &str) -> Option<Vec<DocumentNode>> {
    let dir = dir.trim_matches('/');
    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    };
    let mut nodes: Vec<DocumentNode> = Vec::new();
    for (path, _) in files {
        let Some(rest) = path.strip_prefix(&prefix) else {
            continue;
        };
        match rest.split_once('/') {
            None => nodes.push(DocumentNode::file(*path)),
            Some((folder, _)) => {
                let folder_path = format!("{prefix}{folder}");
                if !nodes.iter().any(|n| n.path == folder_path) {
                    nodes.push(DocumentNode {
                        children: None,
                        ..DocumentNode::folder(folder_path, Vec::new())
                    });
                }
            }
        }
    }
    if nodes.is_empty() && !dir.is_empty() {
        return None;
    }
    Some(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::status::{parse_status, ParsedStatus};

    fn processing_store(settings: PipelineSettings) -> Store {
        let store = Store::new(settings);
        store.insert_upload("j1", "demo.mp4", "video/mp4");
        store.start_processing("j1", ProcessRequest::default()).unwrap();
        store
    }

    #[test]
    fn walks_the_pipeline_to_done() {
        let store = processing_store(PipelineSettings::default());
        let mut seen = Vec::new();
        loop {
            let status = store.poll_status("j1");
            if status == DONE {
                break;
            }
            seen.push(status);
        }
        assert_eq!(seen.first().map(String::as_str), Some("processing"));
        assert!(seen.contains(&"analyzing_keyframes: 2/4".to_string()));
        assert_eq!(seen.len(), STAGES.len() - 1 + KEYFRAMES as usize);
        assert_eq!(store.poll_status("j1"), DONE);
        assert_eq!(store.summaries()[0].status, COMPLETED);
    }

    #[test]
    fn steps_per_stage_slows_it_down() {
        let store = processing_store(PipelineSettings {
            steps_per_stage: 2,
            fail_at: None,
        });
        assert_eq!(store.poll_status("j1"), "processing");
        assert_eq!(store.poll_status("j1"), "processing");
        assert_eq!(store.poll_status("j1"), "extracting_audio");
    }

    #[test]
    fn simulated_failure_sticks() {
        let store = processing_store(PipelineSettings {
            steps_per_stage: 1,
            fail_at: Some("transcribing".to_string()),
        });
        store.poll_status("j1");
        store.poll_status("j1");
        let status = store.poll_status("j1");
        assert_eq!(
            parse_status(&status),
            ParsedStatus::Failed {
                reason: "transcribing failed"
            }
        );
        assert_eq!(store.poll_status("j1"), status);
        assert_eq!(store.summaries()[0].status, FAILED);
    }

    #[test]
    fn unknown_and_unprocessed_jobs() {
        let store = Store::new(PipelineSettings::default());
        assert_eq!(store.poll_status("nope"), NOT_FOUND);
        store.insert_upload("j2", "shot.png", "image/png");
        assert_eq!(store.poll_status("j2"), UPLOADED);
        assert_eq!(store.poll_status("j2"), UPLOADED);
        assert_eq!(store.create_presentation("j2"), Err(StoreError::NotReady("Documentation")));
        let docs = store.summaries();
        assert_eq!(docs[0].title, "shot");
        assert_eq!(docs[0].kind, "image");
    }

    #[test]
    fn rename_validates() {
        let store = Store::new(PipelineSettings::default());
        store.insert_upload("j1", "demo.mp4", "video/mp4");
        assert!(matches!(store.rename("j1", "  "), Err(StoreError::BadRequest(_))));
        assert_eq!(store.rename("zz", "x"), Err(StoreError::NotFound("Document")));
        store.rename("j1", " Tour ").unwrap();
        assert_eq!(store.summaries()[0].title, "Tour");
    }

    #[test]
    fn directory_listing() {
        let files = documentation("Demo");
        let root = list_directory(&files, "").unwrap();
        let names: Vec<_> = root.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(names, vec!["README.md", "guide", "reference"]);
        assert!(root[1].is_folder() && root[1].children.is_none());
        let guide = list_directory(&files, "guide/").unwrap();
        assert_eq!(guide.len(), 2);
        assert_eq!(guide[0].name, "overview.md");
        assert!(list_directory(&files, "missing").is_none());
    }
}
