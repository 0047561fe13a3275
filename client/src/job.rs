//! Drives one asset through upload, processing and polling.
//!
//! Every piece of job state lives in a [`JobState`] behind a mutex that is never
//! held across an await. Requests run without the lock and their results are
//! applied through [`Shared::update`], which drops them if the job was reset
//! (its generation bumped) in the meantime. The poll loop additionally watches
//! a [`CancellationToken`] so that `reset` or dropping the [`Uploader`] stops it
//! even mid-request.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use common::{
    data::{AssetKind, BuildTarget, JobParameters, SelectedAsset},
    payloads::ProcessRequest,
    status::{self, parse_status, ParsedStatus, StatusTable},
};
use tokio::{select, spawn, sync::watch, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::{
    backend::Backend,
    config::ClientConfig,
    error::JobError,
    notice::{Notice, Notices},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Upload,
    Trigger,
    StatusCheck,
    /// The backend reported `error: ...`.
    Processing,
    Presentation,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum JobPhase {
    #[default]
    Idle,
    /// A file is selected and nothing has been sent yet.
    Ready,
    Uploading,
    Triggering,
    Polling,
    GeneratingDeck,
    Completed,
    NotFound,
    Failed { kind: FailureKind, reason: String },
}

impl JobPhase {
    /// A request or the poll loop is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Uploading | Self::Triggering | Self::Polling | Self::GeneratingDeck
        )
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Completed | Self::NotFound | Self::Failed { .. })
    }
}

/// What a front end needs to draw the job.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobSnapshot {
    pub generation: u64,
    pub file_name: Option<String>,
    pub asset_kind: Option<AssetKind>,
    pub asset_id: Option<String>,
    /// Last status string the backend reported, verbatim.
    pub status: Option<String>,
    pub progress: u8,
    pub label: Option<String>,
    pub phase: JobPhase,
    pub download_url: Option<String>,
    pub presentation_url: Option<String>,
}

#[derive(Default)]
struct JobState {
    generation: u64,
    file: Option<SelectedAsset>,
    kind: Option<AssetKind>,
    params: JobParameters,
    asset_id: Option<String>,
    status: Option<String>,
    phase: JobPhase,
    presentation_ready: bool,
    notices: Notices,
    poll: Option<CancellationToken>,
}

impl JobState {
    /// Forgets everything about the current job and invalidates anything
    /// still in flight for it.
    fn clear(&mut self) {
        if let Some(token) = self.poll.take() {
            token.cancel();
        }
        self.generation += 1;
        self.file = None;
        self.kind = None;
        self.params = JobParameters::default();
        self.asset_id = None;
        self.status = None;
        self.phase = JobPhase::Idle;
        self.presentation_ready = false;
    }

    fn settle(&mut self, phase: JobPhase) {
        self.poll = None;
        self.phase = phase;
    }

    fn fail(&mut self, kind: FailureKind, title: &str, reason: String) {
        self.notices.push(Notice::error(title, reason.clone()));
        self.settle(JobPhase::Failed { kind, reason });
    }
}

struct Shared<B> {
    backend: Arc<B>,
    table: StatusTable,
    state: Mutex<JobState>,
    updates: watch::Sender<JobSnapshot>,
}

impl<B> Shared<B> {
    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B: Backend> Shared<B> {
    fn snapshot(&self, state: &JobState) -> JobSnapshot {
        let status = state.status.as_deref();
        let done = status.is_some_and(|s| parse_status(s) == ParsedStatus::Done);
        JobSnapshot {
            generation: state.generation,
            file_name: state.file.as_ref().map(|f| f.name.clone()),
            asset_kind: state.kind,
            asset_id: state.asset_id.clone(),
            status: state.status.clone(),
            progress: status.map_or(0, |s| self.table.progress_for(s)),
            label: status.map(|s| self.table.label_for(s)),
            phase: state.phase.clone(),
            download_url: state
                .asset_id
                .as_deref()
                .filter(|_| done)
                .map(|id| self.backend.download_url(id)),
            presentation_url: state
                .asset_id
                .as_deref()
                .filter(|_| state.presentation_ready)
                .map(|id| self.backend.presentation_download_url(id)),
        }
    }

    fn publish(&self, state: &JobState) {
        self.updates.send_replace(self.snapshot(state));
    }

    /// Applies `f` unless the job has moved past `generation`.
    fn update<R>(&self, generation: u64, f: impl FnOnce(&mut JobState) -> R) -> Option<R> {
        let mut state = self.lock();
        if state.generation != generation {
            log::debug!("dropping result for stale job generation {generation}");
            return None;
        }
        let r = f(&mut state);
        self.publish(&state);
        Some(r)
    }
}

/// Client side of one upload/process/poll job.
pub struct Uploader<B> {
    shared: Arc<Shared<B>>,
    poll_interval: Duration,
}

impl<B: Backend + 'static> Uploader<B> {
    pub fn new(backend: Arc<B>, config: &ClientConfig) -> Self {
        Self::with_status_table(backend, config, StatusTable::default())
    }

    pub fn with_status_table(backend: Arc<B>, config: &ClientConfig, table: StatusTable) -> Self {
        let (updates, _) = watch::channel(JobSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                backend,
                table,
                state: Mutex::new(JobState::default()),
                updates,
            }),
            poll_interval: config.poll_interval,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.shared.updates.subscribe()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.shared.lock();
        self.shared.snapshot(&state)
    }

    /// Parameters of the last submit; defaults after `reset`.
    pub fn parameters(&self) -> JobParameters {
        self.shared.lock().params.clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.shared.lock().notices.all().to_vec()
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        self.shared.lock().notices.take()
    }

    /// Accepts `video/*` and `image/*` assets only. A rejected asset leaves
    /// the current job alone.
    pub fn select_file(&self, asset: SelectedAsset) -> Result<AssetKind, JobError> {
        let mut state = self.shared.lock();
        let Some(kind) = asset.kind() else {
            state.notices.push(Notice::error(
                "Invalid file type",
                "Please upload a video or image file",
            ));
            return Err(JobError::InvalidFileType {
                media_type: asset.media_type,
            });
        };
        state.clear();
        log::info!("selected {kind} {} ({} bytes)", asset.name, asset.size);
        state.file = Some(asset);
        state.kind = Some(kind);
        state.phase = JobPhase::Ready;
        self.shared.publish(&state);
        Ok(kind)
    }

    /// Uploads the selected asset, asks the backend to process it and starts
    /// polling. Returns once polling is running or the job has failed.
    ///
    /// Nothing is retried automatically; calling `submit` again after a
    /// failure runs both steps again.
    pub async fn submit(&self, params: JobParameters) -> Result<(), JobError> {
        let shared = &self.shared;
        let (generation, asset) = {
            let mut state = shared.lock();
            if state.phase.is_busy() {
                log::debug!("submit ignored, job is {:?}", state.phase);
                return Err(JobError::Busy);
            }
            let Some(asset) = state.file.clone() else {
                state
                    .notices
                    .push(Notice::error("No file selected", "Choose a video or image first"));
                return Err(JobError::NoFileSelected);
            };
            state.params = params.clone();
            state.asset_id = None;
            state.status = None;
            state.presentation_ready = false;
            state.phase = JobPhase::Uploading;
            shared.publish(&state);
            (state.generation, asset)
        };

        let uploaded = match shared.backend.upload(&asset).await {
            Ok(resp) => resp,
            Err(e) => {
                shared
                    .update(generation, |state| {
                        state.fail(FailureKind::Upload, "Upload failed", e.user_message())
                    })
                    .ok_or(JobError::Cancelled)?;
                return Err(JobError::Upload(e));
            }
        };
        let video_id = uploaded.video_id;
        shared
            .update(generation, |state| {
                state.asset_id = Some(video_id.clone());
                state.status = Some(status::UPLOADED.to_string());
                state.phase = JobPhase::Triggering;
            })
            .ok_or(JobError::Cancelled)?;
        log::info!("uploaded {} as {video_id}", asset.name);

        let request = ProcessRequest::from(&params);
        let processed = match shared.backend.process(&video_id, &request).await {
            Ok(resp) => resp,
            Err(e) => {
                shared
                    .update(generation, |state| {
                        state.fail(FailureKind::Trigger, "Processing failed", e.user_message())
                    })
                    .ok_or(JobError::Cancelled)?;
                return Err(JobError::Trigger(e));
            }
        };

        let token = CancellationToken::new();
        shared
            .update(generation, |state| {
                if !processed.status.trim().is_empty() {
                    state.status = Some(processed.status.clone());
                }
                state.phase = JobPhase::Polling;
                state.poll = Some(token.clone());
            })
            .ok_or(JobError::Cancelled)?;
        log::info!("processing {video_id}, polling every {:?}", self.poll_interval);

        spawn(poll_loop(
            Arc::clone(shared),
            generation,
            video_id,
            params,
            self.poll_interval,
            token,
        ));
        Ok(())
    }

    /// Polls an asset that was uploaded earlier, for instance by another
    /// session. The job is treated as a user guide build.
    pub fn follow(&self, video_id: &str) -> Result<(), JobError> {
        let token = CancellationToken::new();
        let generation = {
            let mut state = self.shared.lock();
            if state.phase.is_busy() {
                return Err(JobError::Busy);
            }
            state.clear();
            state.asset_id = Some(video_id.to_string());
            state.phase = JobPhase::Polling;
            state.poll = Some(token.clone());
            self.shared.publish(&state);
            state.generation
        };
        log::info!("following {video_id}, polling every {:?}", self.poll_interval);
        spawn(poll_loop(
            Arc::clone(&self.shared),
            generation,
            video_id.to_string(),
            JobParameters::default(),
            self.poll_interval,
            token,
        ));
        Ok(())
    }

    /// Back to a blank form. Any pending poll is cancelled and late responses
    /// are ignored.
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        state.clear();
        state.notices.clear();
        self.shared.publish(&state);
        log::info!("job reset");
    }

    /// Resolves once nothing is in flight any more.
    pub async fn wait_until_settled(&self) -> JobSnapshot {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|s| !s.phase.is_busy()).await.map(|s| s.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }
}

impl<B> Drop for Uploader<B> {
    fn drop(&mut self) {
        if let Some(token) = self.shared.lock().poll.take() {
            token.cancel();
        }
    }
}

async fn poll_loop<B: Backend>(
    shared: Arc<Shared<B>>,
    generation: u64,
    video_id: String,
    params: JobParameters,
    interval: Duration,
    token: CancellationToken,
) {
    let mut first = true;
    loop {
        if !first {
            select! {
                _ = token.cancelled() => return,
                _ = sleep(interval) => {}
            }
        }
        first = false;

        let response = select! {
            _ = token.cancelled() => return,
            r = shared.backend.status(&video_id) => r,
        };
        let status = match response {
            Ok(r) => r.status,
            Err(e) => {
                shared.update(generation, |state| {
                    state.fail(FailureKind::StatusCheck, "Status check failed", e.user_message())
                });
                return;
            }
        };
        log::debug!("{video_id}: {status}");

        let parsed = parse_status(&status);
        let deck = params.build_target == BuildTarget::Deck;
        let applied = shared.update(generation, |state| {
            state.status = Some(status.clone());
            match parsed {
                ParsedStatus::Done if deck => state.phase = JobPhase::GeneratingDeck,
                ParsedStatus::Done => {
                    state
                        .notices
                        .push(Notice::info("Documentation ready", "Your documentation is ready to download"));
                    state.settle(JobPhase::Completed);
                }
                ParsedStatus::NotFound => {
                    state
                        .notices
                        .push(Notice::error("File not found", format!("The backend has no job {video_id}")));
                    state.settle(JobPhase::NotFound);
                }
                ParsedStatus::Failed { reason } => {
                    state.fail(FailureKind::Processing, "Processing failed", reason.to_string())
                }
                ParsedStatus::AnalyzingKeyframes(_) | ParsedStatus::Stage(_) => {}
            }
        });
        if applied.is_none() {
            return;
        }
        match parsed {
            ParsedStatus::Done if deck => {
                generate_deck(&shared, generation, &video_id, &params, &token).await;
                return;
            }
            p if p.is_terminal() => return,
            _ => {}
        }
    }
}

/// The one-shot presentation request made after a deck job reaches `done`.
async fn generate_deck<B: Backend>(
    shared: &Shared<B>,
    generation: u64,
    video_id: &str,
    params: &JobParameters,
    token: &CancellationToken,
) {
    log::info!("{video_id} done, creating presentation");
    let result = select! {
        _ = token.cancelled() => return,
        r = shared.backend.create_presentation(video_id, Some(params.language)) => r,
    };
    shared.update(generation, |state| match result {
        Ok(resp) => {
            state.presentation_ready = true;
            state
                .notices
                .push(Notice::info("Presentation ready", resp.presentation_path));
            state.settle(JobPhase::Completed);
        }
        Err(e) => state.fail(
            FailureKind::Presentation,
            "Presentation creation failed",
            e.user_message(),
        ),
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::data::{Language, Persona};
    use tokio::time::Instant;

    use super::*;
    use crate::{error::ApiError, testing::FakeBackend};

    fn config() -> ClientConfig {
        ClientConfig::default()
            .with_poll_interval(Duration::from_secs(3))
            .unwrap()
    }

    fn video() -> SelectedAsset {
        SelectedAsset::from_bytes("demo.mp4", "video/mp4", vec![0u8; 2 * 1024 * 1024])
    }

    fn uploader(backend: &Arc<FakeBackend>) -> Uploader<FakeBackend> {
        Uploader::new(Arc::clone(backend), &config())
    }

    #[tokio::test]
    async fn rejects_other_media_types() {
        let backend = Arc::new(FakeBackend::new());
        let job = uploader(&backend);
        job.select_file(video()).unwrap();
        let before = job.snapshot();

        let pdf = SelectedAsset::from_bytes("manual.pdf", "application/pdf", b"%PDF".to_vec());
        let err = job.select_file(pdf).unwrap_err();
        assert!(matches!(err, JobError::InvalidFileType { .. }));
        assert_eq!(job.snapshot(), before);
        let notices = job.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Invalid file type");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn submit_without_file() {
        let backend = Arc::new(FakeBackend::new());
        let job = uploader(&backend);
        assert!(matches!(
            job.submit(JobParameters::default()).await,
            Err(JobError::NoFileSelected)
        ));
        assert!(backend.calls().is_empty());
        assert_eq!(job.notices().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn user_guide_end_to_end() {
        let backend = Arc::new(FakeBackend::new().with_statuses(&["extracting_audio", "done"]));
        let job = uploader(&backend);
        assert_eq!(job.select_file(video()).unwrap(), AssetKind::Video);

        let mut rx = job.subscribe();
        let collector = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let snap = rx.borrow_and_update().clone();
                seen.push((snap.status.clone(), snap.progress));
                if snap.phase.is_settled() {
                    break;
                }
            }
            seen
        });

        let params = JobParameters {
            persona: Some(Persona::Developer),
            ..Default::default()
        };
        job.submit(params).await.unwrap();
        let done = job.wait_until_settled().await;
        let seen = collector.await.unwrap();

        assert_eq!(done.phase, JobPhase::Completed);
        assert_eq!(done.progress, 100);
        assert_eq!(done.asset_id.as_deref(), Some("abc123"));
        assert_eq!(done.download_url.as_deref(), Some("http://fake/download/abc123"));
        assert_eq!(done.presentation_url, None);
        assert!(seen.contains(&(Some("extracting_audio".to_string()), 20)));
        assert_eq!(
            backend.calls(),
            vec![
                "POST /upload",
                "POST /process/abc123",
                "GET /status/abc123",
                "GET /status/abc123",
            ]
        );
        assert_eq!(
            backend.process_requests()[0],
            ProcessRequest {
                persona: Some(Persona::Developer),
                language: Some(Language::English),
                ..Default::default()
            }
        );

        // polling has stopped
        sleep(Duration::from_secs(60)).await;
        assert_eq!(backend.count("GET /status"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deck_target_creates_presentation() {
        let backend = Arc::new(FakeBackend::new().with_statuses(&["transcribing", "done"]));
        let job = uploader(&backend);
        job.select_file(video()).unwrap();
        job.submit(JobParameters {
            build_target: BuildTarget::Deck,
            ..Default::default()
        })
        .await
        .unwrap();
        let done = job.wait_until_settled().await;

        assert_eq!(done.phase, JobPhase::Completed);
        assert_eq!(
            done.presentation_url.as_deref(),
            Some("http://fake/download-presentation/abc123")
        );
        assert_eq!(backend.count("POST /create-presentation/abc123?language=English"), 1);
        assert_eq!(backend.calls().last().unwrap(), "POST /create-presentation/abc123?language=English");
    }

    #[tokio::test(start_paused = true)]
    async fn deck_creation_failure_keeps_the_guide() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_statuses(&["transcribing", "done"])
                .fail_next_presentation(ApiError::Status {
                    code: 500,
                    message: "slides service down".to_string(),
                }),
        );
        let job = uploader(&backend);
        job.select_file(video()).unwrap();
        job.submit(JobParameters {
            build_target: BuildTarget::Deck,
            language: Language::French,
            ..Default::default()
        })
        .await
        .unwrap();
        let snap = job.wait_until_settled().await;

        assert_eq!(
            snap.phase,
            JobPhase::Failed {
                kind: FailureKind::Presentation,
                reason: "slides service down".to_string()
            }
        );
        assert_eq!(snap.presentation_url, None);
        assert_eq!(snap.download_url.as_deref(), Some("http://fake/download/abc123"));
        assert_eq!(backend.count("POST /create-presentation/abc123?language=French"), 1);
        let last = job.notices().pop().unwrap();
        assert!(last.is_error());
        assert_eq!(last.title, "Presentation creation failed");
        assert_eq!(last.description, "slides service down");
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_a_fixed_interval() {
        let backend = Arc::new(
            FakeBackend::new().with_statuses(&["transcribing", "analyzing_keyframes: 3/10", "done"]),
        );
        let job = uploader(&backend);
        job.select_file(video()).unwrap();
        let start = Instant::now();
        job.submit(JobParameters::default()).await.unwrap();
        job.wait_until_settled().await;
        assert!(start.elapsed() >= Duration::from_secs(6));
        assert!(start.elapsed() < Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn backend_error_status_is_terminal() {
        let backend = Arc::new(FakeBackend::new().with_statuses(&["transcribing", "error: disk full"]));
        let job = uploader(&backend);
        job.select_file(video()).unwrap();
        job.submit(JobParameters::default()).await.unwrap();
        let snap = job.wait_until_settled().await;

        assert_eq!(
            snap.phase,
            JobPhase::Failed {
                kind: FailureKind::Processing,
                reason: "disk full".to_string()
            }
        );
        assert_eq!(snap.progress, 0);
        assert!(snap.label.unwrap().contains("disk full"));
        assert_eq!(snap.download_url, None);
        assert!(job.notices().last().unwrap().description.contains("disk full"));
    }

    #[tokio::test(start_paused = true)]
    async fn status_check_failure_keeps_last_status() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_statuses(&["transcribing"])
                .push_status_error(ApiError::Transport("connection reset".to_string())),
        );
        let job = uploader(&backend);
        job.select_file(video()).unwrap();
        job.submit(JobParameters::default()).await.unwrap();
        let snap = job.wait_until_settled().await;

        assert!(matches!(
            snap.phase,
            JobPhase::Failed {
                kind: FailureKind::StatusCheck,
                ..
            }
        ));
        assert_eq!(snap.status.as_deref(), Some("transcribing"));
        assert_eq!(job.notices().last().unwrap().title, "Status check failed");
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_stops_polling() {
        let backend = Arc::new(FakeBackend::new().with_statuses(&["not_found"]));
        let job = uploader(&backend);
        job.select_file(video()).unwrap();
        job.submit(JobParameters::default()).await.unwrap();
        let snap = job.wait_until_settled().await;
        assert_eq!(snap.phase, JobPhase::NotFound);
        assert_eq!(snap.label.as_deref(), Some("File Not Found"));
        sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.count("GET /status"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn follow_polls_an_existing_asset() {
        let backend = Arc::new(FakeBackend::new().with_statuses(&["transcribing", "done"]));
        let job = uploader(&backend);
        job.follow("old42").unwrap();
        assert!(job.follow("old42").is_err());
        let snap = job.wait_until_settled().await;
        assert_eq!(snap.phase, JobPhase::Completed);
        assert_eq!(snap.download_url.as_deref(), Some("http://fake/download/old42"));
        assert_eq!(backend.calls(), vec!["GET /status/old42", "GET /status/old42"]);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_failure_then_manual_retry() {
        let backend = Arc::new(
            FakeBackend::new()
                .fail_next_upload(ApiError::Status {
                    code: 413,
                    message: "file too large".to_string(),
                })
                .with_statuses(&["done"]),
        );
        let job = uploader(&backend);
        job.select_file(video()).unwrap();

        let err = job.submit(JobParameters::default()).await.unwrap_err();
        assert!(matches!(err, JobError::Upload(_)));
        assert_eq!(backend.calls(), vec!["POST /upload"]);
        let notice = job.notices().last().cloned().unwrap();
        assert_eq!(notice.title, "Upload failed");
        assert_eq!(notice.description, "file too large");

        job.submit(JobParameters::default()).await.unwrap();
        assert_eq!(job.wait_until_settled().await.phase, JobPhase::Completed);
        assert_eq!(backend.count("POST /upload"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_failure_halts() {
        let backend = Arc::new(FakeBackend::new().fail_next_process(ApiError::Status {
            code: 500,
            message: "queue unavailable".to_string(),
        }));
        let job = uploader(&backend);
        job.select_file(video()).unwrap();
        let err = job.submit(JobParameters::default()).await.unwrap_err();
        assert!(matches!(err, JobError::Trigger(_)));
        let snap = job.snapshot();
        assert_eq!(snap.asset_id.as_deref(), Some("abc123"));
        assert_eq!(snap.status.as_deref(), Some("uploaded"));
        assert_eq!(backend.count("GET /status"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_submits_upload_once() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_delay(Duration::from_millis(500))
                .with_statuses(&["done"]),
        );
        let job = uploader(&backend);
        job.select_file(video()).unwrap();

        let (first, second) = tokio::join!(
            job.submit(JobParameters::default()),
            job.submit(JobParameters::default())
        );
        assert!(first.is_ok());
        assert!(matches!(second, Err(JobError::Busy)));
        job.wait_until_settled().await;
        assert_eq!(backend.count("POST /upload"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_discards_late_poll_responses() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_delay(Duration::from_secs(1))
                .with_statuses(&["transcribing", "done"]),
        );
        let job = uploader(&backend);
        job.select_file(video()).unwrap();
        job.submit(JobParameters {
            prompt: Some("focus on onboarding".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(job.parameters().prompt.as_deref(), Some("focus on onboarding"));

        // first status request is now in flight
        job.reset();
        sleep(Duration::from_secs(30)).await;

        let snap = job.snapshot();
        assert_eq!(snap.phase, JobPhase::Idle);
        assert_eq!(snap.status, None);
        assert_eq!(snap.asset_id, None);
        assert_eq!(snap.file_name, None);
        assert_eq!(job.parameters(), JobParameters::default());
        assert!(backend.count("GET /status") <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_during_upload_discards_result() {
        let backend = Arc::new(FakeBackend::new().with_delay(Duration::from_secs(1)));
        let job = Arc::new(uploader(&backend));
        job.select_file(video()).unwrap();

        let submitting = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { job.submit(JobParameters::default()).await })
        };
        sleep(Duration::from_millis(100)).await;
        job.reset();
        let result = submitting.await.unwrap();
        assert!(matches!(result, Err(JobError::Cancelled)));
        assert_eq!(job.snapshot().asset_id, None);
        assert_eq!(backend.count("POST /process"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_uploader_stops_polling() {
        let backend = Arc::new(FakeBackend::new().with_statuses(&["transcribing"; 10]));
        let job = uploader(&backend);
        job.select_file(video()).unwrap();
        job.submit(JobParameters::default()).await.unwrap();
        sleep(Duration::from_secs(4)).await;
        let polled = backend.count("GET /status");
        drop(job);
        sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.count("GET /status"), polled);
    }

    #[tokio::test]
    async fn custom_table_drives_labels() {
        let backend = Arc::new(
            FakeBackend::new().fail_next_process(ApiError::Transport("connection refused".to_string())),
        );
        let table = StatusTable::default().merge(
            StatusTable::from_json(r#"[{"key": "uploaded", "progress": 5, "label": "Received"}]"#).unwrap(),
        );
        let job = Uploader::with_status_table(Arc::clone(&backend), &config(), table);
        job.select_file(video()).unwrap();
        assert!(job.submit(JobParameters::default()).await.is_err());
        let snap = job.snapshot();
        assert_eq!(snap.label.as_deref(), Some("Received"));
        assert_eq!(snap.progress, 5);
    }
}
