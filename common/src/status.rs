//! The backend reports progress as free-form strings. This module turns them
//! into something the client can reason about and display.
//!
//! The vocabulary changes between backend versions, so stage names, progress
//! values and labels live in a [`StatusTable`] that can be loaded from JSON
//! and merged over the built-in one. Only three shapes are structural and
//! handled in code: `analyzing_keyframes: i/n`, `error: <reason>` and the
//! terminal `done` / `not_found` keys.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DONE: &str = "done";
pub const NOT_FOUND: &str = "not_found";
pub const UPLOADED: &str = "uploaded";
const ANALYZING_KEYFRAMES: &str = "analyzing_keyframes";
const ERROR: &str = "error";

static KEYFRAMES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^analyzing_keyframes: (\d+)/(\d+)").expect("valid regex"));

static DEFAULT_TABLE: LazyLock<StatusTable> = LazyLock::new(StatusTable::default);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyframeProgress {
    pub current: u32,
    pub total: u32,
}

impl KeyframeProgress {
    /// `floor(50 + 30 * current / total)`, or 0 when `total` is 0.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let extra = 30 * u64::from(self.current) / u64::from(self.total);
        (50 + extra).min(100) as u8
    }
}

/// Tagged view of a status string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParsedStatus<'a> {
    Done,
    NotFound,
    Failed { reason: &'a str },
    /// `None` when the counter part could not be parsed.
    AnalyzingKeyframes(Option<KeyframeProgress>),
    /// Any other stage name, known to the table or not.
    Stage(&'a str),
}

impl ParsedStatus<'_> {
    /// Polling stops on these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::NotFound | Self::Failed { .. })
    }
}

pub fn parse_status(status: &str) -> ParsedStatus<'_> {
    let status = status.trim();
    if status == DONE {
        return ParsedStatus::Done;
    }
    if status == NOT_FOUND {
        return ParsedStatus::NotFound;
    }
    if let Some(rest) = status.strip_prefix(ERROR) {
        let reason = rest.strip_prefix(':').map(str::trim_start);
        match reason {
            Some(reason) => return ParsedStatus::Failed { reason },
            None if rest.is_empty() => return ParsedStatus::Failed { reason: "" },
            None => {}
        }
    }
    if status.starts_with(ANALYZING_KEYFRAMES) {
        let progress = KEYFRAMES_RE.captures(status).and_then(|caps| {
            Some(KeyframeProgress {
                current: caps[1].parse().ok()?,
                total: caps[2].parse().ok()?,
            })
        });
        return ParsedStatus::AnalyzingKeyframes(progress);
    }
    ParsedStatus::Stage(status)
}

/// One row of the vocabulary.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StageEntry {
    pub key: String,
    pub progress: u8,
    pub label: String,
}

impl StageEntry {
    fn new(key: &str, progress: u8, label: &str) -> Self {
        Self {
            key: key.to_string(),
            progress: progress.min(100),
            label: label.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct StatusTable {
    stages: Vec<StageEntry>,
}

impl Default for StatusTable {
    fn default() -> Self {
        let stages = [
            (UPLOADED, 10, "File Uploaded"),
            ("processing", 20, "Starting Process"),
            ("extracting_audio", 20, "Extracting Audio"),
            ("transcribing", 30, "Transcribing Audio"),
            ("extracting_keyframes", 50, "Extracting Key Frames"),
            ("consolidating_user_journey", 80, "Consolidating User Journey"),
            (
                "generating_documentation_folder_structure",
                85,
                "Generating Documentation Folder Structure",
            ),
            ("creating_markdown_skeletons", 90, "Creating Markdown Skeletons"),
            ("populating_documentation_files", 95, "Populating Documentation Files"),
            ("generating_documentation", 90, "Generating Documentation"),
            (DONE, 100, "Documentation Complete"),
            (NOT_FOUND, 0, "File Not Found"),
        ];
        Self {
            stages: stages
                .into_iter()
                .map(|(key, progress, label)| StageEntry::new(key, progress, label))
                .collect(),
        }
    }
}

impl StatusTable {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut table: Self = serde_json::from_str(json)?;
        for stage in &mut table.stages {
            stage.progress = stage.progress.min(100);
        }
        Ok(table)
    }

    pub fn stages(&self) -> &[StageEntry] {
        &self.stages
    }

    pub fn get(&self, key: &str) -> Option<&StageEntry> {
        self.stages.iter().find(|s| s.key == key)
    }

    /// Adds a stage, replacing any existing one with the same key in place.
    pub fn insert(&mut self, entry: StageEntry) {
        match self.stages.iter_mut().find(|s| s.key == entry.key) {
            Some(existing) => *existing = entry,
            None => self.stages.push(entry),
        }
    }

    /// Overlays `other` on top of this table.
    pub fn merge(mut self, other: StatusTable) -> Self {
        for entry in other.stages {
            self.insert(entry);
        }
        self
    }

    pub fn progress_for(&self, status: &str) -> u8 {
        match parse_status(status) {
            ParsedStatus::Failed { .. } => 0,
            ParsedStatus::AnalyzingKeyframes(progress) => progress.map_or(0, |p| p.percent()),
            ParsedStatus::Done => self.get(DONE).map_or(100, |s| s.progress),
            ParsedStatus::NotFound => self.get(NOT_FOUND).map_or(0, |s| s.progress),
            ParsedStatus::Stage(key) => self.get(key).map_or(0, |s| s.progress),
        }
    }

    pub fn label_for(&self, status: &str) -> String {
        match parse_status(status) {
            ParsedStatus::Failed { reason } => format!("Error: {reason}"),
            ParsedStatus::AnalyzingKeyframes(Some(p)) => {
                format!("Analyzing Keyframes ({}/{})", p.current, p.total)
            }
            ParsedStatus::AnalyzingKeyframes(None) => "Analyzing Keyframes".to_string(),
            ParsedStatus::Done => self.lookup_label(DONE),
            ParsedStatus::NotFound => self.lookup_label(NOT_FOUND),
            ParsedStatus::Stage(key) => self.lookup_label(key),
        }
    }

    fn lookup_label(&self, key: &str) -> String {
        self.get(key)
            .map_or_else(|| "Unknown Status".to_string(), |s| s.label.clone())
    }
}

/// Progress percentage according to the built-in table.
pub fn progress_for(status: &str) -> u8 {
    DEFAULT_TABLE.progress_for(status)
}

/// Human label according to the built-in table.
pub fn label_for(status: &str) -> String {
    DEFAULT_TABLE.label_for(status)
}
