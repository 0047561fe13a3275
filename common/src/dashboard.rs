use std::{fmt, str::FromStr};

use crate::data::{DocumentSummary, UnknownVariant};

pub const COMPLETED: &str = "completed";
pub const PROCESSING: &str = "processing";
pub const FAILED: &str = "failed";

/// The status tabs of the dashboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DocumentFilter {
    #[default]
    All,
    Completed,
    Processing,
    Failed,
}

impl DocumentFilter {
    pub fn matches(&self, doc: &DocumentSummary) -> bool {
        match self {
            Self::All => true,
            Self::Completed => doc.status == COMPLETED,
            Self::Processing => doc.status == PROCESSING,
            Self::Failed => doc.status == FAILED,
        }
    }
}

impl FromStr for DocumentFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            COMPLETED => Ok(Self::Completed),
            PROCESSING => Ok(Self::Processing),
            FAILED => Ok(Self::Failed),
            _ => Err(UnknownVariant::new("filter", s)),
        }
    }
}

impl fmt::Display for DocumentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Completed => write!(f, "{COMPLETED}"),
            Self::Processing => write!(f, "{PROCESSING}"),
            Self::Failed => write!(f, "{FAILED}"),
        }
    }
}

pub fn filter_documents(docs: &[DocumentSummary], filter: DocumentFilter) -> Vec<&DocumentSummary> {
    docs.iter().filter(|d| filter.matches(d)).collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub completed: usize,
    pub processing: usize,
    pub failed: usize,
}

pub fn summarize(docs: &[DocumentSummary]) -> Summary {
    docs.iter().fold(
        Summary {
            total: docs.len(),
            ..Default::default()
        },
        |mut acc, doc| {
            match doc.status.as_str() {
                COMPLETED => acc.completed += 1,
                PROCESSING => acc.processing += 1,
                FAILED => acc.failed += 1,
                _ => {}
            }
            acc
        },
    )
}

/// Only finished documents can be opened or renamed.
pub fn is_viewable(doc: &DocumentSummary) -> bool {
    doc.status == COMPLETED
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TitleError {
    #[error("Title cannot be empty.")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleChange {
    Unchanged,
    Rename(String),
}

/// Validates an edited title against the current one.
pub fn title_change(current: &str, edited: &str) -> Result<TitleChange, TitleError> {
    let edited = edited.trim();
    if edited == current {
        return Ok(TitleChange::Unchanged);
    }
    if edited.is_empty() {
        return Err(TitleError::Empty);
    }
    Ok(TitleChange::Rename(edited.to_string()))
}
