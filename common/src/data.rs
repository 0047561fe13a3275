use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

/// What kind of asset the user picked. Decided from the declared media type.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Video,
    Image,
}

impl AssetKind {
    /// Classifies a media type such as `video/mp4`. Anything that is not
    /// `video/*` or `image/*` yields `None`.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let media_type = media_type.trim().to_ascii_lowercase();
        if media_type.starts_with("video/") {
            Some(Self::Video)
        } else if media_type.starts_with("image/") {
            Some(Self::Image)
        } else {
            None
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// Where the bytes of a selected asset live.
#[derive(Clone, Debug)]
pub enum AssetSource {
    /// Streamed from disk at upload time.
    Path(PathBuf),
    Memory(Vec<u8>),
}

#[derive(Clone, Debug)]
pub struct SelectedAsset {
    pub name: String,
    pub media_type: String,
    pub size: u64,
    pub source: AssetSource,
}

impl SelectedAsset {
    pub fn from_bytes(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size: bytes.len() as u64,
            source: AssetSource::Memory(bytes),
        }
    }

    pub fn kind(&self) -> Option<AssetKind> {
        AssetKind::from_media_type(&self.media_type)
    }
}

/// Audience the generated documentation is written for.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Developer,
    ProductManager,
    EndUser,
    Sales,
    Support,
}

impl Persona {
    pub const ALL: [Persona; 5] = [
        Self::Developer,
        Self::ProductManager,
        Self::EndUser,
        Self::Sales,
        Self::Support,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Developer => "developer",
            Self::ProductManager => "product_manager",
            Self::EndUser => "end_user",
            Self::Sales => "sales",
            Self::Support => "support",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: {value}")]
pub struct UnknownVariant {
    what: &'static str,
    value: String,
}

impl UnknownVariant {
    pub(crate) fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}

impl FromStr for Persona {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| UnknownVariant::new("persona", s))
    }
}

/// Output language of the generated artifacts. The wire form is the English
/// name of the language.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    English,
    Spanish,
    French,
    German,
    Portuguese,
    Italian,
    Japanese,
    Chinese,
    Hindi,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Self::English,
        Self::Spanish,
        Self::French,
        Self::German,
        Self::Portuguese,
        Self::Italian,
        Self::Japanese,
        Self::Chinese,
        Self::Hindi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Spanish => "Spanish",
            Self::French => "French",
            Self::German => "German",
            Self::Portuguese => "Portuguese",
            Self::Italian => "Italian",
            Self::Japanese => "Japanese",
            Self::Chinese => "Chinese",
            Self::Hindi => "Hindi",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant::new("language", s))
    }
}

/// Shape of the artifact the user wants at the end.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildTarget {
    #[default]
    UserGuide,
    Deck,
}

impl FromStr for BuildTarget {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guide" | "user guide" | "user_guide" | "user-guide" => Ok(Self::UserGuide),
            "deck" => Ok(Self::Deck),
            _ => Err(UnknownVariant::new("build target", s)),
        }
    }
}

/// Everything the user can tune before submitting a job.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct JobParameters {
    pub prompt: Option<String>,
    pub persona: Option<Persona>,
    pub company_website: Option<String>,
    pub language: Language,
    pub build_target: BuildTarget,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// One entry of a generated documentation tree.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DocumentNode {
    pub name: String,
    /// Relative to the document root, slash separated.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// `None` on a folder means the backend did not expand it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DocumentNode>>,
}

impl DocumentNode {
    pub fn file(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: leaf_name(&path).to_string(),
            path,
            kind: NodeKind::File,
            children: None,
        }
    }

    pub fn folder(path: impl Into<String>, children: Vec<DocumentNode>) -> Self {
        let path = path.into();
        Self {
            name: leaf_name(&path).to_string(),
            path,
            kind: NodeKind::Folder,
            children: Some(children),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn children(&self) -> &[DocumentNode] {
        self.children.as_deref().unwrap_or_default()
    }
}

fn leaf_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// A row of the dashboard list.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub date: String,
}
