use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use common::{data::DocumentNode, tree};

use crate::{
    backend::Backend,
    clipboard::ClipboardSink,
    error::{ApiError, ClipboardError},
    notice::{Notice, Notices},
    render,
};

/// Folders nested deeper than this are not expanded.
const MAX_DEPTH: usize = 32;

/// Read-only view of one generated documentation tree and the file picked
/// from it.
pub struct DocumentViewer<B> {
    backend: Arc<B>,
    document_id: Option<String>,
    tree: Vec<DocumentNode>,
    selected: Option<String>,
    content: Option<String>,
    notices: Notices,
}

impl<B: Backend> DocumentViewer<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            document_id: None,
            tree: Vec::new(),
            selected: None,
            content: None,
            notices: Notices::default(),
        }
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn tree(&self) -> &[DocumentNode] {
        &self.tree
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn raw(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// The loaded markdown rendered for a terminal.
    pub fn rendered(&self, styled: bool) -> Option<String> {
        self.content
            .as_deref()
            .map(|md| render::TerminalRenderer::new(styled).render(md))
    }

    pub fn rendered_html(&self) -> Option<String> {
        self.content.as_deref().map(render::render_html)
    }

    pub fn notices(&self) -> &[Notice] {
        self.notices.all()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.take()
    }

    /// Fetches the tree of `id` and opens its initial file, if any.
    pub async fn load_tree(&mut self, id: &str) -> Result<(), ApiError> {
        self.document_id = Some(id.to_string());
        self.tree.clear();
        self.selected = None;
        self.content = None;

        match self.fetch_tree(id).await {
            Ok(tree) => self.tree = tree,
            Err(e) => {
                self.notices
                    .push(Notice::error("Failed to load documentation", e.user_message()));
                return Err(e);
            }
        }
        log::debug!("{id}: {} top-level entries", self.tree.len());

        let initial = tree::initial_file(&self.tree).map(|n| n.path.clone());
        match initial {
            // a failed fetch is already reported as a notice
            Some(path) => {
                let _ = self.select_file(&path).await;
            }
            None => log::info!("{id}: no markdown file to open"),
        }
        Ok(())
    }

    /// Lists the root, then every folder the backend did not expand inline,
    /// breadth first.
    async fn fetch_tree(&self, id: &str) -> Result<Vec<DocumentNode>, ApiError> {
        let mut root = self.backend.list_directory(id, "").await?;
        let mut listed = HashSet::new();
        let mut queue: VecDeque<Vec<usize>> = (0..root.len()).map(|i| vec![i]).collect();

        while let Some(index_path) = queue.pop_front() {
            let Some(node) = node_at_mut(&mut root, &index_path) else {
                continue;
            };
            if !node.is_folder() {
                continue;
            }
            if node.children.is_none() {
                if index_path.len() > MAX_DEPTH || !listed.insert(node.path.clone()) {
                    node.children = Some(Vec::new());
                    continue;
                }
                let path = node.path.clone();
                let children = self.backend.list_directory(id, &path).await?;
                if let Some(node) = node_at_mut(&mut root, &index_path) {
                    node.children = Some(children);
                }
            }
            let count = node_at_mut(&mut root, &index_path).map_or(0, |n| n.children().len());
            for i in 0..count {
                let mut child = index_path.clone();
                child.push(i);
                queue.push_back(child);
            }
        }
        Ok(root)
    }

    /// Replaces the displayed file. On failure the pane stays empty.
    pub async fn select_file(&mut self, path: &str) -> Result<(), ApiError> {
        self.content = None;
        let Some(id) = self.document_id.clone() else {
            self.notices
                .push(Notice::error("Failed to load file", "No document is open"));
            return Err(ApiError::Status {
                code: 404,
                message: "no document is open".to_string(),
            });
        };
        self.selected = Some(path.to_string());
        match self.backend.fetch_file(&id, path).await {
            Ok(text) => {
                self.content = Some(text);
                Ok(())
            }
            Err(e) => {
                self.notices.push(Notice::error(
                    "Failed to load file",
                    format!("{path}: {}", e.user_message()),
                ));
                Err(e)
            }
        }
    }

    /// Copies the raw text. Returns `false` when nothing is loaded.
    pub fn copy_content(&mut self, sink: &mut dyn ClipboardSink) -> Result<bool, ClipboardError> {
        let Some(text) = self.content.as_deref() else {
            return Ok(false);
        };
        sink.set_text(text)?;
        self.notices
            .push(Notice::info("Copied", "Markdown copied to clipboard"));
        Ok(true)
    }
}

fn node_at_mut<'a>(mut nodes: &'a mut [DocumentNode], index_path: &[usize]) -> Option<&'a mut DocumentNode> {
    let (last, parents) = index_path.split_last()?;
    for &i in parents {
        let node = nodes.get_mut(i)?;
        nodes = node.children.as_deref_mut()?;
    }
    nodes.get_mut(*last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    #[derive(Default)]
    struct RecordingClipboard(Vec<String>);

    impl ClipboardSink for RecordingClipboard {
        fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.0.push(text.to_string());
            Ok(())
        }
    }

    fn lazy_folder(path: &str) -> DocumentNode {
        DocumentNode {
            children: None,
            ..DocumentNode::folder(path, Vec::new())
        }
    }

    #[tokio::test]
    async fn opens_readme_first() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_listing("", vec![lazy_folder("docs")])
                .with_listing(
                    "docs",
                    vec![DocumentNode::file("docs/guide.md"), DocumentNode::file("docs/README.md")],
                )
                .with_file("docs/README.md", "# Welcome\n")
                .with_file("docs/guide.md", "# Guide\n"),
        );
        let mut viewer = DocumentViewer::new(Arc::clone(&backend));
        viewer.load_tree("abc123").await.unwrap();

        assert_eq!(viewer.selected(), Some("docs/README.md"));
        assert_eq!(viewer.raw(), Some("# Welcome\n"));
        assert_eq!(viewer.tree()[0].children().len(), 2);
        assert_eq!(
            backend.calls(),
            vec![
                "GET /docs-list/abc123/",
                "GET /docs-list/abc123/docs",
                "GET /docs/abc123/docs/README.md",
            ]
        );
    }

    #[tokio::test]
    async fn falls_back_to_first_markdown() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_listing("", vec![DocumentNode::file("guide.md")])
                .with_file("guide.md", "guide body"),
        );
        let mut viewer = DocumentViewer::new(backend);
        viewer.load_tree("abc123").await.unwrap();
        assert_eq!(viewer.selected(), Some("guide.md"));
        assert_eq!(viewer.raw(), Some("guide body"));
    }

    #[tokio::test]
    async fn failed_tree_leaves_pane_empty() {
        let backend = Arc::new(FakeBackend::new());
        let mut viewer = DocumentViewer::new(backend);
        assert!(viewer.load_tree("missing").await.is_err());
        assert!(viewer.tree().is_empty());
        assert_eq!(viewer.raw(), None);
        assert_eq!(viewer.notices().len(), 1);
        assert_eq!(viewer.notices()[0].title, "Failed to load documentation");
    }

    #[tokio::test]
    async fn failed_file_clears_previous_content() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_listing(
                    "",
                    vec![DocumentNode::file("README.md"), DocumentNode::file("gone.md")],
                )
                .with_file("README.md", "hello"),
        );
        let mut viewer = DocumentViewer::new(backend);
        viewer.load_tree("abc123").await.unwrap();
        assert_eq!(viewer.raw(), Some("hello"));

        assert!(viewer.select_file("gone.md").await.is_err());
        assert_eq!(viewer.raw(), None);
        assert_eq!(viewer.selected(), Some("gone.md"));
        assert!(viewer.notices().last().unwrap().description.contains("gone.md"));
    }

    #[tokio::test]
    async fn copy_is_a_noop_without_content() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_listing("", vec![DocumentNode::file("README.md")])
                .with_file("README.md", "# Copy me"),
        );
        let mut viewer = DocumentViewer::new(backend);
        let mut clipboard = RecordingClipboard::default();
        assert!(!viewer.copy_content(&mut clipboard).unwrap());
        assert!(clipboard.0.is_empty());

        viewer.load_tree("abc123").await.unwrap();
        assert!(viewer.copy_content(&mut clipboard).unwrap());
        assert_eq!(clipboard.0, vec!["# Copy me"]);
    }

    #[tokio::test]
    async fn folder_listed_once() {
        // a backend that answers a folder listing with the folder itself
        let backend = Arc::new(
            FakeBackend::new()
                .with_listing("", vec![lazy_folder("loop")])
                .with_listing("loop", vec![lazy_folder("loop")]),
        );
        let mut viewer = DocumentViewer::new(Arc::clone(&backend));
        viewer.load_tree("abc123").await.unwrap();
        assert_eq!(backend.count("GET /docs-list"), 2);
        assert_eq!(viewer.selected(), None);
    }
}
