use std::sync::Arc;

use common::{
    dashboard::{self, DocumentFilter, Summary, TitleChange, TitleError},
    data::DocumentSummary,
};

use crate::{
    backend::Backend,
    error::{ApiError, RenameError},
    notice::{Notice, Notices},
};

/// The list of every documentation job the backend knows about.
pub struct Dashboard<B> {
    backend: Arc<B>,
    documents: Vec<DocumentSummary>,
    notices: Notices,
}

impl<B: Backend> Dashboard<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            documents: Vec::new(),
            notices: Notices::default(),
        }
    }

    /// Replaces the list. On failure the previous list is kept.
    pub async fn load(&mut self) -> Result<(), ApiError> {
        match self.backend.list_documents().await {
            Ok(docs) => {
                log::debug!("loaded {} documents", docs.len());
                self.documents = docs;
                Ok(())
            }
            Err(e) => {
                self.notices
                    .push(Notice::error("Failed to load documents", e.user_message()));
                Err(e)
            }
        }
    }

    pub fn documents(&self) -> &[DocumentSummary] {
        &self.documents
    }

    pub fn get(&self, id: &str) -> Option<&DocumentSummary> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn filtered(&self, filter: DocumentFilter) -> Vec<&DocumentSummary> {
        dashboard::filter_documents(&self.documents, filter)
    }

    pub fn summary(&self) -> Summary {
        dashboard::summarize(&self.documents)
    }

    pub fn notices(&self) -> &[Notice] {
        self.notices.all()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.take()
    }

    /// Renames a document. Blank titles are refused. A loaded document whose
    /// title is unchanged sends nothing; ids missing from the list are sent
    /// as they are and the backend decides.
    pub async fn rename(&mut self, id: &str, title: &str) -> Result<TitleChange, RenameError> {
        let checked = match self.get(id) {
            Some(doc) => dashboard::title_change(&doc.title, title),
            None => match title.trim() {
                "" => Err(TitleError::Empty),
                t => Ok(TitleChange::Rename(t.to_string())),
            },
        };
        let change = match checked {
            Ok(change) => change,
            Err(e) => {
                self.notices.push(Notice::error("Invalid title", e.to_string()));
                return Err(e.into());
            }
        };
        let TitleChange::Rename(new_title) = &change else {
            log::debug!("{id}: title unchanged");
            return Ok(change);
        };

        if let Err(e) = self.backend.update_title(id, new_title).await {
            self.notices
                .push(Notice::error("Update failed", e.user_message()));
            return Err(RenameError::Api(e));
        }
        for doc in self.documents.iter_mut().filter(|d| d.id == id) {
            doc.title = new_title.clone();
        }
        self.notices
            .push(Notice::info("Title updated", format!("Renamed to {new_title:?}")));
        Ok(change)
    }
}
