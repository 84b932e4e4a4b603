//! Per-document analysis state.
//!
//!     A [`Workspace`] owns one [`Analysis`] per open document. Every change replaces the
//!     whole analysis with a fresh one; readers holding the previous `Arc` keep a
//!     consistent snapshot. Nothing is shared between documents.

use super::{Analysis, AnalysisOptions};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Workspace {
    options: AnalysisOptions,
    documents: HashMap<String, Arc<Analysis>>,
}

impl Workspace {
    pub fn new(options: AnalysisOptions) -> Self {
        Self {
            options,
            documents: HashMap::new(),
        }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn open(&mut self, id: impl Into<String>, text: &str) -> Arc<Analysis> {
        let id = id.into();
        tracing::debug!(document = %id, "open");
        self.store(id, text)
    }

    pub fn change(&mut self, id: impl Into<String>, text: &str) -> Arc<Analysis> {
        let id = id.into();
        tracing::debug!(document = %id, "change");
        self.store(id, text)
    }

    /// Drop a document. Returns whether it was open.
    pub fn close(&mut self, id: &str) -> bool {
        tracing::debug!(document = %id, "close");
        self.documents.remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Analysis>> {
        self.documents.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn store(&mut self, id: String, text: &str) -> Arc<Analysis> {
        let analysis = Arc::new(Analysis::analyze(text, &self.options));
        self.documents.insert(id, Arc::clone(&analysis));
        analysis
    }
}
