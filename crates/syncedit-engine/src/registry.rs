//! One sync-edit state machine per open document.

use crate::session::{EventOutcome, HostContext, InputEvent, SessionState, SyncEditor};
use std::collections::HashMap;
use std::sync::Arc;
use syncedit_config::logging::session_span;
use syncedit_config::SyncEditConfig;
use syncedit_foundation::{SyncEditError, SyncEditResult};
use tracing::debug;

/// Routes host events to the editor of the document they belong to.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    config: Arc<SyncEditConfig>,
    editors: HashMap<String, SyncEditor>,
}

impl SessionRegistry {
    pub fn new(config: SyncEditConfig) -> Self {
        Self {
            config: Arc::new(config),
            editors: HashMap::new(),
        }
    }

    /// Register `document`. Re-opening a known document keeps its state.
    pub fn open(&mut self, document: &str, language: Option<&str>) -> &mut SyncEditor {
        let config = &self.config;
        self.editors.entry(document.to_string()).or_insert_with(|| {
            debug!(document, language, "Opened document");
            SyncEditor::new(Arc::clone(config), language.map(str::to_string))
        })
    }

    pub fn editor(&self, document: &str) -> Option<&SyncEditor> {
        self.editors.get(document)
    }

    pub fn state(&self, document: &str) -> Option<SessionState> {
        self.editor(document).map(SyncEditor::state)
    }

    /// Documents with a running session.
    pub fn active_documents(&self) -> impl Iterator<Item = &str> {
        self.editors
            .iter()
            .filter(|(_, editor)| editor.state() != SessionState::Idle)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    /// Swap in new settings. Running sessions keep their policy; the next
    /// activation in any document resolves against `config`.
    pub fn reload(&mut self, config: SyncEditConfig) {
        self.config = Arc::new(config);
        for editor in self.editors.values_mut() {
            editor.set_config(Arc::clone(&self.config));
        }
    }

    /// Handle `event` for `document`. Closing a document forgets its editor.
    pub fn handle(
        &mut self,
        document: &str,
        event: InputEvent,
        host: &mut HostContext<'_>,
    ) -> SyncEditResult<EventOutcome> {
        let span = session_span(document);
        let _enter = span.enter();

        let closing = event == InputEvent::DocumentClosed;
        let editor = self
            .editors
            .get_mut(document)
            .ok_or_else(|| SyncEditError::no_session(document))?;
        let outcome = editor.handle(event, host)?;

        if closing {
            self.editors.remove(document);
            debug!("Closed document");
        }
        Ok(outcome)
    }
}
