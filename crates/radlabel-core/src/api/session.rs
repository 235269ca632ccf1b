//! Review session methods.

use crate::catalog::{ItemKey, Modality};
use crate::session::{
    CategorySummary, CurrentItem, HistoryEntry, LabelUpdate, Progress, Session, SessionState,
    Submission, ViewMode,
};
use crate::{LabelApi, Result};

impl LabelApi {
    // ========================================
    // Sessions
    // ========================================

    /// Authenticate `identifier` and open a session on `modality`.
    ///
    /// Nothing is read from the label store unless authentication succeeds.
    pub fn open_session(&self, identifier: &str, modality: &str) -> Result<Session> {
        let reviewer = self.auth.authenticate(identifier).into_result()?;
        let modality = Modality::new(modality)?;
        Ok(Session::new(reviewer, modality))
    }

    /// Like [`LabelApi::open_session`], with an explicit view mode.
    pub fn open_session_with_view(
        &self,
        identifier: &str,
        modality: &str,
        view: ViewMode,
    ) -> Result<Session> {
        Ok(self.open_session(identifier, modality)?.with_view(view))
    }

    pub fn session_state(&self, session: &Session) -> Result<SessionState> {
        self.sessions.state(session)
    }

    pub fn current_item(&self, session: &Session) -> Result<Option<CurrentItem>> {
        self.sessions.current_item(session)
    }

    // ========================================
    // Labeling
    // ========================================

    pub fn submit_label(&self, session: &Session, submission: Submission) -> Result<SessionState> {
        self.sessions.submit(session, submission)
    }

    pub fn skip_item(&self, session: &Session, item_key: Option<ItemKey>) -> Result<SessionState> {
        self.sessions.skip(session, item_key)
    }

    pub fn drop_item(&self, session: &Session, item_key: Option<ItemKey>) -> Result<SessionState> {
        self.sessions.drop_item(session, item_key)
    }

    // ========================================
    // History and edits
    // ========================================

    pub fn history(&self, session: &Session) -> Result<Vec<HistoryEntry>> {
        self.sessions.history(session)
    }

    pub fn update_label(
        &self,
        session: &Session,
        key: &ItemKey,
        update: LabelUpdate,
    ) -> Result<HistoryEntry> {
        self.sessions.update(session, key, update)
    }

    pub fn update_report_text(
        &self,
        session: &Session,
        key: &ItemKey,
        report_text: String,
        reasoning: Option<String>,
    ) -> Result<HistoryEntry> {
        self.sessions
            .update_report_text(session, key, report_text, reasoning)
    }

    pub fn delete_label(&self, session: &Session, key: &ItemKey) -> Result<bool> {
        self.sessions.delete(session, key)
    }

    // ========================================
    // Reporting
    // ========================================

    pub fn progress(&self, session: &Session) -> Result<Progress> {
        self.sessions.progress(session)
    }

    pub fn summary(&self, session: &Session) -> Result<CategorySummary> {
        self.sessions.summary(session)
    }

    pub fn prune_stale_labels(&self, session: &Session) -> Result<Vec<ItemKey>> {
        self.sessions.prune_stale(session)
    }
}
