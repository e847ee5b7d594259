//! User session.
//!
//! Owns the result store for the lifetime of one command, together with
//! the currently selected image and the messages raised for the user.

use crate::analysis::{ProgressReporter, Sequencer};
use crate::error::{AnalysisError, StoreError, UploadError};
use crate::models::AnalysisRecord;
use crate::store::{KeyValueStorage, ResultStore};
use crate::upload::{self, ImageUpload, UploadPolicy};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Info,
    Danger,
}

impl AlertLevel {
    pub fn emoji(&self) -> &'static str {
        match self {
            AlertLevel::Success => "✅",
            AlertLevel::Info => "ℹ️ ",
            AlertLevel::Danger => "❌",
        }
    }
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level.emoji(), self.message)
    }
}

pub struct Session<S: KeyValueStorage> {
    store: ResultStore<S>,
    policy: UploadPolicy,
    selected: Option<ImageUpload>,
    alerts: Vec<Alert>,
}

impl<S: KeyValueStorage> Session<S> {
    pub fn new(store: ResultStore<S>, policy: UploadPolicy) -> Self {
        Self {
            store,
            policy,
            selected: None,
            alerts: Vec::new(),
        }
    }

    pub fn store(&self) -> &ResultStore<S> {
        &self.store
    }

    pub fn selected(&self) -> Option<&ImageUpload> {
        self.selected.as_ref()
    }

    /// Whether an accepted image is waiting to be analysed.
    pub fn can_analyze(&self) -> bool {
        self.selected.is_some()
    }

    /// Validate and select the image at `path`.
    ///
    /// A rejected image raises a danger alert and leaves the previous
    /// selection in place.
    pub fn select_image(&mut self, path: &Path) -> Result<&ImageUpload, UploadError> {
        match upload::load_image(path, &self.policy) {
            Ok(image) => Ok(self.selected.insert(image)),
            Err(e) => {
                warn!("Rejected {}: {}", path.display(), e);
                self.alerts.push(Alert::new(AlertLevel::Danger, e.to_string()));
                Err(e)
            }
        }
    }

    /// Run the simulated analysis on the selected image.
    ///
    /// Returns the id of the stored record. The selection is consumed
    /// only when the run succeeds.
    pub async fn analyze(
        &mut self,
        sequencer: &Sequencer,
        progress: &dyn ProgressReporter,
    ) -> Result<String, AnalysisError> {
        let image = self
            .selected
            .as_ref()
            .map(|i| i.data_uri.clone())
            .ok_or(AnalysisError::NoImage)?;

        let id = sequencer.run(&mut self.store, image, progress).await?;
        self.selected = None;
        Ok(id)
    }

    pub fn find(&self, id: &str) -> Option<&AnalysisRecord> {
        self.store.find_by_id(id)
    }

    /// Delete the analysis `id` once the user has confirmed.
    ///
    /// Returns the removed record, or `None` when nothing was deleted
    /// (not confirmed, or no such id).
    pub fn delete(
        &mut self,
        id: &str,
        confirmed: bool,
    ) -> Result<Option<AnalysisRecord>, StoreError> {
        if !confirmed {
            return Ok(None);
        }

        let Some(index) = self.store.position(id) else {
            self.alerts.push(Alert::new(
                AlertLevel::Info,
                format!("No analysis with id {}", id),
            ));
            return Ok(None);
        };
        let Some(removed) = self.store.remove_by_id(id) else {
            return Ok(None);
        };

        if let Err(e) = self.store.persist() {
            self.store.restore(index, removed);
            return Err(e);
        }

        info!("Deleted analysis {}", id);
        self.alerts.push(Alert::new(
            AlertLevel::Success,
            "Analysis deleted successfully",
        ));
        Ok(Some(removed))
    }

    #[allow(dead_code)] // Read-only view; the CLI drains with take_alerts()
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn take_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.alerts)
    }
}
