//! Status transition recorder and activity sinks.
//!
//! A `status_change` activity is written only for confirmed changes where the
//! previous and new status differ. Sink failures are logged and swallowed:
//! the audit trail is best-effort and never undoes a status change.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::models::{ActivityType, LeadActivity, LeadId, LeadStatus};
use crate::errors::PipelineError;

/// Author recorded on activities the board writes itself.
pub const SYSTEM_AUTHOR: &str = "system";

/// Destination for recorded activities.
pub trait ActivitySink: Send + Sync {
    fn append(&self, lead_id: &LeadId, activity: &LeadActivity) -> Result<()>;
}

/// An activity together with the lead it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedActivity {
    pub lead_id: LeadId,
    #[serde(flatten)]
    pub activity: LeadActivity,
}

/// In-process activity log. Keeps every entry and streams new ones to
/// subscribers.
pub struct MemoryActivityLog {
    entries: Mutex<Vec<RecordedActivity>>,
    tx: broadcast::Sender<RecordedActivity>,
}

impl Default for MemoryActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            entries: Mutex::new(Vec::new()),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecordedActivity> {
        self.tx.subscribe()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<RecordedActivity> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn for_lead(&self, lead_id: &LeadId) -> Vec<RecordedActivity> {
        self.entries()
            .into_iter()
            .filter(|e| &e.lead_id == lead_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ActivitySink for MemoryActivityLog {
    fn append(&self, lead_id: &LeadId, activity: &LeadActivity) -> Result<()> {
        let record = RecordedActivity {
            lead_id: lead_id.clone(),
            activity: activity.clone(),
        };
        self.entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Activity log lock poisoned: {}", e))?
            .push(record.clone());
        let _ = self.tx.send(record); // No subscribers is fine
        Ok(())
    }
}

/// Append-only JSON lines file, one `RecordedActivity` per line.
pub struct JsonlActivityLog {
    path: PathBuf,
}

impl JsonlActivityLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<RecordedActivity>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).context("Failed to read activity log")?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("Failed to parse activity log entry"))
            .collect()
    }
}

impl ActivitySink for JsonlActivityLog {
    fn append(&self, lead_id: &LeadId, activity: &LeadActivity) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create activity log directory")?;
        }
        let record = RecordedActivity {
            lead_id: lead_id.clone(),
            activity: activity.clone(),
        };
        let mut line = serde_json::to_string(&record).context("Failed to serialize activity")?;
        line.push('\n');
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context("Failed to open activity log")?
            .write_all(line.as_bytes())
            .context("Failed to write activity log entry")
    }
}

/// Writes `status_change` activities for confirmed transitions.
#[derive(Default, Clone)]
pub struct StatusTransitionRecorder {
    sinks: Vec<Arc<dyn ActivitySink>>,
}

impl StatusTransitionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn describe(previous: &LeadStatus, current: &LeadStatus) -> String {
        format!("Status changed from \"{}\" to \"{}\"", previous, current)
    }

    /// Record a confirmed transition. Returns the activity, or `None` when the
    /// status did not actually change.
    pub fn record(
        &self,
        lead_id: &LeadId,
        previous: &LeadStatus,
        current: &LeadStatus,
    ) -> Option<LeadActivity> {
        if previous == current {
            debug!(%lead_id, status = %current, "no transition to record");
            return None;
        }
        let activity = LeadActivity::new(
            ActivityType::StatusChange,
            Self::describe(previous, current),
            SYSTEM_AUTHOR,
        );
        for sink in &self.sinks {
            if let Err(source) = sink.append(lead_id, &activity) {
                let err = PipelineError::AuditAppendFailed {
                    lead_id: lead_id.clone(),
                    source,
                };
                warn!(error = %err, "audit append failed; status change kept");
            }
        }
        Some(activity)
    }
}
