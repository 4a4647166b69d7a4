use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;

use super::audit::ActivitySink;
use super::models::{CreateLead, Lead, LeadActivity, LeadFilter, LeadId, LeadStatus, Page};
use crate::errors::PipelineError;

const DEFAULT_PAGE_SIZE: usize = 20;

/// Authoritative source of leads.
/// Real implementation lives behind an API; `InMemoryLeadRepository` is the
/// local stand-in used by the CLI and the tests.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>>;

    /// Idempotent: setting the current status again is a no-op.
    async fn set_lead_status(&self, id: &LeadId, status: &LeadStatus) -> Result<Lead>;
}

/// JSON file a store is mirrored to.
///
/// Snapshots are numbered under the store lock; a write older than the last
/// one on disk is skipped, so writes finishing out of order never roll the
/// file back.
struct FileMirror {
    path: PathBuf,
    written: Mutex<u64>,
}

/// Serialized store contents waiting to be written.
struct PendingWrite {
    mirror: Arc<FileMirror>,
    generation: u64,
    json: String,
}

impl PendingWrite {
    fn write(self) -> Result<()> {
        let mut written = self
            .mirror
            .written
            .lock()
            .map_err(|e| anyhow::anyhow!("Leads file lock poisoned: {}", e))?;
        if self.generation <= *written {
            return Ok(());
        }
        let path = &self.mirror.path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create leads directory")?;
        }
        std::fs::write(path, self.json)
            .with_context(|| format!("Failed to write leads file {}", path.display()))?;
        *written = self.generation;
        Ok(())
    }
}

/// Lead store held in memory, optionally mirrored to a JSON file.
pub struct InMemoryLeadRepository {
    leads: Mutex<Vec<Lead>>,
    mirror: Option<Arc<FileMirror>>,
    generation: AtomicU64,
    latency: Duration,
    failing_status_changes: AtomicUsize,
    offline: AtomicBool,
    status_change_calls: AtomicUsize,
}

impl InMemoryLeadRepository {
    pub fn new(leads: Vec<Lead>) -> Self {
        Self {
            leads: Mutex::new(leads),
            mirror: None,
            generation: AtomicU64::new(0),
            latency: Duration::ZERO,
            failing_status_changes: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            status_change_calls: AtomicUsize::new(0),
        }
    }

    /// Load leads from a JSON array file; every mutation is written back.
    /// A missing file starts an empty store.
    pub fn open(path: &Path) -> Result<Self> {
        let leads = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read leads file {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse leads file {}", path.display()))?
        } else {
            Vec::new()
        };
        let mut repo = Self::new(leads);
        repo.mirror = Some(Arc::new(FileMirror {
            path: path.to_path_buf(),
            written: Mutex::new(0),
        }));
        Ok(repo)
    }

    /// Simulated round-trip delay applied to every async call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next `n` status changes fail.
    pub fn fail_status_changes(&self, n: usize) {
        self.failing_status_changes.store(n, Ordering::SeqCst);
    }

    /// While offline every listing fails.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn status_change_calls(&self) -> usize {
        self.status_change_calls.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Result<Vec<Lead>> {
        Ok(self.lock()?.clone())
    }

    pub fn get_lead(&self, id: &LeadId) -> Result<Option<Lead>> {
        Ok(self.lock()?.iter().find(|l| &l.id == id).cloned())
    }

    pub fn create_lead(&self, input: CreateLead) -> Result<Lead> {
        let now = Utc::now();
        let lead = Lead {
            contact: input.contact,
            property_id: input.property_id,
            source: input.source,
            priority: input.priority.unwrap_or_default(),
            qualification: input.qualification,
            notes: input.notes,
            created_at: now,
            updated_at: now,
            ..Lead::new(
                LeadId::new(uuid::Uuid::new_v4().to_string()),
                input.name,
                LeadStatus::New,
            )
        };
        let mut leads = self.lock()?;
        leads.push(lead.clone());
        self.persist(&leads)?;
        Ok(lead)
    }

    /// Filtered listing split into pages (1-based).
    pub fn list_page(&self, filter: &LeadFilter) -> Result<Page<Lead>> {
        let matching: Vec<Lead> = self
            .lock()?
            .iter()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let total = matching.len();
        let data = matching
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();
        Ok(Page {
            data,
            total,
            page,
            page_size,
            total_pages: total.div_ceil(page_size),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Lead>>> {
        self.leads
            .lock()
            .map_err(|e| anyhow::anyhow!("Lead store lock poisoned: {}", e))
    }

    /// Snapshot `leads` for the file mirror. Call with the store lock held.
    fn prepare_write(&self, leads: &[Lead]) -> Result<Option<PendingWrite>> {
        let Some(mirror) = &self.mirror else {
            return Ok(None);
        };
        let json = serde_json::to_string_pretty(leads).context("Failed to serialize leads")?;
        Ok(Some(PendingWrite {
            mirror: mirror.clone(),
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
            json,
        }))
    }

    fn persist(&self, leads: &[Lead]) -> Result<()> {
        match self.prepare_write(leads)? {
            Some(write) => write.write(),
            None => Ok(()),
        }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>> {
        self.simulate_latency().await;
        if self.offline.load(Ordering::SeqCst) {
            anyhow::bail!("lead repository is offline");
        }
        Ok(self
            .lock()?
            .iter()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect())
    }

    async fn set_lead_status(&self, id: &LeadId, status: &LeadStatus) -> Result<Lead> {
        self.status_change_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let should_fail = self
            .failing_status_changes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            anyhow::bail!("status change for lead {} rejected", id);
        }

        let (updated, write) = {
            let mut leads = self.lock()?;
            let lead = leads
                .iter_mut()
                .find(|l| &l.id == id)
                .ok_or_else(|| PipelineError::LeadNotFound { id: id.clone() })?;
            if &lead.status != status {
                lead.status = status.clone();
                lead.updated_at = Utc::now();
            }
            let updated = lead.clone();
            (updated, self.prepare_write(&leads)?)
        };
        if let Some(write) = write {
            tokio::task::spawn_blocking(move || write.write())
                .await
                .context("Leads file writer stopped")??;
        }
        Ok(updated)
    }
}

impl ActivitySink for InMemoryLeadRepository {
    fn append(&self, lead_id: &LeadId, activity: &LeadActivity) -> Result<()> {
        let mut leads = self.lock()?;
        let lead = leads
            .iter_mut()
            .find(|l| &l.id == lead_id)
            .ok_or_else(|| PipelineError::LeadNotFound { id: lead_id.clone() })?;
        if !lead.activities.iter().any(|a| a.id == activity.id) {
            lead.activities.push(activity.clone());
        }
        self.persist(&leads)
    }
}
