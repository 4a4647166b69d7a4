//! Optimistic reconciler.
//!
//! Each lead carries a small sync state machine:
//!
//! ```text
//!   Idle ──request──> Pending ──success──> Settled ──refresh──> Idle
//!                      │  ▲
//!                      │  └── request again (supersede: old ticket dropped)
//!                      └──── failure / timeout ──> Idle (card reverted)
//! ```
//!
//! Status requests run as spawned tasks and report back over an mpsc channel;
//! outcomes are applied only when the board owner drains that channel, so the
//! state model is never touched from more than one place.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use super::models::{Lead, LeadId, LeadStatus};
use super::repository::LeadRepository;
use super::state::CardSlot;
use crate::errors::PipelineError;

/// Default upper bound for one status request.
pub const DEFAULT_MUTATION_TIMEOUT: Duration = Duration::from_secs(10);

pub type Ticket = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum LeadSync {
    Idle,
    Pending {
        ticket: Ticket,
        /// Last status the repository confirmed, and where the card sat then.
        origin: LeadStatus,
        origin_slot: CardSlot,
        target: LeadStatus,
    },
    Settled {
        confirmed: LeadStatus,
    },
}

/// Completion report from a spawned status request.
#[derive(Debug)]
pub struct MutationOutcome {
    pub ticket: Ticket,
    pub lead_id: LeadId,
    pub target: LeadStatus,
    pub result: Result<Lead, PipelineError>,
}

/// What the board has to do with an outcome.
#[derive(Debug)]
pub enum Resolution {
    /// Superseded or unknown request; nothing to do.
    Stale,
    Confirmed {
        lead_id: LeadId,
        previous: LeadStatus,
        current: LeadStatus,
    },
    Reverted {
        lead_id: LeadId,
        attempted: LeadStatus,
        origin: LeadStatus,
        origin_slot: CardSlot,
        error: PipelineError,
    },
}

pub struct Reconciler {
    sync: HashMap<LeadId, LeadSync>,
    in_flight: HashMap<LeadId, JoinHandle<()>>,
    next_ticket: Ticket,
    timeout: Duration,
    tx: mpsc::UnboundedSender<MutationOutcome>,
    rx: mpsc::UnboundedReceiver<MutationOutcome>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_MUTATION_TIMEOUT)
    }
}

impl Reconciler {
    pub fn new(timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            sync: HashMap::new(),
            in_flight: HashMap::new(),
            next_ticket: 1,
            timeout,
            tx,
            rx,
        }
    }

    pub fn sync_state(&self, id: &LeadId) -> LeadSync {
        self.sync.get(id).cloned().unwrap_or(LeadSync::Idle)
    }

    pub fn is_pending(&self, id: &LeadId) -> bool {
        matches!(self.sync.get(id), Some(LeadSync::Pending { .. }))
    }

    pub fn pending_count(&self) -> usize {
        self.sync
            .values()
            .filter(|s| matches!(s, LeadSync::Pending { .. }))
            .count()
    }

    /// Register a request for `target`, superseding any pending one.
    ///
    /// `origin`/`origin_slot` describe the confirmed placement and are only
    /// used when no request is already pending; a superseding request keeps
    /// the origin of the chain it replaces.
    pub fn begin(
        &mut self,
        id: &LeadId,
        origin: LeadStatus,
        origin_slot: CardSlot,
        target: LeadStatus,
    ) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let (origin, origin_slot) = match self.sync.remove(id) {
            Some(LeadSync::Pending {
                ticket: old,
                origin,
                origin_slot,
                ..
            }) => {
                debug!(lead_id = %id, superseded = old, ticket, "superseding pending status change");
                (origin, origin_slot)
            }
            _ => (origin, origin_slot),
        };
        if let Some(handle) = self.in_flight.remove(id) {
            handle.abort();
        }

        self.sync.insert(
            id.clone(),
            LeadSync::Pending {
                ticket,
                origin,
                origin_slot,
                target,
            },
        );
        ticket
    }

    /// Begin a request and run it against the repository in the background.
    pub fn request(
        &mut self,
        repo: Arc<dyn LeadRepository>,
        id: &LeadId,
        origin: LeadStatus,
        origin_slot: CardSlot,
        target: LeadStatus,
    ) -> Ticket {
        let ticket = self.begin(id, origin, origin_slot, target.clone());
        let tx = self.tx.clone();
        let timeout = self.timeout;
        let lead_id = id.clone();

        let handle = tokio::spawn(async move {
            // A panicking call surfaces as a JoinError. Dropping the set
            // aborts the call on timeout or supersede.
            let mut call = JoinSet::new();
            let (call_id, call_target) = (lead_id.clone(), target.clone());
            call.spawn(async move { repo.set_lead_status(&call_id, &call_target).await });

            let result = match tokio::time::timeout(timeout, call.join_next()).await {
                Ok(Some(Ok(Ok(lead)))) => Ok(lead),
                Ok(Some(Ok(Err(e)))) => Err(PipelineError::StatusMutationFailed {
                    lead_id: lead_id.clone(),
                    reason: format!("{:#}", e),
                }),
                Ok(Some(Err(e))) => Err(PipelineError::StatusMutationFailed {
                    lead_id: lead_id.clone(),
                    reason: format!("status request task failed: {}", e),
                }),
                Ok(None) => Err(PipelineError::StatusMutationFailed {
                    lead_id: lead_id.clone(),
                    reason: "status request was never started".to_string(),
                }),
                Err(_) => Err(PipelineError::StatusMutationTimedOut {
                    lead_id: lead_id.clone(),
                    after: timeout,
                }),
            };
            let _ = tx.send(MutationOutcome {
                ticket,
                lead_id,
                target,
                result,
            });
        });
        self.in_flight.insert(id.clone(), handle);
        ticket
    }

    pub fn try_recv(&mut self) -> Option<MutationOutcome> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next outcome. Returns `None` when nothing is pending.
    pub async fn recv(&mut self) -> Option<MutationOutcome> {
        if self.pending_count() == 0 {
            return self.try_recv();
        }
        self.rx.recv().await
    }

    /// Advance the state machine for one outcome.
    pub fn resolve(&mut self, outcome: MutationOutcome) -> Resolution {
        let MutationOutcome {
            ticket,
            lead_id,
            target,
            result,
        } = outcome;

        let (origin, origin_slot) = match self.sync.get(&lead_id) {
            Some(LeadSync::Pending {
                ticket: current,
                origin,
                origin_slot,
                ..
            }) if *current == ticket => (origin.clone(), *origin_slot),
            _ => {
                debug!(%lead_id, ticket, "ignoring stale status outcome");
                return Resolution::Stale;
            }
        };
        self.in_flight.remove(&lead_id);

        match result {
            Ok(lead) => {
                self.sync.insert(
                    lead_id.clone(),
                    LeadSync::Settled {
                        confirmed: lead.status.clone(),
                    },
                );
                Resolution::Confirmed {
                    lead_id,
                    previous: origin,
                    current: lead.status,
                }
            }
            Err(error) => {
                warn!(%lead_id, attempted = %target, reverted_to = %origin, error = %error, "status change failed");
                self.sync.remove(&lead_id);
                Resolution::Reverted {
                    lead_id,
                    attempted: target,
                    origin,
                    origin_slot,
                    error,
                }
            }
        }
    }

    /// Fold a fresh repository snapshot into the local list.
    ///
    /// Fresh data wins, except that leads with a pending request (and the one
    /// being dragged, if any) keep their local status. Known leads keep their
    /// local relative order; new ones follow in repository order. Activities
    /// recorded locally but not yet in the snapshot are kept.
    pub fn merge_snapshot(&mut self, local: &[Lead], fresh: Vec<Lead>, dragging: Option<&LeadId>) -> Vec<Lead> {
        let local_by_id: HashMap<&LeadId, &Lead> = local.iter().map(|l| (&l.id, l)).collect();
        let local_order: HashMap<&LeadId, usize> =
            local.iter().enumerate().map(|(i, l)| (&l.id, i)).collect();

        let mut known = Vec::new();
        let mut added = Vec::new();
        for fresh_lead in fresh {
            let merged = self.merge_lead(local_by_id.get(&fresh_lead.id).copied(), fresh_lead, dragging);
            match local_order.get(&merged.id) {
                Some(&slot) => known.push((slot, merged)),
                None => added.push(merged),
            }
        }
        known.sort_by_key(|(slot, _)| *slot);

        let present: HashSet<LeadId> = known
            .iter()
            .map(|(_, l)| l.id.clone())
            .chain(added.iter().map(|l| l.id.clone()))
            .collect();
        self.sync
            .retain(|id, s| present.contains(id) || matches!(s, LeadSync::Pending { .. }));

        known.into_iter().map(|(_, l)| l).chain(added).collect()
    }

    fn merge_lead(&mut self, local: Option<&Lead>, mut fresh: Lead, dragging: Option<&LeadId>) -> Lead {
        let hold = self.is_pending(&fresh.id) || dragging == Some(&fresh.id);
        if let Some(local) = local {
            if hold && local.status != fresh.status {
                debug!(lead_id = %fresh.id, local = %local.status, server = %fresh.status, "keeping optimistic status over refresh");
                fresh.status = local.status.clone();
            }
            for activity in &local.activities {
                if !fresh.activities.iter().any(|a| a.id == activity.id) {
                    fresh.activities.push(activity.clone());
                }
            }
        }
        if let Some(LeadSync::Settled { .. }) = self.sync.get(&fresh.id) {
            self.sync.insert(fresh.id.clone(), LeadSync::Idle);
        }
        fresh
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        for (_, handle) in self.in_flight.drain() {
            handle.abort();
        }
    }
}
