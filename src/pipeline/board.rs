//! The lead board: one owner for the local pipeline state.
//!
//! `LeadBoard` is mutated only through `&mut self`. Status requests run on
//! spawned tasks; their outcomes queue up until the owner calls
//! [`LeadBoard::process_outcomes`], [`LeadBoard::next_outcome`] or
//! [`LeadBoard::settle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::audit::{ActivitySink, MemoryActivityLog, RecordedActivity, StatusTransitionRecorder};
use super::drag::{DEFAULT_ACTIVATION_DISTANCE, DragController, DragEvent, DragSession, DropTarget, RawInput};
use super::events::{BoardEvent, broadcast_event};
use super::models::{ColumnView, Lead, LeadId, LeadStatus};
use super::quick_action::{self, ContactIntent, ContactLauncher, LoggingLauncher, QuickAction};
use super::reconciler::{DEFAULT_MUTATION_TIMEOUT, LeadSync, MutationOutcome, Reconciler, Resolution};
use super::repository::LeadRepository;
use super::state::PipelineState;
use super::view::PipelineView;
use crate::errors::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardOptions {
    pub activation_distance: f64,
    pub mutation_timeout: Duration,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            activation_distance: DEFAULT_ACTIVATION_DISTANCE,
            mutation_timeout: DEFAULT_MUTATION_TIMEOUT,
        }
    }
}

pub struct LeadBoard {
    repo: Arc<dyn LeadRepository>,
    state: PipelineState,
    drag: DragController,
    reconciler: Reconciler,
    recorder: StatusTransitionRecorder,
    activity_log: Arc<MemoryActivityLog>,
    launcher: Arc<dyn ContactLauncher>,
    view: PipelineView,
    events: broadcast::Sender<BoardEvent>,
}

impl LeadBoard {
    pub fn new(repo: Arc<dyn LeadRepository>, options: BoardOptions) -> Self {
        let activity_log = Arc::new(MemoryActivityLog::new());
        let (events, _) = broadcast::channel(256);
        Self {
            repo,
            state: PipelineState::default(),
            drag: DragController::new(options.activation_distance),
            reconciler: Reconciler::new(options.mutation_timeout),
            recorder: StatusTransitionRecorder::new().with_sink(activity_log.clone()),
            activity_log,
            launcher: Arc::new(LoggingLauncher),
            view: PipelineView::default(),
            events,
        }
    }

    /// Additional destination for status-change activities.
    pub fn with_activity_sink(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.recorder = self.recorder.with_sink(sink);
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn ContactLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_view(mut self, view: PipelineView) -> Self {
        self.view = view;
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn columns(&self) -> Vec<ColumnView> {
        self.state.columns()
    }

    pub fn lead(&self, id: &LeadId) -> Option<&Lead> {
        self.state.lead(id)
    }

    pub fn view(&self) -> &PipelineView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut PipelineView {
        &mut self.view
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.session()
    }

    pub fn sync_state(&self, id: &LeadId) -> LeadSync {
        self.reconciler.sync_state(id)
    }

    pub fn pending_count(&self) -> usize {
        self.reconciler.pending_count()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    /// Every status-change activity recorded by this board, oldest first.
    pub fn activities(&self) -> Vec<RecordedActivity> {
        self.activity_log.entries()
    }

    pub fn subscribe_activities(&self) -> broadcast::Receiver<RecordedActivity> {
        self.activity_log.subscribe()
    }

    /// Reload from the repository and merge into the local board.
    ///
    /// On failure the board keeps what it has.
    pub async fn refresh(&mut self) -> Result<usize, PipelineError> {
        let filter = self.view.board_filter();
        let fresh = match self.repo.list_leads(&filter).await {
            Ok(leads) => leads,
            Err(e) => {
                warn!(error = %e, "refresh failed, keeping current board");
                broadcast_event(
                    &self.events,
                    BoardEvent::RefreshFailed {
                        error: format!("{:#}", e),
                    },
                );
                return Err(PipelineError::RepositoryUnavailable(e));
            }
        };

        let dragging = self.drag.session().map(|s| s.active_lead_id.clone());
        let merged = self
            .reconciler
            .merge_snapshot(self.state.leads(), fresh, dragging.as_ref());
        self.state.replace_all(merged);

        let lead_count = self.state.leads().len();
        debug!(lead_count, "board refreshed");
        broadcast_event(&self.events, BoardEvent::BoardRefreshed { lead_count });
        Ok(lead_count)
    }

    /// Feed one raw pointer or keyboard input through the drag controller.
    pub fn handle_input(&mut self, input: RawInput) {
        for event in self.drag.handle(input, &self.state) {
            self.apply_drag_event(event);
        }
    }

    /// Start dragging a lead. Returns `false` if a drag is already running
    /// or the lead is not on the board.
    pub fn on_drag_start(&mut self, lead_id: &LeadId) -> bool {
        match self.drag.start(lead_id.clone(), &self.state) {
            Some(event) => {
                self.apply_drag_event(event);
                true
            }
            None => false,
        }
    }

    pub fn on_drag_over(&mut self, target: DropTarget) {
        if let Some(event) = self.drag.over(target) {
            self.apply_drag_event(event);
        }
    }

    /// Hover over a raw hit-test id. Unknown ids leave the board untouched.
    pub fn on_drag_over_id(&mut self, raw: &str) -> Result<(), PipelineError> {
        let target = DropTarget::resolve(raw, &self.state)?;
        self.on_drag_over(target);
        Ok(())
    }

    pub fn on_drag_end(&mut self) {
        if let Some(event) = self.drag.end() {
            self.apply_drag_event(event);
        }
    }

    pub fn on_drag_cancel(&mut self) {
        self.abort_drag();
    }

    /// Cancel from outside the input stream (focus lost, view closed).
    pub fn abort_drag(&mut self) {
        if let Some(event) = self.drag.abort() {
            self.apply_drag_event(event);
        }
    }

    /// Apply every outcome that has already arrived. Returns how many.
    pub fn process_outcomes(&mut self) -> usize {
        let mut applied = 0;
        while let Some(outcome) = self.reconciler.try_recv() {
            self.apply_outcome(outcome);
            applied += 1;
        }
        applied
    }

    /// Wait for and apply one outcome. `false` when nothing is in flight.
    pub async fn next_outcome(&mut self) -> bool {
        match self.reconciler.recv().await {
            Some(outcome) => {
                self.apply_outcome(outcome);
                true
            }
            None => false,
        }
    }

    /// Wait until no status request is pending.
    pub async fn settle(&mut self) {
        while self.reconciler.pending_count() > 0 {
            if !self.next_outcome().await {
                break;
            }
        }
    }

    /// Contact a lead through the configured launcher.
    ///
    /// `Ok(None)` when the lead has no usable field for the action.
    pub async fn on_quick_action(
        &self,
        lead_id: &LeadId,
        keyword: &str,
    ) -> Result<Option<ContactIntent>, PipelineError> {
        let action: QuickAction = keyword.parse()?;
        let lead = self
            .state
            .lead(lead_id)
            .ok_or_else(|| PipelineError::LeadNotFound { id: lead_id.clone() })?;

        let intent = quick_action::dispatch(self.launcher.as_ref(), lead, action).await;
        if let Some(intent) = &intent {
            broadcast_event(
                &self.events,
                BoardEvent::QuickActionDispatched {
                    lead_id: lead_id.clone(),
                    action,
                    uri: intent.uri.clone(),
                },
            );
        }
        Ok(intent)
    }

    fn apply_drag_event(&mut self, event: DragEvent) {
        match event {
            DragEvent::Start { lead_id } => debug!(%lead_id, "drag start"),
            DragEvent::Over(target) => self.preview_over(&target),
            DragEvent::End(session) => self.drop_session(session),
            DragEvent::Cancel(session) => {
                self.state.restore_lead(
                    &session.active_lead_id,
                    &session.source_status,
                    session.source_slot,
                );
                broadcast_event(
                    &self.events,
                    BoardEvent::DragCancelled {
                        lead_id: session.active_lead_id,
                    },
                );
            }
        }
    }

    /// Hovering another column re-statuses the card locally right away.
    fn preview_over(&mut self, target: &DropTarget) {
        let Some(lead_id) = self.drag.session().map(|s| s.active_lead_id.clone()) else {
            return;
        };
        let Some(to_status) = target.column_status(&self.state) else {
            return;
        };
        let Some(from_status) = self.state.lead(&lead_id).map(|l| l.status.clone()) else {
            return;
        };
        if from_status == to_status {
            return;
        }
        self.state.set_status(&lead_id, &to_status);
        self.emit_moved(&lead_id, from_status, to_status);
    }

    fn drop_session(&mut self, session: DragSession) {
        let DragSession {
            active_lead_id: lead_id,
            source_status,
            source_slot,
            over_target,
            ..
        } = session;

        let Some(target) = over_target else {
            debug!(%lead_id, "dropped outside any target");
            self.state.restore_lead(&lead_id, &source_status, source_slot);
            broadcast_event(&self.events, BoardEvent::DragCancelled { lead_id });
            return;
        };
        let Some(final_status) = target.column_status(&self.state) else {
            let err = PipelineError::InvalidDragTarget {
                target: format!("{:?}", target),
            };
            debug!(%lead_id, error = %err, "drop ignored");
            self.state.restore_lead(&lead_id, &source_status, source_slot);
            broadcast_event(&self.events, BoardEvent::DragCancelled { lead_id });
            return;
        };
        let Some(current) = self.state.lead(&lead_id).map(|l| l.status.clone()) else {
            debug!(%lead_id, "dragged lead left the board");
            return;
        };
        if current != final_status {
            self.state.set_status(&lead_id, &final_status);
        }

        let onto = match &target {
            DropTarget::Card(id) if id != &lead_id => Some(id.clone()),
            _ => None,
        };

        if final_status != source_status {
            if let Some(onto) = &onto
                && let Some(index) = self.state.index_in_column(onto)
            {
                self.state.move_to_column_index(&lead_id, index);
            }
            self.emit_moved(&lead_id, source_status.clone(), final_status.clone());
            let ticket = self.reconciler.request(
                self.repo.clone(),
                &lead_id,
                source_status,
                source_slot,
                final_status,
            );
            debug!(%lead_id, ticket, "status change requested");
        } else if let Some(onto) = onto
            && let (Some(from), Some(to)) = (
                self.state.index_in_column(&lead_id),
                self.state.index_in_column(&onto),
            )
        {
            self.state.reorder(&final_status, from, to);
            self.emit_moved(&lead_id, final_status.clone(), final_status);
        }
    }

    /// A confirmed change is recorded to every sink even when the lead has
    /// since left the local board; only the local activity list is skipped.
    fn apply_outcome(&mut self, outcome: MutationOutcome) {
        match self.reconciler.resolve(outcome) {
            Resolution::Stale => {}
            Resolution::Confirmed {
                lead_id,
                previous,
                current,
            } => {
                if !self.drag.is_dragging(&lead_id)
                    && self.state.lead(&lead_id).is_some_and(|l| l.status != current)
                {
                    self.state.set_status(&lead_id, &current);
                }
                if let Some(activity) = self.recorder.record(&lead_id, &previous, &current)
                    && let Some(lead) = self.state.lead_mut(&lead_id)
                {
                    lead.activities.push(activity);
                }
                info!(%lead_id, %previous, %current, "status change confirmed");
                broadcast_event(
                    &self.events,
                    BoardEvent::StatusChangeConfirmed {
                        lead_id,
                        previous,
                        current,
                    },
                );
            }
            Resolution::Reverted {
                lead_id,
                attempted,
                origin,
                origin_slot,
                error,
            } => {
                self.state.restore_lead(&lead_id, &origin, origin_slot);
                self.drag.rebase_source(&lead_id, &origin, origin_slot);
                broadcast_event(
                    &self.events,
                    BoardEvent::StatusChangeFailed {
                        lead_id,
                        attempted,
                        reverted_to: origin,
                        error: error.to_string(),
                    },
                );
            }
        }
    }

    fn emit_moved(&self, lead_id: &LeadId, from_status: LeadStatus, to_status: LeadStatus) {
        let index = self.state.index_in_column(lead_id).unwrap_or(0);
        broadcast_event(
            &self.events,
            BoardEvent::LeadMoved {
                lead_id: lead_id.clone(),
                from_status,
                to_status,
                index,
            },
        );
    }
}
