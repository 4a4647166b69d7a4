//! Drag session controller.
//!
//! Raw pointer and keyboard input is folded into four device-independent
//! events (`Start`, `Over`, `End`, `Cancel`). The controller only reads the
//! pipeline state to resolve identities and navigate; it never mutates it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::models::{LeadId, LeadStatus};
use super::state::{CardSlot, PipelineState};
use crate::errors::PipelineError;

/// Pointer travel (in px) before a press becomes a drag.
pub const DEFAULT_ACTIVATION_DISTANCE: f64 = 8.0;

/// Where a dragged card is hovering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DropTarget {
    /// Empty space of a stage column.
    Column(LeadStatus),
    /// Another card (or the dragged card itself).
    Card(LeadId),
}

impl DropTarget {
    /// Resolve a raw hit-test id: stage names are columns, known lead ids are cards.
    pub fn resolve(raw: &str, state: &PipelineState) -> Result<Self, PipelineError> {
        if let Ok(status) = raw.parse::<LeadStatus>() {
            return Ok(Self::Column(status));
        }
        let id = LeadId::from(raw);
        if state.contains(&id) {
            return Ok(Self::Card(id));
        }
        Err(PipelineError::InvalidDragTarget {
            target: raw.to_string(),
        })
    }

    /// Stage of the column this target lies in, as currently rendered.
    pub fn column_status(&self, state: &PipelineState) -> Option<LeadStatus> {
        match self {
            Self::Column(status) => Some(status.clone()),
            Self::Card(id) => state
                .lead(id)
                .map(|l| l.status.clone())
                .filter(LeadStatus::is_stage),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputDevice {
    Pointer,
    Keyboard,
}

/// Raw interaction input as delivered by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    PointerDown { lead_id: LeadId, at: Point },
    /// `over` is the hit-test id under the pointer, if any.
    PointerMove { at: Point, over: Option<String> },
    PointerUp,
    KeyPickUp { lead_id: LeadId },
    KeyStep(Direction),
    KeyDrop,
    Escape,
    /// Window blur or the input source disappearing mid-gesture.
    InputLost,
}

/// One in-progress move.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub active_lead_id: LeadId,
    pub source_status: LeadStatus,
    /// Where the card sat at drag start.
    pub source_slot: CardSlot,
    pub over_target: Option<DropTarget>,
    pub device: InputDevice,
}

/// Device-independent drag event.
#[derive(Debug, Clone, PartialEq)]
pub enum DragEvent {
    Start { lead_id: LeadId },
    Over(DropTarget),
    End(DragSession),
    Cancel(DragSession),
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    /// Pointer pressed on a card but not yet past the activation distance.
    Armed { lead_id: LeadId, origin: Point },
    Active(DragSession),
}

pub struct DragController {
    phase: Phase,
    activation_distance: f64,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVATION_DISTANCE)
    }
}

impl DragController {
    pub fn new(activation_distance: f64) -> Self {
        Self {
            phase: Phase::Idle,
            activation_distance,
        }
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.phase {
            Phase::Active(session) => Some(session),
            _ => None,
        }
    }

    fn active_device(&self) -> Option<InputDevice> {
        self.session().map(|s| s.device)
    }

    pub fn is_dragging(&self, id: &LeadId) -> bool {
        self.session().is_some_and(|s| &s.active_lead_id == id)
    }

    /// Translate one raw input into zero or more drag events.
    pub fn handle(&mut self, input: RawInput, state: &PipelineState) -> Vec<DragEvent> {
        match input {
            RawInput::PointerDown { lead_id, at } => {
                if matches!(self.phase, Phase::Idle) && state.contains(&lead_id) {
                    self.phase = Phase::Armed { lead_id, origin: at };
                }
                Vec::new()
            }
            RawInput::PointerMove { at, over } => self.pointer_move(at, over, state),
            RawInput::PointerUp => {
                if matches!(self.phase, Phase::Armed { .. }) {
                    // Released before the threshold: a click, not a drag.
                    self.phase = Phase::Idle;
                    Vec::new()
                } else if self.active_device() == Some(InputDevice::Pointer) {
                    self.end().into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            RawInput::KeyPickUp { lead_id } => self
                .start_with(lead_id, InputDevice::Keyboard, state)
                .into_iter()
                .collect(),
            RawInput::KeyStep(direction) => self.key_step(direction, state).into_iter().collect(),
            RawInput::KeyDrop => {
                if self.active_device() == Some(InputDevice::Keyboard) {
                    self.end().into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            RawInput::Escape | RawInput::InputLost => self.abort().into_iter().collect(),
        }
    }

    /// Begin a session directly (no activation threshold).
    ///
    /// Ignored while another session is active or for unknown leads.
    pub fn start(&mut self, lead_id: LeadId, state: &PipelineState) -> Option<DragEvent> {
        self.start_with(lead_id, InputDevice::Keyboard, state)
    }

    /// Update the hover target. Repeating the current target emits nothing.
    pub fn over(&mut self, target: DropTarget) -> Option<DragEvent> {
        let Phase::Active(session) = &mut self.phase else {
            return None;
        };
        if session.over_target.as_ref() == Some(&target) {
            return None;
        }
        session.over_target = Some(target.clone());
        Some(DragEvent::Over(target))
    }

    /// Drop: consume the session.
    pub fn end(&mut self) -> Option<DragEvent> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Active(session) => Some(DragEvent::End(session)),
            _ => None,
        }
    }

    /// Abort the current gesture from anywhere, including outside the event stream.
    pub fn abort(&mut self) -> Option<DragEvent> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Active(session) => {
                debug!(lead_id = %session.active_lead_id, "drag cancelled");
                Some(DragEvent::Cancel(session))
            }
            _ => None,
        }
    }

    /// Point the active session at a new pre-drag status and slot.
    ///
    /// Used when a reconciliation revert lands on the lead being dragged.
    pub fn rebase_source(&mut self, id: &LeadId, status: &LeadStatus, slot: CardSlot) {
        if let Phase::Active(session) = &mut self.phase
            && &session.active_lead_id == id
        {
            session.source_status = status.clone();
            session.source_slot = slot;
        }
    }

    fn start_with(
        &mut self,
        lead_id: LeadId,
        device: InputDevice,
        state: &PipelineState,
    ) -> Option<DragEvent> {
        if matches!(self.phase, Phase::Active(_)) {
            debug!(%lead_id, "ignoring drag start while a session is active");
            return None;
        }
        let lead = state.lead(&lead_id).filter(|l| l.status.is_stage())?;
        let source_slot = state.card_slot(&lead_id)?;
        let over_target = match device {
            InputDevice::Keyboard => Some(DropTarget::Card(lead_id.clone())),
            InputDevice::Pointer => None,
        };
        self.phase = Phase::Active(DragSession {
            active_lead_id: lead_id.clone(),
            source_status: lead.status.clone(),
            source_slot,
            over_target,
            device,
        });
        debug!(%lead_id, ?device, "drag started");
        Some(DragEvent::Start { lead_id })
    }

    fn pointer_move(&mut self, at: Point, over: Option<String>, state: &PipelineState) -> Vec<DragEvent> {
        let mut events = Vec::new();

        if let Phase::Armed { lead_id, origin } = &self.phase {
            if origin.distance_to(&at) < self.activation_distance {
                return events;
            }
            let lead_id = lead_id.clone();
            self.phase = Phase::Idle;
            match self.start_with(lead_id, InputDevice::Pointer, state) {
                Some(event) => events.push(event),
                None => return events,
            }
        }

        if self.active_device() != Some(InputDevice::Pointer) {
            return events;
        }

        match over {
            Some(raw) => match DropTarget::resolve(&raw, state) {
                Ok(target) => events.extend(self.over(target)),
                Err(e) => debug!(error = %e, "ignoring hover over unknown target"),
            },
            None => {
                if let Phase::Active(session) = &mut self.phase {
                    session.over_target = None;
                }
            }
        }
        events
    }

    fn key_step(&mut self, direction: Direction, state: &PipelineState) -> Option<DragEvent> {
        let session = self.session()?;
        if session.device != InputDevice::Keyboard {
            return None;
        }
        let current = session
            .over_target
            .clone()
            .unwrap_or_else(|| DropTarget::Card(session.active_lead_id.clone()));
        let column = current
            .column_status(state)
            .unwrap_or_else(|| session.source_status.clone());
        let next = next_keyboard_target(&current, &column, direction, state)?;
        self.over(next)
    }
}

/// Keyboard navigation: up/down walk the cards of the hovered column,
/// left/right jump to the neighbouring column.
fn next_keyboard_target(
    current: &DropTarget,
    column: &LeadStatus,
    direction: Direction,
    state: &PipelineState,
) -> Option<DropTarget> {
    let col_idx = column.column_index()?;
    match direction {
        Direction::Left => col_idx
            .checked_sub(1)
            .map(|i| DropTarget::Column(LeadStatus::STAGES[i].clone())),
        Direction::Right => LeadStatus::STAGES
            .get(col_idx + 1)
            .map(|s| DropTarget::Column(s.clone())),
        Direction::Up | Direction::Down => {
            let cards: Vec<&LeadId> = state.column(column).into_iter().map(|l| &l.id).collect();
            let pos = match current {
                DropTarget::Card(id) => cards.iter().position(|c| *c == id),
                DropTarget::Column(_) => None,
            };
            match (direction, pos) {
                (Direction::Down, None) => cards.first().map(|id| DropTarget::Card((*id).clone())),
                (Direction::Down, Some(i)) => cards.get(i + 1).map(|id| DropTarget::Card((*id).clone())),
                (Direction::Up, Some(0)) => Some(DropTarget::Column(column.clone())),
                (Direction::Up, Some(i)) => Some(DropTarget::Card(cards[i - 1].clone())),
                _ => None,
            }
        }
    }
}
