//! Lead Pipeline: Kanban board over the sales funnel.
//!
//! ## Overview
//!
//! Leads are grouped into six stage columns (`new` → `contacted` → `visited`
//! → `negotiating` → `closed` / `lost`). Cards move between and within
//! columns by a device-independent drag model. Moving a card to another
//! column changes its status locally at once and asks the repository to
//! persist it in the background; a rejected or timed-out request puts the
//! card back. Confirmed status changes leave a `status_change` activity.
//!
//! ## Module Map
//!
//! ```text
//! ┌────────────┐ RawInput ┌──────────────────────────────────────────────┐
//! │ Presenter  │ ───────> │  board.rs  (LeadBoard, BoardOptions)         │
//! │ (UI / CLI) │ <─────── │    ├─ drag.rs   (DragController → DragEvent) │
//! └────────────┘ BoardEvent    ├─ state.rs  (PipelineState, partition)   │
//!                       │    ├─ reconciler.rs (Idle/Pending/Settled)   │
//!                       │    │      │ spawn set_lead_status + timeout   │
//!                       │    │      v                                   │
//!                       │    │  repository.rs (LeadRepository trait)    │
//!                       │    ├─ audit.rs  (StatusTransitionRecorder)   │
//!                       │    └─ quick_action.rs (ContactLauncher)       │
//!                       └──────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module    | Responsibility                                        |
//! |-----------|-------------------------------------------------------|
//! | `models`  | Shared types: `Lead`, `LeadStatus`, `LeadActivity`    |
//! | `events`  | `BoardEvent` enum + `broadcast_event()` helper        |
//! | `view`    | `PipelineView`: filters, view mode, selected lead     |

pub mod audit;
pub mod board;
pub mod drag;
pub mod events;
pub mod models;
pub mod quick_action;
pub mod reconciler;
pub mod repository;
pub mod state;
pub mod view;

pub use board::{BoardOptions, LeadBoard};
pub use drag::{DropTarget, RawInput};
pub use events::BoardEvent;
pub use models::{Lead, LeadId, LeadStatus};
pub use repository::{InMemoryLeadRepository, LeadRepository};
