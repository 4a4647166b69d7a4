use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use super::models::{LeadId, LeadStatus};
use super::quick_action::QuickAction;

/// Notifications the board emits to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BoardEvent {
    /// Local (optimistic) placement of a card changed.
    LeadMoved {
        lead_id: LeadId,
        from_status: LeadStatus,
        to_status: LeadStatus,
        index: usize,
    },
    DragCancelled {
        lead_id: LeadId,
    },
    /// The repository confirmed a status change.
    StatusChangeConfirmed {
        lead_id: LeadId,
        previous: LeadStatus,
        current: LeadStatus,
    },
    /// A status change was rejected or timed out; the card went back.
    StatusChangeFailed {
        lead_id: LeadId,
        attempted: LeadStatus,
        reverted_to: LeadStatus,
        error: String,
    },
    BoardRefreshed {
        lead_count: usize,
    },
    RefreshFailed {
        error: String,
    },
    QuickActionDispatched {
        lead_id: LeadId,
        action: QuickAction,
        uri: String,
    },
}

pub fn broadcast_event(tx: &broadcast::Sender<BoardEvent>, event: BoardEvent) {
    if tx.send(event).is_err() {
        trace!("board event dropped, no subscribers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_change_failed_serialization() {
        let event = BoardEvent::StatusChangeFailed {
            lead_id: LeadId::from("L1"),
            attempted: LeadStatus::Contacted,
            reverted_to: LeadStatus::New,
            error: "rejected".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"StatusChangeFailed\""));
        assert!(json.contains("\"data\""));
        assert!(json.contains("\"attempted\":\"contacted\""));
        assert!(json.contains("\"reverted_to\":\"new\""));
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        broadcast_event(&tx, BoardEvent::BoardRefreshed { lead_count: 0 });
    }
}
