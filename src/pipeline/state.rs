//! Pipeline state model: the local partition of leads into stage columns.
//!
//! The free functions are pure transformations over a lead list. Column order
//! is the relative order of a stage's leads inside that list, so reordering a
//! column permutes only the slots that column occupies.

use tracing::debug;

use super::models::{ColumnView, Lead, LeadId, LeadStatus};

/// Group leads into the fixed stage columns, preserving arrival order.
///
/// Leads whose status is not a pipeline stage are left out of every column.
pub fn partition(leads: &[Lead]) -> Vec<ColumnView> {
    let mut columns: Vec<ColumnView> = LeadStatus::STAGES
        .iter()
        .map(|status| ColumnView {
            status: status.clone(),
            leads: Vec::new(),
        })
        .collect();

    for lead in leads {
        match lead.status.column_index() {
            Some(idx) => columns[idx].leads.push(lead.clone()),
            None => debug!(lead_id = %lead.id, status = %lead.status, "dropping lead with unrecognized status"),
        }
    }

    columns
}

/// Reorder one column, leaving every status field untouched.
///
/// Out-of-range indices return the input unchanged.
pub fn move_within_column(leads: &[Lead], status: &LeadStatus, from: usize, to: usize) -> Vec<Lead> {
    let slots: Vec<usize> = leads
        .iter()
        .enumerate()
        .filter(|(_, l)| &l.status == status)
        .map(|(i, _)| i)
        .collect();

    if from >= slots.len() || to >= slots.len() || from == to {
        return leads.to_vec();
    }

    let mut column: Vec<Lead> = slots.iter().map(|&i| leads[i].clone()).collect();
    let moved = column.remove(from);
    column.insert(to, moved);

    let mut result = leads.to_vec();
    for (slot, lead) in slots.into_iter().zip(column) {
        result[slot] = lead;
    }
    result
}

/// Return a copy where only the given lead carries `new_status`.
///
/// An unknown `lead_id` returns the input unchanged.
pub fn move_across_columns(leads: &[Lead], lead_id: &LeadId, new_status: &LeadStatus) -> Vec<Lead> {
    leads
        .iter()
        .map(|lead| {
            if &lead.id == lead_id {
                Lead {
                    status: new_status.clone(),
                    ..lead.clone()
                }
            } else {
                lead.clone()
            }
        })
        .collect()
}

/// Where a card sat when a drag or request began.
///
/// `list_index` reproduces the exact list when nothing else moved;
/// `column_index` still holds after a refresh added or dropped leads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardSlot {
    pub list_index: usize,
    pub column_index: usize,
}

/// The locally visible lead list the board renders and mutates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineState {
    leads: Vec<Lead>,
}

impl PipelineState {
    pub fn new(leads: Vec<Lead>) -> Self {
        Self { leads }
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn replace_all(&mut self, leads: Vec<Lead>) {
        self.leads = leads;
    }

    pub fn lead(&self, id: &LeadId) -> Option<&Lead> {
        self.leads.iter().find(|l| &l.id == id)
    }

    pub fn lead_mut(&mut self, id: &LeadId) -> Option<&mut Lead> {
        self.leads.iter_mut().find(|l| &l.id == id)
    }

    pub fn contains(&self, id: &LeadId) -> bool {
        self.lead(id).is_some()
    }

    pub fn columns(&self) -> Vec<ColumnView> {
        partition(&self.leads)
    }

    /// Leads of one column in display order.
    pub fn column(&self, status: &LeadStatus) -> Vec<&Lead> {
        self.leads.iter().filter(|l| &l.status == status).collect()
    }

    /// Slot of the lead in the underlying list.
    pub fn position_of(&self, id: &LeadId) -> Option<usize> {
        self.leads.iter().position(|l| &l.id == id)
    }

    pub fn card_slot(&self, id: &LeadId) -> Option<CardSlot> {
        Some(CardSlot {
            list_index: self.position_of(id)?,
            column_index: self.index_in_column(id)?,
        })
    }

    /// Index of the lead inside its own column.
    pub fn index_in_column(&self, id: &LeadId) -> Option<usize> {
        let lead = self.lead(id)?;
        self.column(&lead.status).iter().position(|l| &l.id == id)
    }

    pub fn set_status(&mut self, id: &LeadId, status: &LeadStatus) {
        self.leads = move_across_columns(&self.leads, id, status);
    }

    pub fn reorder(&mut self, status: &LeadStatus, from: usize, to: usize) {
        self.leads = move_within_column(&self.leads, status, from, to);
    }

    /// Move a lead to `index` inside the column it currently belongs to.
    pub fn move_to_column_index(&mut self, id: &LeadId, index: usize) {
        let Some(status) = self.lead(id).map(|l| l.status.clone()) else {
            return;
        };
        if let Some(from) = self.index_in_column(id) {
            self.reorder(&status, from, index);
        }
    }

    /// Put a lead back at a recorded status and slot.
    ///
    /// The recorded list index is used when it still lands the card at its
    /// recorded column index; otherwise the card is placed by column index
    /// among the leads currently in that column.
    pub fn restore_lead(&mut self, id: &LeadId, status: &LeadStatus, slot: CardSlot) {
        let Some(current) = self.position_of(id) else {
            return;
        };
        let mut lead = self.leads.remove(current);
        lead.status = status.clone();

        let at = slot.list_index.min(self.leads.len());
        let column_index_at = self.leads[..at].iter().filter(|l| &l.status == status).count();
        if column_index_at == slot.column_index {
            self.leads.insert(at, lead);
            return;
        }

        let column: Vec<usize> = self
            .leads
            .iter()
            .enumerate()
            .filter(|(_, l)| &l.status == status)
            .map(|(i, _)| i)
            .collect();
        let at = match column.get(slot.column_index) {
            Some(&i) => i,
            None => column.last().map_or(self.leads.len(), |&i| i + 1),
        };
        debug!(lead_id = %id, list_index = at, column_index = slot.column_index, "restoring lead by column index");
        self.leads.insert(at, lead);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::models::Priority;

    fn lead(id: &str, status: LeadStatus) -> Lead {
        Lead::new(id, format!("Lead {}", id), status)
    }

    fn ids(col: &ColumnView) -> Vec<&str> {
        col.lead_ids()
    }

    #[test]
    fn test_partition_places_every_recognized_lead_once() {
        let mut leads = Vec::new();
        for i in 0..30 {
            let status = match i % 7 {
                6 => LeadStatus::Unrecognized("archived".to_string()),
                n => LeadStatus::STAGES[n].clone(),
            };
            leads.push(lead(&format!("L{}", i), status));
        }

        let columns = partition(&leads);
        let recognized = leads.iter().filter(|l| l.status.is_stage()).count();
        let placed: usize = columns.iter().map(|c| c.leads.len()).sum();
        assert_eq!(placed, recognized);

        for l in leads.iter().filter(|l| l.status.is_stage()) {
            let hits = columns
                .iter()
                .filter(|c| c.leads.iter().any(|x| x.id == l.id))
                .count();
            assert_eq!(hits, 1, "lead {} must be in exactly one column", l.id);
        }
    }

    #[test]
    fn test_partition_is_stable_and_in_stage_order() {
        let leads = vec![
            lead("L3", LeadStatus::Contacted),
            lead("L1", LeadStatus::New),
            lead("L2", LeadStatus::New),
            lead("L4", LeadStatus::Lost),
        ];
        let columns = partition(&leads);
        let statuses: Vec<_> = columns.iter().map(|c| c.status.clone()).collect();
        assert_eq!(statuses, LeadStatus::STAGES.to_vec());
        assert_eq!(ids(&columns[0]), vec!["L1", "L2"]);
        assert_eq!(ids(&columns[1]), vec!["L3"]);
        assert_eq!(ids(&columns[5]), vec!["L4"]);
    }

    #[test]
    fn test_partition_drops_unrecognized_status() {
        let leads = vec![lead("L1", LeadStatus::Unrecognized("archived".into()))];
        let columns = partition(&leads);
        assert!(columns.iter().all(|c| c.leads.is_empty()));
    }

    #[test]
    fn test_move_within_column_reorders_only_that_column() {
        let leads = vec![
            lead("A", LeadStatus::New),
            lead("X", LeadStatus::Contacted),
            lead("B", LeadStatus::New),
            lead("C", LeadStatus::New),
        ];
        let moved = move_within_column(&leads, &LeadStatus::New, 2, 0);
        let columns = partition(&moved);
        assert_eq!(ids(&columns[0]), vec!["C", "A", "B"]);
        assert_eq!(ids(&columns[1]), vec!["X"]);
        // The other column keeps its slot in the list.
        assert_eq!(moved[1].id.as_str(), "X");
        for l in &moved {
            let before = leads.iter().find(|o| o.id == l.id).unwrap();
            assert_eq!(l.status, before.status);
        }
    }

    #[test]
    fn test_move_within_column_out_of_range_is_noop() {
        let leads = vec![lead("A", LeadStatus::New), lead("B", LeadStatus::New)];
        assert_eq!(move_within_column(&leads, &LeadStatus::New, 0, 2), leads);
        assert_eq!(move_within_column(&leads, &LeadStatus::New, 5, 0), leads);
        assert_eq!(move_within_column(&leads, &LeadStatus::Closed, 0, 0), leads);
    }

    #[test]
    fn test_move_across_columns_changes_only_status() {
        let mut original = vec![
            lead("A", LeadStatus::New),
            lead("B", LeadStatus::New),
            lead("C", LeadStatus::Visited),
        ];
        original[0].priority = Priority::High;
        original[0].notes = Some("call after 6pm".to_string());

        let moved = move_across_columns(&original, &LeadId::from("A"), &LeadStatus::Contacted);

        assert_eq!(moved.len(), original.len());
        let mut expected = original[0].clone();
        expected.status = LeadStatus::Contacted;
        assert_eq!(moved[0], expected);
        assert_eq!(moved[1..], original[1..]);
    }

    #[test]
    fn test_move_across_columns_unknown_id_is_noop() {
        let leads = vec![lead("A", LeadStatus::New)];
        let moved = move_across_columns(&leads, &LeadId::from("missing"), &LeadStatus::Lost);
        assert_eq!(moved, leads);
    }

    #[test]
    fn test_restore_lead_returns_to_slot_and_status() {
        let mut state = PipelineState::new(vec![
            lead("A", LeadStatus::New),
            lead("B", LeadStatus::New),
        ]);
        let id = LeadId::from("A");
        let slot = state.card_slot(&id).unwrap();
        let before = state.clone();
        state.set_status(&id, &LeadStatus::Contacted);
        state.move_to_column_index(&id, 0);
        state.restore_lead(&id, &LeadStatus::New, slot);

        assert_eq!(state, before);

        let columns = state.columns();
        assert_eq!(ids(&columns[0]), vec!["A", "B"]);
        assert!(columns[1].leads.is_empty());
    }

    #[test]
    fn test_restore_lead_after_list_shrank_keeps_column_index() {
        let mut state = PipelineState::new(vec![
            lead("L0", LeadStatus::Contacted),
            lead("L1", LeadStatus::New),
            lead("L2", LeadStatus::New),
        ]);
        let id = LeadId::from("L1");
        let slot = state.card_slot(&id).unwrap();
        assert_eq!(slot, CardSlot { list_index: 1, column_index: 0 });

        state.set_status(&id, &LeadStatus::Visited);
        // A refresh drops L0 while the card is away.
        state.replace_all(vec![lead("L1", LeadStatus::Visited), lead("L2", LeadStatus::New)]);
        state.restore_lead(&id, &LeadStatus::New, slot);

        assert_eq!(ids(&state.columns()[0]), vec!["L1", "L2"]);
    }

    #[test]
    fn test_restore_lead_into_column_that_lost_its_cards_appends() {
        let mut state = PipelineState::new(vec![
            lead("A", LeadStatus::New),
            lead("B", LeadStatus::New),
            lead("C", LeadStatus::New),
        ]);
        let id = LeadId::from("C");
        let slot = state.card_slot(&id).unwrap();
        state.replace_all(vec![lead("X", LeadStatus::Lost), lead("C", LeadStatus::Closed)]);
        state.restore_lead(&id, &LeadStatus::New, slot);

        let columns = state.columns();
        assert_eq!(ids(&columns[0]), vec!["C"]);
        assert_eq!(ids(&columns[5]), vec!["X"]);
    }

    #[test]
    fn test_index_in_column() {
        let state = PipelineState::new(vec![
            lead("A", LeadStatus::New),
            lead("X", LeadStatus::Lost),
            lead("B", LeadStatus::New),
        ]);
        assert_eq!(state.index_in_column(&LeadId::from("B")), Some(1));
        assert_eq!(state.index_in_column(&LeadId::from("X")), Some(0));
        assert_eq!(state.index_in_column(&LeadId::from("nope")), None);
    }
}
