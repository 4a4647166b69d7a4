use serde::{Deserialize, Serialize};

use super::models::{LeadFilter, LeadId, LeadSource, Priority};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Kanban,
    List,
}

/// Pipeline-screen settings: listing filter, layout and the opened lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineView {
    #[serde(default)]
    pub filter: LeadFilter,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default)]
    pub selected_lead: Option<LeadId>,
}

impl PipelineView {
    /// Filter sent to the repository on refresh.
    ///
    /// The board always shows every stage, so status filters and paging are
    /// stripped.
    pub fn board_filter(&self) -> LeadFilter {
        LeadFilter {
            statuses: Vec::new(),
            page: None,
            page_size: None,
            ..self.filter.clone()
        }
    }

    pub fn set_property(&mut self, property_id: Option<String>) {
        self.filter.property_id = property_id;
    }

    pub fn set_sources(&mut self, sources: Vec<LeadSource>) {
        self.filter.sources = sources;
    }

    pub fn set_priorities(&mut self, priorities: Vec<Priority>) {
        self.filter.priorities = priorities;
    }

    pub fn set_search(&mut self, search: Option<String>) {
        self.filter.search = search.filter(|s| !s.trim().is_empty());
    }

    pub fn clear_filters(&mut self) {
        self.filter = LeadFilter::default();
    }

    pub fn has_active_filters(&self) -> bool {
        self.board_filter() != LeadFilter::default()
    }

    pub fn toggle_view_mode(&mut self) -> ViewMode {
        self.view_mode = match self.view_mode {
            ViewMode::Kanban => ViewMode::List,
            ViewMode::List => ViewMode::Kanban,
        };
        self.view_mode
    }

    pub fn select(&mut self, lead: Option<LeadId>) {
        self.selected_lead = lead;
    }
}
