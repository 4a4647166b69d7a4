//! Board commands: `board`, `move`, `reorder`, `contact`, `activity`.

use std::sync::Arc;

use anyhow::Result;
use console::style;

use leadboard::config::LeadboardConfig;
use leadboard::errors::PipelineError;
use leadboard::pipeline::audit::JsonlActivityLog;
use leadboard::pipeline::models::{LeadSource, Priority};
use leadboard::pipeline::view::PipelineView;
use leadboard::pipeline::{
    BoardEvent, DropTarget, InMemoryLeadRepository, LeadBoard, LeadId, LeadStatus, RawInput,
};

/// Listing filters from `leadboard board`.
pub struct BoardFilters {
    pub property: Option<String>,
    pub source: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
}

impl BoardFilters {
    fn into_view(self) -> Result<PipelineView> {
        let mut view = PipelineView::default();
        view.set_property(self.property);
        view.set_search(self.search);
        if let Some(source) = self.source {
            view.set_sources(vec![source.parse::<LeadSource>().map_err(anyhow::Error::msg)?]);
        }
        if let Some(priority) = self.priority {
            view.set_priorities(vec![priority.parse::<Priority>().map_err(anyhow::Error::msg)?]);
        }
        Ok(view)
    }
}

async fn open_board(
    config: &LeadboardConfig,
    view: PipelineView,
) -> Result<LeadBoard> {
    let repo = Arc::new(InMemoryLeadRepository::open(&config.leads_file())?);
    let mut board = LeadBoard::new(repo.clone(), config.board_options())
        .with_activity_sink(repo.clone())
        .with_activity_sink(Arc::new(JsonlActivityLog::new(&config.audit_file())))
        .with_view(view);
    board.refresh().await?;
    Ok(board)
}

fn require_lead(board: &LeadBoard, raw: &str) -> Result<LeadId> {
    let id = LeadId::from(raw);
    if board.lead(&id).is_none() {
        return Err(PipelineError::LeadNotFound { id }.into());
    }
    Ok(id)
}

pub async fn cmd_board(config: &LeadboardConfig, filters: BoardFilters, json: bool) -> Result<()> {
    let view = filters.into_view()?;
    let board = open_board(config, view).await?;
    let columns = board.columns();

    if json {
        println!("{}", serde_json::to_string_pretty(&columns)?);
        return Ok(());
    }

    println!();
    println!("{}", style("Lead Pipeline").bold().cyan());
    if board.view().has_active_filters() {
        println!("{}", style("(filtered)").dim());
    }
    println!();
    for column in &columns {
        println!(
            "{} {}",
            style(column.status.as_str().to_uppercase()).bold(),
            style(format!("({})", column.leads.len())).dim()
        );
        if column.leads.is_empty() {
            println!("  {}", style("-").dim());
        }
        for lead in &column.leads {
            println!(
                "  {:<38} {:<24} {}",
                lead.id.as_str(),
                lead.name,
                style(lead.priority.as_str()).dim()
            );
        }
        println!();
    }
    Ok(())
}

pub async fn cmd_move(config: &LeadboardConfig, lead: &str, status: &str) -> Result<()> {
    let target: LeadStatus = status
        .parse()
        .map_err(|_| PipelineError::InvalidStatus(status.to_string()))?;
    let mut board = open_board(config, PipelineView::default()).await?;
    let lead_id = require_lead(&board, lead)?;

    if board.lead(&lead_id).is_some_and(|l| l.status == target) {
        println!("{} is already in {}", lead, target);
        return Ok(());
    }

    let mut events = board.subscribe();
    board.handle_input(RawInput::KeyPickUp {
        lead_id: lead_id.clone(),
    });
    board.on_drag_over(DropTarget::Column(target));
    board.handle_input(RawInput::KeyDrop);
    board.settle().await;

    while let Ok(event) = events.try_recv() {
        match event {
            BoardEvent::StatusChangeConfirmed {
                previous, current, ..
            } => {
                println!(
                    "{} {}: {} -> {}",
                    style("Moved").green().bold(),
                    lead,
                    previous,
                    current
                );
                return Ok(());
            }
            BoardEvent::StatusChangeFailed {
                error, reverted_to, ..
            } => {
                anyhow::bail!("{} (lead stays in {})", error, reverted_to);
            }
            _ => {}
        }
    }
    anyhow::bail!("Lead {} could not be moved", lead)
}

pub async fn cmd_reorder(config: &LeadboardConfig, lead: &str, onto: &str) -> Result<()> {
    let mut board = open_board(config, PipelineView::default()).await?;
    let lead_id = require_lead(&board, lead)?;
    let onto_id = require_lead(&board, onto)?;

    let status = board
        .lead(&lead_id)
        .map(|l| l.status.clone())
        .unwrap_or(LeadStatus::New);
    if board.lead(&onto_id).map(|l| &l.status) != Some(&status) {
        anyhow::bail!(
            "{} and {} are in different columns; use `leadboard move` to change status",
            lead,
            onto
        );
    }

    board.on_drag_start(&lead_id);
    board.on_drag_over(DropTarget::Card(onto_id));
    board.on_drag_end();

    println!("{}", style(status.as_str().to_uppercase()).bold());
    for (i, lead) in board.state().column(&status).iter().enumerate() {
        println!("  {}. {} {}", i + 1, lead.id.as_str(), lead.name);
    }
    println!(
        "{}",
        style("Card order is local to this board and is not saved.").dim()
    );
    Ok(())
}

pub async fn cmd_contact(config: &LeadboardConfig, lead: &str, action: &str) -> Result<()> {
    let board = open_board(config, PipelineView::default()).await?;
    let lead_id = LeadId::from(lead);
    match board.on_quick_action(&lead_id, action).await? {
        Some(intent) => println!("{}", intent.uri),
        None => println!(
            "{} Lead {} has no contact details for {}",
            style("!").yellow(),
            lead,
            action
        ),
    }
    Ok(())
}

pub fn cmd_activity(config: &LeadboardConfig, lead: &str) -> Result<()> {
    let repo = InMemoryLeadRepository::open(&config.leads_file())?;
    let id = LeadId::from(lead);
    let lead = repo
        .get_lead(&id)?
        .ok_or(PipelineError::LeadNotFound { id })?;

    println!();
    println!("{} {}", style(&lead.name).bold(), style(lead.status.as_str()).cyan());
    println!();
    if lead.activities.is_empty() {
        println!("  {}", style("No activity yet.").dim());
    }
    for activity in lead.activities_newest_first() {
        println!(
            "  {}  {:<13} {}  {}",
            activity.created_at.format("%Y-%m-%d %H:%M"),
            activity.activity_type.as_str(),
            activity.description,
            style(format!("by {}", activity.created_by)).dim()
        );
    }
    println!();
    Ok(())
}
