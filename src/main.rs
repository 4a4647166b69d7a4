use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use leadboard::config::LeadboardConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "leadboard")]
#[command(version, about = "Lead pipeline board for real-estate sales")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Leads JSON file. Overrides leadboard.toml and LEADBOARD_LEADS_FILE.
    #[arg(long, global = true)]
    pub leads_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create .leadboard/ with a default configuration and an empty lead store
    Init,
    /// Add a lead to the `new` column
    Add {
        name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Property the lead is interested in
        #[arg(long, default_value = "")]
        property: String,
        /// zonaprop, argenprop, mercadolibre, properati, website, referral, walk_in, phone, other
        #[arg(long, default_value = "other")]
        source: String,
        /// low, medium, high
        #[arg(long)]
        priority: Option<String>,
    },
    /// Show the pipeline columns
    Board {
        #[arg(long)]
        property: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        /// Match name, email or phone
        #[arg(long)]
        search: Option<String>,
        /// Print columns as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a lead to another stage and wait for the repository to confirm
    Move { lead: String, status: String },
    /// Reorder a lead inside its column by dropping it onto another card
    Reorder {
        lead: String,
        #[arg(long)]
        onto: String,
    },
    /// Contact a lead: call, email or message
    Contact { lead: String, action: String },
    /// Show a lead's activity history, newest first
    Activity { lead: String },
    /// View or change UI preferences
    Ui {
        #[command(subcommand)]
        command: Option<UiCommands>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum UiCommands {
    /// Show current UI preferences
    Show,
    /// Set the theme: light, dark, system
    Theme { theme: String },
    /// Collapse or expand the sidebar
    ToggleSidebar,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = LeadboardConfig::with_cli_args(
        project_dir,
        cli.verbose,
        cli.json_logs,
        cli.leads_file.clone(),
    )?;
    let _telemetry = leadboard::telemetry::init(&config)?;

    match &cli.command {
        Commands::Init => cmd::cmd_init(&config)?,
        Commands::Add {
            name,
            phone,
            email,
            property,
            source,
            priority,
        } => cmd::cmd_add(
            &config,
            cmd::NewLead {
                name,
                phone: phone.as_deref(),
                email: email.as_deref(),
                property,
                source,
                priority: priority.as_deref(),
            },
        )?,
        Commands::Board {
            property,
            source,
            priority,
            search,
            json,
        } => {
            let filters = cmd::BoardFilters {
                property: property.clone(),
                source: source.clone(),
                priority: priority.clone(),
                search: search.clone(),
            };
            cmd::cmd_board(&config, filters, *json).await?
        }
        Commands::Move { lead, status } => cmd::cmd_move(&config, lead, status).await?,
        Commands::Reorder { lead, onto } => cmd::cmd_reorder(&config, lead, onto).await?,
        Commands::Contact { lead, action } => cmd::cmd_contact(&config, lead, action).await?,
        Commands::Activity { lead } => cmd::cmd_activity(&config, lead)?,
        Commands::Ui { command } => cmd::cmd_ui(&config, command.clone())?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
