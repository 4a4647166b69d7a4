//! Project initialization and lead intake commands.

use anyhow::{Context, Result};

use leadboard::config::{LeadboardConfig, LeadboardToml};
use leadboard::pipeline::models::{ContactInfo, CreateLead, LeadSource, Priority};
use leadboard::pipeline::InMemoryLeadRepository;

pub fn cmd_init(config: &LeadboardConfig) -> Result<()> {
    let dir = &config.leadboard_dir;
    let already = dir.exists();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let config_file = config.config_file();
    if !config_file.exists() {
        LeadboardToml::default().save(&config_file)?;
    }

    let leads_file = config.leads_file();
    if !leads_file.exists() {
        if let Some(parent) = leads_file.parent() {
            std::fs::create_dir_all(parent).context("Failed to create leads directory")?;
        }
        std::fs::write(&leads_file, "[]\n")
            .with_context(|| format!("Failed to write {}", leads_file.display()))?;
    }

    if already {
        println!("Lead board already initialized at {}", dir.display());
        println!("Directory structure verified.");
    } else {
        println!("Initialized lead board at {}", dir.display());
        println!();
        println!("Created:");
        println!("  .leadboard/");
        println!("  ├── leadboard.toml  # Board, storage and logging settings");
        println!("  └── leads.json      # Lead store");
        println!();
        println!("Next steps:");
        println!("  1. Run `leadboard add <name> --phone ...` to add leads");
        println!("  2. Run `leadboard board` to see the pipeline");
    }
    Ok(())
}

/// Arguments of `leadboard add`.
pub struct NewLead<'a> {
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub property: &'a str,
    pub source: &'a str,
    pub priority: Option<&'a str>,
}

pub fn cmd_add(config: &LeadboardConfig, input: NewLead<'_>) -> Result<()> {
    let source: LeadSource = input.source.parse().map_err(anyhow::Error::msg)?;
    let priority = input
        .priority
        .map(|p| p.parse::<Priority>())
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let repo = InMemoryLeadRepository::open(&config.leads_file())?;
    let lead = repo.create_lead(CreateLead {
        name: input.name.to_string(),
        contact: ContactInfo {
            phone: input.phone.map(String::from),
            email: input.email.map(String::from),
            ..Default::default()
        },
        property_id: input.property.to_string(),
        source,
        priority,
        qualification: None,
        notes: None,
    })?;

    println!(
        "{} {} ({})",
        console::style("Added").green().bold(),
        lead.name,
        lead.id
    );
    Ok(())
}
