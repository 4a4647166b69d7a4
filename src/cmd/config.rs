//! Configuration view and validation commands (`leadboard config`).

use anyhow::Result;

use leadboard::config::LeadboardConfig;

use super::super::ConfigCommands;

pub fn cmd_config(config: &LeadboardConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Leadboard Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No leadboard.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            let toml = &config.toml;
            println!("[board]");
            println!("  activation_distance = {}", toml.board.activation_distance);
            println!("  mutation_timeout_ms = {}", toml.board.mutation_timeout_ms);
            println!();
            println!("[storage]");
            println!("  leads_file = \"{}\"", toml.storage.leads_file.display());
            println!("  audit_file = \"{}\"", toml.storage.audit_file.display());
            println!("  ui_state_file = \"{}\"", toml.storage.ui_state_file.display());
            println!();
            println!("[logging]");
            if let Some(level) = &toml.logging.level {
                println!("  level = \"{}\"", level);
            }
            println!("  json = {}", toml.logging.json);
            if let Some(dir) = &toml.logging.log_dir {
                println!("  log_dir = \"{}\"", dir.display());
            }
            println!();

            println!("Effective values (with env/CLI overrides):");
            println!("  activation_distance = {}", config.activation_distance());
            println!(
                "  mutation_timeout_ms = {}",
                config.mutation_timeout().as_millis()
            );
            println!("  leads_file = \"{}\"", config.leads_file().display());
            println!("  audit_file = \"{}\"", config.audit_file().display());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }
        }
    }
    Ok(())
}
