//! UI preference commands (`leadboard ui`).

use anyhow::Result;

use leadboard::config::LeadboardConfig;
use leadboard::ui_state::{Theme, UiState};

use super::super::UiCommands;

pub fn cmd_ui(config: &LeadboardConfig, command: Option<UiCommands>) -> Result<()> {
    let path = config.ui_state_file();
    let mut state = UiState::load(&path)?;

    match command {
        None | Some(UiCommands::Show) => {
            println!("theme = \"{}\"", state.theme);
            println!("sidebar_collapsed = {}", state.sidebar_collapsed);
        }
        Some(UiCommands::Theme { theme }) => {
            let theme: Theme = theme.parse()?;
            state.set_theme(theme);
            state.save(&path)?;
            println!("Theme set to {}", theme);
        }
        Some(UiCommands::ToggleSidebar) => {
            let collapsed = state.toggle_sidebar();
            state.save(&path)?;
            println!(
                "Sidebar {}",
                if collapsed { "collapsed" } else { "expanded" }
            );
        }
    }
    Ok(())
}
