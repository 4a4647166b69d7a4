//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                                   |
//! |-----------|----------------------------------------------------|
//! | `project` | `Init`, `Add`                                      |
//! | `board`   | `Board`, `Move`, `Reorder`, `Contact`, `Activity`  |
//! | `ui`      | `Ui`                                               |
//! | `config`  | `Config`                                           |

pub mod board;
pub mod config;
pub mod project;
pub mod ui;

pub use board::{BoardFilters, cmd_activity, cmd_board, cmd_contact, cmd_move, cmd_reorder};
pub use config::cmd_config;
pub use project::{NewLead, cmd_add, cmd_init};
pub use ui::cmd_ui;
