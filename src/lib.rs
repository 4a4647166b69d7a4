pub mod config;
pub mod errors;
pub mod pipeline;
pub mod telemetry;
pub mod ui_state;
