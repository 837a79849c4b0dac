//! CLI command handlers. Each command is in its own file.

mod config;
mod decide;
mod simulate;

pub use config::run_config;
pub use decide::run_decide;
pub use simulate::run_simulate;
