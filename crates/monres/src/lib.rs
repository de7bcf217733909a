//! monres daemon: configuration, the collect/evaluate/notify loop and alert
//! state persistence.

pub mod config;
pub mod monitor;
pub mod probe;
pub mod state;

pub use config::MonitorConfig;
pub use monitor::{build_dispatcher, Monitor, TickReport};
pub use state::StateStore;
