pub mod advisor;
pub mod config;
pub mod data;
pub mod driver;
pub mod error;
pub mod events;
pub mod locator;
pub mod notify;
pub mod report;
pub mod retry;
pub mod runner;
pub mod steps;

// Re-export common items
pub use config::Config;
pub use report::generate_report;
pub use runner::{build_suite, CancelFlag, Flow, SuiteOrchestrator, SuiteResult};
