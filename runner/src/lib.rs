pub mod assertion;
pub mod collector;
pub mod config;
pub mod database;
pub mod registry;
pub mod suite;
pub mod usage;
pub mod workload;

#[cfg(test)]
mod collector_test;
#[cfg(test)]
mod config_test;
#[cfg(test)]
mod registry_test;

pub use config::RunnerConfig;
pub use database::Connection;
pub use suite::{RunContext, RunSummary, TestRunner};
