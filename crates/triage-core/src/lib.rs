//! triage-core: domain model, configuration, and store abstraction for the
//! triage assignment engine.
//!
//! This crate contains the foundational types shared across the workspace:
//! tickets, members, candidates, decisions, the error taxonomy, the engine
//! configuration with its priority weight tables, the `TeamStore` trait,
//! and a configurable `MockTeamStore` for testing.

pub mod config;
pub mod error;
pub mod mock;
pub mod store;
pub mod types;

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "triage-core"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_label_is_stable() {
        assert_eq!(crate_label(), "triage-core");
    }
}
