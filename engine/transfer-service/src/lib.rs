//! TransferService - Salary-cap roster transfers, budgets and auto-draft
//!
//! This crate keeps each fantasy team's roster inside a fixed budget and the
//! season's position rules. It previews and atomically executes buy/sell
//! swaps, charges free transfers and point penalties, validates candidate
//! rosters and proposes affordable players to complete a roster.

pub mod auto_draft;
pub mod config;
pub mod constraints;
pub mod error;
pub mod executor;
pub mod impact;
pub mod ledger;
pub mod money;
pub mod period;
pub mod player;
pub mod roster;
pub mod service;
pub mod store;
pub mod transfer;
pub mod validator;

pub use config::TransferServiceConfig;
pub use error::TransferError;
pub use service::TransferService;

// Re-export commonly used types
pub use auto_draft::{auto_draft, AutoDraftRequest, AutoDraftSummary, DraftOutcome};
pub use constraints::RosterConstraints;
pub use executor::TransferReceipt;
pub use impact::{ImpactReport, TransferRequest};
pub use ledger::TeamLedger;
pub use money::Money;
pub use period::Period;
pub use player::{PlayerId, PlayerQuote, Position, TeamId};
pub use roster::{EffectiveRoster, PositionSlot, RosterEntry};
pub use store::{InMemoryRosterStore, PgRosterStore, RosterStore};
pub use transfer::{TransferRecord, TransferType};
pub use validator::{RosterCompleteness, ValidationReport};

// Result type alias
pub type Result<T> = std::result::Result<T, TransferError>;

#[cfg(test)]
mod integration_tests;
