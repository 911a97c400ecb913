//! Core of the expense request assistant: domain types, field extractors,
//! and the dialogue state machine, plus configuration. No I/O lives here;
//! persistence and transcription are collaborators behind traits in sibling
//! crates.

pub mod config;
pub mod dialogue;
pub mod domain;
pub mod errors;
pub mod extract;

pub use dialogue::{DialogueSession, Stage, TurnOutcome};
pub use domain::message::{Message, Sender, Transcript};
pub use domain::request::{Currency, DraftRequest, ExpenseRequest, RequestId, RequestStatus};
pub use errors::DomainError;
pub use extract::{FieldExtractor, ProjectInfo};

// Re-exported so downstream crates share one chrono/decimal version.
pub use chrono;
pub use rust_decimal;
