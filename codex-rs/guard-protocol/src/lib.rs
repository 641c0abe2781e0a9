//! Shared types for the review-slot guard bot.
//!
//! This crate carries no I/O and no business logic — only the vocabulary
//! every other crate in the workspace speaks: ids, the review state machine's
//! states and decisions, the closed intent alphabet emitted by the state
//! machine, the entity structs persisted by `guard-store`, and the error
//! kinds raised by adapters.

mod callback;
mod decision;
mod entities;
mod error;
mod ids;
mod intent;
mod settings;
mod status;
mod tokens;
mod whitelist;

pub use callback::format_callback;
pub use callback::parse_callback;
pub use decision::Decision;
pub use entities::ProjectFamilyIndex;
pub use entities::Reviewer;
pub use entities::ReviewerStatus;
pub use entities::WhitelistEntry;
pub use error::ErrorKind;
pub use ids::Login;
pub use ids::ReviewId;
pub use ids::SlotId;
pub use intent::Intent;
pub use settings::BoolSettingValidationError;
pub use settings::ReviewerSettings;
pub use settings::SettingRange;
pub use settings::SettingValidationError;
pub use status::ReviewRequest;
pub use status::ReviewStatus;
pub use tokens::TokenBundle;
pub use whitelist::WhitelistKind;
