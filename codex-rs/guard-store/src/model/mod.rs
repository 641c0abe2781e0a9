//! Row types that mirror `guard-store`'s tables column-for-column, and the
//! `TryFrom<SqliteRow>` conversions that turn them into the domain structs
//! `guard-protocol` defines. Kept separate from `runtime/` so a schema
//! change only touches one file per entity.

mod family_index;
mod review_request;
mod reviewer;
mod secret_document;
mod whitelist_entry;

pub(crate) use family_index::FamilyIndexRow;
pub(crate) use review_request::ReviewRequestRow;
pub(crate) use reviewer::ReviewerRow;
pub(crate) use reviewer::ReviewerSettingsRow;
pub(crate) use secret_document::SecretDocumentRow;
pub(crate) use whitelist_entry::WhitelistEntryRow;
