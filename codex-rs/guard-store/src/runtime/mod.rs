//! Query methods on [`crate::StoreRuntime`], one module per entity. Each
//! file adds its own `impl StoreRuntime` block rather than collecting
//! everything in one file, so a change to one entity's queries never
//! touches another's.

mod family_index;
mod review_requests;
mod reviewers;
mod secrets;
mod settings;
mod whitelist;

pub use review_requests::TransitionPatch;
