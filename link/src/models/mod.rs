//! Data models for instances-link.
//!
//! Defines the persisted view record, its addressable fields and the shapes
//! exchanged with the key/value mirror.

pub mod column_filter;
pub mod fallback;
pub mod remote_snapshot;
pub mod sort_rule;
pub mod state_dump;
pub mod state_field;

#[cfg(test)]
mod tests;

pub use column_filter::ColumnFilter;
pub use fallback::{is_truthy, res_or_default};
pub use remote_snapshot::RemoteSnapshot;
pub use sort_rule::SortRule;
pub use state_dump::{StateDump, STATE_DUMP_VERSION};
pub use state_field::StateField;
