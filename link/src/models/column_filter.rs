use serde::{Deserialize, Serialize};

/// A per-column filter expression, e.g. `{ "id": "memory", "value": ">=16" }`.
///
/// Within a [`StateDump`](super::StateDump) the `id`s are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFilter {
    /// Column identifier
    pub id: String,

    /// Expression text as typed into the column filter box
    pub value: String,
}

impl ColumnFilter {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}
