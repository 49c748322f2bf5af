use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LinkError;

/// Addressable fields of a [`StateDump`](super::StateDump).
///
/// Subscriptions are keyed by field, so an edit to `Region` only wakes the
/// callbacks registered for `Region`. The currency is deliberately absent:
/// it lives in the store's sticky slot rather than in any path's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateField {
    Filter,
    Columns,
    PricingUnit,
    CostDuration,
    Region,
    ReservedTerm,
    CompareOn,
    Selected,
    VisibleColumns,
    Sort,
}

impl StateField {
    /// Every field, in wire order.
    pub const ALL: [StateField; 10] = [
        StateField::Filter,
        StateField::Columns,
        StateField::PricingUnit,
        StateField::CostDuration,
        StateField::Region,
        StateField::ReservedTerm,
        StateField::CompareOn,
        StateField::Selected,
        StateField::VisibleColumns,
        StateField::Sort,
    ];

    /// JSON key used by the serialized record.
    pub fn as_str(&self) -> &'static str {
        match self {
            StateField::Filter => "filter",
            StateField::Columns => "columns",
            StateField::PricingUnit => "pricingUnit",
            StateField::CostDuration => "costDuration",
            StateField::Region => "region",
            StateField::ReservedTerm => "reservedTerm",
            StateField::CompareOn => "compareOn",
            StateField::Selected => "selected",
            StateField::VisibleColumns => "visibleColumns",
            StateField::Sort => "sort",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateField {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| LinkError::InvalidFieldValue {
                field: s.to_string(),
                reason: "unknown state field".to_string(),
            })
    }
}
