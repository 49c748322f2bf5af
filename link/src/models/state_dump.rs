use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::column_filter::ColumnFilter;
use super::sort_rule::SortRule;
use super::state_field::StateField;
use crate::error::{LinkError, Result};

/// Schema version written by this crate.
pub const STATE_DUMP_VERSION: u32 = 1;

/// The full view configuration of one catalog page.
///
/// This is the record persisted to page-local storage (under
/// `<prefix><path>`) and uploaded to the key/value mirror. Every key is
/// optional on the wire; missing keys take the blank-record value.
///
/// # Examples
///
/// ```rust
/// use instances_link::StateDump;
///
/// let dump = StateDump::blank("/rds");
/// assert_eq!(dump.path, "/rds");
/// assert_eq!(dump.pricing_unit, "instance");
/// assert_eq!(dump.reserved_term, "yrTerm1Standard.noUpfront");
/// assert!(dump.currency.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateDump {
    pub version: u32,

    /// Page path this record belongs to (e.g. `/`, `/rds`, `/azure`)
    pub path: String,

    /// Free-text search filter
    pub filter: String,

    /// Per-column filter expressions, ids unique
    pub columns: Vec<ColumnFilter>,

    pub pricing_unit: String,
    pub cost_duration: String,
    pub region: String,
    pub reserved_term: String,

    /// Compare mode: only `selected` rows are shown
    pub compare_on: bool,

    /// Selected row ids, order preserved, no duplicates
    pub selected: Vec<String>,

    /// Column visibility overrides. Absent keys fall back to the path's
    /// default column table.
    pub visible_columns: BTreeMap<String, bool>,

    pub sort: Vec<SortRule>,

    /// Only present on uploaded snapshots; never part of a page-local record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl Default for StateDump {
    fn default() -> Self {
        Self {
            version: STATE_DUMP_VERSION,
            path: String::new(),
            filter: String::new(),
            columns: Vec::new(),
            pricing_unit: "instance".to_string(),
            cost_duration: "hourly".to_string(),
            region: String::new(),
            reserved_term: "yrTerm1Standard.noUpfront".to_string(),
            compare_on: false,
            selected: Vec::new(),
            visible_columns: BTreeMap::new(),
            sort: Vec::new(),
            currency: None,
        }
    }
}

fn decode<T: DeserializeOwned>(field: StateField, value: JsonValue) -> Result<T> {
    serde_json::from_value(value).map_err(|e| LinkError::InvalidFieldValue {
        field: field.as_str().to_string(),
        reason: e.to_string(),
    })
}

impl StateDump {
    /// Blank record for `path`.
    pub fn blank(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Current value of `field` as JSON.
    pub fn field_value(&self, field: StateField) -> JsonValue {
        let value = match field {
            StateField::Filter => serde_json::to_value(&self.filter),
            StateField::Columns => serde_json::to_value(&self.columns),
            StateField::PricingUnit => serde_json::to_value(&self.pricing_unit),
            StateField::CostDuration => serde_json::to_value(&self.cost_duration),
            StateField::Region => serde_json::to_value(&self.region),
            StateField::ReservedTerm => serde_json::to_value(&self.reserved_term),
            StateField::CompareOn => serde_json::to_value(self.compare_on),
            StateField::Selected => serde_json::to_value(&self.selected),
            StateField::VisibleColumns => serde_json::to_value(&self.visible_columns),
            StateField::Sort => serde_json::to_value(&self.sort),
        };
        value.unwrap_or(JsonValue::Null)
    }

    /// Replace `field` with `value`.
    ///
    /// Fails with [`LinkError::InvalidFieldValue`] when `value` has the wrong
    /// shape or column filter ids collide. Duplicate selected ids are
    /// collapsed, keeping the first occurrence.
    pub fn set_field_value(&mut self, field: StateField, value: JsonValue) -> Result<()> {
        match field {
            StateField::Filter => self.filter = decode(field, value)?,
            StateField::Columns => {
                let columns: Vec<ColumnFilter> = decode(field, value)?;
                for (i, column) in columns.iter().enumerate() {
                    if columns[..i].iter().any(|c| c.id == column.id) {
                        return Err(LinkError::InvalidFieldValue {
                            field: field.as_str().to_string(),
                            reason: format!("duplicate column id '{}'", column.id),
                        });
                    }
                }
                self.columns = columns;
            }
            StateField::PricingUnit => self.pricing_unit = decode(field, value)?,
            StateField::CostDuration => self.cost_duration = decode(field, value)?,
            StateField::Region => self.region = decode(field, value)?,
            StateField::ReservedTerm => self.reserved_term = decode(field, value)?,
            StateField::CompareOn => self.compare_on = decode(field, value)?,
            StateField::Selected => {
                let selected: Vec<String> = decode(field, value)?;
                let mut unique: Vec<String> = Vec::with_capacity(selected.len());
                for id in selected {
                    if !unique.contains(&id) {
                        unique.push(id);
                    }
                }
                self.selected = unique;
            }
            StateField::VisibleColumns => self.visible_columns = decode(field, value)?,
            StateField::Sort => self.sort = decode(field, value)?,
        }
        Ok(())
    }

    /// Insert a column filter, replacing any existing filter on the same column.
    pub fn upsert_column_filter(&mut self, filter: ColumnFilter) {
        match self.columns.iter_mut().find(|c| c.id == filter.id) {
            Some(existing) => existing.value = filter.value,
            None => self.columns.push(filter),
        }
    }

    /// Overlay the keys present in a fetched JSON record.
    ///
    /// Keys absent from `value` keep their current contents. `currency` is
    /// ignored here; the store routes it to the sticky slot. The merge is
    /// all-or-nothing: on error `self` is left untouched.
    pub fn merge_json(&mut self, value: &JsonValue) -> Result<()> {
        let object = value.as_object().ok_or_else(|| {
            LinkError::SerializationError("state record must be a JSON object".to_string())
        })?;

        let mut merged = self.clone();
        if let Some(version) = object.get("version").and_then(JsonValue::as_u64) {
            merged.version = u32::try_from(version).map_err(|_| LinkError::InvalidFieldValue {
                field: "version".to_string(),
                reason: format!("{} does not fit a schema version", version),
            })?;
        }
        if let Some(path) = object.get("path").and_then(JsonValue::as_str) {
            merged.path = path.to_string();
        }
        for field in StateField::ALL {
            if let Some(v) = object.get(field.as_str()) {
                merged.set_field_value(field, v.clone())?;
            }
        }

        *self = merged;
        Ok(())
    }

    /// Copy suitable for page-local persistence (currency stripped).
    pub fn to_local_snapshot(&self) -> StateDump {
        StateDump {
            currency: None,
            ..self.clone()
        }
    }

    /// Copy suitable for upload, carrying the sticky currency.
    pub fn with_currency(&self, currency: impl Into<String>) -> StateDump {
        StateDump {
            currency: Some(currency.into()),
            ..self.clone()
        }
    }
}
