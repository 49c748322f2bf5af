use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;

use super::{StateStore, Subscription};
use crate::error::Result;
use crate::migration::{default_visibility, is_azure_path};
use crate::models::{ColumnFilter, SortRule, StateDump, StateField};

const DEFAULT_PRICING_UNIT: &str = "instance";
const DEFAULT_COST_DURATION: &str = "hourly";

/// Typed view of one page path in a [`StateStore`].
///
/// Getters apply the same falsy-default fallback as [`StateStore::read`],
/// with defaults that depend on the catalog the path renders.
///
/// ```rust
/// use instances_link::{MemoryLocation, MemoryRemoteStore, StateStore};
/// use std::sync::Arc;
///
/// # fn main() -> instances_link::Result<()> {
/// let store = StateStore::builder()
///     .remote(Arc::new(MemoryRemoteStore::new()))
///     .location(Arc::new(MemoryLocation::new("https://instances.vantage.sh/azure")?))
///     .build()?;
///
/// let azure = store.path("/azure");
/// assert_eq!(azure.region(), "us-east");
/// assert_eq!(store.path("/").region(), "us-east-1");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PathContext {
    store: StateStore,
    path: String,
}

impl PathContext {
    pub(crate) fn new(store: StateStore, path: String) -> Self {
        Self { store, path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    fn get<T: DeserializeOwned>(&self, field: StateField, default: JsonValue) -> T
    where
        T: Default,
    {
        let value = self.store.read(&self.path, field, Some(default));
        serde_json::from_value(value).unwrap_or_default()
    }

    fn put(&self, field: StateField, value: impl serde::Serialize) -> Result<()> {
        self.store.set(&self.path, field, serde_json::to_value(value)?)
    }

    pub fn filter(&self) -> String {
        self.get(StateField::Filter, json!(""))
    }

    pub fn set_filter(&self, filter: impl Into<String>) -> Result<()> {
        self.put(StateField::Filter, filter.into())
    }

    pub fn columns(&self) -> Vec<ColumnFilter> {
        self.get(StateField::Columns, json!([]))
    }

    pub fn set_columns(&self, columns: Vec<ColumnFilter>) -> Result<()> {
        self.put(StateField::Columns, columns)
    }

    /// Set the filter expression on one column, replacing any existing one.
    pub fn set_column_filter(&self, id: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let filter = ColumnFilter::new(id, value);
        let mut columns = self.columns();
        match columns.iter_mut().find(|c| c.id == filter.id) {
            Some(existing) => existing.value = filter.value,
            None => columns.push(filter),
        }
        self.set_columns(columns)
    }

    pub fn pricing_unit(&self) -> String {
        self.get(StateField::PricingUnit, json!(DEFAULT_PRICING_UNIT))
    }

    pub fn set_pricing_unit(&self, unit: impl Into<String>) -> Result<()> {
        self.put(StateField::PricingUnit, unit.into())
    }

    pub fn cost_duration(&self) -> String {
        self.get(StateField::CostDuration, json!(DEFAULT_COST_DURATION))
    }

    pub fn set_cost_duration(&self, duration: impl Into<String>) -> Result<()> {
        self.put(StateField::CostDuration, duration.into())
    }

    /// Selected region; `us-east` on Azure, `us-east-1` elsewhere when unset.
    pub fn region(&self) -> String {
        self.get(StateField::Region, json!(self.default_region()))
    }

    pub fn set_region(&self, region: impl Into<String>) -> Result<()> {
        self.put(StateField::Region, region.into())
    }

    pub fn reserved_term(&self) -> String {
        self.get(StateField::ReservedTerm, json!(self.default_reserved_term()))
    }

    pub fn set_reserved_term(&self, term: impl Into<String>) -> Result<()> {
        self.put(StateField::ReservedTerm, term.into())
    }

    pub fn compare_on(&self) -> bool {
        self.get(StateField::CompareOn, json!(false))
    }

    pub fn set_compare_on(&self, on: bool) -> Result<()> {
        self.put(StateField::CompareOn, on)
    }

    pub fn selected(&self) -> Vec<String> {
        self.get(StateField::Selected, json!([]))
    }

    pub fn set_selected(&self, selected: Vec<String>) -> Result<()> {
        self.put(StateField::Selected, selected)
    }

    /// Add or remove one row id from the selection.
    pub fn toggle_selected(&self, id: &str) -> Result<()> {
        let mut selected = self.selected();
        match selected.iter().position(|s| s == id) {
            Some(index) => {
                selected.remove(index);
            }
            None => selected.push(id.to_string()),
        }
        self.set_selected(selected)
    }

    pub fn visible_columns(&self) -> BTreeMap<String, bool> {
        self.get(StateField::VisibleColumns, json!({}))
    }

    pub fn set_visible_columns(&self, columns: BTreeMap<String, bool>) -> Result<()> {
        self.put(StateField::VisibleColumns, columns)
    }

    pub fn set_column_visible(&self, column: impl Into<String>, visible: bool) -> Result<()> {
        let mut columns = self.visible_columns();
        columns.insert(column.into(), visible);
        self.set_visible_columns(columns)
    }

    /// Whether `column` is shown: the stored override, else the path's
    /// default table, else visible.
    pub fn is_column_visible(&self, column: &str) -> bool {
        self.visible_columns()
            .get(column)
            .copied()
            .or_else(|| default_visibility(&self.path, column))
            .unwrap_or(true)
    }

    pub fn sort(&self) -> Vec<SortRule> {
        self.get(StateField::Sort, json!([]))
    }

    pub fn set_sort(&self, sort: Vec<SortRule>) -> Result<()> {
        self.put(StateField::Sort, sort)
    }

    pub fn currency(&self) -> String {
        self.store.currency()
    }

    pub fn set_currency(&self, code: impl Into<String>) {
        self.store.set_currency(code)
    }

    pub fn subscribe(
        &self,
        field: StateField,
        callback: impl Fn(&JsonValue) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.subscribe(&self.path, field, callback)
    }

    pub fn snapshot(&self) -> StateDump {
        self.store.snapshot(&self.path)
    }

    pub fn reset(&self) -> Result<()> {
        self.store.reset(&self.path)
    }

    pub async fn wait_for_hydration(&self) {
        self.store.wait_for_hydration(&self.path).await
    }

    fn default_region(&self) -> &'static str {
        if is_azure_path(&self.path) {
            "us-east"
        } else {
            "us-east-1"
        }
    }

    fn default_reserved_term(&self) -> &'static str {
        if is_azure_path(&self.path) {
            "yrTerm1Standard.allUpfront"
        } else {
            "yrTerm1Standard.noUpfront"
        }
    }
}
