//! Legacy persisted formats.
//!
//! Three generations predate the current `<prefix><path>` records. Each is a
//! [`LegacyKind`] with its own parser producing a [`LegacyRecord`]; applying a
//! record onto a [`StateDump`] is shared with the URL migration through
//! [`LegacySettings`].

use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

use super::columns::{default_columns, is_azure_path, vcpu_column};
use crate::error::{LinkError, Result};
use crate::models::{ColumnFilter, StateDump};

/// Metrics that carried a `<metric>_expr` / `min_<metric>` pair.
pub const LEGACY_METRICS: [&str; 7] = [
    "memory",
    "vcpus",
    "memory_per_vcpu",
    "gpus",
    "gpu_memory",
    "maxips",
    "storage",
];

/// Generation of a legacy storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyKind {
    /// Snake_case settings object shared by several pages (`ec2_settings`, `azure_settings`).
    SettingsBlob,
    /// Table-library state with a positional `columns[].visible` array.
    DataTablesState,
    /// `columnId -> bool` map from the first rewrite.
    ColumnVisibilityMap,
}

const AWS_PATHS: &[&str] = &["/", "/rds", "/cache", "/redshift", "/opensearch"];

/// Every recognized legacy key with its generation and target paths.
pub const LEGACY_KEYS: &[(&str, LegacyKind, &[&str])] = &[
    ("ec2_settings", LegacyKind::SettingsBlob, AWS_PATHS),
    ("azure_settings", LegacyKind::SettingsBlob, &["/azure"]),
    ("DataTables_data_/", LegacyKind::DataTablesState, &["/"]),
    ("DataTables_data_/rds/", LegacyKind::DataTablesState, &["/rds"]),
    ("DataTables_data_/cache/", LegacyKind::DataTablesState, &["/cache"]),
    ("DataTables_data_/redshift/", LegacyKind::DataTablesState, &["/redshift"]),
    ("DataTables_data_/opensearch/", LegacyKind::DataTablesState, &["/opensearch"]),
    ("DataTables_data_/azure/", LegacyKind::DataTablesState, &["/azure"]),
    ("columnVisibility_ec2", LegacyKind::ColumnVisibilityMap, &["/"]),
    ("columnVisibility_rds", LegacyKind::ColumnVisibilityMap, &["/rds"]),
    ("columnVisibility_cache", LegacyKind::ColumnVisibilityMap, &["/cache"]),
    ("columnVisibility_redshift", LegacyKind::ColumnVisibilityMap, &["/redshift"]),
    ("columnVisibility_opensearch", LegacyKind::ColumnVisibilityMap, &["/opensearch"]),
    ("columnVisibility_azure", LegacyKind::ColumnVisibilityMap, &["/azure"]),
];

/// Classify a storage key; returns its generation and the page paths it feeds.
pub fn classify_key(key: &str) -> Option<(LegacyKind, &'static [&'static str])> {
    LEGACY_KEYS
        .iter()
        .find(|(name, _, _)| *name == key)
        .map(|(_, kind, paths)| (*kind, *paths))
}

/// A raw legacy value read from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacySource {
    pub kind: LegacyKind,
    pub key: String,
    pub raw: String,
}

/// A successfully parsed legacy value.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyRecord {
    SettingsBlob(LegacySettings),
    /// `visible` per position; `None` where the entry had no boolean.
    DataTablesState(Vec<Option<bool>>),
    ColumnVisibilityMap(BTreeMap<String, bool>),
}

impl LegacySource {
    pub fn new(kind: LegacyKind, key: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            raw: raw.into(),
        }
    }

    fn parse_failed(&self, reason: impl Into<String>) -> LinkError {
        LinkError::MigrationParseFailed {
            key: self.key.clone(),
            reason: reason.into(),
        }
    }

    fn parse_json(&self) -> Result<JsonValue> {
        serde_json::from_str(&self.raw).map_err(|e| self.parse_failed(e.to_string()))
    }

    /// Parse with the generation's dedicated parser.
    pub fn parse(&self) -> Result<LegacyRecord> {
        match self.kind {
            LegacyKind::SettingsBlob => self.parse_settings_blob(),
            LegacyKind::DataTablesState => self.parse_data_tables(),
            LegacyKind::ColumnVisibilityMap => self.parse_visibility_map(),
        }
    }

    fn parse_settings_blob(&self) -> Result<LegacyRecord> {
        match self.parse_json()? {
            JsonValue::Object(object) => {
                Ok(LegacyRecord::SettingsBlob(LegacySettings::from_json(&object)))
            }
            _ => Err(self.parse_failed("settings blob is not an object")),
        }
    }

    fn parse_data_tables(&self) -> Result<LegacyRecord> {
        let value = self.parse_json()?;
        let columns = value
            .get("columns")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| self.parse_failed("missing columns array"))?;
        let visible = columns
            .iter()
            .map(|column| column.get("visible").and_then(JsonValue::as_bool))
            .collect();
        Ok(LegacyRecord::DataTablesState(visible))
    }

    fn parse_visibility_map(&self) -> Result<LegacyRecord> {
        let value = self.parse_json()?;
        let object = value
            .as_object()
            .ok_or_else(|| self.parse_failed("column visibility is not an object"))?;

        let mut map = BTreeMap::new();
        for (column, visible) in object {
            let visible = visible
                .as_bool()
                .ok_or_else(|| self.parse_failed(format!("'{}' is not a boolean", column)))?;
            map.insert(column.clone(), visible);
        }
        Ok(LegacyRecord::ColumnVisibilityMap(map))
    }
}

impl LegacyRecord {
    /// Merge this record into `state` (whose `path` selects per-page rules).
    pub fn apply(&self, state: &mut StateDump) -> usize {
        match self {
            LegacyRecord::SettingsBlob(settings) => settings.apply(state),
            LegacyRecord::DataTablesState(visible) => apply_positional(state, visible),
            LegacyRecord::ColumnVisibilityMap(map) => {
                state.visible_columns = map.clone();
                map.len()
            }
        }
    }
}

/// Zip positional flags against the path's default table, keeping only
/// entries that differ from the default. Extra positions on either side are
/// ignored.
fn apply_positional(state: &mut StateDump, visible: &[Option<bool>]) -> usize {
    let mut changed = 0;
    for ((column, default), flag) in default_columns(&state.path).iter().zip(visible) {
        if let Some(flag) = flag {
            if flag != default {
                state.visible_columns.insert(column.to_string(), *flag);
                changed += 1;
            }
        }
    }
    changed
}

/// Settings recovered from a legacy blob or legacy URL parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacySettings {
    pub pricing_unit: Option<String>,
    pub cost_duration: Option<String>,
    pub region: Option<String>,
    pub reserved_term: Option<String>,
    /// Only honored on Azure paths; `Savings` becomes `Standard`.
    pub savings_plan_term: Option<String>,
    pub compare_on: Option<bool>,
    pub filter: Option<String>,
    pub selected: Option<String>,
    /// `metric -> boundary expression`, already resolved from `_expr`/`min_`.
    pub expressions: BTreeMap<String, String>,
}

fn string_field(object: &Map<String, JsonValue>, key: &str) -> Option<String> {
    object.get(key).and_then(JsonValue::as_str).map(str::to_string)
}

fn format_min(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(i.to_string()),
            (None, Some(f)) if f.fract() == 0.0 && f.is_finite() => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        _ => None,
    }
}

fn split_removing_blanks(s: &str, delimiter: char) -> Vec<String> {
    s.split(delimiter)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the loose boolean spellings legacy links used.
pub fn parse_legacy_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl LegacySettings {
    /// Read a parsed settings blob.
    pub fn from_json(object: &Map<String, JsonValue>) -> Self {
        let mut settings = LegacySettings {
            pricing_unit: string_field(object, "pricing_unit"),
            cost_duration: string_field(object, "cost_duration"),
            region: string_field(object, "region"),
            reserved_term: string_field(object, "reserved_term"),
            savings_plan_term: None,
            compare_on: Some(object.get("compare_on").map(crate::models::is_truthy).unwrap_or(false)),
            filter: string_field(object, "filter"),
            selected: string_field(object, "selected"),
            expressions: BTreeMap::new(),
        };

        for metric in LEGACY_METRICS {
            let expr = object
                .get(format!("{}_expr", metric).as_str())
                .and_then(JsonValue::as_str)
                .filter(|expr| !expr.is_empty())
                .map(str::to_string)
                .or_else(|| {
                    object
                        .get(format!("min_{}", metric).as_str())
                        .and_then(format_min)
                        .map(|min| format!(">={}", min))
                });
            if let Some(expr) = expr {
                settings.expressions.insert(metric.to_string(), expr);
            }
        }
        settings
    }

    /// Read legacy query parameters (first occurrence of each name wins).
    pub fn from_query<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params: BTreeMap<&str, &str> = BTreeMap::new();
        for (key, value) in pairs {
            params.entry(key).or_insert(value);
        }
        let get = |key: &str| params.get(key).map(|v| v.to_string());

        let mut settings = LegacySettings {
            pricing_unit: get("pricing_unit"),
            cost_duration: get("cost_duration"),
            region: get("region"),
            reserved_term: get("reserved_term"),
            savings_plan_term: get("savings_plan_term").filter(|v| !v.is_empty()),
            compare_on: params.get("compare_on").and_then(|v| parse_legacy_bool(v)),
            filter: get("filter"),
            selected: get("selected").filter(|v| !v.is_empty()),
            expressions: BTreeMap::new(),
        };

        for metric in LEGACY_METRICS {
            let expr = get(format!("{}_expr", metric).as_str())
                .filter(|expr| !expr.is_empty())
                .or_else(|| {
                    get(format!("min_{}", metric).as_str())
                        .filter(|min| !min.is_empty())
                        .map(|min| format!(">={}", min))
                });
            if let Some(expr) = expr {
                settings.expressions.insert(metric.to_string(), expr);
            }
        }
        settings
    }

    /// Query parameter names this format understands.
    pub fn param_names() -> Vec<String> {
        let mut names: Vec<String> = [
            "pricing_unit",
            "cost_duration",
            "region",
            "reserved_term",
            "savings_plan_term",
            "compare_on",
            "filter",
            "selected",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        for metric in LEGACY_METRICS {
            names.push(format!("{}_expr", metric));
            names.push(format!("min_{}", metric));
        }
        names
    }

    /// Merge into `state`; returns how many fields were written.
    pub fn apply(&self, state: &mut StateDump) -> usize {
        let mut changed = 0;
        let mut set = |target: &mut String, value: &Option<String>| {
            if let Some(value) = value {
                *target = value.clone();
                changed += 1;
            }
        };

        set(&mut state.pricing_unit, &self.pricing_unit);
        set(&mut state.cost_duration, &self.cost_duration);
        set(&mut state.region, &self.region);
        set(&mut state.reserved_term, &self.reserved_term);

        if is_azure_path(&state.path) {
            if let Some(term) = &self.savings_plan_term {
                state.reserved_term = term.replacen("Savings", "Standard", 1);
                changed += 1;
            }
        }

        if self.compare_on == Some(true) {
            state.compare_on = true;
            changed += 1;
            // Compare mode stored the selection in the filter, pipe-delimited.
            if let Some(filter) = &self.filter {
                state.selected = split_removing_blanks(filter, '|');
            }
        } else {
            if let Some(filter) = &self.filter {
                state.filter = filter.clone();
                changed += 1;
            }
            if let Some(selected) = &self.selected {
                state.selected = split_removing_blanks(selected, ',');
                changed += 1;
            }
        }

        for metric in LEGACY_METRICS {
            let Some(expr) = self.expressions.get(metric) else {
                continue;
            };
            if expr == ">=0" {
                continue;
            }
            let column = match metric {
                "gpus" => "GPU",
                "gpu_memory" => "GPU_memory",
                "vcpus" => vcpu_column(&state.path),
                other => other,
            };
            state.upsert_column_filter(ColumnFilter::new(column, expr.clone()));
            changed += 1;
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blob(value: JsonValue) -> LegacySettings {
        match value {
            JsonValue::Object(object) => LegacySettings::from_json(&object),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_classify_key() {
        assert_eq!(classify_key("ec2_settings").unwrap().1.len(), 5);
        assert_eq!(classify_key("azure_settings").unwrap().1, &["/azure"]);
        assert_eq!(
            classify_key("DataTables_data_/rds/"),
            Some((LegacyKind::DataTablesState, &["/rds"][..]))
        );
        assert_eq!(
            classify_key("columnVisibility_ec2"),
            Some((LegacyKind::ColumnVisibilityMap, &["/"][..]))
        );
        assert_eq!(classify_key("gstate-/"), None);
        assert_eq!(classify_key("aws_settings"), None);
    }

    #[test]
    fn test_min_memory_becomes_boundary_expression() {
        let mut state = StateDump::blank("/");
        blob(json!({"min_memory": 16})).apply(&mut state);
        assert_eq!(state.columns, vec![ColumnFilter::new("memory", ">=16")]);
    }

    #[test]
    fn test_noop_boundaries_are_dropped() {
        let mut state = StateDump::blank("/");
        blob(json!({"memory_expr": ">=0"})).apply(&mut state);
        blob(json!({"min_memory": 0})).apply(&mut state);
        blob(json!({"min_storage": "0"})).apply(&mut state);
        assert!(state.columns.is_empty());
    }

    #[test]
    fn test_expr_preferred_over_min() {
        let mut state = StateDump::blank("/");
        blob(json!({"memory_expr": "4..8", "min_memory": 2})).apply(&mut state);
        assert_eq!(state.columns, vec![ColumnFilter::new("memory", "4..8")]);

        let mut state = StateDump::blank("/");
        blob(json!({"memory_expr": "", "min_memory": 2.5})).apply(&mut state);
        assert_eq!(state.columns, vec![ColumnFilter::new("memory", ">=2.5")]);
    }

    #[test]
    fn test_metric_column_renames() {
        let mut state = StateDump::blank("/cache");
        blob(json!({
            "min_vcpus": 4,
            "gpus_expr": ">=1",
            "gpu_memory_expr": ">=16",
            "maxips_expr": ">=10"
        }))
        .apply(&mut state);

        let ids: Vec<&str> = state.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["vcpus", "GPU", "GPU_memory", "maxips"]);
    }

    #[test]
    fn test_string_fields_copied() {
        let mut state = StateDump::blank("/");
        let changed = blob(json!({
            "pricing_unit": "vcpu",
            "cost_duration": "monthly",
            "region": "eu-west-1",
            "reserved_term": "yrTerm3Standard.allUpfront",
            "filter": "m5",
            "selected": "m5.large,,t3.micro,"
        }))
        .apply(&mut state);

        assert_eq!(state.pricing_unit, "vcpu");
        assert_eq!(state.cost_duration, "monthly");
        assert_eq!(state.region, "eu-west-1");
        assert_eq!(state.reserved_term, "yrTerm3Standard.allUpfront");
        assert_eq!(state.filter, "m5");
        assert_eq!(state.selected, vec!["m5.large", "t3.micro"]);
        assert!(!state.compare_on);
        assert_eq!(changed, 6);
    }

    #[test]
    fn test_compare_mode_reads_selection_from_filter() {
        let mut state = StateDump::blank("/");
        blob(json!({
            "compare_on": true,
            "filter": "|m5.large||c5.xlarge|",
            "selected": "ignored"
        }))
        .apply(&mut state);

        assert!(state.compare_on);
        assert_eq!(state.filter, "");
        assert_eq!(state.selected, vec!["m5.large", "c5.xlarge"]);
    }

    #[test]
    fn test_non_string_fields_ignored() {
        let mut state = StateDump::blank("/");
        let changed = blob(json!({"region": 5, "pricing_unit": null})).apply(&mut state);
        assert_eq!(changed, 0);
        assert_eq!(state, StateDump::blank("/"));
    }

    #[test]
    fn test_positional_zip_shorter_array() {
        let source = LegacySource::new(
            LegacyKind::DataTablesState,
            "DataTables_data_/redshift/",
            json!({"columns": [{"visible": true}, {"visible": false}, {"visible": true}]}).to_string(),
        );
        let mut state = StateDump::blank("/redshift");
        source.parse().unwrap().apply(&mut state);

        // pretty_name (T) same, instance_type (T) -> false differs, memory (T) same
        assert_eq!(state.visible_columns.len(), 1);
        assert_eq!(state.visible_columns.get("instance_type"), Some(&false));
    }

    #[test]
    fn test_positional_zip_longer_array_and_non_bool_entries() {
        let mut columns: Vec<JsonValue> = (0..20).map(|_| json!({"visible": true})).collect();
        columns[1] = json!({"visible": "yes"});
        columns[6] = json!({});
        let source = LegacySource::new(
            LegacyKind::DataTablesState,
            "DataTables_data_/redshift/",
            json!({ "columns": columns }).to_string(),
        );
        let mut state = StateDump::blank("/redshift");
        source.parse().unwrap().apply(&mut state);

        // Only ECU (index 6, default false) would differ, but it carried no flag;
        // generation (index 7, default false) is true.
        assert_eq!(state.visible_columns.len(), 1);
        assert_eq!(state.visible_columns.get("generation"), Some(&true));
    }

    #[test]
    fn test_positional_parse_failures() {
        for raw in ["{oops", "{\"columns\": 4}", "[]"] {
            let source = LegacySource::new(LegacyKind::DataTablesState, "DataTables_data_/", raw);
            assert!(matches!(
                source.parse(),
                Err(LinkError::MigrationParseFailed { .. })
            ));
        }
    }

    #[test]
    fn test_visibility_map_requires_booleans() {
        let ok = LegacySource::new(
            LegacyKind::ColumnVisibilityMap,
            "columnVisibility_azure",
            r#"{"GPU": true, "size": false}"#,
        );
        let mut state = StateDump::blank("/azure");
        assert_eq!(ok.parse().unwrap().apply(&mut state), 2);
        assert_eq!(state.visible_columns.get("size"), Some(&false));

        let bad = LegacySource::new(
            LegacyKind::ColumnVisibilityMap,
            "columnVisibility_azure",
            r#"{"GPU": "yes"}"#,
        );
        assert!(bad.parse().is_err());
    }

    #[test]
    fn test_query_settings() {
        let settings = LegacySettings::from_query([
            ("region", "us-west-2"),
            ("region", "ignored"),
            ("compare_on", "YES"),
            ("filter", "m5.large|t3.micro"),
            ("min_vcpus", "8"),
            ("memory_expr", ">=0"),
        ]);
        let mut state = StateDump::blank("/");
        settings.apply(&mut state);

        assert_eq!(state.region, "us-west-2");
        assert!(state.compare_on);
        assert_eq!(state.selected, vec!["m5.large", "t3.micro"]);
        assert_eq!(state.columns, vec![ColumnFilter::new("vCPU", ">=8")]);
    }

    #[test]
    fn test_query_unrecognized_boolean_ignored() {
        let settings = LegacySettings::from_query([("compare_on", "maybe")]);
        assert_eq!(settings.compare_on, None);
        assert_eq!(parse_legacy_bool("Off"), Some(false));
        assert_eq!(parse_legacy_bool("1"), Some(true));
    }

    #[test]
    fn test_savings_plan_term_only_on_azure() {
        let settings = LegacySettings::from_query([("savings_plan_term", "yrTerm1Savings.allUpfront")]);

        let mut azure = StateDump::blank("/azure");
        settings.apply(&mut azure);
        assert_eq!(azure.reserved_term, "yrTerm1Standard.allUpfront");

        let mut ec2 = StateDump::blank("/");
        assert_eq!(settings.apply(&mut ec2), 0);
        assert_eq!(ec2.reserved_term, "yrTerm1Standard.noUpfront");
    }
}
