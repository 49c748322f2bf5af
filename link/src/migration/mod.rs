//! One-shot migration of legacy persisted view state.
//!
//! [`migrate_local_storage`] converts every recognized legacy key into a
//! current-schema record, then deletes what it consumed. It is a no-op once
//! any current-schema key exists, which makes it idempotent.
//! [`plan_url_migration`] does the same for legacy query parameters; the
//! store uploads the result and swaps the parameters for a share id.

pub mod columns;
pub mod legacy;
mod url_params;

pub use columns::{default_columns, default_visibility, is_azure_path, vcpu_column};
pub use legacy::{
    classify_key, parse_legacy_bool, LegacyKind, LegacyRecord, LegacySettings, LegacySource,
    LEGACY_KEYS, LEGACY_METRICS,
};
pub use url_params::{plan_url_migration, UrlMigrationPlan};

use log::{debug, info, warn};
use std::collections::BTreeMap;

use crate::config::LinkConfig;
use crate::error::Result;
use crate::models::StateDump;
use crate::storage::{save_state, PageStorage};

/// A legacy source that could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationFailure {
    pub key: String,
    pub path: String,
    pub reason: String,
}

/// Outcome of [`migrate_local_storage`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    /// Current-schema keys already existed; nothing was touched.
    pub skipped: bool,
    /// Paths that received a migrated record.
    pub migrated_paths: Vec<String>,
    /// Legacy keys deleted.
    pub removed_keys: Vec<String>,
    pub failures: Vec<MigrationFailure>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.migrated_paths.is_empty() && self.removed_keys.is_empty()
    }
}

/// Legacy inputs gathered for one target path.
#[derive(Debug, Default)]
struct MigrationGroup {
    settings: Option<LegacySource>,
    data_tables: Option<LegacySource>,
    visibility_map: Option<LegacySource>,
    keys: Vec<String>,
}

impl MigrationGroup {
    /// Sources to merge, in order. A visibility map is preferred wholesale
    /// over a positional array.
    fn sources(&self) -> Vec<&LegacySource> {
        let visibility = self.visibility_map.as_ref().or(self.data_tables.as_ref());
        self.settings.iter().chain(visibility).collect()
    }
}

/// Convert legacy page-local records into current-schema records.
///
/// Groups recognized keys by target path and migrates each group on its
/// own. A group succeeds when at least one of its sources parsed; it then
/// stores the merged record under `<prefix><path>` and deletes every legacy
/// key of the group, including sources that failed to parse. Failed groups
/// are left untouched.
pub fn migrate_local_storage(
    storage: &dyn PageStorage,
    config: &LinkConfig,
) -> Result<MigrationReport> {
    let keys = storage.keys()?;
    if keys.iter().any(|k| k.starts_with(&config.storage_prefix)) {
        debug!("[MIGRATION] Current-schema records present, skipping");
        return Ok(MigrationReport {
            skipped: true,
            ..Default::default()
        });
    }

    let mut groups: BTreeMap<&'static str, MigrationGroup> = BTreeMap::new();
    for key in &keys {
        let Some((kind, paths)) = classify_key(key) else {
            continue;
        };
        let Some(raw) = storage.get_item(key)? else {
            continue;
        };
        for &path in paths {
            let group = groups.entry(path).or_default();
            let source = LegacySource::new(kind, key.clone(), raw.clone());
            match kind {
                LegacyKind::SettingsBlob => group.settings = Some(source),
                LegacyKind::DataTablesState => group.data_tables = Some(source),
                LegacyKind::ColumnVisibilityMap => group.visibility_map = Some(source),
            }
            group.keys.push(key.clone());
        }
    }

    let mut report = MigrationReport::default();
    for (path, group) in groups {
        let mut state = StateDump::blank(path);
        let mut any_success = false;

        for source in group.sources() {
            match source.parse() {
                Ok(record) => {
                    record.apply(&mut state);
                    any_success = true;
                }
                Err(e) => {
                    warn!("[MIGRATION] Ignoring '{}' for path={}: {}", source.key, path, e);
                    report.failures.push(MigrationFailure {
                        key: source.key.clone(),
                        path: path.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !any_success {
            continue;
        }

        for key in &group.keys {
            storage.remove_item(key)?;
            if !report.removed_keys.contains(key) {
                report.removed_keys.push(key.clone());
            }
        }
        save_state(storage, config, path, &state)?;
        report.migrated_paths.push(path.to_string());
    }

    if !report.migrated_paths.is_empty() {
        info!(
            "[MIGRATION] Migrated {} path(s) {:?}, removed {} legacy key(s)",
            report.migrated_paths.len(),
            report.migrated_paths,
            report.removed_keys.len()
        );
    }
    Ok(report)
}
