use url::Url;

use super::legacy::LegacySettings;
use crate::location::{remove_query_params, set_query_param, SHARE_ID_PARAM};
use crate::models::StateDump;

/// Result of reading legacy query parameters for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlMigrationPlan {
    /// `current` with the legacy parameters applied.
    pub state: StateDump,
    /// Legacy parameter names present in the address.
    pub consumed_params: Vec<String>,
}

impl UrlMigrationPlan {
    /// `href` with the consumed parameters replaced by `id=<share_id>`.
    pub fn rewrite(&self, href: &Url, share_id: &str) -> Url {
        let consumed: Vec<&str> = self.consumed_params.iter().map(String::as_str).collect();
        set_query_param(&remove_query_params(href, &consumed), SHARE_ID_PARAM, share_id)
    }
}

/// Apply legacy query parameters from `href` onto `current`.
///
/// Returns `None` when the address already carries a share id or when no
/// legacy parameter changed anything.
pub fn plan_url_migration(href: &Url, current: &StateDump) -> Option<UrlMigrationPlan> {
    let pairs: Vec<(String, String)> = href.query_pairs().into_owned().collect();
    if pairs
        .iter()
        .any(|(key, value)| key == SHARE_ID_PARAM && !value.is_empty())
    {
        return None;
    }

    let settings = LegacySettings::from_query(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let mut state = current.clone();
    if settings.apply(&mut state) == 0 {
        return None;
    }

    let known = LegacySettings::param_names();
    let mut consumed_params: Vec<String> = Vec::new();
    for (key, _) in &pairs {
        if known.contains(key) && !consumed_params.contains(key) {
            consumed_params.push(key.clone());
        }
    }

    Some(UrlMigrationPlan {
        state,
        consumed_params,
    })
}
