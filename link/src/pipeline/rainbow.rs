//! Rainbow-table pricing expansion.
//!
//! Shards store each row's `pricing` map in indexed form to keep repeated
//! region, platform and key names out of the payload:
//!
//! ```text
//! [[regionIdx, [[platformIdx, [[keyIdx, value], ...]], ...]], ...]
//! ```
//!
//! Every index points into the string table that leads the shard. The value
//! under the `reserved` key is itself a list of `[termIdx, price]` pairs.
//!
//! A platform whose prices are identical to one already emitted is written
//! as `[platformIdx, [regionIdx, otherPlatformIdx]]`, a reference to that
//! earlier platform.

use serde_json::{Map, Value as JsonValue};

use super::Row;
use crate::error::{LinkError, Result};

const RESERVED_KEY: &str = "reserved";

/// Interpret a shard's leading element as a string table.
pub fn as_rainbow_table(value: &JsonValue) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Expand `row.pricing` in place. Rows without indexed pricing are untouched.
///
/// On error the row is left as it was.
pub fn expand_row(table: &[String], row: &mut Row) -> Result<()> {
    let Some(pricing) = row.get_mut("pricing") else {
        return Ok(());
    };
    if !pricing.is_array() {
        return Ok(());
    }
    *pricing = expand_pricing(table, pricing)?;
    Ok(())
}

fn expand_pricing(table: &[String], pricing: &JsonValue) -> Result<JsonValue> {
    let mut regions = Map::new();
    for region in entries(pricing, "pricing")? {
        let (region_key, platforms_value) = pair(table, region, "region")?;
        let mut platforms = Map::new();
        for platform in entries(platforms_value, "platforms")? {
            let (platform_key, kv_value) = pair(table, platform, "platform")?;
            if is_reference(kv_value) {
                let (ref_region, ref_platform) = pair(table, kv_value, "platform reference")?;
                let ref_platform = ref_platform
                    .as_u64()
                    .and_then(|i| table.get(i as usize))
                    .ok_or_else(|| {
                        LinkError::DecodeError(format!(
                            "platform reference index {} is not in the string table",
                            ref_platform
                        ))
                    })?;
                let source = if ref_region == region_key {
                    platforms.get(ref_platform.as_str())
                } else {
                    regions
                        .get(ref_region)
                        .and_then(|p| p.get(ref_platform.as_str()))
                };
                let resolved = source.cloned().ok_or_else(|| {
                    LinkError::DecodeError(format!(
                        "platform reference {}/{} points at nothing decoded yet",
                        ref_region, ref_platform
                    ))
                })?;
                platforms.insert(platform_key.to_string(), resolved);
                continue;
            }
            let mut kv = Map::new();
            for entry in entries(kv_value, "platform entries")? {
                let (key, value) = pair(table, entry, "price key")?;
                let value = if key == RESERVED_KEY {
                    expand_reserved(table, value)?
                } else {
                    value.clone()
                };
                kv.insert(key.to_string(), value);
            }
            platforms.insert(platform_key.to_string(), JsonValue::Object(kv));
        }
        regions.insert(region_key.to_string(), JsonValue::Object(platforms));
    }
    Ok(JsonValue::Object(regions))
}

fn expand_reserved(table: &[String], value: &JsonValue) -> Result<JsonValue> {
    let mut reserved = Map::new();
    for term in entries(value, "reserved terms")? {
        let (term_key, price) = pair(table, term, "reserved term")?;
        reserved.insert(term_key.to_string(), price.clone());
    }
    Ok(JsonValue::Object(reserved))
}

/// `[regionIdx, platformIdx]` rather than a list of `[keyIdx, value]` pairs.
fn is_reference(value: &JsonValue) -> bool {
    value
        .as_array()
        .and_then(|items| items.first())
        .is_some_and(JsonValue::is_number)
}

fn entries<'a>(value: &'a JsonValue, what: &str) -> Result<&'a Vec<JsonValue>> {
    value
        .as_array()
        .ok_or_else(|| LinkError::DecodeError(format!("{} must be an array", what)))
}

/// Split `[index, value]` and resolve the index against `table`.
fn pair<'a, 't>(
    table: &'t [String],
    value: &'a JsonValue,
    what: &str,
) -> Result<(&'t str, &'a JsonValue)> {
    let (index, rest) = match value.as_array().map(Vec::as_slice) {
        Some([index, rest]) => (index, rest),
        _ => {
            return Err(LinkError::DecodeError(format!(
                "{} entry must be an [index, value] pair",
                what
            )))
        }
    };
    let key = index
        .as_u64()
        .and_then(|i| table.get(i as usize))
        .ok_or_else(|| {
            LinkError::DecodeError(format!("{} index {} is not in the string table", what, index))
        })?;
    Ok((key.as_str(), rest))
}
