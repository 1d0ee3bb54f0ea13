//! Option defaults and deep merge
//!
//! Options arrive as JSON shaped like data attributes. Unless the caller
//! opts out, they are merged over the category defaults before use.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{FormError, FormResult};

/// Recursive last-write-wins merge of `overlay` into `base`.
///
/// Objects merge key by key; anything else in the overlay (arrays and
/// nulls included) replaces the base value.
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                merge_json(base_map.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Build typed options from caller JSON.
///
/// With `skip_default_merge` the JSON is used as-is and anything it leaves
/// out falls back to the disabled state of the options type.
pub fn resolve_options<T>(
    field_type: &str,
    defaults: &T,
    overrides: Value,
    skip_default_merge: bool,
) -> FormResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let invalid = |source| FormError::InvalidOptions {
        field_type: field_type.to_string(),
        source,
    };

    let merged = if skip_default_merge {
        overrides
    } else {
        let mut base = serde_json::to_value(defaults).map_err(invalid)?;
        if !overrides.is_null() {
            merge_json(&mut base, overrides);
        }
        base
    };

    serde_json::from_value(merged).map_err(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_objects_merge() {
        let mut base = json!({"a": 1, "nested": {"x": true, "y": false}});
        merge_json(&mut base, json!({"nested": {"y": true}, "b": 2}));

        assert_eq!(base, json!({"a": 1, "b": 2, "nested": {"x": true, "y": true}}));
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = json!({"protocols": ["http", "https", "ftp"]});
        merge_json(&mut base, json!({"protocols": ["https"]}));

        assert_eq!(base, json!({"protocols": ["https"]}));
    }

    #[test]
    fn test_last_write_wins() {
        let mut base = json!({"pattern": "^a$"});
        merge_json(&mut base, json!({"pattern": "^b$"}));
        merge_json(&mut base, json!({"pattern": null}));

        assert_eq!(base, json!({"pattern": null}));
    }
}
