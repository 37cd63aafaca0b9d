use std::str::FromStr;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Number, Value};

use crate::config::TrainingError;

/// One `key=value` assignment; the key is a dot-separated path and may index
/// arrays as `name[2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideArg {
    pub path: String,
    pub value: String,
}

impl FromStr for OverrideArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, value) = s
            .split_once('=')
            .ok_or_else(|| "override must be in the form key=value".to_string())?;
        if path.trim().is_empty() {
            return Err("override key must not be empty".into());
        }
        Ok(Self {
            path: path.trim().to_string(),
            value: value.trim().to_string(),
        })
    }
}

/// Apply `overrides` in order to any serde bundle.
///
/// The bundle is round-tripped through JSON, so unknown keys are rejected by
/// bundles that deny them and type mismatches surface as `ConfigFormat`.
pub fn apply_overrides<T>(config: T, overrides: &[OverrideArg]) -> Result<T, TrainingError>
where
    T: Serialize + DeserializeOwned,
{
    if overrides.is_empty() {
        return Ok(config);
    }

    let mut value = serde_json::to_value(config)?;

    for OverrideArg { path, value: raw } in overrides {
        parse_path(path)
            .and_then(|segments| assign(&mut value, &segments, parse_override_value(raw)))
            .map_err(|reason| TrainingError::Override {
                path: path.clone(),
                reason,
            })?;
        log::debug!("override {} = {}", path, raw);
    }

    serde_json::from_value(value).map_err(|err| {
        TrainingError::ConfigFormat(format!("failed to apply overrides: {err}"))
    })
}

/// Infer a JSON scalar from a command-line string. Anything that is not a
/// bool, null, number or JSON array/object stays a string.
pub fn parse_override_value(raw: &str) -> Value {
    let text = raw.trim();
    match text.to_ascii_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(int) = text.parse::<i64>() {
        return Value::from(int);
    }
    if let Some(number) = text.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    if text.starts_with(['[', '{']) {
        if let Ok(json) = serde_json::from_str(text) {
            return json;
        }
    }
    Value::String(text.to_owned())
}

#[derive(Debug)]
struct PathSegment {
    key: String,
    index: Option<usize>,
}

/// Split `a.b[2].c` into keys with optional array indices.
fn parse_path(path: &str) -> Result<Vec<PathSegment>, String> {
    path.split('.')
        .map(|segment| {
            let (key, index) = match segment.split_once('[') {
                Some((key, rest)) => {
                    let digits = rest
                        .strip_suffix(']')
                        .ok_or_else(|| format!("unclosed index in '{segment}'"))?;
                    let index = digits
                        .parse::<usize>()
                        .map_err(|err| format!("bad index in '{segment}': {err}"))?;
                    (key, Some(index))
                }
                None => (segment, None),
            };
            if key.is_empty() {
                return Err("empty path segment".to_owned());
            }
            Ok(PathSegment {
                key: key.to_owned(),
                index,
            })
        })
        .collect()
}

fn assign(target: &mut Value, segments: &[PathSegment], new_value: Value) -> Result<(), String> {
    let Some((segment, rest)) = segments.split_first() else {
        *target = new_value;
        return Ok(());
    };

    if target.is_null() {
        *target = Value::Object(Map::new());
    }
    let map = target
        .as_object_mut()
        .ok_or_else(|| format!("'{}' is inside a non-table value", segment.key))?;
    let entry = map.entry(segment.key.clone()).or_insert(Value::Null);

    let Some(index) = segment.index else {
        return assign(entry, rest, new_value);
    };

    if entry.is_null() {
        *entry = Value::Array(Vec::new());
    }
    let array = entry
        .as_array_mut()
        .ok_or_else(|| format!("'{}' is not a list", segment.key))?;
    // An index may name an existing slot or append exactly one.
    if index == array.len() {
        array.push(Value::Null);
    }
    let len = array.len();
    let slot = array.get_mut(index).ok_or_else(|| {
        format!(
            "index {index} is past the end of '{}' (length {len})",
            segment.key
        )
    })?;
    assign(slot, rest, new_value)
}
