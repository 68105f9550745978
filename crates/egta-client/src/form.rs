use serde_json::Value;

/// Flattens nested parameters into the `outer[inner]` pairs the service's
/// form parser expects. `null` entries are dropped and booleans become `1`/`0`.
pub(crate) fn flatten(params: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Value::Object(map) = params {
        for (key, value) in map {
            push(&mut pairs, key.clone(), value);
        }
    }
    pairs
}

fn push(pairs: &mut Vec<(String, String)>, key: String, value: &Value) {
    match value {
        Value::Object(map) => {
            for (inner, value) in map {
                push(pairs, format!("{key}[{inner}]"), value);
            }
        }
        Value::Null => {}
        Value::Bool(flag) => pairs.push((key, if *flag { "1" } else { "0" }.to_string())),
        Value::String(text) => pairs.push((key, text.clone())),
        other => pairs.push((key, other.to_string())),
    }
}
