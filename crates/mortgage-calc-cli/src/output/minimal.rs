use serde_json::{Map, Value};

/// Headline figure of each command, in lookup order.
const PRIORITY_KEYS: [&str; 6] = [
    "total_closing_costs",
    "monthly_payment",
    "lowest_payment_id",
    "estimated_monthly_piti",
    "total_interest",
    "cash_to_close",
];

/// Print just the headline answer of a response.
///
/// Looks for a well-known figure in the result (or its `breakdown`), lists
/// matched program names for a program screen, and otherwise falls back to
/// the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        for key in PRIORITY_KEYS {
            if let Some(val) = lookup(map, key) {
                println!("{}", format_minimal(val));
                return;
            }
        }

        if let Some(Value::Array(matches)) = map.get("matches") {
            let names: Vec<&str> = matches
                .iter()
                .filter_map(|m| m.pointer("/program/name").and_then(Value::as_str))
                .collect();
            println!("{}", names.join(", "));
            return;
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn lookup<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key)
        .or_else(|| map.get("breakdown").and_then(|b| b.get(key)))
        .filter(|v| !v.is_null())
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
