use serde_json::{Map, Value};
use std::io;

/// Lists exported row-per-record, in preference order.
const ROW_LISTS: [&str; 4] = ["schedule", "quotes", "matches", "rejections"];

/// Write output as CSV to stdout. A response carrying a schedule or quote
/// list is exported one row per entry; anything else as `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            let result = match map.get("result") {
                Some(Value::Object(result)) => result,
                _ => map,
            };
            let rows = ROW_LISTS.iter().find_map(|name| match result.get(*name) {
                Some(Value::Array(items)) if !items.is_empty() => Some(items),
                _ => None,
            });
            match rows {
                Some(items) => write_array_csv(&mut wtr, items),
                None => write_pairs(&mut wtr, "", result),
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_pairs(wtr: &mut csv::Writer<io::StdoutLock<'_>>, prefix: &str, map: &Map<String, Value>) {
    if prefix.is_empty() {
        let _ = wtr.write_record(["field", "value"]);
    }
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(inner) => write_pairs(wtr, &name, inner),
            _ => {
                let _ = wtr.write_record([name.as_str(), &format_csv_value(val)]);
            }
        }
    }
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
