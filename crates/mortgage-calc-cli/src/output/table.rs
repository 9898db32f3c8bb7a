use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use tabled::{builder::Builder, Table};

use mortgage_calc_core::format::format_currency;

/// Key suffixes whose values are dollar amounts.
const MONEY_SUFFIXES: [&str; 12] = [
    "payment",
    "payment_low",
    "payment_high",
    "_total",
    "interest",
    "balance",
    "component",
    "closing_costs",
    "to_close",
    "principal",
    "amount",
    "piti",
];

/// Money fields nested inside these objects are all fees.
const FEE_MAPS: [&str; 2] = ["lender_fees", "third_party_fees"];

/// Format output as tables: scalar fields first, then one table per list
/// (schedule rows, rate quotes, program matches).
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_object(res_map),
        other => println!("{}", other),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut lists: Vec<(&str, &Vec<Value>)> = Vec::new();
    push_fields(&mut builder, &mut lists, "", map, false);
    println!("{}", Table::from(builder));

    for (name, rows) in lists {
        println!("\n{}:", name);
        print_array_table(rows);
    }
}

/// Flatten nested objects into dotted keys; lists of objects are deferred
/// to their own tables.
fn push_fields<'a>(
    builder: &mut Builder,
    lists: &mut Vec<(&'a str, &'a Vec<Value>)>,
    prefix: &str,
    map: &'a Map<String, Value>,
    all_money: bool,
) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(inner) => {
                let fees = FEE_MAPS.contains(&key.as_str());
                push_fields(builder, lists, &name, inner, fees);
            }
            Value::Array(items) if items.first().map_or(false, Value::is_object) => {
                lists.push((key.as_str(), items));
            }
            _ => {
                let money = all_money || is_money_key(key);
                builder.push_record([name, format_value(val, money)]);
            }
        }
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(headers.iter().cloned());

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        map.get(h.as_str())
                            .map(|v| format_value(v, is_money_key(h)))
                            .unwrap_or_default()
                    })
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item, false));
        }
    }
}

fn is_money_key(key: &str) -> bool {
    MONEY_SUFFIXES.iter().any(|s| key.ends_with(s))
}

fn format_value(value: &Value, money: bool) -> String {
    match value {
        Value::String(s) if money => Decimal::from_str(s)
            .map(format_currency)
            .unwrap_or_else(|_| s.clone()),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(|v| format_value(v, money)).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
