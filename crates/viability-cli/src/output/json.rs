use serde_json::Value;

/// Pretty-print an analysis envelope (or bare result) as JSON. This is the
/// default format and the only lossless one: Decimal fields stay strings.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}
