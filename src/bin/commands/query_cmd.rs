use anyhow::{Context, Result};
use mmdbkit::Database;
use serde_json::json;
use std::path::PathBuf;

use crate::cli_utils::{data_value_to_json, format_cidr};

pub fn cmd_query(database: PathBuf, query: String, quiet: bool) -> Result<()> {
    let db = Database::open(&database)
        .with_context(|| format!("Failed to load database: {}", database.display()))?;

    let result = db
        .lookup(&query)
        .with_context(|| format!("Query failed for: {}", query))?;
    let found = result.is_some();

    if quiet {
        // Quiet mode: no output, just exit code
        std::process::exit(if found { 0 } else { 1 });
    }

    // Always an array, empty when nothing matched
    match result {
        Some(result) => {
            let mut data = data_value_to_json(&result.data);
            if let serde_json::Value::Object(ref mut map) = data {
                map.insert(
                    "cidr".to_string(),
                    json!(format_cidr(&query, result.prefix_len)),
                );
                map.insert("prefix_len".to_string(), json!(result.prefix_len));
            }
            println!("{}", serde_json::to_string_pretty(&json!([data]))?);
        }
        None => println!("[]"),
    }

    std::process::exit(if found { 0 } else { 1 });
}
