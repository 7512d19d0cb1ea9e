use anyhow::{Context, Result};
use mmdbkit::Database;
use serde_json::json;
use std::path::PathBuf;

use crate::cli_utils::{format_bytes, format_unix_timestamp};

pub fn cmd_inspect(database: PathBuf, json_output: bool) -> Result<()> {
    let db = Database::open(&database)
        .with_context(|| format!("Failed to load database: {}", database.display()))?;

    let envelope = db.envelope();
    let metadata = db.metadata();
    let tree_bytes = envelope.tree().len();
    let data_bytes = envelope.data().len();
    let metadata_bytes = envelope.metadata_bytes().len();

    if json_output {
        let output = json!({
            "file": database.display().to_string(),
            "size": db.len(),
            "regions": {
                "tree": tree_bytes,
                "data": data_bytes,
                "metadata": metadata_bytes,
            },
            "metadata": metadata,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Database: {}", database.display());
    println!("Size:     {}", format_bytes(db.len()));
    println!();
    println!("Regions:");
    println!("  Search tree:     {}", format_bytes(tree_bytes));
    println!("  Data section:    {}", format_bytes(data_bytes));
    println!("  Metadata:        {}", format_bytes(metadata_bytes));
    println!();
    println!("Metadata:");
    println!("  Database type:   {}", metadata.database_type);
    if !metadata.description.is_empty() {
        println!("  Description:");
        for (lang, text) in &metadata.description {
            println!("    {}: {}", lang, text);
        }
    }
    if !metadata.languages.is_empty() {
        println!("  Languages:       {}", metadata.languages.join(", "));
    }
    println!(
        "  Build time:      {} ({})",
        format_unix_timestamp(metadata.build_epoch),
        metadata.build_epoch
    );
    println!(
        "  Format version:  {}.{}",
        metadata.binary_format_major_version, metadata.binary_format_minor_version
    );
    println!("  IP version:      IPv{}", metadata.ip_version.as_u16());
    println!("  Node count:      {}", metadata.node_count);
    println!("  Record size:     {} bits", metadata.record_size.bits());

    Ok(())
}
