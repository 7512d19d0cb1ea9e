use anyhow::{Context, Result};
use mmdbkit::{IpVersion, MmdbBuilder, RecordSize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::cli_utils::{format_bytes, json_to_data_map};

/// Flags of the `build` subcommand
pub struct BuildOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub record_size: Option<String>,
    pub ipv4: bool,
    pub database_type: Option<String>,
    pub description: Option<String>,
    pub desc_lang: String,
}

/// Set file permissions to read-only (0444 on Unix, read-only attribute on Windows)
fn set_readonly(path: &PathBuf) -> Result<()> {
    let mut perms = fs::metadata(path)
        .with_context(|| format!("Failed to get metadata for: {}", path.display()))?
        .permissions();

    #[cfg(unix)]
    {
        perms.set_mode(0o444); // r--r--r--
    }

    #[cfg(not(unix))]
    {
        perms.set_readonly(true);
    }

    fs::set_permissions(path, perms)
        .with_context(|| format!("Failed to set read-only permissions: {}", path.display()))?;

    Ok(())
}

pub fn cmd_build(options: BuildOptions) -> Result<()> {
    let mut builder = MmdbBuilder::new();

    if let Some(bits) = &options.record_size {
        let bits: u64 = bits.parse().context("Record size must be a number")?;
        builder = builder.with_record_size(RecordSize::from_bits(bits)?);
    }
    if options.ipv4 {
        builder = builder.with_ip_version(IpVersion::V4);
    }
    if let Some(db_type) = options.database_type {
        builder = builder.with_database_type(db_type);
    }
    if let Some(desc) = options.description {
        builder = builder.with_description(options.desc_lang, desc);
    }

    // Format: [{"key": "192.168.0.0/16", "data": {...}}]
    let content = fs::read_to_string(&options.input)
        .with_context(|| format!("Failed to read JSON file: {}", options.input.display()))?;
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(&content).context("Failed to parse JSON")?;

    for (i, item) in entries.iter().enumerate() {
        let key = item
            .get("key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing 'key' field at index {}", i))?;

        let data = match item.get("data") {
            Some(data_json) => json_to_data_map(data_json)
                .with_context(|| format!("Invalid 'data' for {}", key))?,
            None => HashMap::new(),
        };

        builder
            .add_ip(key, data)
            .with_context(|| format!("Invalid entry at index {}", i))?;
    }

    let stats = builder.stats();
    tracing::debug!(
        total = stats.total_entries,
        ipv4 = stats.ipv4_entries,
        ipv6 = stats.ipv6_entries,
        "loaded entries"
    );

    let database_bytes = builder.build().context("Failed to build database")?;

    fs::write(&options.output, &database_bytes)
        .with_context(|| format!("Failed to save database: {}", options.output.display()))?;

    // Set file to read-only to protect mmap integrity
    set_readonly(&options.output)?;

    println!(
        "✓ Database built: {} ({} entries, {})",
        options.output.display(),
        stats.total_entries,
        format_bytes(database_bytes.len())
    );

    Ok(())
}
