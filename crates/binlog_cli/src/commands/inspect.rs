//! Inspect command implementation.

use super::CommandError;
use binlog_core::{LogFileInfo, LOG_MAGIC};
use serde::Serialize;
use std::path::Path;

/// Log file inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Log file path.
    pub path: String,
    /// Magic bytes, as text.
    pub magic: String,
    /// Header format version.
    pub version: u16,
    /// Raw flag bits.
    pub flags: u16,
    /// Whether the file is still marked in use.
    pub in_use: bool,
    /// Committed length recorded in the header.
    pub committed_len: u64,
    /// Physical file size in bytes.
    pub file_len: u64,
    /// Bytes past the committed length (only known for clean files).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_bytes: Option<u64>,
}

impl InspectResult {
    /// Reads the log file at `path`.
    pub fn collect(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let info = LogFileInfo::read_from(path)?;
        Ok(Self {
            path: path.display().to_string(),
            magic: String::from_utf8_lossy(&LOG_MAGIC).into_owned(),
            version: info.header.version,
            flags: info.header.flags,
            in_use: info.header.is_in_use(),
            committed_len: info.header.committed_len,
            file_len: info.file_len,
            trailing_bytes: info.trailing_bytes(),
        })
    }
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !matches!(format, "text" | "json") {
        return Err(CommandError::UnknownFormat(format.to_string()).into());
    }
    if !path.exists() {
        return Err(format!("No log file found at {:?}", path).into());
    }

    let result = InspectResult::collect(path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Log File: {}", result.path);
    println!();
    println!("Header:");
    println!("  Magic:         {}", result.magic);
    println!("  Version:       {}", result.version);
    println!("  Flags:         {:#06x}", result.flags);
    println!("  Committed:     {} bytes", result.committed_len);
    println!();
    println!("File size:       {} bytes", result.file_len);

    if result.in_use {
        println!();
        println!("⚠ File is marked in use: it is open elsewhere or was not closed cleanly");
    } else if let Some(trailing) = result.trailing_bytes.filter(|&n| n > 0) {
        println!();
        println!("⚠ {trailing} bytes past the committed length");
    } else {
        println!();
        println!("✓ Closed cleanly");
    }
}
