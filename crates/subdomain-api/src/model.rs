use crate::Result;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

// region:        --- Models

/// One enumerated subdomain with its resolved address, `ip` holds the
/// literal `"Unknown"` when the name did not resolve.
#[derive(Debug, Serialize)]
pub struct SubdomainRecord {
    pub subdomain: String,
    pub ip: String,
}

#[derive(Debug, Serialize)]
pub struct EnumerationReport {
    pub subdomains: Vec<SubdomainRecord>,
    pub logs: String,
}

// endregion:     --- Models

// region:        --- Exporting utils

pub fn ensure_dir(dir: &Path) -> Result<bool> {
    if dir.is_dir() {
        Ok(false)
    } else {
        fs::create_dir_all(dir)?;
        Ok(true)
    }
}

pub fn export_to_json(result: &EnumerationReport, path: &Path) -> Result<()> {
    let json = to_string_pretty(result)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

// endregion:     --- Exporting utils
