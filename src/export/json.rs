//! JSON export.

use std::path::Path;

use super::{write_file, ExportError};
use crate::models::StudyMaterials;

/// Serialize materials as pretty-printed JSON
pub fn to_json(materials: &StudyMaterials) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(materials)?)
}

/// Parse materials previously written by [`to_json`]
pub fn from_json(json: &str) -> Result<StudyMaterials, ExportError> {
    Ok(serde_json::from_str(json)?)
}

/// Write materials to a JSON file
pub fn export_json(materials: &StudyMaterials, path: &Path) -> Result<(), ExportError> {
    let mut json = to_json(materials)?;
    json.push('\n');
    write_file(path, json.as_bytes())?;
    tracing::info!(path = %path.display(), "Saved JSON");
    Ok(())
}
