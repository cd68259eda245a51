use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::record::SbRecord;

/// Load the remaining-record list for one partition. A missing or empty
/// file means there is nothing to resume from.
pub fn load(path: &Path) -> Result<Option<Vec<SbRecord>>> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(None),
        Ok(bytes) => {
            let records: Vec<SbRecord> = serde_json::from_slice(&bytes)
                .with_context(|| format!("malformed checkpoint {}", path.display()))?;
            Ok(Some(records))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("read checkpoint {}", path.display())),
    }
}

/// Overwrite the checkpoint with the complete remaining list. Written to a
/// temp sibling first and renamed into place, so a crash mid-save leaves
/// the previous checkpoint intact.
pub fn save(path: &Path, records: &[SbRecord]) -> Result<()> {
    let bytes = serde_json::to_vec(records)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes).with_context(|| format!("write checkpoint {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace checkpoint {}", path.display()))?;
    Ok(())
}

// ── Tests ──
