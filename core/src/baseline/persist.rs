//! Baseline persistence: one JSON document per deployment, loaded at
//! startup and saved write-then-rename so a crash never leaves a partial
//! file behind.

use std::path::Path;

use crate::baseline::model::Baseline;
use crate::errors::BaselineError;

/// Load the persisted baseline. Missing fields in an old document are
/// filled from serde defaults, so forward-compatible additions are safe.
pub fn load(path: &Path) -> Result<Baseline, BaselineError> {
    let raw = std::fs::read_to_string(path).map_err(BaselineError::Io)?;
    serde_json::from_str(&raw).map_err(BaselineError::Decode)
}

/// Load, falling back to defaults on a missing or unreadable file. Learned
/// state is worth losing rather than refusing to start.
pub fn load_or_default(path: &Path) -> Baseline {
    match load(path) {
        Ok(baseline) => {
            tracing::info!(
                target: "toolwatch.baseline",
                path = %path.display(),
                learned = baseline.learned,
                windows = baseline.windows.len(),
                "baseline loaded"
            );
            baseline
        }
        Err(BaselineError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Baseline::default()
        }
        Err(e) => {
            tracing::warn!(
                target: "toolwatch.baseline",
                path = %path.display(),
                error = %e,
                "baseline unreadable, starting from defaults"
            );
            Baseline::default()
        }
    }
}

pub fn save(path: &Path, baseline: &Baseline) -> Result<(), BaselineError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(BaselineError::Io)?;
    }

    let encoded = serde_json::to_vec_pretty(baseline).map_err(BaselineError::Encode)?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &encoded).map_err(BaselineError::Io)?;
    std::fs::rename(&tmp, path).map_err(BaselineError::Io)?;
    Ok(())
}
