//! Custom Rhai function files.

use crate::config::config_dir;
use crate::error::{GridcalcError, Result};
use std::path::{Path, PathBuf};

const MAX_FUNCTION_FILE_BYTES: u64 = 1_048_576; // 1 MiB

pub(crate) fn default_functions_path() -> Option<PathBuf> {
    let mut path = config_dir()?;
    path.push("default.rhai");
    Some(path)
}

pub(crate) fn prepend_default_functions_if_present(
    functions: &mut Vec<PathBuf>,
    no_default_functions: bool,
) {
    if no_default_functions {
        return;
    }
    let Some(path) = default_functions_path() else {
        return;
    };
    if path.is_file() {
        functions.insert(0, path);
    }
}

fn read_functions_file(path: &Path) -> Result<String> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_FUNCTION_FILE_BYTES {
        return Err(GridcalcError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "Refusing to read {}: functions file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_FUNCTION_FILE_BYTES
            ),
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Concatenate every functions file, in order. `None` if there are none.
pub(crate) fn load_functions(paths: &[PathBuf]) -> Result<Option<String>> {
    let mut merged: Option<String> = None;
    for path in paths {
        let content = read_functions_file(path)?;
        match &mut merged {
            Some(existing) => {
                existing.push_str("\n\n");
                existing.push_str(&content);
            }
            None => merged = Some(content),
        }
    }
    Ok(merged)
}
