//! Side-channel output for downstream pipeline steps
//!
//! CI runners expose a file (e.g. `$GITHUB_OUTPUT`) where a step appends
//! `key=value` lines that later steps can read.

use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};

/// Append a single `key=value` line to the output file
pub fn append_output(path: &Path, key: &str, value: &str) -> Result<()> {
    if key.is_empty() || key.contains('=') || key.contains('\n') {
        return Err(Error::General(format!("Invalid output key: {key:?}")));
    }
    if value.contains('\n') {
        return Err(Error::General(format!(
            "Output value for {key} spans multiple lines"
        )));
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{key}={value}")?;

    tracing::info!(path = %path.display(), key, value, "Wrote step output");
    Ok(())
}
