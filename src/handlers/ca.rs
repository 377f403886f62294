use crate::error::{PkiError, Result};
use crate::handlers::output::classify;
use crate::handlers::runner::{Executor, Invocation};
use crate::outcome::Outcome;
use crate::request::{Action, Request};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Creates a new certificate authority, replacing the old one when forced.
pub fn new_ca(request: &Request, executor: &impl Executor) -> Result<Outcome> {
    if request.force {
        remove_ca_directory(&request.ca_path)?;
    }
    let output = executor.execute(&Invocation::pki(Action::NewCa, "new-ca"))?;
    let stdout = classify(Action::NewCa, output)?;
    info!(ca_path = %request.ca_path.display(), "created CA");
    Ok(Outcome::changed(format!("new CA created at {}", request.ca_path.display())).with_stdout(stdout))
}

/// A symlink is unlinked without touching its target; a real directory is
/// removed recursively.
fn remove_ca_directory(ca_path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(ca_path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(PkiError::io(format!("inspecting {}", ca_path.display()), e)),
    };
    warn!(ca_path = %ca_path.display(), symlink = meta.file_type().is_symlink(), "removing existing CA");
    let removed = if meta.is_dir() {
        fs::remove_dir_all(ca_path)
    } else {
        fs::remove_file(ca_path)
    };
    removed.map_err(|e| PkiError::io(format!("removing {}", ca_path.display()), e))
}
