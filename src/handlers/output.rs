//! Interpretation of `icinga2 pki` console output.
//!
//! The tool has no machine-readable error channel, so known failures are
//! recognized by the `critical/cli` messages it prints. Those phrases live
//! here and nowhere else.

use crate::error::{PkiError, Result};
use crate::handlers::runner::CommandOutput;
use crate::request::Action;
use tracing::debug;

/// A failure the tool reports through its console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    PermissionDenied,
    CaDirectoryExists,
    TicketSaltMissing,
}

const DIAGNOSTICS: &[(&str, Diagnostic)] = &[
    ("critical/cli: setgroups", Diagnostic::PermissionDenied),
    ("critical/cli: CA directory", Diagnostic::CaDirectoryExists),
    ("critical/cli: Ticket salt", Diagnostic::TicketSaltMissing),
];

impl Diagnostic {
    /// First known diagnostic that `stdout` contains and that `action` can
    /// produce.
    pub fn detect(action: Action, stdout: &str) -> Option<Diagnostic> {
        DIAGNOSTICS
            .iter()
            .filter(|(_, diagnostic)| diagnostic.applies_to(action))
            .find(|(phrase, _)| stdout.contains(phrase))
            .map(|(_, diagnostic)| *diagnostic)
    }

    fn applies_to(self, action: Action) -> bool {
        match self {
            Diagnostic::PermissionDenied => true,
            Diagnostic::CaDirectoryExists => action == Action::NewCa,
            Diagnostic::TicketSaltMissing => action == Action::Ticket,
        }
    }

    fn into_error(self, stdout: &str) -> PkiError {
        let stdout = stdout.to_owned();
        match self {
            Diagnostic::PermissionDenied => PkiError::PermissionDenied { stdout },
            Diagnostic::CaDirectoryExists => PkiError::CaDirectoryExists { stdout },
            Diagnostic::TicketSaltMissing => PkiError::TicketSaltMissing { stdout },
        }
    }
}

/// Maps a finished run to success (returning stdout) or the matching error.
/// Output phrases are checked before the exit code.
pub fn classify(action: Action, output: CommandOutput) -> Result<String> {
    if let Some(diagnostic) = Diagnostic::detect(action, &output.stdout) {
        debug!(%action, ?diagnostic, "recognized failure in output");
        return Err(diagnostic.into_error(&output.stdout));
    }
    if !output.success() {
        return Err(PkiError::CommandFailed {
            action,
            stdout: output.stdout,
        });
    }
    Ok(output.stdout)
}
