use crate::request::Action;
use std::path::PathBuf;
use thiserror::Error;

/// Every way a single invocation can fail. The `Display` text is what ends up
/// in the `msg` field of the failure outcome.
#[derive(Debug, Error)]
pub enum PkiError {
    #[error("common_name is required for the '{action}' action")]
    MissingCommonName { action: Action },

    #[error("invalid common_name '{0}': must be a single file name not starting with '-'")]
    InvalidCommonName(String),

    #[error("{binary} not found. Icinga2 may not be installed")]
    BinaryNotFound { binary: String },

    #[error("files already exist for common_name '{common_name}'. Use --force to replace")]
    FilesExist { common_name: String },

    #[error("no ca.crt file is present at {}. Try 'new-ca' first", .path.display())]
    CaCertMissing { path: PathBuf },

    #[error("no csr file is present at {}. Try 'new-csr' first", .path.display())]
    CsrMissing { path: PathBuf },

    #[error("certificate already exists for common_name '{common_name}'. Use --force to replace")]
    CertExists { common_name: String },

    #[error("this command must be run as root or the icinga2 service user: {stdout}")]
    PermissionDenied { stdout: String },

    #[error("CA directory already exists. Use --force to replace: {stdout}")]
    CaDirectoryExists { stdout: String },

    #[error("icinga2 needs a ticket salt. Use --salt <SALT>: {stdout}")]
    TicketSaltMissing { stdout: String },

    #[error("couldn't run {action}: {stdout}")]
    CommandFailed { action: Action, stdout: String },

    #[error("{action} did not finish within {after}")]
    TimedOut {
        action: Action,
        after: humantime::Duration,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PkiError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PkiError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PkiError>;
