use crate::error::{PkiError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_CA_PATH: &str = "/var/lib/icinga2/ca";
pub const CA_CERT_FILE: &str = "ca.crt";

/// The `icinga2 pki` workflow to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Action {
    NewCa,
    NewKey,
    NewCsr,
    NewCert,
    NewSignedCert,
    Request,
    SaveCert,
    SignCsr,
    Ticket,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::NewCa => "new-ca",
            Action::NewKey => "new-key",
            Action::NewCsr => "new-csr",
            Action::NewCert => "new-cert",
            Action::NewSignedCert => "new-signed-cert",
            Action::Request => "request",
            Action::SaveCert => "save-cert",
            Action::SignCsr => "sign-csr",
            Action::Ticket => "ticket",
        }
    }

    /// Actions that are accepted but do nothing.
    pub fn is_noop(&self) -> bool {
        matches!(self, Action::Request | Action::SaveCert)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized request. Built once in `main` and only ever borrowed.
#[derive(Debug, Clone)]
pub struct Request {
    pub action: Action,
    pub common_name: Option<String>,
    pub force: bool,
    pub ca_path: PathBuf,
    pub salt: Option<String>,
}

/// Files belonging to one common name inside the CA directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertPaths {
    pub key_file: PathBuf,
    pub csr_file: PathBuf,
    pub crt_file: PathBuf,
}

impl CertPaths {
    pub fn derive(ca_path: &Path, common_name: &str) -> Self {
        CertPaths {
            key_file: ca_path.join(format!("{common_name}.key")),
            csr_file: ca_path.join(format!("{common_name}.csr")),
            crt_file: ca_path.join(format!("{common_name}.crt")),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [
            self.key_file.as_path(),
            self.csr_file.as_path(),
            self.crt_file.as_path(),
        ]
        .into_iter()
    }
}

impl Request {
    pub fn new(action: Action) -> Self {
        Request {
            action,
            common_name: None,
            force: false,
            ca_path: PathBuf::from(DEFAULT_CA_PATH),
            salt: None,
        }
    }

    pub fn ca_file(&self) -> PathBuf {
        self.ca_path.join(CA_CERT_FILE)
    }

    /// Returns the common name, failing when it is absent or empty, or when it
    /// is not a plain file name icinga2 would accept as a `--cn` value.
    pub fn common_name(&self) -> Result<&str> {
        let name = self
            .common_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or(PkiError::MissingCommonName {
                action: self.action,
            })?;
        if name == "." || name == ".." || name.starts_with('-') || name.contains(['/', '\0']) {
            return Err(PkiError::InvalidCommonName(name.to_owned()));
        }
        Ok(name)
    }

    pub fn cert_paths(&self) -> Result<CertPaths> {
        Ok(CertPaths::derive(&self.ca_path, self.common_name()?))
    }

    /// Salt to pass along, ignoring an empty value.
    pub fn salt(&self) -> Option<&str> {
        self.salt.as_deref().filter(|salt| !salt.is_empty())
    }
}
