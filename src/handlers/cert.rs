use crate::error::{PkiError, Result};
use crate::handlers::output::classify;
use crate::handlers::runner::{Executor, Invocation};
use crate::outcome::Outcome;
use crate::request::{Action, CertPaths, Request};
use std::fs;
use tracing::{info, warn};

/// Which files `pki new-cert` should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Artifacts {
    Key,
    KeyAndCsr,
    KeyAndSelfSigned,
}

impl Artifacts {
    fn for_action(action: Action) -> Self {
        match action {
            Action::NewKey => Artifacts::Key,
            Action::NewCert => Artifacts::KeyAndSelfSigned,
            // new-signed-cert generates a CSR here and signs it afterwards.
            _ => Artifacts::KeyAndCsr,
        }
    }
}

/// Generates a key, and a CSR or self-signed certificate depending on the
/// action, for the request's common name.
pub fn generate(request: &Request, executor: &impl Executor) -> Result<Outcome> {
    let common_name = request.common_name()?;
    let paths = request.cert_paths()?;
    remove_files(request, &paths)?;

    // 1. Build the command line for the requested artifacts.
    let invocation = Invocation::pki(request.action, "new-cert")
        .flag("--cn", common_name)
        .flag("--key", &paths.key_file);
    let invocation = match Artifacts::for_action(request.action) {
        Artifacts::Key => invocation,
        Artifacts::KeyAndCsr => invocation.flag("--csr", &paths.csr_file),
        Artifacts::KeyAndSelfSigned => invocation.flag("--cert", &paths.crt_file),
    };

    // 2. Run it and check the result.
    let stdout = classify(request.action, executor.execute(&invocation)?)?;
    info!(common_name, action = %request.action, "generated");
    Ok(Outcome::changed(format!("{} done for common_name '{common_name}'", request.action)).with_stdout(stdout))
}

/// Signs the common name's CSR with the CA certificate.
pub fn sign_csr(request: &Request, executor: &impl Executor) -> Result<Outcome> {
    let common_name = request.common_name()?;
    let paths = request.cert_paths()?;

    let ca_file = request.ca_file();
    if !ca_file.is_file() {
        return Err(PkiError::CaCertMissing { path: ca_file });
    }
    if !paths.csr_file.is_file() {
        return Err(PkiError::CsrMissing {
            path: paths.csr_file,
        });
    }
    if paths.crt_file.is_file() && !request.force {
        return Err(PkiError::CertExists {
            common_name: common_name.to_owned(),
        });
    }

    let invocation = Invocation::pki(request.action, "sign-csr")
        .flag("--csr", &paths.csr_file)
        .flag("--cert", &paths.crt_file);
    let stdout = classify(request.action, executor.execute(&invocation)?)?;
    info!(common_name, crt_file = %paths.crt_file.display(), "signed");
    Ok(Outcome::changed(format!(
        "certificate for '{common_name}' signed to {}",
        paths.crt_file.display()
    ))
    .with_stdout(stdout))
}

/// Key and CSR generation followed by signing. The second stage only runs
/// when the first succeeded; files from a failed signing stay on disk.
pub fn new_signed_cert(request: &Request, executor: &impl Executor) -> Result<Outcome> {
    let generated = generate(request, executor)?;
    let signed = sign_csr(request, executor)?;
    let stdout = [generated.stdout, signed.stdout]
        .into_iter()
        .flatten()
        .collect::<String>();
    Ok(Outcome {
        stdout: Some(stdout),
        ..signed
    })
}

/// Clears existing key/CSR/certificate files for the common name when
/// forced, or refuses to continue when any of them is present.
fn remove_files(request: &Request, paths: &CertPaths) -> Result<()> {
    if !paths.iter().any(|path| path.is_file()) {
        return Ok(());
    }
    if !request.force {
        return Err(PkiError::FilesExist {
            common_name: request.common_name()?.to_owned(),
        });
    }
    for path in paths.iter().filter(|path| path.is_file()) {
        warn!(path = %path.display(), "removing existing file");
        fs::remove_file(path).map_err(|e| PkiError::io(format!("removing {}", path.display()), e))?;
    }
    Ok(())
}
