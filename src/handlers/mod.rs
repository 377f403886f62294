pub mod ca;
pub mod cert;
pub mod output;
pub mod runner;
pub mod ticket;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::Result;
use crate::outcome::Outcome;
use crate::request::{Action, Request};
use runner::{Executor, SubprocessExecutor};
use std::time::Duration;
use tracing::{debug, error, info};

pub const NOT_IMPLEMENTED: &str = "Not implemented. Copy files with a file-transfer tool instead";

/// How to reach the external tool.
#[derive(Debug, Clone)]
pub struct ToolParams<'a> {
    pub binary: &'a str,
    pub timeout: Option<Duration>,
}

/// Runs one request to completion and reports exactly one outcome.
pub fn handle(request: &Request, tool: ToolParams<'_>) -> Outcome {
    let outcome = if request.action.is_noop() {
        Outcome::unchanged(NOT_IMPLEMENTED)
    } else {
        runner::locate(tool.binary)
            .and_then(|program| {
                debug!(program = %program.display(), "using pki tool");
                dispatch(request, &SubprocessExecutor::new(program, tool.timeout))
            })
            .unwrap_or_else(Outcome::from)
    };
    match &outcome {
        Outcome { failed: true, msg, .. } => {
            error!(action = %request.action, msg = msg.as_deref().unwrap_or_default(), "failed")
        }
        Outcome { changed, .. } => info!(action = %request.action, changed, "finished"),
    }
    outcome
}

/// Routes the request to its action handler.
pub fn dispatch(request: &Request, executor: &impl Executor) -> Result<Outcome> {
    match request.action {
        Action::NewCa => ca::new_ca(request, executor),
        Action::NewKey | Action::NewCsr | Action::NewCert => cert::generate(request, executor),
        Action::NewSignedCert => cert::new_signed_cert(request, executor),
        Action::SignCsr => cert::sign_csr(request, executor),
        Action::Ticket => ticket::ticket(request, executor),
        Action::Request | Action::SaveCert => Ok(Outcome::unchanged(NOT_IMPLEMENTED)),
    }
}
