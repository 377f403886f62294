use crate::error::Result;
use crate::handlers::output::classify;
use crate::handlers::runner::{Executor, Invocation};
use crate::outcome::Outcome;
use crate::request::{Action, Request};
use tracing::info;

/// Issues an enrollment ticket for the common name.
pub fn ticket(request: &Request, executor: &impl Executor) -> Result<Outcome> {
    let common_name = request.common_name()?;
    let mut invocation = Invocation::pki(Action::Ticket, "ticket").flag("--cn", common_name);
    if let Some(salt) = request.salt() {
        invocation = invocation.flag("--salt", salt);
    }
    let stdout = classify(Action::Ticket, executor.execute(&invocation)?)?;
    info!(common_name, "issued ticket");
    Ok(Outcome::ticket(stdout.trim_end()))
}
