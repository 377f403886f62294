use crate::error::Result;
use crate::handlers::runner::{CommandOutput, Executor, Invocation};
use crate::request::{Action, Request};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const OUTPUT_FLAGS: [&str; 3] = ["--key", "--csr", "--cert"];

pub(crate) fn request_in(ca_path: &Path, action: Action, common_name: Option<&str>) -> Request {
    Request {
        common_name: common_name.map(str::to_owned),
        ca_path: ca_path.to_path_buf(),
        ..Request::new(action)
    }
}

/// Stands in for `icinga2`: answers each call with the next scripted reply
/// and, like the real tool, writes the files named by `--key`, `--csr` and
/// `--cert` when the reply is a success.
pub(crate) struct ScriptedExecutor {
    replies: RefCell<VecDeque<(i32, String)>>,
    calls: RefCell<Vec<Invocation>>,
    watched: Option<PathBuf>,
    observed: RefCell<Vec<bool>>,
}

impl ScriptedExecutor {
    pub(crate) fn replying(replies: &[(i32, &str)]) -> Self {
        ScriptedExecutor {
            replies: RefCell::new(
                replies
                    .iter()
                    .map(|(code, stdout)| (*code, stdout.to_string()))
                    .collect(),
            ),
            calls: RefCell::new(Vec::new()),
            watched: None,
            observed: RefCell::new(Vec::new()),
        }
    }

    /// Records whether `path` exists at the moment of each call.
    pub(crate) fn observing(mut self, path: &Path) -> Self {
        self.watched = Some(path.to_path_buf());
        self
    }

    /// Each call rendered as a command line.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Invocation::to_string).collect()
    }

    pub(crate) fn invocations(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub(crate) fn observed(&self) -> Vec<bool> {
        self.observed.borrow().clone()
    }
}

impl Executor for ScriptedExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        if let Some(path) = &self.watched {
            self.observed.borrow_mut().push(path.exists());
        }
        let (code, stdout) = self
            .replies
            .borrow_mut()
            .pop_front()
            .expect("unexpected call to icinga2");
        if code == 0 {
            for pair in invocation.args().windows(2) {
                if OUTPUT_FLAGS.iter().any(|flag| pair[0] == *flag) {
                    std::fs::write(&pair[1], pair[0].as_encoded_bytes()).expect("writing fake output");
                }
            }
        }
        Ok(CommandOutput {
            code: Some(code),
            stdout,
            stderr: String::new(),
        })
    }
}
