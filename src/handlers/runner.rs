use crate::error::{PkiError, Result};
use crate::request::Action;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Arguments for one `icinga2` run, always starting with `pki <subcommand>`.
/// Values are kept as raw OS strings so paths reach the tool byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    action: Action,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn pki(action: Action, subcommand: &str) -> Self {
        Invocation {
            action,
            args: vec![OsString::from("pki"), OsString::from(subcommand)],
        }
    }

    pub fn flag(mut self, name: &str, value: impl AsRef<OsStr>) -> Self {
        self.args.push(OsString::from(name));
        self.args.push(value.as_ref().to_owned());
        self
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn subcommand(&self) -> &str {
        self.args.get(1).and_then(|arg| arg.to_str()).unwrap_or("")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// What came back from the external tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs invocations of the PKI tool.
pub trait Executor {
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Runs the located binary as a blocking child process.
#[derive(Debug)]
pub struct SubprocessExecutor {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl SubprocessExecutor {
    pub fn new(program: PathBuf, timeout: Option<Duration>) -> Self {
        SubprocessExecutor { program, timeout }
    }
}

impl Executor for SubprocessExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        debug!(program = %self.program.display(), subcommand = invocation.subcommand(), args = %invocation, "running");
        // Captured into files so a chatty child never blocks on a full pipe.
        let mut stdout = tempfile::tempfile().map_err(|e| PkiError::io("capturing stdout", e))?;
        let mut stderr = tempfile::tempfile().map_err(|e| PkiError::io("capturing stderr", e))?;

        let mut child = Command::new(&self.program)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(clone_handle(&stdout)?)
            .stderr(clone_handle(&stderr)?)
            .spawn()
            .map_err(|e| {
                PkiError::io(format!("couldn't start {}", self.program.display()), e)
            })?;

        let status = match self.timeout {
            None => child
                .wait()
                .map_err(|e| PkiError::io("waiting for child", e))?,
            Some(limit) => match wait_with_deadline(&mut child, limit)? {
                Some(status) => status,
                None => {
                    return Err(PkiError::TimedOut {
                        action: invocation.action(),
                        after: limit.into(),
                    });
                }
            },
        };

        let output = CommandOutput {
            code: status.code(),
            stdout: read_back(&mut stdout)?,
            stderr: read_back(&mut stderr)?,
        };
        debug!(code = ?output.code, stderr = %output.stderr.trim_end(), "finished");
        Ok(output)
    }
}

fn clone_handle(file: &File) -> Result<Stdio> {
    Ok(file
        .try_clone()
        .map_err(|e| PkiError::io("duplicating capture file", e))?
        .into())
}

fn read_back(file: &mut File) -> Result<String> {
    let mut buffer = Vec::new();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut buffer))
        .map_err(|e| PkiError::io("reading captured output", e))?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Polls the child until it exits or `limit` elapses. On expiry the child is
/// killed and reaped, and `None` is returned.
fn wait_with_deadline(child: &mut Child, limit: Duration) -> Result<Option<ExitStatus>> {
    let started = Instant::now();
    loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|e| PkiError::io("waiting for child", e))?
        {
            return Ok(Some(status));
        }
        if started.elapsed() >= limit {
            warn!(pid = child.id(), "killing child after timeout");
            if let Err(e) = child.kill() {
                debug!("kill failed, child probably exited: {e}");
            }
            let status = child
                .wait()
                .map_err(|e| PkiError::io("reaping child", e))?;
            return Ok(exited_on_its_own(status));
        }
        std::thread::sleep(POLL_INTERVAL.min(limit));
    }
}

/// A child that exited between the last poll and the kill still counts as
/// finished; only death by signal means it was cut short.
fn exited_on_its_own(status: ExitStatus) -> Option<ExitStatus> {
    status.code().is_some().then_some(status)
}

/// Finds `binary` on the current `PATH`.
pub fn locate(binary: &str) -> Result<PathBuf> {
    locate_in(binary, std::env::var_os("PATH").as_deref())
}

/// Finds `binary` in the given search path. A name containing a slash is
/// taken as a path and only checked for being executable.
pub fn locate_in(binary: &str, search_path: Option<&OsStr>) -> Result<PathBuf> {
    let not_found = || PkiError::BinaryNotFound {
        binary: binary.to_owned(),
    };
    if binary.is_empty() {
        return Err(not_found());
    }
    if binary.contains('/') {
        let candidate = PathBuf::from(binary);
        return is_executable(&candidate).then_some(candidate).ok_or_else(not_found);
    }
    search_path
        .into_iter()
        .flat_map(std::env::split_paths)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(not_found)
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn install(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    fn shell() -> SubprocessExecutor {
        SubprocessExecutor::new(PathBuf::from("/bin/sh"), None)
    }

    fn script(body: &str) -> Invocation {
        Invocation {
            action: Action::NewCa,
            args: vec![OsString::from("-c"), OsString::from(body)],
        }
    }

    #[test]
    fn invocation_builder_appends_flag_pairs() {
        let invocation = Invocation::pki(Action::NewKey, "new-cert")
            .flag("--cn", "foo")
            .flag("--key", Path::new("/srv/ca/foo.key"));
        assert_eq!(invocation.subcommand(), "new-cert");
        assert_eq!(
            invocation.to_string(),
            "pki new-cert --cn foo --key /srv/ca/foo.key"
        );
    }

    #[test]
    fn invocation_keeps_non_utf8_values_intact() {
        use std::os::unix::ffi::OsStrExt;
        let key_file = Path::new(OsStr::from_bytes(b"/srv/ca\xff/foo.key"));
        let invocation = Invocation::pki(Action::NewKey, "new-cert").flag("--key", key_file);
        assert_eq!(invocation.args()[3].as_os_str(), key_file.as_os_str());
    }

    #[test]
    fn subcommand_of_a_short_invocation_is_empty() {
        let invocation = Invocation {
            action: Action::NewCa,
            args: vec![OsString::from("pki")],
        };
        assert_eq!(invocation.subcommand(), "");
        assert_eq!(script("true").subcommand(), "true");
    }

    #[test]
    fn exit_after_kill_deadline_still_counts_as_finished() {
        let normal = Command::new("/bin/sh").args(["-c", "exit 0"]).status().unwrap();
        assert_eq!(exited_on_its_own(normal), Some(normal));
        let killed = Command::new("/bin/sh").args(["-c", "kill -9 $$"]).status().unwrap();
        assert_eq!(exited_on_its_own(killed), None);
    }

    #[test]
    fn locate_searches_each_path_entry_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        install(first.path(), "icinga2", 0o644);
        let expected = install(second.path(), "icinga2", 0o755);

        let search = std::env::join_paths([first.path(), second.path()]).unwrap();
        assert_eq!(locate_in("icinga2", Some(search.as_os_str())).unwrap(), expected);
    }

    #[test]
    fn locate_reports_missing_binary() {
        let empty = tempfile::tempdir().unwrap();
        let err = locate_in("icinga2", Some(empty.path().as_os_str())).unwrap_err();
        assert_eq!(err.to_string(), "icinga2 not found. Icinga2 may not be installed");
        assert!(locate_in("icinga2", None).is_err());
        assert!(locate_in("", Some(empty.path().as_os_str())).is_err());
    }

    #[test]
    fn locate_accepts_explicit_paths() {
        let dir = tempfile::tempdir().unwrap();
        let tool = install(dir.path(), "my-icinga2", 0o755);
        let as_str = tool.to_str().unwrap();
        assert_eq!(locate_in(as_str, None).unwrap(), tool);
        assert!(locate_in(dir.path().to_str().unwrap(), None).is_err());
    }

    #[test]
    fn execute_captures_exit_code_and_both_streams() {
        let output = shell()
            .execute(&script("echo out; echo err >&2; exit 3"))
            .unwrap();
        assert_eq!(output.code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[test]
    fn execute_handles_output_larger_than_a_pipe_buffer() {
        let output = shell()
            .execute(&script("i=0; while [ $i -lt 20000 ]; do echo 0123456789; i=$((i+1)); done"))
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.len(), 20000 * 11);
    }

    #[test]
    fn execute_kills_a_hung_child_after_the_timeout() {
        let executor = SubprocessExecutor::new(
            PathBuf::from("/bin/sh"),
            Some(Duration::from_millis(200)),
        );
        let started = Instant::now();
        let err = executor.execute(&script("sleep 30")).unwrap_err();
        assert!(matches!(err, PkiError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(err.to_string(), "new-ca did not finish within 200ms");
    }

    #[test]
    fn execute_reports_spawn_failures() {
        let executor = SubprocessExecutor::new(PathBuf::from("/nonexistent/icinga2"), None);
        let err = executor.execute(&script("true")).unwrap_err();
        assert!(matches!(err, PkiError::Io { .. }));
    }
}
