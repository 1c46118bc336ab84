use std::ffi::OsStr;
use std::io::{Error, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::cmd::command::CommandError::{ExecutionError, ExitStatusError, TimeoutError};

use itertools::Itertools;
use timeout_readwrite::TimeoutReader;

const EXIT_POLLING_INTERVAL: Duration = Duration::from_millis(100);
const STDOUT_READ_TIMEOUT: Duration = Duration::from_secs(1);
const READ_CHUNK_SIZE: usize = 8192;

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("Error while executing command")]
    ExecutionError(#[from] Error),

    #[error("Command terminated with a non success exit status code: {status}")]
    ExitStatusError { status: ExitStatus, output: CommandOutput },

    /// output: what the command printed before being killed.
    #[error("Command killed due to timeout: {message}")]
    TimeoutError {
        message: String,
        timeout: Duration,
        output: CommandOutput,
    },
}

#[derive(Debug, Clone)]
pub enum AbortReason {
    Timeout(Duration),
}

pub struct CommandKiller<'a> {
    should_abort: Box<dyn Fn() -> Option<AbortReason> + 'a>,
}

impl<'a> CommandKiller<'a> {
    pub fn never() -> CommandKiller<'a> {
        CommandKiller {
            should_abort: Box::new(|| None),
        }
    }

    pub fn from_timeout(timeout: Duration) -> CommandKiller<'a> {
        let now = Instant::now();
        CommandKiller {
            should_abort: Box::new(move || {
                if now.elapsed() >= timeout {
                    return Some(AbortReason::Timeout(timeout));
                }

                None
            }),
        }
    }

    pub fn should_abort(&self) -> Option<AbortReason> {
        (self.should_abort)()
    }
}

/// Everything a command printed, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stderr first since it holds the diagnostic, then stdout.
    pub fn diagnostic(&self) -> String {
        match (self.stderr.trim().is_empty(), self.stdout.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stderr, self.stdout),
            (false, true) => self.stderr.clone(),
            (true, _) => self.stdout.clone(),
        }
    }
}

/// One output pipe of a child, read through a `TimeoutReader` so the abort notifier is checked between reads.
struct OutputStream<R> {
    reader: R,
    buffer: Vec<u8>,
    closed: bool,
}

impl<R: Read> OutputStream<R> {
    fn new(reader: R) -> OutputStream<R> {
        OutputStream {
            reader,
            buffer: Vec::new(),
            closed: false,
        }
    }

    /// Reads until the pipe is closed or stays idle for the reader timeout.
    /// Returns early with the reason when the command must be aborted.
    fn read_available(&mut self, abort_notifier: &CommandKiller) -> Option<AbortReason> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        while !self.closed {
            match self.reader.read(&mut chunk) {
                Ok(0) => self.closed = true,
                Ok(read) => self.buffer.extend_from_slice(&chunk[..read]),
                Err(ref err) if err.kind() == ErrorKind::TimedOut => return abort_notifier.should_abort(),
                Err(ref err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    error!("Error while reading command output: {:?}", err);
                    self.closed = true;
                }
            }

            if let Some(reason) = abort_notifier.should_abort() {
                return Some(reason);
            }
        }

        None
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }
}

pub struct ToolCommand {
    command: Command,
}

impl ToolCommand {
    pub fn new<P: AsRef<Path>>(binary: P, args: &[&str], envs: &[(&str, &str)]) -> ToolCommand {
        let mut command = Command::new(binary.as_ref().as_os_str());
        command.args(args);

        envs.iter().for_each(|(k, v)| {
            command.env(k, v);
        });

        ToolCommand { command }
    }

    pub fn set_current_dir<P: AsRef<Path>>(&mut self, root_dir: P) {
        self.command.current_dir(root_dir);
    }

    fn kill(cmd_handle: &mut Child) {
        let _ = cmd_handle
            .kill() //Fire
            .map(|_| cmd_handle.wait())
            .map_err(|err| error!("Cannot kill process {:?} {}", cmd_handle, err));
    }

    fn abort(&self, cmd_handle: &mut Child, reason: AbortReason, output: CommandOutput) -> CommandError {
        let AbortReason::Timeout(timeout) = reason;
        let message = format!(
            "Killing process {:?} due to timeout {}s reached",
            self.command,
            timeout.as_secs()
        );
        warn!("{}", message);
        Self::kill(cmd_handle);

        TimeoutError {
            message,
            timeout,
            output,
        }
    }

    pub fn exec(&mut self) -> Result<CommandOutput, CommandError> {
        self.exec_with_abort(&CommandKiller::never())
    }

    pub fn exec_with_abort(&mut self, abort_notifier: &CommandKiller) -> Result<CommandOutput, CommandError> {
        info!("command: {:?}", self.command);
        let mut cmd_handle = self
            .command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExecutionError)?;

        // Read stdout/stderr until both are closed or the timeout is reached
        let stdout = cmd_handle
            .stdout
            .take()
            .ok_or_else(|| ExecutionError(Error::new(ErrorKind::BrokenPipe, "Cannot get stdout for command")))?;
        let mut stdout = OutputStream::new(TimeoutReader::new(stdout, STDOUT_READ_TIMEOUT));
        let stderr = cmd_handle
            .stderr
            .take()
            .ok_or_else(|| ExecutionError(Error::new(ErrorKind::BrokenPipe, "Cannot get stderr for command")))?;
        // short timeout on stderr, it is mostly silent
        let mut stderr = OutputStream::new(TimeoutReader::new(stderr, EXIT_POLLING_INTERVAL));

        let mut aborted = None;
        while aborted.is_none() && !(stdout.closed && stderr.closed) {
            // stderr is read even when stdout asks to abort, it holds the diagnostic
            let stdout_aborted = stdout.read_available(abort_notifier);
            let stderr_aborted = stderr.read_available(abort_notifier);
            aborted = stdout_aborted.or(stderr_aborted);
        }

        let output = CommandOutput {
            stdout: stdout.text(),
            stderr: stderr.text(),
        };
        output.stderr.lines().for_each(|line| debug!("{}", line));

        // A descendant may keep the pipes open after the command itself exited
        if let Some(reason) = aborted {
            return Err(self.abort(&mut cmd_handle, reason, output));
        }

        // Wait for the process to exit before reaching the timeout
        // If not, we just kill it
        let exit_status;
        loop {
            match cmd_handle.try_wait() {
                Ok(Some(status)) => {
                    exit_status = status;
                    break;
                }
                Ok(None) => {
                    if let Some(reason) = abort_notifier.should_abort() {
                        return Err(self.abort(&mut cmd_handle, reason, output));
                    }
                }
                Err(err) => return Err(ExecutionError(err)),
            };

            std::thread::sleep(EXIT_POLLING_INTERVAL);
        }

        if !exit_status.success() {
            debug!(
                "command: {:?} terminated with error exist status {:?}",
                self.command, exit_status
            );
            return Err(ExitStatusError {
                status: exit_status,
                output,
            });
        }

        Ok(output)
    }
}

pub fn does_binary_exist<S>(binary: S) -> bool
where
    S: AsRef<OsStr>,
{
    Command::new(binary)
        .stdout(Stdio::null())
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|mut child| child.wait())
        .is_ok()
}

pub fn command_to_string<P>(binary: P, args: &[&str], envs: &[(&str, &str)]) -> String
where
    P: AsRef<Path>,
{
    let command = format!("{} {}", binary.as_ref().display(), args.join(" "));
    match envs.is_empty() {
        true => command,
        false => format!("{} {}", envs.iter().map(|(k, v)| format!("{}={}", k, v)).join(" "), command),
    }
}
