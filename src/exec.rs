//! Child process execution
//!
//! Commands are argument vectors handed straight to the OS; nothing here ever
//! goes through a shell. Two entry points:
//!
//! - [`run_streaming`] forwards every stdout/stderr line to an [`OutputSink`]
//!   while the child runs.
//! - [`capture`] collects the full output once the child has exited.

use std::fmt;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};

use crate::ui::prelude::*;

/// A program plus its arguments, and optionally bytes to feed on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Shell-quoted rendering for display only.
    pub fn display(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }
}

/// One step of a running child: a line on either stream, or its exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecEvent {
    Stdout(String),
    Stderr(String),
    /// Always the last event. `None` when the child was killed by a signal
    /// or could not be reaped.
    Exited(Option<i32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    pub code: Option<i32>,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "no exit code (terminated by signal)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub outcome: CommandOutcome,
    pub stdout: String,
    pub stderr: String,
}

/// Receives the output of a streamed command.
pub trait OutputSink {
    fn stdout_line(&mut self, line: &str);
    fn stderr_line(&mut self, line: &str);
    fn command_failed(&mut self, spec: &CommandSpec, outcome: &CommandOutcome);
}

/// Forwards child output through [`emit`].
#[derive(Debug, Default)]
pub struct EmitSink;

impl OutputSink for EmitSink {
    fn stdout_line(&mut self, line: &str) {
        emit(Level::Info, "exec.stdout", line, None);
    }

    fn stderr_line(&mut self, line: &str) {
        emit(Level::Warn, "exec.stderr", line, None);
    }

    fn command_failed(&mut self, spec: &CommandSpec, outcome: &CommandOutcome) {
        emit(
            Level::Warn,
            "exec.failed",
            &format!("Command failed with {}", outcome),
            Some(serde_json::json!({
                "command": spec.display(),
                "code": outcome.code,
            })),
        );
    }
}

/// Spawn `spec` and return a channel of its events in arrival order.
///
/// One reader thread per output stream feeds the channel; a third thread
/// writes the stdin payload. After both readers hit EOF the child is reaped
/// and [`ExecEvent::Exited`] is sent.
pub fn stream(spec: &CommandSpec) -> Result<Receiver<ExecEvent>> {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

    emit(
        Level::Debug,
        "exec.spawn",
        &format!("{} {}", char::from(NerdFont::Terminal), spec.display()),
        None,
    );

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning {}", spec.program))?;

    let stdin_writer = match (child.stdin.take(), spec.stdin.clone()) {
        (Some(mut pipe), Some(payload)) => Some(thread::spawn(move || {
            // Dropping the pipe at the end of the closure closes the child's stdin.
            let _ = pipe.write_all(payload.as_bytes());
        })),
        _ => None,
    };

    let stdout = child.stdout.take().context("child stdout was not captured")?;
    let stderr = child.stderr.take().context("child stderr was not captured")?;

    let (tx, rx) = mpsc::channel();
    let out_reader = forward_lines(stdout, tx.clone(), ExecEvent::Stdout);
    let err_reader = forward_lines(stderr, tx.clone(), ExecEvent::Stderr);

    thread::spawn(move || {
        let _ = out_reader.join();
        let _ = err_reader.join();
        if let Some(writer) = stdin_writer {
            let _ = writer.join();
        }
        let code = child.wait().ok().and_then(|status| status.code());
        let _ = tx.send(ExecEvent::Exited(code));
    });

    Ok(rx)
}

fn forward_lines<R>(
    reader: R,
    tx: Sender<ExecEvent>,
    wrap: fn(String) -> ExecEvent,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send(wrap(line)).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Run `spec`, forwarding its output to `sink` as it arrives.
pub fn run_streaming(spec: &CommandSpec, sink: &mut dyn OutputSink) -> Result<CommandOutcome> {
    let events = stream(spec)?;
    let mut outcome = CommandOutcome { code: None };

    for event in events {
        match event {
            ExecEvent::Stdout(line) => sink.stdout_line(&line),
            ExecEvent::Stderr(line) => sink.stderr_line(&line),
            ExecEvent::Exited(code) => outcome.code = code,
        }
    }

    if !outcome.success() {
        sink.command_failed(spec, &outcome);
    }

    Ok(outcome)
}

/// Run `spec` to completion and collect all of its output.
/// A non-zero exit is returned in the outcome, not as an error.
pub fn capture(spec: &CommandSpec) -> Result<CapturedOutput> {
    let mut expression = duct::cmd(spec.program.as_str(), &spec.args)
        .stdout_capture()
        .stderr_capture()
        .unchecked();

    expression = match &spec.stdin {
        Some(input) => expression.stdin_bytes(input.as_bytes().to_vec()),
        None => expression.stdin_null(),
    };

    let output = expression
        .run()
        .with_context(|| format!("running {}", spec.program))?;

    Ok(CapturedOutput {
        outcome: CommandOutcome {
            code: output.status.code(),
        },
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct RecordingSink {
        stdout: Vec<String>,
        stderr: Vec<String>,
        failures: Vec<Option<i32>>,
    }

    impl OutputSink for RecordingSink {
        fn stdout_line(&mut self, line: &str) {
            self.stdout.push(line.to_string());
        }

        fn stderr_line(&mut self, line: &str) {
            self.stderr.push(line.to_string());
        }

        fn command_failed(&mut self, _spec: &CommandSpec, outcome: &CommandOutcome) {
            self.failures.push(outcome.code);
        }
    }

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn test_streams_are_separated() {
        let mut sink = RecordingSink::default();
        let outcome = run_streaming(
            &sh("echo one; echo oops >&2; echo two"),
            &mut sink,
        )
        .unwrap();

        assert!(outcome.success());
        assert_eq!(sink.stdout, vec!["one", "two"]);
        assert_eq!(sink.stderr, vec!["oops"]);
        assert!(sink.failures.is_empty());
    }

    #[test]
    fn test_nonzero_exit_is_reported() {
        let mut sink = RecordingSink::default();
        let outcome = run_streaming(&sh("echo bad >&2; exit 3"), &mut sink).unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.code, Some(3));
        assert_eq!(sink.failures, vec![Some(3)]);
        assert_eq!(sink.stderr, vec!["bad"]);
    }

    #[test]
    fn test_stdin_payload_reaches_child() {
        let mut sink = RecordingSink::default();
        let spec = CommandSpec::new("cat").stdin("alice:hunter2\n");
        let outcome = run_streaming(&spec, &mut sink).unwrap();

        assert!(outcome.success());
        assert_eq!(sink.stdout, vec!["alice:hunter2"]);
    }

    #[test]
    fn test_exit_event_comes_last() {
        let events: Vec<ExecEvent> = stream(&sh("echo a; echo b >&2")).unwrap().into_iter().collect();
        assert_eq!(events.last(), Some(&ExecEvent::Exited(Some(0))));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_lines_arrive_before_exit() {
        let events = stream(&sh("echo first; sleep 2; echo second")).unwrap();
        let start = Instant::now();

        assert_eq!(
            events.recv_timeout(Duration::from_secs(1)),
            Ok(ExecEvent::Stdout("first".into()))
        );
        assert!(start.elapsed() < Duration::from_millis(1500));

        let rest: Vec<ExecEvent> = events.into_iter().collect();
        assert_eq!(
            rest,
            vec![
                ExecEvent::Stdout("second".into()),
                ExecEvent::Exited(Some(0))
            ]
        );
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let mut sink = RecordingSink::default();
        let result = run_streaming(
            &CommandSpec::new("acctctl-definitely-not-a-program"),
            &mut sink,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_capture_collects_everything() {
        let output = capture(&sh("printf 'root\\nalice\\n'; echo warn >&2; exit 2")).unwrap();
        assert_eq!(output.outcome.code, Some(2));
        assert_eq!(output.stdout, "root\nalice\n");
        assert_eq!(output.stderr, "warn\n");
    }

    #[test]
    fn test_display_quotes_arguments() {
        let spec = CommandSpec::new("usermod").args(["-a", "-G", "wheel", "bob; rm -rf /"]);
        assert_eq!(spec.display(), "usermod -a -G wheel 'bob; rm -rf /'");
    }
}
