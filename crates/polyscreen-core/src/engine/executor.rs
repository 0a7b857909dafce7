use super::error::StageError;
use super::transcript::Transcript;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, trace};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_TAIL_CHARS: usize = 400;

/// A command-line invocation of an external engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
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
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs external engine invocations inside a working directory.
///
/// Implementations block until the invocation completes and return its standard
/// output. A nonzero exit, a launch failure or an expired time limit is a
/// [`StageError`].
pub trait Executor: Send + Sync {
    fn execute(&self, invocation: &Invocation, workdir: &Path) -> Result<Transcript, StageError>;
}

/// Executes invocations as child processes, optionally bounded by a time limit.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

fn drain<R: Read + Send + 'static>(mut source: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = source.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn tail(text: &str, max_chars: usize) -> &str {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed;
    }
    let start = trimmed
        .char_indices()
        .nth(count - max_chars)
        .map(|(b, _)| b)
        .unwrap_or(0);
    &trimmed[start..]
}

impl Executor for ProcessExecutor {
    #[instrument(level = "debug", skip_all, fields(command = %invocation))]
    fn execute(&self, invocation: &Invocation, workdir: &Path) -> Result<Transcript, StageError> {
        debug!(workdir = %workdir.display(), "Launching external engine.");
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| StageError::Launch {
                program: invocation.program.clone(),
                source,
            })?;

        // Both pipes are drained concurrently so a chatty engine cannot block on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(StageError::Timeout {
                        command: invocation.to_string(),
                        seconds: limit.as_secs(),
                    });
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
        let stderr = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
        trace!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            stdout_bytes = stdout.len(),
            "External engine finished."
        );

        if !status.success() {
            let detail = tail(&stderr, STDERR_TAIL_CHARS);
            return Err(StageError::ExitStatus {
                command: invocation.to_string(),
                status: status.to_string(),
                detail: if detail.is_empty() {
                    String::new()
                } else {
                    format!(": {}", detail)
                },
            });
        }

        Ok(Transcript::new(stdout))
    }
}
