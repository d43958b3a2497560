//! The external model compiler.
//!
//! The harness treats OpenSCAD as an opaque process: it gets a source path and
//! an output path, and either exits 0 having written the artifact or fails.
//! Waiting is bounded by an optional timeout; a child that overruns it is
//! killed and reported as [`HarnessError::CompilerTimeout`]. On Unix the
//! child leads its own process group and the whole group is killed, so
//! processes started by a wrapper script cannot outlive the case.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::errors::HarnessError;

/// Interval between exit checks while waiting on a child with a timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Something that turns a source file into an artifact at `output`.
pub trait Compiler {
    fn compile(&self, source: &Path, output: &Path) -> Result<(), HarnessError>;
}

/// OpenSCAD invoked as a child process.
#[derive(Debug, Clone)]
pub struct OpenScad {
    pub program: String,
    pub baseline_args: Vec<String>,
    pub output_arg: String,
    pub timeout: Option<Duration>,
}

impl OpenScad {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            program: config.compiler.clone(),
            baseline_args: config.baseline_args.clone(),
            output_arg: config.output_arg.clone(),
            timeout: config.timeout(),
        }
    }

    /// Arguments passed to the program, in order.
    pub fn arguments(&self, source: &Path, output: &Path) -> Vec<String> {
        let mut args = self.baseline_args.clone();
        args.push(self.output_arg.clone());
        args.push(output.display().to_string());
        args.push(source.display().to_string());
        args
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, HarnessError> {
        let Some(timeout) = self.timeout else {
            return child
                .wait()
                .map_err(|e| HarnessError::io(&self.program, e));
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|e| HarnessError::io(&self.program, e))?
            {
                return Ok(status);
            }
            if started.elapsed() >= timeout {
                // the child may have exited between the checks; either way reap it
                kill_tree(child);
                let _ = child.wait();
                return Err(HarnessError::CompilerTimeout {
                    program: self.program.clone(),
                    timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for OpenScad {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

impl Compiler for OpenScad {
    fn compile(&self, source: &Path, output: &Path) -> Result<(), HarnessError> {
        let args = self.arguments(source, output);
        info!(program = %self.program, ?args, "running compiler");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command
            .spawn()
            .map_err(|source| HarnessError::CompilerSpawn {
                program: self.program.clone(),
                source,
            })?;

        // drain both pipes so a chatty child cannot block on a full buffer
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        // on timeout the reader threads are left detached until the killed group closes the pipes
        let status = self.wait(&mut child)?;
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        debug!(program = %self.program, %status, "compiler finished");
        if !status.success() {
            return Err(HarnessError::Compiler {
                program: self.program.clone(),
                status: status.to_string(),
                stdout,
                stderr,
            });
        }
        Ok(())
    }
}

/// Kills the child's process group, falling back to the child alone.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    let script = format!("kill -KILL -{}", child.id());
    let killed = Command::new("sh")
        .args(["-c", script.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false);
    if !killed {
        tracing::warn!(pid = child.id(), "could not kill process group, killing the child only");
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
