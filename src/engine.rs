// src/engine.rs

//! Build engine invocation.
//!
//! The engine is an external, containerized build tool (Docker with
//! BuildKit) driven entirely over pipes: the input archive goes to its
//! stdin, the output archive is captured from its stdout, and its stderr
//! streams to the caller's diagnostic sink verbatim. The invocation is
//! cancellable through a shared token polled while waiting on the child.

use crate::config::RunConfig;
use crate::error::{Error, Result};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

/// Executable resolved from `PATH` when no explicit engine is configured
pub const DEFAULT_ENGINE: &str = "docker";

/// Environment flag forcing the engine's BuildKit output mode
const BUILDKIT_VAR: (&str, &str) = ("DOCKER_BUILDKIT", "1");

/// Poll interval while waiting on the engine subprocess
const WAIT_POLL: Duration = Duration::from_millis(100);

/// Cooperative cancellation flag shared between the caller and a running
/// invocation. Cloning hands out another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; a running engine is killed at the next poll.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A located build engine executable
#[derive(Debug)]
pub struct Engine {
    exe: PathBuf,
}

impl Engine {
    /// Locate the engine executable.
    ///
    /// Runs before anything else in the pipeline so a missing engine is
    /// reported without touching any file.
    pub fn locate(config: &RunConfig) -> Result<Self> {
        let exe = match &config.engine {
            Some(path) if path.is_file() => path.clone(),
            Some(_) => return Err(Error::EngineMissing),
            None => which::which(DEFAULT_ENGINE).map_err(|_| Error::EngineMissing)?,
        };
        debug!(exe = %exe.display(), "located build engine");
        Ok(Self { exe })
    }

    /// Run `build --output=- -` with `input` piped to stdin.
    ///
    /// Returns the bytes the engine wrote to stdout: the output archive.
    /// Exit status 1 is the engine's "build rejected" signature and maps
    /// to [`Error::BuildFailed`]; any other failure status is reported as
    /// an abnormal termination.
    pub fn build(
        &self,
        cancel: &CancelToken,
        input: &[u8],
        build_args: &[String],
        diag: &mut (dyn Write + Send),
    ) -> Result<Vec<u8>> {
        let mut command = Command::new(&self.exe);
        command.arg("build").arg("--output=-");
        for arg in build_args {
            command.arg(format!("--build-arg={arg}"));
        }
        command.arg("-");
        command.env(BUILDKIT_VAR.0, BUILDKIT_VAR.1);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(exe = %self.exe.display(), build_args = build_args.len(), "invoking build engine");
        let mut child = command.spawn()?;
        let mut stdin = child.stdin.take().expect("stdin is piped");
        let mut stdout = child.stdout.take().expect("stdout is piped");
        let mut stderr = child.stderr.take().expect("stderr is piped");

        let (status, captured) = thread::scope(|scope| {
            // The engine may exit before draining its stdin; that shows
            // up in its exit status, not as a pipe error here.
            scope.spawn(move || {
                if let Err(err) = stdin.write_all(input) {
                    debug!(error = %err, "engine closed stdin early");
                }
            });
            scope.spawn(move || {
                let _ = io::copy(&mut stderr, diag);
            });
            let collector = scope.spawn(move || {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).map(|_| buf)
            });

            let status = loop {
                if cancel.is_cancelled() {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::Cancelled);
                }
                match child.wait_timeout(WAIT_POLL)? {
                    Some(status) => break status,
                    None => continue,
                }
            };

            let captured = collector
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdout collector panicked")))?;
            Ok((status, captured))
        })?;

        if status.success() {
            debug!(bytes = captured.len(), "captured engine output archive");
            Ok(captured)
        } else if status.code() == Some(1) {
            Err(Error::BuildFailed)
        } else {
            Err(Error::EngineTerminated { status })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("engine.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o700);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn engine_for(path: &Path) -> Engine {
        Engine::locate(&RunConfig::default().with_engine(path)).unwrap()
    }

    #[test]
    fn test_locate_missing_engine() {
        let err = Engine::locate(&RunConfig::default().with_engine("/nonexistent/docker"))
            .unwrap_err();
        assert!(matches!(err, Error::EngineMissing));
    }

    #[test]
    fn test_build_captures_stdout() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_for(&script(tmp.path(), "cat >/dev/null\nprintf output-bytes"));

        let mut diag = Vec::new();
        let out = engine
            .build(&CancelToken::new(), b"input", &[], &mut diag)
            .unwrap();
        assert_eq!(out, b"output-bytes");
    }

    #[test]
    fn test_stderr_streams_to_diagnostic_sink() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_for(&script(
            tmp.path(),
            "cat >/dev/null\necho progress line >&2",
        ));

        let mut diag = Vec::new();
        engine
            .build(&CancelToken::new(), b"", &[], &mut diag)
            .unwrap();
        assert_eq!(String::from_utf8(diag).unwrap(), "progress line\n");
    }

    #[test]
    fn test_exit_one_is_a_build_failure() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_for(&script(tmp.path(), "cat >/dev/null\nexit 1"));

        let mut diag = Vec::new();
        let err = engine
            .build(&CancelToken::new(), b"", &[], &mut diag)
            .unwrap_err();
        assert!(matches!(err, Error::BuildFailed));
    }

    #[test]
    fn test_other_exit_codes_are_not_build_failures() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_for(&script(tmp.path(), "cat >/dev/null\nexit 3"));

        let mut diag = Vec::new();
        let err = engine
            .build(&CancelToken::new(), b"", &[], &mut diag)
            .unwrap_err();
        assert!(matches!(err, Error::EngineTerminated { .. }));
    }

    #[test]
    fn test_cancellation_kills_the_engine() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_for(&script(tmp.path(), "cat >/dev/null\nexec sleep 30"));

        let cancel = CancelToken::new();
        cancel.cancel();
        let mut diag = Vec::new();
        let started = std::time::Instant::now();
        let err = engine.build(&cancel, b"", &[], &mut diag).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_build_args_are_forwarded() {
        let tmp = TempDir::new().unwrap();
        // echo every argument back on stdout, one per line
        let engine = engine_for(&script(
            tmp.path(),
            r#"cat >/dev/null
for a in "$@"; do echo "$a"; done"#,
        ));

        let mut diag = Vec::new();
        let out = engine
            .build(
                &CancelToken::new(),
                b"",
                &["GOFMT_IMAGE=hello-world".to_string()],
                &mut diag,
            )
            .unwrap();
        let args = String::from_utf8(out).unwrap();
        assert_eq!(
            args,
            "build\n--output=-\n--build-arg=GOFMT_IMAGE=hello-world\n-\n"
        );
    }
}
