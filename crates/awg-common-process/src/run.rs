// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{trace, warn};

use crate::error::CommandError;

/// One invocation of an external program.
#[derive(Debug, Clone)]
pub struct CommandSpec {
	program: String,
	args: Vec<String>,
	timeout: Duration,
}

impl CommandSpec {
	pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
		Self {
			program: program.into(),
			args: Vec::new(),
			timeout,
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

	fn display(&self) -> String {
		format!("{} {}", self.program, self.args.join(" "))
	}
}

/// Runs a command, optionally feeding `stdin`, and returns trimmed stdout on
/// success. Stdin content is never logged.
pub async fn run_command(spec: &CommandSpec, stdin: Option<&[u8]>) -> Result<String, CommandError> {
	let output = execute(spec, stdin).await?;

	if output.status.success() {
		Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
	} else {
		let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
		Err(CommandError::Failed {
			program: spec.program.clone(),
			args: spec.args.clone(),
			code: output.status.code(),
			stderr,
		})
	}
}

/// Runs a command only for its exit status. A non-zero exit is `Ok(false)`;
/// a missing program, I/O failure or timeout is still an error.
pub async fn probe_command(spec: &CommandSpec) -> Result<bool, CommandError> {
	let output = execute(spec, None).await?;
	Ok(output.status.success())
}

async fn execute(spec: &CommandSpec, stdin: Option<&[u8]>) -> Result<Output, CommandError> {
	trace!(cmd = %spec.display(), timeout = ?spec.timeout, "running external command");

	let mut cmd = Command::new(&spec.program);
	cmd.args(&spec.args)
		.stdin(if stdin.is_some() {
			Stdio::piped()
		} else {
			Stdio::null()
		})
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);

	let mut child = cmd.spawn().map_err(|e| spawn_error(spec, e))?;

	let run = async move {
		if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
			pipe.write_all(input).await?;
			pipe.shutdown().await?;
		}
		child.wait_with_output().await
	};

	match tokio::time::timeout(spec.timeout, run).await {
		Ok(Ok(output)) => Ok(output),
		Ok(Err(source)) => Err(CommandError::Io {
			program: spec.program.clone(),
			source,
		}),
		Err(_) => {
			warn!(cmd = %spec.display(), timeout = ?spec.timeout, "external command timed out");
			Err(CommandError::Timeout {
				program: spec.program.clone(),
				args: spec.args.clone(),
				timeout: spec.timeout,
			})
		}
	}
}

fn spawn_error(spec: &CommandSpec, e: std::io::Error) -> CommandError {
	if e.kind() == std::io::ErrorKind::NotFound {
		warn!(program = %spec.program, "program not found in PATH");
		CommandError::NotFound {
			program: spec.program.clone(),
		}
	} else {
		CommandError::Io {
			program: spec.program.clone(),
			source: e,
		}
	}
}

#[cfg(all(test, unix))]
mod tests {
	use super::*;

	fn sh(script: &str, timeout: Duration) -> CommandSpec {
		CommandSpec::new("sh", timeout).args(["-c", script])
	}

	#[tokio::test]
	async fn returns_trimmed_stdout() {
		let out = run_command(&sh("echo '  hello  '", Duration::from_secs(5)), None)
			.await
			.unwrap();
		assert_eq!(out, "hello");
	}

	#[tokio::test]
	async fn feeds_stdin() {
		let out = run_command(&sh("tr a-z A-Z", Duration::from_secs(5)), Some(b"abc".as_slice()))
			.await
			.unwrap();
		assert_eq!(out, "ABC");
	}

	#[tokio::test]
	async fn non_zero_exit_is_failed() {
		let err = run_command(&sh("echo boom >&2; exit 3", Duration::from_secs(5)), None)
			.await
			.unwrap_err();
		match err {
			CommandError::Failed { code, stderr, .. } => {
				assert_eq!(code, Some(3));
				assert_eq!(stderr, "boom");
			}
			other => panic!("expected Failed, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn missing_program_is_not_found() {
		let spec = CommandSpec::new("awg-definitely-not-installed", Duration::from_secs(1));
		let err = run_command(&spec, None).await.unwrap_err();
		assert!(matches!(err, CommandError::NotFound { .. }));
	}

	#[tokio::test]
	async fn slow_command_times_out() {
		let err = run_command(&sh("sleep 5", Duration::from_millis(100)), None)
			.await
			.unwrap_err();
		assert!(err.is_timeout());
	}

	#[tokio::test]
	async fn probe_reports_exit_status() {
		assert!(probe_command(&sh("exit 0", Duration::from_secs(5))).await.unwrap());
		assert!(!probe_command(&sh("exit 1", Duration::from_secs(5))).await.unwrap());
	}
}
