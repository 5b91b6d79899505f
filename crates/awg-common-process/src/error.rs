// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
	#[error("{program} is not installed or not in PATH")]
	NotFound { program: String },

	#[error("{program} {args:?} exited with {}: {stderr}", display_code(.code))]
	Failed {
		program: String,
		args: Vec<String>,
		code: Option<i32>,
		stderr: String,
	},

	#[error("{program} {args:?} did not finish within {timeout:?}")]
	Timeout {
		program: String,
		args: Vec<String>,
		timeout: Duration,
	},

	#[error("I/O error running {program}: {source}")]
	Io {
		program: String,
		#[source]
		source: io::Error,
	},
}

impl CommandError {
	pub fn is_timeout(&self) -> bool {
		matches!(self, CommandError::Timeout { .. })
	}
}

fn display_code(code: &Option<i32>) -> String {
	match code {
		Some(code) => format!("status {code}"),
		None => "a signal".to_string(),
	}
}
