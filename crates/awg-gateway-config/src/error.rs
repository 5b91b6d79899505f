// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;

/// Structural problems in a configuration document. Values of key fields are
/// never echoed back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
	#[error("line {line}: expected `[Section]` or `Key = Value`")]
	Syntax { line: usize },

	#[error("line {line}: unknown section [{name}]")]
	UnknownSection { line: usize, name: String },

	#[error("line {line}: `{key}` appears outside of any section")]
	EntryOutsideSection { line: usize, key: String },

	#[error("missing [{0}] section")]
	MissingSection(&'static str),

	#[error("line {line}: more than one [{section}] section")]
	DuplicateSection { line: usize, section: &'static str },

	#[error("[{section}] section starting at line {line} is missing `{field}`")]
	MissingField {
		line: usize,
		section: &'static str,
		field: &'static str,
	},

	#[error("line {line}: invalid `{field}`: {reason}")]
	InvalidValue {
		line: usize,
		field: String,
		reason: String,
	},

	#[error("line {line}: address {address} is already assigned")]
	DuplicateAddress { line: usize, address: Ipv4Addr },
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("gateway is not initialized: {} does not exist", .path.display())]
	NotInitialized { path: PathBuf },

	#[error("failed to parse {}: {source}", .path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: ParseError,
	},

	#[error("I/O error on {}: {source}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

impl ConfigError {
	pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
		let path = path.into();
		move |source| ConfigError::Io { path, source }
	}
}

/// A client name that cannot be used as a storage directory name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid client name {name:?}: {reason}")]
pub struct InvalidClientName {
	pub name: String,
	pub reason: &'static str,
}
