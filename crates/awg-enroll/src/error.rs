// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io;
use std::path::PathBuf;

use awg_common_process::CommandError;
use awg_gateway_config::{ConfigError, InvalidClientName, ParseError};
use awg_keys::KeyError;
use thiserror::Error;

use crate::allocator::AddressSpaceExhausted;
use crate::lock::LockError;
use crate::settings::SettingsError;
use crate::state::EnrollmentState;

#[derive(Debug, Error)]
pub enum EnrollError {
	#[error(transparent)]
	InvalidClientName(#[from] InvalidClientName),

	#[error("gateway is not initialized: {} does not exist", .path.display())]
	NotInitialized { path: PathBuf },

	#[error("client {name:?} already exists")]
	DuplicateClient { name: String },

	#[error("failed to parse {}: {source}", .path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: ParseError,
	},

	#[error("malformed key material: {0}")]
	KeyFormat(#[source] KeyError),

	#[error(transparent)]
	AddressSpaceExhausted(#[from] AddressSpaceExhausted),

	#[error("external call timed out: {0}")]
	ExternalCallTimeout(#[source] CommandError),

	#[error("external call failed: {0}")]
	ExternalCall(#[source] CommandError),

	#[error(transparent)]
	Lock(#[from] LockError),

	#[error("invalid settings: {0}")]
	Settings(#[from] SettingsError),

	#[error("I/O error on {}: {source}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

impl EnrollError {
	pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
		let path = path.into();
		move |source| EnrollError::Io { path, source }
	}
}

impl From<ConfigError> for EnrollError {
	fn from(e: ConfigError) -> Self {
		match e {
			ConfigError::NotInitialized { path } => EnrollError::NotInitialized { path },
			ConfigError::Parse { path, source } => EnrollError::Parse { path, source },
			ConfigError::Io { path, source } => EnrollError::Io { path, source },
		}
	}
}

impl From<CommandError> for EnrollError {
	fn from(e: CommandError) -> Self {
		if e.is_timeout() {
			EnrollError::ExternalCallTimeout(e)
		} else {
			EnrollError::ExternalCall(e)
		}
	}
}

impl From<KeyError> for EnrollError {
	fn from(e: KeyError) -> Self {
		match e {
			KeyError::Command(e) => e.into(),
			other => EnrollError::KeyFormat(other),
		}
	}
}

/// An enrollment that stopped at `step`. The lock has been released and no
/// staged write was left behind.
#[derive(Debug, Error)]
#[error("enrollment of {client:?} failed during {step}: {source}")]
pub struct EnrollFailure {
	pub client: String,
	pub step: EnrollmentState,
	#[source]
	pub source: EnrollError,
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[test]
	fn command_timeouts_are_classified() {
		let timeout = CommandError::Timeout {
			program: "awg".to_string(),
			args: vec!["genkey".to_string()],
			timeout: Duration::from_secs(10),
		};
		assert!(matches!(
			EnrollError::from(KeyError::Command(timeout)),
			EnrollError::ExternalCallTimeout(_)
		));

		let missing = CommandError::NotFound {
			program: "awg".to_string(),
		};
		assert!(matches!(
			EnrollError::from(KeyError::Command(missing)),
			EnrollError::ExternalCall(_)
		));
	}

	#[test]
	fn malformed_keys_are_key_format_errors() {
		let err = awg_keys::WgPublicKey::from_base64("short").unwrap_err();
		assert!(matches!(EnrollError::from(err), EnrollError::KeyFormat(_)));
	}

	#[test]
	fn failure_names_the_step() {
		let failure = EnrollFailure {
			client: "alice".to_string(),
			step: EnrollmentState::ConfigLoaded,
			source: EnrollError::NotInitialized {
				path: PathBuf::from("/etc/amnezia/amneziawg/config/server.conf"),
			},
		};
		let message = failure.to_string();
		assert!(message.contains("configuration load"));
		assert!(message.contains("not initialized"));
	}
}
