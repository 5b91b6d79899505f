// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use async_trait::async_trait;
use awg_common_process::{run_command, CommandSpec};
use tracing::instrument;

use crate::keys::{Result, WgPresharedKey, WgPrivateKey, WgPublicKey};
use crate::provider::KeyMaterialProvider;

pub const DEFAULT_AWG_BINARY: &str = "awg";

/// Key generation through the `awg` tool (`genkey`, `pubkey`, `genpsk`).
/// Every call is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct CommandKeyProvider {
	program: String,
	timeout: Duration,
}

impl CommandKeyProvider {
	pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
		Self {
			program: program.into(),
			timeout,
		}
	}

	fn spec(&self, subcommand: &str) -> CommandSpec {
		CommandSpec::new(&self.program, self.timeout).arg(subcommand)
	}
}

#[async_trait]
impl KeyMaterialProvider for CommandKeyProvider {
	fn backend(&self) -> &'static str {
		"command"
	}

	#[instrument(skip(self), fields(program = %self.program))]
	async fn generate_private_key(&self) -> Result<WgPrivateKey> {
		let out = run_command(&self.spec("genkey"), None).await?;
		WgPrivateKey::from_base64(&out)
	}

	#[instrument(skip_all, fields(program = %self.program))]
	async fn derive_public_key(&self, private: &WgPrivateKey) -> Result<WgPublicKey> {
		let encoded = private.to_base64();
		let out = run_command(&self.spec("pubkey"), Some(encoded.expose().as_bytes())).await?;
		WgPublicKey::from_base64(&out)
	}

	#[instrument(skip(self), fields(program = %self.program))]
	async fn generate_preshared_key(&self) -> Result<WgPresharedKey> {
		let out = run_command(&self.spec("genpsk"), None).await?;
		WgPresharedKey::from_base64(&out)
	}
}

#[cfg(all(test, unix))]
mod tests {
	use super::*;
	use crate::keys::{KeyError, KeyKind};
	use std::os::unix::fs::PermissionsExt;
	use std::path::PathBuf;
	use tempfile::TempDir;

	const PRIVATE: &str = "yAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=";
	const PUBLIC: &str = "xTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg=";

	fn fake_awg(dir: &TempDir, genpsk_output: &str) -> PathBuf {
		let path = dir.path().join("awg");
		let script = format!(
			"#!/bin/sh\ncase \"$1\" in\n  genkey) echo '{PRIVATE}' ;;\n  pubkey) cat >/dev/null; echo '{PUBLIC}' ;;\n  genpsk) echo '{genpsk_output}' ;;\n  *) exit 1 ;;\nesac\n"
		);
		std::fs::write(&path, script).unwrap();
		std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
		path
	}

	#[tokio::test]
	async fn parses_tool_output() {
		let dir = TempDir::new().unwrap();
		let provider = CommandKeyProvider::new(
			fake_awg(&dir, PRIVATE).to_string_lossy(),
			Duration::from_secs(5),
		);

		let private = provider.generate_private_key().await.unwrap();
		assert_eq!(private.to_base64().expose(), PRIVATE);

		let public = provider.derive_public_key(&private).await.unwrap();
		assert_eq!(public.to_base64(), PUBLIC);
	}

	#[tokio::test]
	async fn truncated_output_is_a_format_error() {
		let dir = TempDir::new().unwrap();
		let provider = CommandKeyProvider::new(
			fake_awg(&dir, "dG9vLXNob3J0").to_string_lossy(),
			Duration::from_secs(5),
		);

		let err = provider.generate_preshared_key().await.unwrap_err();
		assert!(matches!(
			err,
			KeyError::InvalidEncodedLength {
				kind: KeyKind::Preshared,
				actual: 12
			}
		));
	}

	#[tokio::test]
	async fn missing_tool_is_a_command_error() {
		let provider = CommandKeyProvider::new("awg-not-installed-anywhere", Duration::from_secs(1));
		let err = provider.generate_private_key().await.unwrap_err();
		assert!(!err.is_format_error());
	}
}
