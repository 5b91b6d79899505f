// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! On-disk layout of a gateway configuration directory.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use awg_keys::{WgPublicKey, ENCODED_KEY_LEN};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::client_name::ClientName;
use crate::error::ConfigError;
use crate::model::{GatewayConfig, PeerRecord};

pub const DEFAULT_CONFIG_DIR: &str = "/etc/amnezia/amneziawg/config";
pub const SERVER_CONFIG_FILE: &str = "server.conf";
pub const SERVER_KEYS_FILE: &str = "server.keys";
pub const CLIENTS_DIR: &str = "clients";
pub const LOCK_FILE: &str = ".add-client.lock";

const PUBLIC_KEY_PREFIX: &str = "PUBLIC_KEY=";

#[derive(Debug, Clone)]
pub struct ConfigRepository {
	root: PathBuf,
}

impl ConfigRepository {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn server_config_path(&self) -> PathBuf {
		self.root.join(SERVER_CONFIG_FILE)
	}

	pub fn server_keys_path(&self) -> PathBuf {
		self.root.join(SERVER_KEYS_FILE)
	}

	pub fn clients_dir(&self) -> PathBuf {
		self.root.join(CLIENTS_DIR)
	}

	pub fn client_dir(&self, name: &ClientName) -> PathBuf {
		self.clients_dir().join(name.as_str())
	}

	pub fn lock_path(&self) -> PathBuf {
		self.root.join(LOCK_FILE)
	}

	/// Stem of the configuration file, which is also the interface name
	/// `awg-quick` would bring up from it.
	pub fn config_stem(&self) -> &'static str {
		SERVER_CONFIG_FILE.trim_end_matches(".conf")
	}

	pub async fn is_initialized(&self) -> Result<bool, ConfigError> {
		let path = self.server_config_path();
		tokio::fs::try_exists(&path)
			.await
			.map_err(ConfigError::io(path))
	}

	#[instrument(skip(self), fields(path = %self.server_config_path().display()))]
	pub async fn load(&self) -> Result<GatewayConfig, ConfigError> {
		let path = self.server_config_path();
		let text = self.read_server_config().await?;

		let config = GatewayConfig::parse(&text).map_err(|source| ConfigError::Parse {
			path: path.clone(),
			source,
		})?;

		debug!(
			network = %config.network(),
			peers = config.peers.len(),
			"loaded gateway configuration"
		);
		Ok(config)
	}

	/// Advisory: a directory created after this check is still detected by
	/// the caller's second check under the lock.
	pub async fn client_exists(&self, name: &ClientName) -> Result<bool, ConfigError> {
		let path = self.client_dir(name);
		tokio::fs::try_exists(&path)
			.await
			.map_err(ConfigError::io(path))
	}

	/// The `PUBLIC_KEY=` entry of `server.keys`, if present and well formed.
	#[instrument(skip(self))]
	pub async fn server_public_key_hint(&self) -> Result<Option<WgPublicKey>, ConfigError> {
		let path = self.server_keys_path();
		let text = match tokio::fs::read_to_string(&path).await {
			Ok(text) => text,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				debug!("no server.keys, public key will be derived");
				return Ok(None);
			}
			Err(e) => return Err(ConfigError::io(path)(e)),
		};

		let Some(value) = text
			.lines()
			.find_map(|line| line.trim().strip_prefix(PUBLIC_KEY_PREFIX))
			.map(str::trim)
		else {
			return Ok(None);
		};

		if value.len() != ENCODED_KEY_LEN {
			warn!(
				length = value.len(),
				"ignoring malformed PUBLIC_KEY in server.keys"
			);
			return Ok(None);
		}

		match WgPublicKey::from_base64(value) {
			Ok(key) => Ok(Some(key)),
			Err(e) => {
				warn!(error = %e, "ignoring undecodable PUBLIC_KEY in server.keys");
				Ok(None)
			}
		}
	}

	/// Writes the current document plus `record` to a temporary file beside
	/// `server.conf`. Nothing is visible until [`PendingAppend::commit`].
	#[instrument(skip(self, record), fields(peer = ?record.name))]
	pub async fn prepare_append(&self, record: &PeerRecord) -> Result<PendingAppend, ConfigError> {
		let target = self.server_config_path();
		let original = self.read_server_config().await?;
		let mode = tokio::fs::metadata(&target)
			.await
			.map_err(ConfigError::io(&target))?
			.permissions()
			.mode() & 0o7777;

		let mut contents = original;
		contents.push_str(separator_for(&contents));
		contents.push_str(&record.render());

		let tmp_path = self.root.join(format!("{SERVER_CONFIG_FILE}.tmp"));
		// A leftover file would keep its old mode, so start from scratch.
		match tokio::fs::remove_file(&tmp_path).await {
			Ok(()) => warn!(tmp = %tmp_path.display(), "removed stale staged server config"),
			Err(e) if e.kind() == io::ErrorKind::NotFound => {}
			Err(e) => return Err(ConfigError::io(&tmp_path)(e)),
		}

		let mut file = tokio::fs::OpenOptions::new()
			.write(true)
			.create_new(true)
			.mode(mode)
			.open(&tmp_path)
			.await
			.map_err(ConfigError::io(&tmp_path))?;
		let pending = PendingAppend {
			tmp_path: tmp_path.clone(),
			target,
			committed: false,
		};

		file
			.write_all(contents.as_bytes())
			.await
			.map_err(ConfigError::io(&tmp_path))?;
		file.sync_all().await.map_err(ConfigError::io(&tmp_path))?;
		// The umask may have narrowed the mode further.
		tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(mode))
			.await
			.map_err(ConfigError::io(&tmp_path))?;

		debug!(tmp = %tmp_path.display(), bytes = contents.len(), "staged server config");
		Ok(pending)
	}

	/// Prepares and commits in one step.
	pub async fn append_peer(&self, record: &PeerRecord) -> Result<(), ConfigError> {
		self.prepare_append(record).await?.commit().await
	}

	async fn read_server_config(&self) -> Result<String, ConfigError> {
		let path = self.server_config_path();
		match tokio::fs::read_to_string(&path).await {
			Ok(text) => Ok(text),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ConfigError::NotInitialized { path }),
			Err(e) => Err(ConfigError::io(path)(e)),
		}
	}
}

fn separator_for(existing: &str) -> &'static str {
	if existing.is_empty() {
		""
	} else if existing.ends_with('\n') {
		"\n"
	} else {
		"\n\n"
	}
}

/// A fully written replacement for `server.conf`. Dropping it without
/// committing removes the temporary file and leaves the original untouched.
#[derive(Debug)]
pub struct PendingAppend {
	tmp_path: PathBuf,
	target: PathBuf,
	committed: bool,
}

impl PendingAppend {
	/// Atomically replaces `server.conf` with the staged document.
	pub async fn commit(mut self) -> Result<(), ConfigError> {
		tokio::fs::rename(&self.tmp_path, &self.target)
			.await
			.map_err(ConfigError::io(&self.target))?;
		self.committed = true;
		debug!(path = %self.target.display(), "committed server config");
		Ok(())
	}
}

impl Drop for PendingAppend {
	fn drop(&mut self) {
		if !self.committed {
			if let Err(e) = std::fs::remove_file(&self.tmp_path) {
				if e.kind() != io::ErrorKind::NotFound {
					warn!(path = %self.tmp_path.display(), error = %e, "failed to remove staged server config");
				}
			}
		}
	}
}
