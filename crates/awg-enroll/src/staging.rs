// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-client storage, written aside and moved into place in one rename.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use awg_common_secret::SecretString;
use awg_gateway_config::{ClientName, ConfigRepository};
use awg_keys::{write_key_file, write_owner_only, KeyTriple};
use tracing::{debug, instrument, warn};

const STAGING_PREFIX: &str = ".staging-";
pub const PRIVATE_KEY_FILE: &str = "privatekey";
pub const PUBLIC_KEY_FILE: &str = "publickey";
pub const PRESHARED_KEY_FILE: &str = "presharedkey";

/// A client directory being assembled under `clients/`. Client names cannot
/// start with `.`, so the staging name never collides with a real client.
#[derive(Debug)]
pub struct StagedClient {
	staging_dir: PathBuf,
	final_dir: PathBuf,
	committed: bool,
}

impl StagedClient {
	#[instrument(skip(repository), fields(client = %name))]
	pub async fn create(repository: &ConfigRepository, name: &ClientName) -> io::Result<Self> {
		let clients_dir = repository.clients_dir();
		tokio::fs::create_dir_all(&clients_dir).await?;

		let staging_dir = clients_dir.join(format!("{STAGING_PREFIX}{name}"));
		// Left behind by a process killed mid-enrollment.
		match tokio::fs::remove_dir_all(&staging_dir).await {
			Ok(()) => warn!(path = %staging_dir.display(), "removed stale staging directory"),
			Err(e) if e.kind() == io::ErrorKind::NotFound => {}
			Err(e) => return Err(e),
		}

		let staged = Self {
			staging_dir,
			final_dir: repository.client_dir(name),
			committed: false,
		};
		tokio::fs::create_dir(&staged.staging_dir).await?;
		tokio::fs::set_permissions(&staged.staging_dir, std::fs::Permissions::from_mode(0o700))
			.await?;
		Ok(staged)
	}

	pub fn final_dir(&self) -> &Path {
		&self.final_dir
	}

	/// Writes the three key files and `<name>.conf`, each readable by the
	/// owner only.
	pub async fn write_bundle(
		&self,
		name: &ClientName,
		keys: &KeyTriple,
		document: &SecretString,
	) -> io::Result<()> {
		write_key_file(
			self.staging_dir.join(PRIVATE_KEY_FILE),
			keys.private.to_base64().expose(),
		)
		.await?;
		write_key_file(
			self.staging_dir.join(PUBLIC_KEY_FILE),
			&keys.public.to_base64(),
		)
		.await?;
		write_key_file(
			self.staging_dir.join(PRESHARED_KEY_FILE),
			keys.preshared.to_base64().expose(),
		)
		.await?;
		write_owner_only(
			self.staging_dir.join(client_config_file(name)),
			document.expose(),
		)
		.await?;
		debug!(path = %self.staging_dir.display(), "staged client bundle");
		Ok(())
	}

	/// Moves the staged directory to `clients/<name>`.
	pub async fn commit(mut self) -> io::Result<CommittedClient> {
		tokio::fs::rename(&self.staging_dir, &self.final_dir).await?;
		self.committed = true;
		Ok(CommittedClient {
			dir: self.final_dir.clone(),
		})
	}
}

impl Drop for StagedClient {
	fn drop(&mut self) {
		if !self.committed {
			if let Err(e) = std::fs::remove_dir_all(&self.staging_dir) {
				if e.kind() != io::ErrorKind::NotFound {
					warn!(path = %self.staging_dir.display(), error = %e, "failed to remove staging directory");
				}
			}
		}
	}
}

/// A client directory that is in place but whose peer is not yet in
/// `server.conf`.
#[derive(Debug)]
pub struct CommittedClient {
	dir: PathBuf,
}

impl CommittedClient {
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Removes the directory again after the server config could not be
	/// committed.
	pub async fn rollback(self) {
		if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
			warn!(path = %self.dir.display(), error = %e, "failed to roll back client directory");
		}
	}
}

pub fn client_config_file(name: &ClientName) -> String {
	format!("{name}.conf")
}

#[cfg(test)]
mod tests {
	use super::*;
	use awg_keys::{generate_key_triple, NativeKeyProvider};
	use tempfile::TempDir;

	async fn fixture() -> (ConfigRepository, ClientName, KeyTriple, TempDir) {
		let tmp = TempDir::new().unwrap();
		let repo = ConfigRepository::new(tmp.path());
		let name = ClientName::parse("alice").unwrap();
		let keys = generate_key_triple(&NativeKeyProvider).await.unwrap();
		(repo, name, keys, tmp)
	}

	fn mode(path: &Path) -> u32 {
		std::fs::metadata(path).unwrap().permissions().mode() & 0o777
	}

	#[tokio::test]
	async fn commit_moves_bundle_into_place() {
		let (repo, name, keys, _tmp) = fixture().await;
		let document = SecretString::new("[Interface]\n".to_string());

		let staged = StagedClient::create(&repo, &name).await.unwrap();
		staged.write_bundle(&name, &keys, &document).await.unwrap();
		let committed = staged.commit().await.unwrap();

		let dir = repo.client_dir(&name);
		assert_eq!(committed.dir(), dir.as_path());
		assert_eq!(mode(&dir), 0o700);
		for file in [PRIVATE_KEY_FILE, PUBLIC_KEY_FILE, PRESHARED_KEY_FILE, "alice.conf"] {
			assert_eq!(mode(&dir.join(file)), 0o600, "{file}");
		}
		let public = std::fs::read_to_string(dir.join(PUBLIC_KEY_FILE)).unwrap();
		assert_eq!(public, format!("{}\n", keys.public));
		assert!(!repo.clients_dir().join(".staging-alice").exists());
	}

	#[tokio::test]
	async fn dropping_uncommitted_stage_leaves_nothing() {
		let (repo, name, keys, _tmp) = fixture().await;

		let staged = StagedClient::create(&repo, &name).await.unwrap();
		staged
			.write_bundle(&name, &keys, &SecretString::new(String::new()))
			.await
			.unwrap();
		drop(staged);

		let leftovers: Vec<_> = std::fs::read_dir(repo.clients_dir())
			.unwrap()
			.collect();
		assert!(leftovers.is_empty());
	}

	#[tokio::test]
	async fn stale_staging_directory_is_replaced() {
		let (repo, name, _keys, _tmp) = fixture().await;
		let stale = repo.clients_dir().join(".staging-alice");
		std::fs::create_dir_all(&stale).unwrap();
		std::fs::write(stale.join("junk"), "x").unwrap();

		let staged = StagedClient::create(&repo, &name).await.unwrap();
		assert!(!stale.join("junk").exists());
		drop(staged);
	}

	#[tokio::test]
	async fn rollback_removes_committed_directory() {
		let (repo, name, _keys, _tmp) = fixture().await;

		let committed = StagedClient::create(&repo, &name)
			.await
			.unwrap()
			.commit()
			.await
			.unwrap();
		assert!(repo.client_dir(&name).exists());

		committed.rollback().await;
		assert!(!repo.client_dir(&name).exists());
	}
}
