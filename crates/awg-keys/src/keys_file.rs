// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;
use tokio::fs;
use tracing::instrument;

/// Writes `content` to a file only the owner can read or write. Used for the
/// per-client key files and the rendered client configuration.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn write_owner_only(path: impl AsRef<Path>, content: &str) -> std::io::Result<()> {
	let path = path.as_ref();

	#[cfg(unix)]
	{
		use tokio::fs::OpenOptions;
		use tokio::io::AsyncWriteExt;

		let mut file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.mode(0o600)
			.open(path)
			.await?;
		file.write_all(content.as_bytes()).await?;
		file.flush().await?;

		// mode() only applies on creation
		use std::os::unix::fs::PermissionsExt;
		fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
	}

	#[cfg(not(unix))]
	{
		fs::write(path, content).await?;
	}

	Ok(())
}

/// Writes one encoded key followed by a newline, the layout `awg genkey > file`
/// produces.
pub async fn write_key_file(path: impl AsRef<Path>, encoded: &str) -> std::io::Result<()> {
	write_owner_only(path, &format!("{encoded}\n")).await
}
