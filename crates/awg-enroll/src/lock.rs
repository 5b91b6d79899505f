// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exclusive advisory lock serializing enrollments on one gateway.
//!
//! The lock is a `flock(2)` on a file in the configuration directory. It
//! belongs to the open file description, so the kernel drops it when the
//! holder exits for any reason.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum LockError {
	#[error("failed to open lock file {}: {source}", .path.display())]
	Open {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("failed to lock {}: {source}", .path.display())]
	Lock {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("failed to unlock {}: {source}", .path.display())]
	Unlock {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("lock task failed: {0}")]
	Task(String),
}

/// Held lock. Released by [`GatewayLock::release`] or on drop.
pub struct GatewayLock {
	lock: Flock<File>,
	path: PathBuf,
}

impl fmt::Debug for GatewayLock {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GatewayLock").field("path", &self.path).finish()
	}
}

impl GatewayLock {
	/// Blocks until the lock is held, creating the lock file if needed. The
	/// blocking wait runs on the blocking thread pool.
	#[instrument(skip_all, fields(path = %path.as_ref().display()))]
	pub async fn acquire(path: impl AsRef<Path>) -> Result<Self, LockError> {
		let path = path.as_ref().to_path_buf();
		let lock = tokio::task::spawn_blocking(move || Self::acquire_blocking(path))
			.await
			.map_err(|e| LockError::Task(e.to_string()))??;
		debug!("lock acquired");
		Ok(lock)
	}

	/// Takes the lock only if it is free right now.
	pub fn try_acquire(path: impl AsRef<Path>) -> Result<Option<Self>, LockError> {
		let path = path.as_ref().to_path_buf();
		let file = open_lock_file(&path)?;
		match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
			Ok(lock) => Ok(Some(Self { lock, path })),
			Err((_, Errno::EWOULDBLOCK)) => Ok(None),
			Err((_, errno)) => Err(LockError::Lock {
				path,
				source: errno.into(),
			}),
		}
	}

	fn acquire_blocking(path: PathBuf) -> Result<Self, LockError> {
		let mut file = open_lock_file(&path)?;
		loop {
			match Flock::lock(file, FlockArg::LockExclusive) {
				Ok(lock) => return Ok(Self { lock, path }),
				Err((returned, Errno::EINTR)) => file = returned,
				Err((_, errno)) => {
					return Err(LockError::Lock {
						path,
						source: errno.into(),
					})
				}
			}
		}
	}

	/// Releases the lock explicitly. Dropping the guard releases it too.
	pub fn release(self) -> Result<(), LockError> {
		let Self { lock, path } = self;
		lock.unlock().map_err(|(_, errno)| LockError::Unlock {
			path: path.clone(),
			source: errno.into(),
		})?;
		debug!(path = %path.display(), "lock released");
		Ok(())
	}
}

fn open_lock_file(path: &Path) -> Result<File, LockError> {
	OpenOptions::new()
		.read(true)
		.write(true)
		.create(true)
		.truncate(false)
		.mode(0o600)
		.open(path)
		.map_err(|source| LockError::Open {
			path: path.to_path_buf(),
			source,
		})
}
