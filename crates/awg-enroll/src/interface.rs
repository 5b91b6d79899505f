// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Applying a new peer to the running interface without a restart.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use awg_common_process::{probe_command, run_command, CommandError, CommandSpec};
use awg_gateway_config::PeerRecord;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_IP_BINARY: &str = "ip";

#[derive(Debug, Error)]
pub enum SyncError {
	#[error(transparent)]
	Command(#[from] CommandError),

	#[error("failed to write peer delta: {0}")]
	Io(#[from] std::io::Error),
}

/// Control surface of the running tunnel interface.
#[async_trait]
pub trait InterfaceController: Send + Sync {
	async fn link_exists(&self, interface: &str) -> Result<bool, CommandError>;

	/// Merges the peers in `conf_path` into the interface, leaving existing
	/// peers and their sessions alone.
	async fn add_peers(&self, interface: &str, conf_path: &Path) -> Result<(), CommandError>;
}

/// Controller backed by `ip link show` and `awg addconf`.
#[derive(Debug, Clone)]
pub struct CommandInterfaceController {
	ip_program: String,
	awg_program: String,
	timeout: Duration,
}

impl CommandInterfaceController {
	pub fn new(
		ip_program: impl Into<String>,
		awg_program: impl Into<String>,
		timeout: Duration,
	) -> Self {
		Self {
			ip_program: ip_program.into(),
			awg_program: awg_program.into(),
			timeout,
		}
	}
}

#[async_trait]
impl InterfaceController for CommandInterfaceController {
	#[instrument(skip(self))]
	async fn link_exists(&self, interface: &str) -> Result<bool, CommandError> {
		let spec = CommandSpec::new(&self.ip_program, self.timeout).args(["link", "show", interface]);
		probe_command(&spec).await
	}

	#[instrument(skip(self), fields(conf = %conf_path.display()))]
	async fn add_peers(&self, interface: &str, conf_path: &Path) -> Result<(), CommandError> {
		let spec = CommandSpec::new(&self.awg_program, self.timeout)
			.arg("addconf")
			.arg(interface)
			.arg(conf_path.to_string_lossy());
		run_command(&spec, None).await.map(|_| ())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockInterfaceCall {
	LinkExists(String),
	/// The delta file is read at call time since it is removed afterwards.
	AddPeers { interface: String, contents: String },
}

/// Mock controller for testing.
#[derive(Clone, Default)]
pub struct MockInterfaceController {
	pub links: HashSet<String>,
	pub add_peers_error: Option<String>,
	pub calls: Arc<Mutex<Vec<MockInterfaceCall>>>,
}

impl MockInterfaceController {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_link(mut self, interface: impl Into<String>) -> Self {
		self.links.insert(interface.into());
		self
	}

	/// Makes `add_peers` fail with a non-zero exit carrying `stderr`.
	pub fn with_add_peers_error(mut self, stderr: impl Into<String>) -> Self {
		self.add_peers_error = Some(stderr.into());
		self
	}

	pub fn get_calls(&self) -> Vec<MockInterfaceCall> {
		self.calls.lock().unwrap().clone()
	}

	fn record(&self, call: MockInterfaceCall) {
		self.calls.lock().unwrap().push(call);
	}
}

#[async_trait]
impl InterfaceController for MockInterfaceController {
	async fn link_exists(&self, interface: &str) -> Result<bool, CommandError> {
		self.record(MockInterfaceCall::LinkExists(interface.to_string()));
		Ok(self.links.contains(interface))
	}

	async fn add_peers(&self, interface: &str, conf_path: &Path) -> Result<(), CommandError> {
		let contents = std::fs::read_to_string(conf_path).unwrap_or_default();
		self.record(MockInterfaceCall::AddPeers {
			interface: interface.to_string(),
			contents,
		});
		match &self.add_peers_error {
			Some(stderr) => Err(CommandError::Failed {
				program: "awg".to_string(),
				args: vec!["addconf".to_string(), interface.to_string()],
				code: Some(1),
				stderr: stderr.clone(),
			}),
			None => Ok(()),
		}
	}
}

/// Result of pushing a new peer to the running interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
	Applied { interface: String },
	Skipped,
	Failed { interface: String, reason: String },
}

impl SyncOutcome {
	pub fn is_applied(&self) -> bool {
		matches!(self, SyncOutcome::Applied { .. })
	}
}

pub struct LiveInterfaceSync {
	controller: Arc<dyn InterfaceController>,
	fallback: String,
}

impl LiveInterfaceSync {
	/// `fallback` is the interface name derived from the configuration file
	/// stem, used when the preferred interface is not up.
	pub fn new(controller: Arc<dyn InterfaceController>, fallback: impl Into<String>) -> Self {
		Self {
			controller,
			fallback: fallback.into(),
		}
	}

	/// The preferred interface if its link exists, else the fallback name,
	/// whether or not that one exists.
	#[instrument(skip(self))]
	pub async fn resolve_active_interface(&self, preferred: &str) -> Result<String, CommandError> {
		if self.controller.link_exists(preferred).await? {
			return Ok(preferred.to_string());
		}
		if !self.controller.link_exists(&self.fallback).await? {
			debug!(fallback = %self.fallback, "neither interface is up, using fallback name");
		}
		Ok(self.fallback.clone())
	}

	/// Hands only the new peer block to the interface.
	#[instrument(skip(self, record), fields(peer = ?record.name))]
	pub async fn apply_peer_delta(&self, interface: &str, record: &PeerRecord) -> Result<(), SyncError> {
		let mut delta = tempfile::Builder::new()
			.prefix("awg-peer-")
			.suffix(".conf")
			.tempfile()?;
		delta.write_all(record.render().as_bytes())?;
		delta.flush()?;

		self.controller.add_peers(interface, delta.path()).await?;
		Ok(())
	}

	/// Resolves the interface and applies the peer, folding any failure into
	/// the outcome.
	pub async fn sync_peer(&self, preferred: &str, record: &PeerRecord) -> SyncOutcome {
		let interface = match self.resolve_active_interface(preferred).await {
			Ok(interface) => interface,
			Err(e) => {
				warn!(error = %e, "could not inspect running interfaces");
				return SyncOutcome::Failed {
					interface: preferred.to_string(),
					reason: e.to_string(),
				};
			}
		};

		match self.apply_peer_delta(&interface, record).await {
			Ok(()) => {
				info!(%interface, "peer added to running interface");
				SyncOutcome::Applied { interface }
			}
			Err(e) => {
				warn!(%interface, error = %e, "failed to add peer to running interface");
				SyncOutcome::Failed {
					interface,
					reason: e.to_string(),
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use awg_gateway_config::ClientName;
	use awg_keys::{WgPresharedKey, WgPrivateKey};

	fn record() -> PeerRecord {
		PeerRecord::for_client(
			&ClientName::parse("alice").unwrap(),
			WgPrivateKey::generate().public_key(),
			WgPresharedKey::generate(),
			"10.0.0.3".parse().unwrap(),
		)
	}

	#[tokio::test]
	async fn prefers_running_interface() {
		let mock = MockInterfaceController::new().with_link("awg0");
		let sync = LiveInterfaceSync::new(Arc::new(mock.clone()), "server");

		assert_eq!(sync.resolve_active_interface("awg0").await.unwrap(), "awg0");
		assert_eq!(
			mock.get_calls(),
			vec![MockInterfaceCall::LinkExists("awg0".to_string())]
		);
	}

	#[tokio::test]
	async fn falls_back_to_config_stem() {
		let mock = MockInterfaceController::new().with_link("server");
		let sync = LiveInterfaceSync::new(Arc::new(mock), "server");
		assert_eq!(sync.resolve_active_interface("awg0").await.unwrap(), "server");

		let sync = LiveInterfaceSync::new(Arc::new(MockInterfaceController::new()), "server");
		assert_eq!(sync.resolve_active_interface("awg0").await.unwrap(), "server");
	}

	#[tokio::test]
	async fn delta_contains_only_new_peer() {
		let mock = MockInterfaceController::new().with_link("awg0");
		let sync = LiveInterfaceSync::new(Arc::new(mock.clone()), "server");
		let record = record();

		let outcome = sync.sync_peer("awg0", &record).await;
		assert!(outcome.is_applied());

		let calls = mock.get_calls();
		assert_eq!(
			calls.last(),
			Some(&MockInterfaceCall::AddPeers {
				interface: "awg0".to_string(),
				contents: record.render(),
			})
		);
	}

	#[tokio::test]
	async fn addconf_failure_becomes_failed_outcome() {
		let mock = MockInterfaceController::new()
			.with_link("awg0")
			.with_add_peers_error("Unable to modify interface");
		let sync = LiveInterfaceSync::new(Arc::new(mock), "server");

		match sync.sync_peer("awg0", &record()).await {
			SyncOutcome::Failed { interface, reason } => {
				assert_eq!(interface, "awg0");
				assert!(reason.contains("Unable to modify interface"));
			}
			other => panic!("unexpected outcome {other:?}"),
		}
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn command_controller_reports_missing_tool() {
		let controller = CommandInterfaceController::new(
			"/nonexistent/ip",
			"/nonexistent/awg",
			Duration::from_secs(1),
		);
		let err = controller.link_exists("awg0").await.unwrap_err();
		assert!(matches!(err, CommandError::NotFound { .. }));
	}

	#[test]
	fn outcome_serializes_with_status_tag() {
		let json = serde_json::to_value(SyncOutcome::Applied {
			interface: "awg0".to_string(),
		})
		.unwrap();
		assert_eq!(json["status"], "applied");
		assert_eq!(json["interface"], "awg0");
	}
}
