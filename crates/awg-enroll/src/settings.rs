// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use awg_gateway_config::DEFAULT_CONFIG_DIR;
use awg_keys::{CommandKeyProvider, KeyMaterialProvider, NativeKeyProvider, DEFAULT_AWG_BINARY};
use thiserror::Error;

use crate::interface::{CommandInterfaceController, InterfaceController, DEFAULT_IP_BINARY};

pub const DEFAULT_SERVER_IP: &str = "YOUR_SERVER_IP";
pub const DEFAULT_LISTEN_PORT: u16 = 51820;
pub const DEFAULT_DNS: &str = "1.1.1.1";
pub const DEFAULT_INTERFACE: &str = "awg0";
pub const DEFAULT_EXTERNAL_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
	#[error("endpoint host must not be empty")]
	EmptyEndpointHost,

	#[error("DNS server must not be empty")]
	EmptyDns,

	#[error("interface name must not be empty")]
	EmptyInterface,

	#[error("external call timeout must be greater than zero")]
	ZeroTimeout,

	#[error("unknown key backend {0:?} (expected `command` or `native`)")]
	UnknownKeyBackend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyBackend {
	/// `awg genkey`, `awg pubkey`, `awg genpsk`.
	#[default]
	Command,
	/// In-process x25519.
	Native,
}

impl FromStr for KeyBackend {
	type Err = SettingsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"command" => Ok(KeyBackend::Command),
			"native" => Ok(KeyBackend::Native),
			_ => Err(SettingsError::UnknownKeyBackend(s.to_string())),
		}
	}
}

impl fmt::Display for KeyBackend {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			KeyBackend::Command => f.write_str("command"),
			KeyBackend::Native => f.write_str("native"),
		}
	}
}

/// Everything one enrollment needs besides the client name.
#[derive(Debug, Clone)]
pub struct EnrollSettings {
	pub config_dir: PathBuf,
	/// Public address clients dial, written into their `Endpoint`.
	pub endpoint_host: String,
	/// Overrides the gateway's `ListenPort` in client endpoints.
	pub listen_port: Option<u16>,
	pub dns: String,
	/// Interface preferred for live sync.
	pub interface: String,
	pub awg_binary: String,
	pub ip_binary: String,
	pub key_backend: KeyBackend,
	pub external_timeout: Duration,
	pub sync_interface: bool,
}

impl Default for EnrollSettings {
	fn default() -> Self {
		Self {
			config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
			endpoint_host: DEFAULT_SERVER_IP.to_string(),
			listen_port: None,
			dns: DEFAULT_DNS.to_string(),
			interface: DEFAULT_INTERFACE.to_string(),
			awg_binary: DEFAULT_AWG_BINARY.to_string(),
			ip_binary: DEFAULT_IP_BINARY.to_string(),
			key_backend: KeyBackend::default(),
			external_timeout: Duration::from_secs(DEFAULT_EXTERNAL_TIMEOUT_SECS),
			sync_interface: true,
		}
	}
}

impl EnrollSettings {
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.endpoint_host.trim().is_empty() {
			return Err(SettingsError::EmptyEndpointHost);
		}
		if self.dns.trim().is_empty() {
			return Err(SettingsError::EmptyDns);
		}
		if self.interface.trim().is_empty() {
			return Err(SettingsError::EmptyInterface);
		}
		if self.external_timeout.is_zero() {
			return Err(SettingsError::ZeroTimeout);
		}
		Ok(())
	}

	pub fn key_provider(&self) -> Arc<dyn KeyMaterialProvider> {
		match self.key_backend {
			KeyBackend::Command => Arc::new(CommandKeyProvider::new(
				&self.awg_binary,
				self.external_timeout,
			)),
			KeyBackend::Native => Arc::new(NativeKeyProvider::new()),
		}
	}

	pub fn interface_controller(&self) -> Arc<dyn InterfaceController> {
		Arc::new(CommandInterfaceController::new(
			&self.ip_binary,
			&self.awg_binary,
			self.external_timeout,
		))
	}
}
