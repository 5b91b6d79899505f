// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! AmneziaWG gateway configuration.
//!
//! Parses `server.conf` into a [`GatewayConfig`], renders and parses client
//! documents, and appends peers to the gateway configuration without
//! rewriting what is already there.

pub mod client;
pub mod client_name;
mod document;
pub mod error;
pub mod model;
pub mod obfuscation;
pub mod repository;

pub use client::{ClientDocument, CLIENT_MTU, PERSISTENT_KEEPALIVE_SECS};
pub use client_name::{ClientName, MAX_CLIENT_NAME_LEN};
pub use error::{ConfigError, InvalidClientName, ParseError};
pub use model::{host_number, GatewayConfig, PeerRecord};
pub use obfuscation::{ObfuscationParam, ObfuscationParams, ObfuscationValue};
pub use repository::{
	ConfigRepository, PendingAppend, CLIENTS_DIR, DEFAULT_CONFIG_DIR, LOCK_FILE, SERVER_CONFIG_FILE,
	SERVER_KEYS_FILE,
};
