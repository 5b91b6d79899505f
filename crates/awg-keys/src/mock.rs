// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::keys::{Result, WgPresharedKey, WgPrivateKey, WgPublicKey};
use crate::provider::KeyMaterialProvider;

/// Recorded call to the mock provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockKeyCall {
	GeneratePrivate,
	DerivePublic,
	GeneratePreshared,
}

/// Mock key provider for testing.
///
/// Without overrides it behaves like the native backend. Each `with_*_output`
/// makes the matching call parse the given text instead, the way the command
/// backend parses tool output.
#[derive(Clone, Default)]
pub struct MockKeyProvider {
	pub private_output: Option<String>,
	pub public_output: Option<String>,
	pub preshared_output: Option<String>,
	pub calls: Arc<Mutex<Vec<MockKeyCall>>>,
}

impl MockKeyProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_private_output(mut self, output: impl Into<String>) -> Self {
		self.private_output = Some(output.into());
		self
	}

	pub fn with_public_output(mut self, output: impl Into<String>) -> Self {
		self.public_output = Some(output.into());
		self
	}

	pub fn with_preshared_output(mut self, output: impl Into<String>) -> Self {
		self.preshared_output = Some(output.into());
		self
	}

	/// Returns the recorded calls.
	pub fn get_calls(&self) -> Vec<MockKeyCall> {
		self.calls.lock().unwrap().clone()
	}

	fn record(&self, call: MockKeyCall) {
		self.calls.lock().unwrap().push(call);
	}
}

#[async_trait]
impl KeyMaterialProvider for MockKeyProvider {
	fn backend(&self) -> &'static str {
		"mock"
	}

	async fn generate_private_key(&self) -> Result<WgPrivateKey> {
		self.record(MockKeyCall::GeneratePrivate);
		match &self.private_output {
			Some(out) => WgPrivateKey::from_base64(out),
			None => Ok(WgPrivateKey::generate()),
		}
	}

	async fn derive_public_key(&self, private: &WgPrivateKey) -> Result<WgPublicKey> {
		self.record(MockKeyCall::DerivePublic);
		match &self.public_output {
			Some(out) => WgPublicKey::from_base64(out),
			None => Ok(private.public_key()),
		}
	}

	async fn generate_preshared_key(&self) -> Result<WgPresharedKey> {
		self.record(MockKeyCall::GeneratePreshared);
		match &self.preshared_output {
			Some(out) => WgPresharedKey::from_base64(out),
			None => Ok(WgPresharedKey::generate()),
		}
	}
}
