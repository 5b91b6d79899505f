// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::keys::{Result, WgPresharedKey, WgPrivateKey, WgPublicKey};
use crate::provider::KeyMaterialProvider;

/// In-process Curve25519 key generation; needs no `awg` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeKeyProvider;

impl NativeKeyProvider {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl KeyMaterialProvider for NativeKeyProvider {
	fn backend(&self) -> &'static str {
		"native"
	}

	async fn generate_private_key(&self) -> Result<WgPrivateKey> {
		Ok(WgPrivateKey::generate())
	}

	async fn derive_public_key(&self, private: &WgPrivateKey) -> Result<WgPublicKey> {
		Ok(private.public_key())
	}

	async fn generate_preshared_key(&self) -> Result<WgPresharedKey> {
		Ok(WgPresharedKey::generate())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::generate_key_triple;
	use std::collections::HashSet;

	#[tokio::test]
	async fn private_keys_are_distinct_across_runs() {
		let provider = NativeKeyProvider::new();
		let mut seen = HashSet::new();
		for _ in 0..64 {
			let triple = generate_key_triple(&provider).await.unwrap();
			assert!(seen.insert(triple.private.to_base64().expose().clone()));
		}
	}

	#[tokio::test]
	async fn derive_is_deterministic() {
		let provider = NativeKeyProvider::new();
		let private = provider.generate_private_key().await.unwrap();
		let a = provider.derive_public_key(&private).await.unwrap();
		let b = provider.derive_public_key(&private).await.unwrap();
		assert_eq!(a, b);
	}
}
