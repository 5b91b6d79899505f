// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use std::fmt;
use tracing::{debug, instrument};

use crate::keys::{Result, WgPresharedKey, WgPrivateKey, WgPublicKey};

/// Source of fresh key material for a new peer.
///
/// Implementations must hand back keys that went through
/// [`decode_key`](crate::decode_key) (or were constructed from raw bytes), so a
/// generator emitting malformed output surfaces as a
/// [`KeyError`](crate::KeyError) instead of a broken client bundle.
#[async_trait]
pub trait KeyMaterialProvider: Send + Sync {
	/// Short backend name for logs.
	fn backend(&self) -> &'static str;

	async fn generate_private_key(&self) -> Result<WgPrivateKey>;

	async fn derive_public_key(&self, private: &WgPrivateKey) -> Result<WgPublicKey>;

	async fn generate_preshared_key(&self) -> Result<WgPresharedKey>;
}

/// Everything a new peer needs: its key pair and the preshared key it shares
/// with the gateway.
#[derive(Clone)]
pub struct KeyTriple {
	pub private: WgPrivateKey,
	pub public: WgPublicKey,
	pub preshared: WgPresharedKey,
}

impl fmt::Debug for KeyTriple {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyTriple")
			.field("private", &self.private)
			.field("public", &self.public)
			.field("preshared", &self.preshared)
			.finish()
	}
}

#[instrument(skip(provider), fields(backend = provider.backend()))]
pub async fn generate_key_triple(provider: &dyn KeyMaterialProvider) -> Result<KeyTriple> {
	let private = provider.generate_private_key().await?;
	let public = provider.derive_public_key(&private).await?;
	let preshared = provider.generate_preshared_key().await?;

	debug!(public_key = %public, "generated key triple");

	Ok(KeyTriple {
		private,
		public,
		preshared,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::NativeKeyProvider;

	#[tokio::test]
	async fn triple_public_key_matches_private() {
		let triple = generate_key_triple(&NativeKeyProvider::new()).await.unwrap();
		assert_eq!(triple.public, triple.private.public_key());
	}

	#[tokio::test]
	async fn triple_debug_hides_secrets() {
		let triple = generate_key_triple(&NativeKeyProvider::new()).await.unwrap();
		let debug = format!("{triple:?}");
		assert!(!debug.contains(triple.private.to_base64().expose().as_str()));
		assert!(!debug.contains(triple.preshared.to_base64().expose().as_str()));
	}
}
