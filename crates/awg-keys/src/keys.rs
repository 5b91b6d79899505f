// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use awg_common_secret::SecretString;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

/// Raw key size shared by private, public and preshared keys.
pub const KEY_LEN: usize = 32;

/// Length of a key in the padded base64 form `awg` reads and writes.
pub const ENCODED_KEY_LEN: usize = 44;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
	Private,
	Public,
	Preshared,
}

impl fmt::Display for KeyKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			KeyKind::Private => "private key",
			KeyKind::Public => "public key",
			KeyKind::Preshared => "preshared key",
		})
	}
}

#[derive(Error, Debug)]
pub enum KeyError {
	#[error("invalid {kind} length: expected {expected} characters, got {actual}", expected = ENCODED_KEY_LEN)]
	InvalidEncodedLength { kind: KeyKind, actual: usize },

	#[error("invalid {kind} encoding: {source}")]
	InvalidBase64 {
		kind: KeyKind,
		#[source]
		source: base64::DecodeError,
	},

	#[error("invalid {kind}: expected {expected} bytes, got {actual}", expected = KEY_LEN)]
	InvalidLength { kind: KeyKind, actual: usize },

	#[error("key generation command failed: {0}")]
	Command(#[from] awg_common_process::CommandError),
}

impl KeyError {
	/// True when the key material itself was malformed, as opposed to the
	/// generator failing to run.
	pub fn is_format_error(&self) -> bool {
		!matches!(self, KeyError::Command(_))
	}
}

pub type Result<T> = std::result::Result<T, KeyError>;

/// Validates and decodes one encoded key. The length check runs before
/// decoding so a truncated or padded-away value from a misbehaving generator
/// is reported as such rather than as a base64 error.
pub fn decode_key(kind: KeyKind, encoded: &str) -> Result<[u8; KEY_LEN]> {
	if encoded.len() != ENCODED_KEY_LEN {
		return Err(KeyError::InvalidEncodedLength {
			kind,
			actual: encoded.len(),
		});
	}
	let mut bytes = STANDARD
		.decode(encoded)
		.map_err(|source| KeyError::InvalidBase64 { kind, source })?;
	if bytes.len() != KEY_LEN {
		let actual = bytes.len();
		bytes.zeroize();
		return Err(KeyError::InvalidLength { kind, actual });
	}
	let mut arr = [0u8; KEY_LEN];
	arr.copy_from_slice(&bytes);
	bytes.zeroize();
	Ok(arr)
}

#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct WgPrivateKey {
	bytes: [u8; KEY_LEN],
}

impl WgPrivateKey {
	/// Generates a clamped Curve25519 scalar, the same shape `awg genkey`
	/// emits.
	pub fn generate() -> Self {
		let secret = StaticSecret::random_from_rng(OsRng);
		let mut bytes = secret.to_bytes();
		bytes[0] &= 248;
		bytes[31] &= 127;
		bytes[31] |= 64;
		Self { bytes }
	}

	pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
		Self { bytes }
	}

	pub fn from_base64(s: &str) -> Result<Self> {
		Ok(Self {
			bytes: decode_key(KeyKind::Private, s)?,
		})
	}

	pub fn to_base64(&self) -> SecretString {
		SecretString::new(STANDARD.encode(self.bytes))
	}

	pub fn public_key(&self) -> WgPublicKey {
		let secret = StaticSecret::from(self.bytes);
		let public = PublicKey::from(&secret);
		WgPublicKey {
			bytes: *public.as_bytes(),
		}
	}
}

impl fmt::Debug for WgPrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WgPrivateKey")
			.field("bytes", &"[REDACTED]")
			.finish()
	}
}

impl fmt::Display for WgPrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[REDACTED]")
	}
}

impl PartialEq for WgPrivateKey {
	fn eq(&self, other: &Self) -> bool {
		self.bytes == other.bytes
	}
}

impl Eq for WgPrivateKey {}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WgPublicKey {
	bytes: [u8; KEY_LEN],
}

impl WgPublicKey {
	pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
		Self { bytes }
	}

	pub fn from_base64(s: &str) -> Result<Self> {
		Ok(Self {
			bytes: decode_key(KeyKind::Public, s)?,
		})
	}

	pub fn to_base64(&self) -> String {
		STANDARD.encode(self.bytes)
	}
}

impl fmt::Debug for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let b64 = self.to_base64();
		f.debug_struct("WgPublicKey")
			.field("prefix", &format!("{}...", &b64[..8]))
			.finish()
	}
}

impl fmt::Display for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_base64())
	}
}

impl std::str::FromStr for WgPublicKey {
	type Err = KeyError;

	fn from_str(s: &str) -> Result<Self> {
		Self::from_base64(s)
	}
}

impl Serialize for WgPublicKey {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_base64())
	}
}

/// Symmetric key mixed into the handshake of a single peer.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct WgPresharedKey {
	bytes: [u8; KEY_LEN],
}

impl WgPresharedKey {
	pub fn generate() -> Self {
		let mut bytes = [0u8; KEY_LEN];
		OsRng.fill_bytes(&mut bytes);
		Self { bytes }
	}

	pub fn from_base64(s: &str) -> Result<Self> {
		Ok(Self {
			bytes: decode_key(KeyKind::Preshared, s)?,
		})
	}

	pub fn to_base64(&self) -> SecretString {
		SecretString::new(STANDARD.encode(self.bytes))
	}
}

impl fmt::Debug for WgPresharedKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WgPresharedKey")
			.field("bytes", &"[REDACTED]")
			.finish()
	}
}

impl PartialEq for WgPresharedKey {
	fn eq(&self, other: &Self) -> bool {
		self.bytes == other.bytes
	}
}

impl Eq for WgPresharedKey {}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn generated_keys_encode_to_expected_length() {
		let private = WgPrivateKey::generate();
		assert_eq!(private.to_base64().expose().len(), ENCODED_KEY_LEN);
		assert_eq!(private.public_key().to_base64().len(), ENCODED_KEY_LEN);
		assert_eq!(
			WgPresharedKey::generate().to_base64().expose().len(),
			ENCODED_KEY_LEN
		);
	}

	#[test]
	fn generated_private_key_is_clamped() {
		let private = WgPrivateKey::generate();
		let bytes = decode_key(KeyKind::Private, private.to_base64().expose()).unwrap();
		assert_eq!(bytes[0] & 7, 0);
		assert_eq!(bytes[31] & 128, 0);
		assert_eq!(bytes[31] & 64, 64);
	}

	#[test]
	fn short_key_is_rejected_before_decoding() {
		let err = WgPublicKey::from_base64("abc").unwrap_err();
		assert!(matches!(
			err,
			KeyError::InvalidEncodedLength {
				kind: KeyKind::Public,
				actual: 3
			}
		));
		assert!(err.is_format_error());
	}

	#[test]
	fn non_base64_key_is_rejected() {
		let bogus = "!".repeat(ENCODED_KEY_LEN);
		let err = WgPresharedKey::from_base64(&bogus).unwrap_err();
		assert!(matches!(err, KeyError::InvalidBase64 { .. }));
	}

	#[test]
	fn private_key_debug_and_display_are_redacted() {
		let private = WgPrivateKey::generate();
		let encoded = private.to_base64();
		assert!(!format!("{private:?}").contains(encoded.expose().as_str()));
		assert_eq!(format!("{private}"), "[REDACTED]");
	}

	#[test]
	fn preshared_key_debug_is_redacted() {
		let psk = WgPresharedKey::generate();
		let encoded = psk.to_base64();
		let debug = format!("{psk:?}");
		assert!(debug.contains("[REDACTED]"));
		assert!(!debug.contains(encoded.expose().as_str()));
	}

	#[test]
	fn public_key_serializes_as_base64() {
		let public = WgPrivateKey::generate().public_key();
		let json = serde_json::to_string(&public).unwrap();
		assert_eq!(json, format!("\"{}\"", public.to_base64()));
	}

	proptest! {
		#[test]
		fn public_key_is_pure_function_of_private(seed in prop::array::uniform32(any::<u8>())) {
			let a = WgPrivateKey::from_bytes(seed);
			let b = WgPrivateKey::from_bytes(seed);
			prop_assert_eq!(a.public_key(), b.public_key());
		}

		#[test]
		fn private_key_roundtrips_via_base64(seed in prop::array::uniform32(any::<u8>())) {
			let private = WgPrivateKey::from_bytes(seed);
			let restored = WgPrivateKey::from_base64(private.to_base64().expose()).unwrap();
			prop_assert_eq!(private.public_key(), restored.public_key());
		}
	}
}
