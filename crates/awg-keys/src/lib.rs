// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! AmneziaWG key material.
//!
//! Keys are 32-byte Curve25519 values exchanged as 44-character padded
//! base64. [`KeyMaterialProvider`] abstracts where they come from: the `awg`
//! tool ([`CommandKeyProvider`]), in-process generation
//! ([`NativeKeyProvider`]) or a scripted [`MockKeyProvider`] in tests.

pub mod command;
pub mod keys;
pub mod keys_file;
pub mod mock;
pub mod native;
pub mod provider;

pub use command::{CommandKeyProvider, DEFAULT_AWG_BINARY};
pub use keys::{
	decode_key, KeyError, KeyKind, WgPresharedKey, WgPrivateKey, WgPublicKey, ENCODED_KEY_LEN,
	KEY_LEN,
};
pub use keys_file::{write_key_file, write_owner_only};
pub use mock::{MockKeyCall, MockKeyProvider};
pub use native::NativeKeyProvider;
pub use provider::{generate_key_triple, KeyMaterialProvider, KeyTriple};
