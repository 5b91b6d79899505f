// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting wrapper for key material handled during peer enrollment.
//!
//! Private keys and preshared keys pass through logging-heavy code paths
//! (tracing spans, error values, debug dumps of the enrollment report). Wrapping
//! them in [`Secret<T>`] keeps them out of every formatted output:
//!
//! - `Debug` and `Display` print `[REDACTED]`
//! - the inner value is zeroized on drop
//! - reading the value requires an explicit `.expose()`
//!
//! ```
//! use awg_common_secret::Secret;
//!
//! let psk = Secret::new("c2VjcmV0LXByZXNoYXJlZC1rZXktbWF0ZXJpYWwhISE=".to_string());
//! assert_eq!(format!("{psk}"), "[REDACTED]");
//! assert!(psk.expose().ends_with('='));
//! ```

use std::fmt;
use zeroize::Zeroize;

/// The redaction placeholder used in all output.
pub const REDACTED: &str = "[REDACTED]";

/// A wrapper for sensitive values that prevents accidental exposure.
///
/// There is no `Deref` impl; call sites must use [`Secret::expose`] so that
/// every read of key material is visible in review.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// Convenience alias for encoded key strings.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Explicitly access the inner value.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

impl From<String> for Secret<String> {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const SAMPLE_KEY: &str = "yAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=";

	#[test]
	fn debug_is_redacted() {
		let secret = Secret::new(SAMPLE_KEY.to_string());
		let debug_output = format!("{secret:?}");

		assert!(!debug_output.contains(SAMPLE_KEY));
		assert_eq!(debug_output, "Secret(\"[REDACTED]\")");
	}

	#[test]
	fn display_is_redacted() {
		let secret = Secret::new(SAMPLE_KEY.to_string());
		assert_eq!(format!("{secret}"), REDACTED);
	}

	#[test]
	fn expose_returns_inner_value() {
		let secret = SecretString::from(SAMPLE_KEY.to_string());
		assert_eq!(secret.expose(), SAMPLE_KEY);
	}

	#[test]
	fn option_secret_debug_is_redacted() {
		let secret: Option<SecretString> = Some(Secret::new(SAMPLE_KEY.to_string()));
		let debug = format!("{secret:?}");
		assert!(debug.contains(REDACTED));
		assert!(!debug.contains(SAMPLE_KEY));
	}

	#[test]
	fn equality_compares_inner_values() {
		let a = Secret::new("a".to_string());
		let b = Secret::new("a".to_string());
		let c = Secret::new("c".to_string());

		assert_eq!(a, b);
		assert_ne!(a, c);
	}

	proptest! {
		#[test]
		fn formatted_output_never_contains_key(inner in "[A-Za-z0-9+/]{43}=") {
			let secret = Secret::new(inner.clone());
			let debug_out = format!("{secret:?}");
			let display_out = format!("{secret}");
			prop_assert!(!debug_out.contains(&inner));
			prop_assert!(!display_out.contains(&inner));
		}

		#[test]
		fn clone_preserves_value(inner in ".*") {
			let secret = Secret::new(inner.clone());
			let cloned = secret.clone();
			prop_assert_eq!(cloned.expose(), &inner);
		}
	}
}
