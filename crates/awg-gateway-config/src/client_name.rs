// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use crate::error::InvalidClientName;

pub const MAX_CLIENT_NAME_LEN: usize = 64;

/// A client name that is safe to use as a directory and file name under the
/// clients tree and as a `# Client:` annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientName(String);

impl ClientName {
	pub fn parse(name: &str) -> Result<Self, InvalidClientName> {
		let invalid = |reason| InvalidClientName {
			name: name.to_string(),
			reason,
		};

		if name.is_empty() {
			return Err(invalid("name is empty"));
		}
		if name.len() > MAX_CLIENT_NAME_LEN {
			return Err(invalid("name is longer than 64 characters"));
		}
		if name.starts_with('.') {
			return Err(invalid("name must not start with '.'"));
		}
		if !name
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
		{
			return Err(invalid("only letters, digits, '-', '_' and '.' are allowed"));
		}

		Ok(Self(name.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ClientName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl std::str::FromStr for ClientName {
	type Err = InvalidClientName;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn accepts_typical_names() {
		for name in ["alice", "bob-laptop", "phone_2", "v1.2"] {
			assert_eq!(ClientName::parse(name).unwrap().as_str(), name);
		}
	}

	#[test]
	fn rejects_path_tricks() {
		for name in ["", "..", ".hidden", "a/b", "../etc", "white space", "tab\t"] {
			assert!(ClientName::parse(name).is_err(), "{name:?} should be rejected");
		}
	}

	#[test]
	fn rejects_overlong_names() {
		let name = "a".repeat(MAX_CLIENT_NAME_LEN + 1);
		assert!(ClientName::parse(&name).is_err());
		assert!(ClientName::parse(&name[1..]).is_ok());
	}

	proptest! {
		#[test]
		fn accepted_names_are_single_path_components(name in "[A-Za-z0-9_.-]{1,64}") {
			if let Ok(parsed) = ClientName::parse(&name) {
				let path = std::path::Path::new(parsed.as_str());
				prop_assert_eq!(path.components().count(), 1);
				prop_assert!(!parsed.as_str().starts_with('.'));
			}
		}
	}
}
