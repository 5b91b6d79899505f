// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use serde::Serialize;

/// Steps of one enrollment, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
	PreconditionCheck,
	LockAcquired,
	ConfigLoaded,
	AddressAllocated,
	KeysGenerated,
	ClientPersisted,
	ServerConfigAppended,
	InterfaceSynced,
	LockReleased,
}

impl EnrollmentState {
	pub fn as_str(self) -> &'static str {
		match self {
			EnrollmentState::PreconditionCheck => "precondition check",
			EnrollmentState::LockAcquired => "lock acquisition",
			EnrollmentState::ConfigLoaded => "configuration load",
			EnrollmentState::AddressAllocated => "address allocation",
			EnrollmentState::KeysGenerated => "key generation",
			EnrollmentState::ClientPersisted => "client persistence",
			EnrollmentState::ServerConfigAppended => "server config append",
			EnrollmentState::InterfaceSynced => "interface sync",
			EnrollmentState::LockReleased => "lock release",
		}
	}
}

impl fmt::Display for EnrollmentState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
