// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Peer enrollment for an AmneziaWG gateway.
//!
//! [`PeerEnrollmentService::enroll`] runs one enrollment as a single
//! transaction under an exclusive lock on the configuration directory:
//! allocate the next tunnel address, generate keys, write the client bundle
//! and the new `[Peer]` block, then push the peer to the running interface.

pub mod allocator;
pub mod error;
pub mod interface;
pub mod lock;
pub mod service;
pub mod settings;
pub mod staging;
pub mod state;

pub use allocator::{AddressAllocator, AddressSpaceExhausted, FIRST_CLIENT_HOST};
pub use error::{EnrollError, EnrollFailure};
pub use interface::{
	CommandInterfaceController, InterfaceController, LiveInterfaceSync, MockInterfaceCall,
	MockInterfaceController, SyncError, SyncOutcome, DEFAULT_IP_BINARY,
};
pub use lock::{GatewayLock, LockError};
pub use service::{EnrollmentReport, PeerEnrollmentService};
pub use settings::{
	EnrollSettings, KeyBackend, SettingsError, DEFAULT_DNS, DEFAULT_EXTERNAL_TIMEOUT_SECS,
	DEFAULT_INTERFACE, DEFAULT_LISTEN_PORT, DEFAULT_SERVER_IP,
};
pub use staging::{StagedClient, PRESHARED_KEY_FILE, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
pub use state::EnrollmentState;
