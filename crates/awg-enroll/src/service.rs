// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use awg_common_secret::SecretString;
use awg_gateway_config::{ClientDocument, ClientName, ConfigRepository, PeerRecord};
use awg_keys::{generate_key_triple, KeyMaterialProvider, WgPublicKey};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::allocator::AddressAllocator;
use crate::error::{EnrollError, EnrollFailure};
use crate::interface::{InterfaceController, LiveInterfaceSync, SyncOutcome};
use crate::lock::GatewayLock;
use crate::settings::{EnrollSettings, SettingsError, DEFAULT_LISTEN_PORT};
use crate::staging::{client_config_file, StagedClient};
use crate::state::EnrollmentState;

/// What a successful enrollment produced.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentReport {
	pub client: String,
	pub address: Ipv4Addr,
	pub public_key: WgPublicKey,
	pub endpoint: String,
	pub client_dir: PathBuf,
	pub client_config: PathBuf,
	pub sync: SyncOutcome,
	/// Rendered client document, carrying the client's private key.
	#[serde(skip)]
	pub document: SecretString,
}

pub struct PeerEnrollmentService {
	settings: EnrollSettings,
	repository: ConfigRepository,
	keys: Arc<dyn KeyMaterialProvider>,
	sync: Option<LiveInterfaceSync>,
}

impl PeerEnrollmentService {
	pub fn new(
		settings: EnrollSettings,
		keys: Arc<dyn KeyMaterialProvider>,
		controller: Arc<dyn InterfaceController>,
	) -> Result<Self, SettingsError> {
		settings.validate()?;
		let repository = ConfigRepository::new(&settings.config_dir);
		let sync = settings
			.sync_interface
			.then(|| LiveInterfaceSync::new(controller, repository.config_stem()));
		Ok(Self {
			settings,
			repository,
			keys,
			sync,
		})
	}

	/// Wires the backends the settings name.
	pub fn from_settings(settings: EnrollSettings) -> Result<Self, SettingsError> {
		let keys = settings.key_provider();
		let controller = settings.interface_controller();
		Self::new(settings, keys, controller)
	}

	pub fn repository(&self) -> &ConfigRepository {
		&self.repository
	}

	pub fn settings(&self) -> &EnrollSettings {
		&self.settings
	}

	/// Provisions `client` end to end. On failure nothing is left on disk
	/// and the error names the step that could not be completed.
	#[instrument(skip(self), fields(backend = self.keys.backend()))]
	pub async fn enroll(&self, client: &str) -> Result<EnrollmentReport, EnrollFailure> {
		let mut step = EnrollmentState::PreconditionCheck;
		match self.run(client, &mut step).await {
			Ok(report) => {
				info!(
					address = %report.address,
					public_key = %report.public_key,
					synced = report.sync.is_applied(),
					"client enrolled"
				);
				Ok(report)
			}
			Err(source) => Err(EnrollFailure {
				client: client.to_string(),
				step,
				source,
			}),
		}
	}

	async fn run(
		&self,
		client: &str,
		step: &mut EnrollmentState,
	) -> Result<EnrollmentReport, EnrollError> {
		let repo = &self.repository;

		let name = ClientName::parse(client)?;
		if !repo.is_initialized().await? {
			return Err(EnrollError::NotInitialized {
				path: repo.server_config_path(),
			});
		}
		self.ensure_new_client(&name).await?;

		advance(step, EnrollmentState::LockAcquired);
		let lock = GatewayLock::acquire(repo.lock_path()).await?;
		// Another enrollment may have finished while we waited.
		self.ensure_new_client(&name).await?;

		advance(step, EnrollmentState::ConfigLoaded);
		let config = repo.load().await?;

		advance(step, EnrollmentState::AddressAllocated);
		let address = AddressAllocator::for_config(&config).next_address(config.used_host_numbers())?;

		advance(step, EnrollmentState::KeysGenerated);
		let keys = generate_key_triple(self.keys.as_ref()).await?;
		let server_public_key = match repo.server_public_key_hint().await? {
			Some(key) => key,
			None => self.keys.derive_public_key(&config.private_key).await?,
		};

		let port = self
			.settings
			.listen_port
			.or(config.listen_port)
			.unwrap_or(DEFAULT_LISTEN_PORT);
		let document = ClientDocument::full_tunnel(
			keys.private.clone(),
			address,
			self.settings.dns.clone(),
			config.obfuscation.clone(),
			server_public_key,
			keys.preshared.clone(),
			&self.settings.endpoint_host,
			port,
		);
		let endpoint = document.endpoint.clone();
		let rendered = document.render();
		let record = PeerRecord::for_client(&name, keys.public, keys.preshared.clone(), address);

		advance(step, EnrollmentState::ClientPersisted);
		let client_dir = repo.client_dir(&name);
		let staged = StagedClient::create(repo, &name)
			.await
			.map_err(EnrollError::io(repo.clients_dir()))?;
		staged
			.write_bundle(&name, &keys, &rendered)
			.await
			.map_err(EnrollError::io(&client_dir))?;
		let pending = repo.prepare_append(&record).await?;
		let committed = staged
			.commit()
			.await
			.map_err(EnrollError::io(&client_dir))?;

		advance(step, EnrollmentState::ServerConfigAppended);
		if let Err(e) = pending.commit().await {
			committed.rollback().await;
			return Err(e.into());
		}

		advance(step, EnrollmentState::InterfaceSynced);
		let sync = match &self.sync {
			Some(sync) => sync.sync_peer(&self.settings.interface, &record).await,
			None => {
				debug!("live interface sync disabled");
				SyncOutcome::Skipped
			}
		};

		advance(step, EnrollmentState::LockReleased);
		lock.release()?;

		Ok(EnrollmentReport {
			client: name.to_string(),
			address,
			public_key: keys.public,
			endpoint,
			client_config: client_dir.join(client_config_file(&name)),
			client_dir,
			sync,
			document: rendered,
		})
	}

	async fn ensure_new_client(&self, name: &ClientName) -> Result<(), EnrollError> {
		if self.repository.client_exists(name).await? {
			return Err(EnrollError::DuplicateClient {
				name: name.to_string(),
			});
		}
		Ok(())
	}
}

fn advance(step: &mut EnrollmentState, next: EnrollmentState) {
	debug!(from = %step, to = %next, "enrollment step");
	*step = next;
}
