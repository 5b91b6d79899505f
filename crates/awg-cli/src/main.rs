// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! awg-add-client - enroll a new client on an AmneziaWG gateway
//!
//! Allocates the next tunnel address, generates keys, writes the client
//! bundle under `clients/<name>/`, appends the peer to `server.conf` and
//! adds it to the running interface.

mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use awg_enroll::{
	EnrollSettings, KeyBackend, PeerEnrollmentService, DEFAULT_DNS, DEFAULT_EXTERNAL_TIMEOUT_SECS,
	DEFAULT_INTERFACE, DEFAULT_IP_BINARY, DEFAULT_SERVER_IP,
};
use awg_gateway_config::DEFAULT_CONFIG_DIR;
use awg_keys::DEFAULT_AWG_BINARY;

/// Enroll a new client on an AmneziaWG gateway
#[derive(Parser, Debug)]
#[command(name = "awg-add-client", version, about, long_about = None)]
struct Args {
	/// Name of the new client (letters, digits, '-', '_' and '.')
	client_name: String,

	/// Gateway configuration directory
	#[arg(long, env = "AWG_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
	config_dir: PathBuf,

	/// Public address clients connect to
	#[arg(long, env = "SERVER_IP", default_value = DEFAULT_SERVER_IP)]
	server_ip: String,

	/// Endpoint port for clients (defaults to the gateway ListenPort)
	#[arg(long, env = "LISTEN_PORT")]
	listen_port: Option<u16>,

	/// DNS server written into the client configuration
	#[arg(long, env = "DNS", default_value = DEFAULT_DNS)]
	dns: String,

	/// Running interface to add the peer to
	#[arg(long, env = "INTERFACE", default_value = DEFAULT_INTERFACE)]
	interface: String,

	/// Path or name of the awg tool
	#[arg(long, env = "AWG_BIN", default_value = DEFAULT_AWG_BINARY)]
	awg_bin: String,

	/// Path or name of the ip tool
	#[arg(long, env = "IP_BIN", default_value = DEFAULT_IP_BINARY)]
	ip_bin: String,

	/// Key generation backend (command or native)
	#[arg(long, env = "AWG_KEY_BACKEND", default_value_t = KeyBackend::Command)]
	key_backend: KeyBackend,

	/// Timeout in seconds for each awg/ip invocation
	#[arg(long, env = "AWG_EXTERNAL_TIMEOUT_SECS", default_value_t = DEFAULT_EXTERNAL_TIMEOUT_SECS)]
	timeout_secs: u64,

	/// Do not add the peer to the running interface
	#[arg(long, env = "AWG_NO_SYNC")]
	no_sync: bool,

	/// Log level or filter directive (overrides RUST_LOG)
	#[arg(short, long)]
	log_level: Option<String>,

	/// Output logs as JSON
	#[arg(long)]
	json_logs: bool,

	/// Print the enrollment report as JSON
	#[arg(long)]
	json: bool,
}

impl Args {
	fn settings(&self) -> EnrollSettings {
		EnrollSettings {
			config_dir: self.config_dir.clone(),
			endpoint_host: self.server_ip.clone(),
			listen_port: self.listen_port,
			dns: self.dns.clone(),
			interface: self.interface.clone(),
			awg_binary: self.awg_bin.clone(),
			ip_binary: self.ip_bin.clone(),
			key_backend: self.key_backend,
			external_timeout: Duration::from_secs(self.timeout_secs),
			sync_interface: !self.no_sync,
		}
	}
}

fn init_tracing(level: Option<&str>, json: bool) {
	let filter = match level {
		Some(level) => EnvFilter::new(level),
		None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
	};

	if json {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().compact().with_writer(std::io::stderr))
			.init();
	}
}

async fn run(args: &Args) -> Result<ExitCode> {
	let service = PeerEnrollmentService::from_settings(args.settings())
		.context("invalid configuration")?;

	tracing::debug!(
		config_dir = %args.config_dir.display(),
		backend = %args.key_backend,
		"starting enrollment"
	);

	match service.enroll(&args.client_name).await {
		Ok(report) => {
			if args.json {
				println!(
					"{}",
					serde_json::to_string_pretty(&report).context("failed to encode report")?
				);
			} else {
				output::print_report(&report);
			}
			Ok(ExitCode::SUCCESS)
		}
		Err(failure) => {
			output::print_failure(&failure);
			Ok(ExitCode::FAILURE)
		}
	}
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();
	init_tracing(args.log_level.as_deref(), args.json_logs);

	match run(&args).await {
		Ok(code) => code,
		Err(e) => {
			output::print_error(&e);
			ExitCode::FAILURE
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn args_are_well_formed() {
		Args::command().debug_assert();
	}

	#[test]
	fn flags_map_onto_settings() {
		let args = Args::try_parse_from([
			"awg-add-client",
			"alice",
			"--config-dir",
			"/tmp/gw",
			"--server-ip",
			"vpn.example.com",
			"--listen-port",
			"443",
			"--key-backend",
			"native",
			"--timeout-secs",
			"3",
			"--no-sync",
		])
		.unwrap();

		let settings = args.settings();
		assert_eq!(args.client_name, "alice");
		assert_eq!(settings.config_dir, PathBuf::from("/tmp/gw"));
		assert_eq!(settings.endpoint_host, "vpn.example.com");
		assert_eq!(settings.listen_port, Some(443));
		assert_eq!(settings.key_backend, KeyBackend::Native);
		assert_eq!(settings.external_timeout, Duration::from_secs(3));
		assert!(!settings.sync_interface);
	}

	#[test]
	fn unknown_key_backend_is_rejected() {
		let result = Args::try_parse_from(["awg-add-client", "alice", "--key-backend", "hsm"]);
		assert!(result.is_err());
	}
}
