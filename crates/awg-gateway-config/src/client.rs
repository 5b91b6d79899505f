// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The configuration document handed to an enrolled client.

use std::fmt::Write as _;
use std::net::Ipv4Addr;

use awg_common_secret::SecretString;
use awg_keys::{WgPresharedKey, WgPrivateKey, WgPublicKey};
use ipnet::{IpNet, Ipv4Net};

use crate::document::{parse_sections, Entry, Section, SectionKind};
use crate::error::ParseError;
use crate::obfuscation::ObfuscationParams;

pub const CLIENT_MTU: u16 = 1280;
pub const PERSISTENT_KEEPALIVE_SECS: u16 = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDocument {
	pub private_key: WgPrivateKey,
	pub address: Ipv4Addr,
	pub dns: String,
	pub mtu: u16,
	pub obfuscation: ObfuscationParams,
	pub server_public_key: WgPublicKey,
	pub preshared_key: WgPresharedKey,
	/// `host:port` of the gateway.
	pub endpoint: String,
	pub allowed_ips: Vec<IpNet>,
	pub persistent_keepalive: u16,
}

impl ClientDocument {
	/// Full-tunnel document with the standard MTU and keepalive.
	#[allow(clippy::too_many_arguments)]
	pub fn full_tunnel(
		private_key: WgPrivateKey,
		address: Ipv4Addr,
		dns: impl Into<String>,
		obfuscation: ObfuscationParams,
		server_public_key: WgPublicKey,
		preshared_key: WgPresharedKey,
		endpoint_host: &str,
		endpoint_port: u16,
	) -> Self {
		Self {
			private_key,
			address,
			dns: dns.into(),
			mtu: CLIENT_MTU,
			obfuscation,
			server_public_key,
			preshared_key,
			endpoint: format!("{endpoint_host}:{endpoint_port}"),
			allowed_ips: vec![
				IpNet::V4(Ipv4Net::default()),
				IpNet::V6(ipnet::Ipv6Net::default()),
			],
			persistent_keepalive: PERSISTENT_KEEPALIVE_SECS,
		}
	}

	/// Renders the document. The result carries the client's private key.
	pub fn render(&self) -> SecretString {
		let mut out = String::from("[Interface]\n");
		let _ = writeln!(out, "PrivateKey = {}", self.private_key.to_base64().expose());
		let _ = writeln!(out, "Address = {}/32", self.address);
		let _ = writeln!(out, "DNS = {}", self.dns);
		let _ = writeln!(out, "MTU = {}", self.mtu);
		for (param, value) in self.obfuscation.rendered() {
			let _ = writeln!(out, "{param} = {value}");
		}

		out.push_str("\n[Peer]\n");
		let _ = writeln!(out, "PublicKey = {}", self.server_public_key);
		let _ = writeln!(out, "PresharedKey = {}", self.preshared_key.to_base64().expose());
		let _ = writeln!(out, "Endpoint = {}", self.endpoint);
		let ips: Vec<String> = self.allowed_ips.iter().map(ToString::to_string).collect();
		let _ = writeln!(out, "AllowedIPs = {}", ips.join(", "));
		let _ = writeln!(out, "PersistentKeepalive = {}", self.persistent_keepalive);

		SecretString::new(out)
	}

	pub fn parse(text: &str) -> Result<Self, ParseError> {
		let sections = parse_sections(text)?;
		let interface = single(&sections, SectionKind::Interface)?;
		let peer = single(&sections, SectionKind::Peer)?;

		let private_key = key_field(interface, "PrivateKey", WgPrivateKey::from_base64)?;

		let address_entry = interface.require("Address")?;
		let address = address_entry
			.value
			.parse::<Ipv4Net>()
			.ok()
			.filter(|net| net.prefix_len() == 32)
			.map(|net| net.addr())
			.ok_or_else(|| invalid(address_entry, "expected a single IPv4 host (/32)".to_string()))?;

		let dns = interface
			.last("DNS")
			.map(|e| e.value.clone())
			.unwrap_or_default();
		let mtu = number_field(interface, "MTU")?.unwrap_or(CLIENT_MTU);
		let obfuscation = ObfuscationParams::from_section(interface)?;

		let server_public_key = key_field(peer, "PublicKey", WgPublicKey::from_base64)?;
		let preshared_key = key_field(peer, "PresharedKey", WgPresharedKey::from_base64)?;
		let endpoint = peer.require("Endpoint")?.value.clone();

		let mut allowed_ips = Vec::new();
		for entry in peer.all("AllowedIPs") {
			for item in entry.value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
				let net = item
					.parse::<IpNet>()
					.map_err(|_| invalid(entry, format!("{item:?} is not a CIDR block")))?;
				allowed_ips.push(net);
			}
		}
		let persistent_keepalive = number_field(peer, "PersistentKeepalive")?.unwrap_or(0);

		Ok(Self {
			private_key,
			address,
			dns,
			mtu,
			obfuscation,
			server_public_key,
			preshared_key,
			endpoint,
			allowed_ips,
			persistent_keepalive,
		})
	}
}

fn single(sections: &[Section], kind: SectionKind) -> Result<&Section, ParseError> {
	let mut matching = sections.iter().filter(|s| s.kind == kind);
	let first = matching.next().ok_or(ParseError::MissingSection(kind.name()))?;
	if let Some(extra) = matching.next() {
		return Err(ParseError::DuplicateSection {
			line: extra.line,
			section: kind.name(),
		});
	}
	Ok(first)
}

fn invalid(entry: &Entry, reason: String) -> ParseError {
	ParseError::InvalidValue {
		line: entry.line,
		field: entry.key.clone(),
		reason,
	}
}

fn key_field<T>(
	section: &Section,
	field: &'static str,
	decode: impl FnOnce(&str) -> awg_keys::keys::Result<T>,
) -> Result<T, ParseError> {
	let entry = section.require(field)?;
	decode(&entry.value).map_err(|e| invalid(entry, e.to_string()))
}

fn number_field(section: &Section, field: &str) -> Result<Option<u16>, ParseError> {
	section
		.last(field)
		.map(|entry| {
			entry
				.value
				.parse::<u16>()
				.map_err(|e| invalid(entry, e.to_string()))
		})
		.transpose()
}
