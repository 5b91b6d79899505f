// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashSet;
use std::fmt::Write as _;
use std::net::Ipv4Addr;

use awg_keys::{WgPresharedKey, WgPrivateKey, WgPublicKey};
use ipnet::{IpNet, Ipv4Net};

use crate::client_name::ClientName;
use crate::document::{parse_sections, Section, SectionKind};
use crate::error::ParseError;
use crate::obfuscation::ObfuscationParams;

const CLIENT_ANNOTATION: &str = "Client:";

/// The gateway's durable configuration, parsed and validated.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
	/// The gateway's own tunnel address together with the tunnel mask.
	pub address: Ipv4Net,
	pub private_key: WgPrivateKey,
	pub listen_port: Option<u16>,
	pub obfuscation: ObfuscationParams,
	pub peers: Vec<PeerRecord>,
}

impl GatewayConfig {
	pub fn parse(text: &str) -> Result<Self, ParseError> {
		let mut interface: Option<Section> = None;
		let mut peers = Vec::new();

		for section in parse_sections(text)? {
			match section.kind {
				SectionKind::Interface => {
					if interface.is_some() {
						return Err(ParseError::DuplicateSection {
							line: section.line,
							section: SectionKind::Interface.name(),
						});
					}
					interface = Some(section);
				}
				SectionKind::Peer => {
					let record = PeerRecord::from_section(&section)?;
					peers.push((section.line, record));
				}
			}
		}

		let interface = interface.ok_or(ParseError::MissingSection("Interface"))?;
		let address = parse_interface_address(&interface)?;

		let key_entry = interface.require("PrivateKey")?;
		let private_key =
			WgPrivateKey::from_base64(&key_entry.value).map_err(|e| ParseError::InvalidValue {
				line: key_entry.line,
				field: "PrivateKey".to_string(),
				reason: e.to_string(),
			})?;

		let listen_port = interface
			.last("ListenPort")
			.map(|entry| {
				entry.value.parse::<u16>().map_err(|e| ParseError::InvalidValue {
					line: entry.line,
					field: "ListenPort".to_string(),
					reason: e.to_string(),
				})
			})
			.transpose()?;

		let obfuscation = ObfuscationParams::from_section(&interface)?;

		let network = address.trunc();
		let mut seen = HashSet::from([address.addr()]);
		for (line, record) in &peers {
			if let Some(host) = record.tunnel_address(&network) {
				if !seen.insert(host) {
					return Err(ParseError::DuplicateAddress {
						line: *line,
						address: host,
					});
				}
			}
		}

		Ok(Self {
			address,
			private_key,
			listen_port,
			obfuscation,
			peers: peers.into_iter().map(|(_, record)| record).collect(),
		})
	}

	/// The tunnel network, e.g. `10.0.0.0/24` for a gateway at `10.0.0.1/24`.
	pub fn network(&self) -> Ipv4Net {
		self.address.trunc()
	}

	pub fn gateway_host_number(&self) -> u32 {
		host_number(&self.network(), self.address.addr()).unwrap_or(0)
	}

	/// Host numbers currently held by peers, in document order.
	pub fn used_host_numbers(&self) -> Vec<u32> {
		let network = self.network();
		self
			.peers
			.iter()
			.filter_map(|peer| peer.tunnel_address(&network))
			.filter_map(|addr| host_number(&network, addr))
			.collect()
	}
}

/// Offset of `addr` from the network address, or `None` outside `network`.
pub fn host_number(network: &Ipv4Net, addr: Ipv4Addr) -> Option<u32> {
	if !network.contains(&addr) {
		return None;
	}
	Some(u32::from(addr) - u32::from(network.network()))
}

fn parse_interface_address(interface: &Section) -> Result<Ipv4Net, ParseError> {
	let entry = interface.require("Address")?;
	let invalid = |reason: String| ParseError::InvalidValue {
		line: entry.line,
		field: "Address".to_string(),
		reason,
	};

	for item in entry.value.split(',').map(str::trim) {
		if item.contains('.') {
			return item
				.parse::<Ipv4Net>()
				.map_err(|_| invalid(format!("{item:?} is not an IPv4 address with prefix length")));
		}
	}

	Err(invalid(format!(
		"{:?} has no IPv4 tunnel address",
		entry.value
	)))
}

/// One `[Peer]` section of the gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
	pub name: Option<String>,
	pub public_key: WgPublicKey,
	pub preshared_key: Option<WgPresharedKey>,
	pub allowed_ips: Vec<IpNet>,
}

impl PeerRecord {
	/// A client peer restricted to a single tunnel address.
	pub fn for_client(
		name: &ClientName,
		public_key: WgPublicKey,
		preshared_key: WgPresharedKey,
		address: Ipv4Addr,
	) -> Self {
		Self {
			name: Some(name.to_string()),
			public_key,
			preshared_key: Some(preshared_key),
			allowed_ips: vec![IpNet::V4(Ipv4Net::from(address))],
		}
	}

	/// The single-host (`/32`) entry of `AllowedIPs` inside `network`, which
	/// is the address the peer was allocated.
	pub fn tunnel_address(&self, network: &Ipv4Net) -> Option<Ipv4Addr> {
		self.allowed_ips.iter().find_map(|net| match net {
			IpNet::V4(v4) if v4.prefix_len() == 32 && network.contains(&v4.addr()) => Some(v4.addr()),
			_ => None,
		})
	}

	/// Serializes the record as a `[Peer]` block ending in a newline.
	pub fn render(&self) -> String {
		let mut out = String::from("[Peer]\n");
		if let Some(name) = &self.name {
			let _ = writeln!(out, "# {CLIENT_ANNOTATION} {name}");
		}
		let _ = writeln!(out, "PublicKey = {}", self.public_key);
		if let Some(psk) = &self.preshared_key {
			let _ = writeln!(out, "PresharedKey = {}", psk.to_base64().expose());
		}
		if !self.allowed_ips.is_empty() {
			let ips: Vec<String> = self.allowed_ips.iter().map(ToString::to_string).collect();
			let _ = writeln!(out, "AllowedIPs = {}", ips.join(", "));
		}
		out
	}

	fn from_section(section: &Section) -> Result<Self, ParseError> {
		let name = section.comments.iter().find_map(|c| {
			c.strip_prefix(CLIENT_ANNOTATION)
				.map(|rest| rest.trim().to_string())
				.filter(|rest| !rest.is_empty())
		});

		let key_entry = section.require("PublicKey")?;
		let public_key =
			WgPublicKey::from_base64(&key_entry.value).map_err(|e| ParseError::InvalidValue {
				line: key_entry.line,
				field: "PublicKey".to_string(),
				reason: e.to_string(),
			})?;

		let preshared_key = section
			.last("PresharedKey")
			.map(|entry| {
				WgPresharedKey::from_base64(&entry.value).map_err(|e| ParseError::InvalidValue {
					line: entry.line,
					field: "PresharedKey".to_string(),
					reason: e.to_string(),
				})
			})
			.transpose()?;

		let mut allowed_ips = Vec::new();
		for entry in section.all("AllowedIPs") {
			for item in entry.value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
				let net = item.parse::<IpNet>().map_err(|_| ParseError::InvalidValue {
					line: entry.line,
					field: "AllowedIPs".to_string(),
					reason: format!("{item:?} is not a CIDR block"),
				})?;
				allowed_ips.push(net);
			}
		}

		Ok(Self {
			name,
			public_key,
			preshared_key,
			allowed_ips,
		})
	}
}
