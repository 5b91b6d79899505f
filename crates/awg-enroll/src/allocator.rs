// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;

use awg_gateway_config::GatewayConfig;
use ipnet::Ipv4Net;
use thiserror::Error;
use tracing::debug;

/// Host number handed to the first client; `.1` is conventionally the gateway.
pub const FIRST_CLIENT_HOST: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("address space of {network} is exhausted: host {candidate} is past the last usable host {last_usable}")]
pub struct AddressSpaceExhausted {
	pub network: Ipv4Net,
	pub candidate: u64,
	pub last_usable: u64,
}

/// Hands out the next tunnel address after the highest one in use.
///
/// Freed addresses are never reused; allocation always moves past the
/// current maximum.
#[derive(Debug, Clone, Copy)]
pub struct AddressAllocator {
	network: Ipv4Net,
	gateway_host: u64,
}

impl AddressAllocator {
	pub fn new(network: Ipv4Net, gateway: Ipv4Addr) -> Self {
		let network = network.trunc();
		let gateway_host = u64::from(u32::from(gateway).wrapping_sub(u32::from(network.network())));
		Self {
			network,
			gateway_host,
		}
	}

	pub fn for_config(config: &GatewayConfig) -> Self {
		Self::new(config.network(), config.address.addr())
	}

	pub fn network(&self) -> Ipv4Net {
		self.network
	}

	/// `2^(32 - len) - 2`: everything below the broadcast address.
	pub fn last_usable_host(&self) -> u64 {
		let size = 1u64 << (32 - u32::from(self.network.prefix_len()));
		size.saturating_sub(2)
	}

	pub fn next_host_number(
		&self,
		used: impl IntoIterator<Item = u32>,
	) -> Result<u64, AddressSpaceExhausted> {
		let mut host = used
			.into_iter()
			.max()
			.map_or(FIRST_CLIENT_HOST, |max| (u64::from(max) + 1).max(FIRST_CLIENT_HOST));
		if host == self.gateway_host {
			host += 1;
		}

		if host > self.last_usable_host() {
			return Err(self.exhausted(host));
		}
		Ok(host)
	}

	fn exhausted(&self, candidate: u64) -> AddressSpaceExhausted {
		AddressSpaceExhausted {
			network: self.network,
			candidate,
			last_usable: self.last_usable_host(),
		}
	}

	pub fn next_address(
		&self,
		used: impl IntoIterator<Item = u32>,
	) -> Result<Ipv4Addr, AddressSpaceExhausted> {
		let host = self.next_host_number(used)?;
		let addr = u32::try_from(host)
			.ok()
			.and_then(|offset| u32::from(self.network.network()).checked_add(offset))
			.map(Ipv4Addr::from)
			.ok_or_else(|| self.exhausted(host))?;
		debug!(network = %self.network, host, %addr, "allocated tunnel address");
		Ok(addr)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn allocator(cidr: &str) -> AddressAllocator {
		let net: Ipv4Net = cidr.parse().unwrap();
		AddressAllocator::new(net, net.addr())
	}

	#[test]
	fn first_client_gets_host_two() {
		let alloc = allocator("10.0.0.1/24");
		assert_eq!(alloc.next_address([]).unwrap(), Ipv4Addr::new(10, 0, 0, 2));
	}

	#[test]
	fn follows_highest_used_host() {
		let alloc = allocator("10.0.0.1/24");
		assert_eq!(alloc.next_address([2]).unwrap(), Ipv4Addr::new(10, 0, 0, 3));
		assert_eq!(alloc.next_address([7, 3, 5]).unwrap(), Ipv4Addr::new(10, 0, 0, 8));
	}

	#[test]
	fn gaps_are_not_reused() {
		let alloc = allocator("10.0.0.1/24");
		assert_eq!(alloc.next_address([2, 9]).unwrap(), Ipv4Addr::new(10, 0, 0, 10));
	}

	#[test]
	fn skips_gateway_host() {
		let alloc = allocator("10.0.0.5/24");
		assert_eq!(alloc.next_address([4]).unwrap(), Ipv4Addr::new(10, 0, 0, 6));
	}

	#[test]
	fn gateway_on_host_two_pushes_first_client_to_three() {
		let alloc = allocator("10.0.0.2/24");
		assert_eq!(alloc.next_address([]).unwrap(), Ipv4Addr::new(10, 0, 0, 3));
	}

	#[test]
	fn crosses_octet_boundaries_in_wide_networks() {
		let alloc = allocator("10.8.0.1/16");
		assert_eq!(alloc.next_address([255]).unwrap(), Ipv4Addr::new(10, 8, 1, 0));
	}

	#[test]
	fn exhaustion_is_an_error() {
		let alloc = allocator("10.0.0.1/24");
		assert_eq!(alloc.last_usable_host(), 254);
		assert!(alloc.next_address([253]).is_ok());

		let err = alloc.next_address([254]).unwrap_err();
		assert_eq!(err.candidate, 255);
		assert_eq!(err.last_usable, 254);
	}

	#[test]
	fn tiny_networks_have_no_room() {
		assert!(allocator("10.0.0.1/30").next_address([]).is_ok());
		assert!(allocator("10.0.0.1/30").next_address([2]).is_err());
		assert!(allocator("10.0.0.1/31").next_address([]).is_err());
		assert!(allocator("10.0.0.1/32").next_address([]).is_err());
	}

	#[test]
	fn widest_prefix_exhausts_without_overflow() {
		let alloc = allocator("0.0.0.1/0");
		assert_eq!(
			alloc.next_address([u32::MAX - 2]).unwrap(),
			Ipv4Addr::new(255, 255, 255, 254)
		);

		let err = alloc.next_address([u32::MAX - 1, u32::MAX]).unwrap_err();
		assert_eq!(err.candidate, u64::from(u32::MAX) + 1);
		assert_eq!(err.last_usable, u64::from(u32::MAX) - 1);
	}

	proptest! {
		#[test]
		fn allocation_is_past_every_used_host(
			prefix in 16u8..=30,
			used in proptest::collection::vec(0u32..1024, 0..20),
		) {
			let net = Ipv4Net::new(Ipv4Addr::new(10, 0, 0, 1), prefix).unwrap();
			let alloc = AddressAllocator::new(net, net.addr());
			match alloc.next_host_number(used.iter().copied()) {
				Ok(host) => {
					prop_assert!(host >= FIRST_CLIENT_HOST);
					prop_assert!(host != 1);
					prop_assert!(host <= alloc.last_usable_host());
					prop_assert!(used.iter().all(|u| u64::from(*u) < host));
					let addr = alloc.next_address(used.iter().copied()).unwrap();
					prop_assert!(alloc.network().contains(&addr));
				}
				Err(err) => prop_assert!(err.candidate > alloc.last_usable_host()),
			}
		}

		#[test]
		fn successive_allocations_strictly_increase(count in 1usize..50) {
			let alloc = allocator("10.0.0.1/24");
			let mut used = Vec::new();
			let mut last = 0;
			for _ in 0..count {
				let host = alloc.next_host_number(used.iter().copied()).unwrap();
				prop_assert!(host > last);
				last = host;
				used.push(host as u32);
			}
			prop_assert_eq!(used.first().copied(), Some(2));
		}
	}
}
