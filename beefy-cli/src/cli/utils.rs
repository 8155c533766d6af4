// Copyright (C) 2021 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later WITH Classpath-exception-2.0

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use beefy_light_client::{Address, H256};

/// Parse hex string to a vector of bytes.
pub fn parse_hex(hex: &str) -> anyhow::Result<Vec<u8>> {
	let s = hex.strip_prefix("0x").unwrap_or(hex);

	Ok(hex::decode(s)?)
}

/// Parse a hex string of exactly `N` bytes.
fn parse_fixed<const N: usize>(hex: &str) -> anyhow::Result<[u8; N]> {
	let bytes = parse_hex(hex)?;
	if bytes.len() != N {
		anyhow::bail!("Expected {} bytes, got {}: {}", N, bytes.len(), hex);
	}

	let mut fixed = [0_u8; N];
	fixed.copy_from_slice(&bytes);
	Ok(fixed)
}

/// A wrapper struct to overcome structopt's `Vec` special handling.
#[derive(Debug)]
pub struct Bytes(pub Vec<u8>);
impl std::str::FromStr for Bytes {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> anyhow::Result<Self> {
		parse_hex(s).map(Bytes)
	}
}

/// Comma-separated list of hex encoded addresses.
#[derive(Debug)]
pub struct Addresses(pub Vec<Address>);
impl std::str::FromStr for Addresses {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> anyhow::Result<Self> {
		s.split(',')
			.map(|a| parse_fixed::<20>(a.trim()).map(Address::from))
			.collect::<anyhow::Result<_>>()
			.map(Addresses)
	}
}

/// Comma-separated list of hex encoded 32 byte hashes.
#[derive(Debug)]
pub struct Hashes(pub Vec<H256>);
impl std::str::FromStr for Hashes {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> anyhow::Result<Self> {
		s.split(',')
			.map(|h| parse_fixed::<32>(h.trim()).map(H256::from))
			.collect::<anyhow::Result<_>>()
			.map(Hashes)
	}
}

/// Comma-separated list of validator positions.
#[derive(Debug)]
pub struct Positions(pub Vec<u32>);
impl std::str::FromStr for Positions {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> anyhow::Result<Self> {
		s.split(',')
			.map(|p| p.trim().parse::<u32>().map_err(anyhow::Error::from))
			.collect::<anyhow::Result<_>>()
			.map(Positions)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;

	#[test]
	fn parse_hex_accepts_optional_prefix() {
		assert_eq!(parse_hex("0x0102").unwrap(), vec![1, 2]);
		assert_eq!(parse_hex("0102").unwrap(), vec![1, 2]);
		assert!(parse_hex("0x012").is_err());
	}

	#[test]
	fn parse_lists() {
		let addresses: Addresses = "0xE04CC55ebEE1cBCE552f250e85c57B70B2E2625b, 25451A4de12dcCc2D166922fA938E900fCc4ED24"
			.parse()
			.unwrap();
		assert_eq!(
			addresses.0,
			vec![
				Address::from(hex!("E04CC55ebEE1cBCE552f250e85c57B70B2E2625b")),
				Address::from(hex!("25451A4de12dcCc2D166922fA938E900fCc4ED24")),
			]
		);

		// too short
		assert!("0xE04CC55ebEE1cBCE552f250e85c57B70B2E262".parse::<Addresses>().is_err());

		let positions: Positions = "0, 3,64".parse().unwrap();
		assert_eq!(positions.0, vec![0, 3, 64]);
		assert!("0,x".parse::<Positions>().is_err());
	}
}
