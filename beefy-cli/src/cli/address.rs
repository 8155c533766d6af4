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

use crate::cli::utils::Bytes;
use beefy_light_client::{signature::public_to_address, Address};
use structopt::StructOpt;

/// Derive validator addresses from public keys.
#[derive(Debug, StructOpt)]
#[structopt(about = "Derive the Ethereum address of one or more secp256k1 public keys")]
pub struct PublicToAddress {
	/// Public keys, either compressed (33 bytes), uncompressed (65 bytes) or raw (64 bytes).
	///
	/// This can be obtained by querying `beefy.authorities`/`beefy.nextAuthorities` storage items
	/// of the BEEFY pallet.
	#[structopt(required = true, min_values = 1)]
	pub public_keys: Vec<Bytes>,
}

impl PublicToAddress {
	pub fn run(self) -> anyhow::Result<()> {
		for key in self.public_keys {
			let address = address_of(&key.0)?;
			println!("[0x{}] Address:\n\t {:?}", hex::encode(&key.0), address);
		}
		Ok(())
	}
}

fn address_of(public_key: &[u8]) -> anyhow::Result<Address> {
	let public = secp256k1::PublicKey::parse_slice(public_key, None)
		.map_err(|e| anyhow::format_err!("Invalid public key 0x{}: {}", hex::encode(public_key), e))?;

	Ok(public_to_address(&public))
}

#[cfg(test)]
mod tests {
	use super::*;
	use beefy_light_client::Keyring;

	#[test]
	fn every_key_format_gives_same_address() {
		// given
		let public = Keyring::Alice.public();
		let full = public.serialize();

		// then
		assert_eq!(address_of(&full).unwrap(), Keyring::Alice.address());
		assert_eq!(address_of(&full[1..]).unwrap(), Keyring::Alice.address());
		assert_eq!(address_of(&public.serialize_compressed()).unwrap(), Keyring::Alice.address());
	}

	#[test]
	fn invalid_key_is_rejected() {
		assert!(address_of(&[2_u8; 20]).is_err());
		assert!(address_of(&[0_u8; 33]).is_err());
	}
}
