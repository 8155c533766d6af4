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

use crate::cli::utils::{Addresses, Bytes};
use beefy_light_client::{
	validator_set::verify_membership, Address, MembershipProof, ValidatorSet, ValidatorSetId, H256,
};
use parity_scale_codec::{DecodeAll, Encode};
use structopt::StructOpt;

/// Validator address merkle tree related commands.
#[derive(Debug, StructOpt)]
#[structopt(about = "Construct or verify a membership proof of a BEEFY validator.")]
pub enum ValidatorTree {
	/// Construct a merkle tree of validator addresses and generate a membership proof.
	GenerateProof {
		/// Position of the validator to generate the proof for.
		position: u32,
		/// Comma-separated validator addresses, in validator set order.
		addresses: Addresses,
		/// Validator set id.
		#[structopt(long, default_value = "0")]
		set_id: ValidatorSetId,
	},
	/// Verify a membership proof given the validator set root and length.
	VerifyProof {
		/// Merkle root of the validator set.
		root: H256,
		/// Number of validators in the set.
		len: u32,
		/// SCALE-encoded membership proof.
		proof: Bytes,
	},
}

impl ValidatorTree {
	pub fn run(self) -> anyhow::Result<()> {
		match self {
			Self::GenerateProof {
				position,
				addresses,
				set_id,
			} => {
				let (set, proof) = generate_membership_proof(&addresses.0, position, set_id)?;
				println!();
				println!("Root: {:?}", set.root);
				println!("Length: {}", set.len);
				println!("SCALE-encoded validator set: 0x{}", hex::encode(set.encode()));
				println!("\nAddress: {:?}", proof.address);
				println!("SCALE-encoded proof: 0x{}", hex::encode(proof.encode()));
				println!();
				Ok(())
			}
			Self::VerifyProof { root, len, proof } => {
				let proof = verify_membership_proof(root, len, &proof.0)?;
				println!("\nProof for validator #{} ({:?}) is correct.\n", proof.position, proof.address);
				Ok(())
			}
		}
	}
}

fn generate_membership_proof(
	addresses: &[Address],
	position: u32,
	set_id: ValidatorSetId,
) -> anyhow::Result<(ValidatorSet, MembershipProof)> {
	let proof = MembershipProof::generate(addresses, position)
		.ok_or_else(|| anyhow::format_err!("Position out of bounds: {} vs {}", position, addresses.len()))?;

	Ok((ValidatorSet::from_addresses(addresses, set_id)?, proof))
}

fn verify_membership_proof(root: H256, len: u32, proof: &[u8]) -> anyhow::Result<MembershipProof> {
	let proof = MembershipProof::decode_all(&mut &*proof)?;
	// the id plays no part in membership
	let set = ValidatorSet { root, len, id: 0 };

	if !verify_membership(&set, &proof) {
		anyhow::bail!("Invalid proof for validator #{} ({:?})", proof.position, proof.address);
	}

	Ok(proof)
}

#[cfg(test)]
mod tests {
	use super::*;
	use beefy_light_client::Keyring;

	fn addresses() -> Vec<Address> {
		Keyring::iter().take(5).map(Keyring::address).collect()
	}

	#[test]
	fn generate_proof_should_be_verified_correctly() {
		for position in 0..5 {
			// given
			let (set, proof) = generate_membership_proof(&addresses(), position, 3).unwrap();

			// when
			let verified = verify_membership_proof(set.root, set.len, &proof.encode());

			// then
			assert_eq!(verified.unwrap(), proof);
			assert_eq!(set.id, 3);
		}
	}

	#[test]
	fn wrong_root_or_length_fails() {
		let (set, proof) = generate_membership_proof(&addresses(), 4, 0).unwrap();

		assert!(verify_membership_proof(H256::repeat_byte(1), set.len, &proof.encode()).is_err());
		assert!(verify_membership_proof(set.root, set.len + 1, &proof.encode()).is_err());
		assert!(verify_membership_proof(set.root, set.len, &proof.encode()[1..]).is_err());
	}

	#[test]
	fn out_of_bounds_position_fails() {
		assert!(generate_membership_proof(&addresses(), 5, 0).is_err());
	}
}
