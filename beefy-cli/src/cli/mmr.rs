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

use crate::cli::utils::{Bytes, Hashes};
use beefy_light_client::{
	mmr::{decode_leaf, encode_leaf, hash_leaf, verify_inclusion, MerkleMountainRange},
	BeefyNextAuthoritySet, MmrLeaf, MmrLeafVersion, MmrProof, H256,
};
use parity_scale_codec::{Decode, DecodeAll, Encode};
use structopt::StructOpt;

/// MMR related commands
#[derive(Debug, StructOpt)]
#[structopt(about = "Merkle Mountain Range related commands.")]
pub enum Mmr {
	/// Encode and hash a BEEFY MMR Leaf.
	EncodeLeaf {
		/// Major version of the leaf format.
		#[structopt(long, default_value = "0")]
		major: u8,
		/// Minor version of the leaf format.
		#[structopt(long, default_value = "0")]
		minor: u8,
		/// Parent block number.
		#[structopt(long)]
		parent_number: u32,
		/// Parent block hash.
		#[structopt(long)]
		parent_hash: H256,
		/// Merkle root of the parachain heads.
		#[structopt(long)]
		parachain_heads: H256,
		/// Id of the next validator set.
		#[structopt(long)]
		next_set_id: u64,
		/// Length of the next validator set.
		#[structopt(long)]
		next_set_len: u32,
		/// Merkle root of the next validator set.
		#[structopt(long)]
		next_set_root: H256,
	},
	/// Decode a BEEFY MMR Leaf.
	DecodeLeaf {
		/// A SCALE-encoded MMR Leaf.
		leaf: Bytes,
		/// The leaf is double SCALE-encoded.
		///
		/// Leaves obtained via the `mmr_generateProof` custom RPC method are SCALE-encoded
		/// `Vec<u8>`s.
		#[structopt(long)]
		wrapped: bool,
	},
	/// Build an MMR over leaf hashes and generate an inclusion proof.
	GenerateProof {
		/// Index of the leaf to generate the proof for.
		leaf_index: u64,
		/// Comma-separated leaf hashes, in insertion order.
		leaves: Hashes,
	},
	/// Verify an MMR inclusion proof of an encoded leaf.
	VerifyProof {
		/// MMR root, i.e. the payload of the signed commitment.
		root: H256,
		/// A SCALE-encoded MMR Leaf.
		leaf: Bytes,
		/// SCALE-encoded MMR proof.
		proof: Bytes,
	},
}

impl Mmr {
	pub fn run(self) -> anyhow::Result<()> {
		match self {
			Self::EncodeLeaf {
				major,
				minor,
				parent_number,
				parent_hash,
				parachain_heads,
				next_set_id,
				next_set_len,
				next_set_root,
			} => {
				if major > 0b111 || minor > 0b11111 {
					anyhow::bail!("Version {}.{} does not fit 3 + 5 bits", major, minor);
				}
				let leaf = MmrLeaf {
					version: MmrLeafVersion::new(major, minor),
					parent_number_and_hash: (parent_number, parent_hash),
					parachain_heads,
					beefy_next_authority_set: BeefyNextAuthoritySet {
						id: next_set_id,
						len: next_set_len,
						root: next_set_root,
					},
				};
				let encoded = encode_leaf(&leaf);
				println!("SCALE-encoded leaf: 0x{}", hex::encode(&encoded));
				println!("Leaf hash: {:?}", hash_leaf(&encoded));
			}
			Self::DecodeLeaf { leaf, wrapped } => {
				let (leaf, hash) = decode(leaf.0, wrapped)?;
				println!("{:?}", leaf);
				println!("Leaf hash: {:?}", hash);
			}
			Self::GenerateProof { leaf_index, leaves } => {
				let (root, proof) = generate_mmr_proof(leaves.0, leaf_index)?;
				println!();
				println!("Root: {:?}", root);
				println!("SCALE-encoded proof: 0x{}", hex::encode(proof.encode()));
				println!();
			}
			Self::VerifyProof { root, leaf, proof } => {
				verify_mmr_proof(root, &leaf.0, &proof.0)?;
				println!("\nProof is correct.\n");
			}
		}
		Ok(())
	}
}

fn decode(leaf: Vec<u8>, wrapped: bool) -> anyhow::Result<(MmrLeaf, H256)> {
	let leaf = if wrapped { Vec::<u8>::decode(&mut &*leaf)? } else { leaf };

	Ok((decode_leaf(&leaf)?, hash_leaf(&leaf)))
}

fn generate_mmr_proof(leaves: Vec<H256>, leaf_index: u64) -> anyhow::Result<(H256, MmrProof)> {
	let mut mmr = MerkleMountainRange::new();
	for leaf in leaves {
		mmr.push(leaf);
	}

	let proof = mmr
		.proof(leaf_index)
		.ok_or_else(|| anyhow::format_err!("Leaf index out of bounds: {} vs {}", leaf_index, mmr.leaf_count()))?;

	Ok((mmr.root(), proof))
}

fn verify_mmr_proof(root: H256, leaf: &[u8], proof: &[u8]) -> anyhow::Result<()> {
	let proof = MmrProof::decode_all(&mut &*proof)?;
	let leaf_hash = hash_leaf(leaf);

	if !verify_inclusion(leaf_hash, &proof, &root) {
		anyhow::bail!("Leaf {:?} is not included at index {} under {:?}", leaf_hash, proof.leaf_index, root);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;

	const LEAF: [u8; 113] = hex!(
		"25"
		"2a000000"
		"4545454545454545454545454545454545454545454545454545454545454545"
		"1111111111111111111111111111111111111111111111111111111111111111"
		"0100000000000000"
		"02000000"
		"2222222222222222222222222222222222222222222222222222222222222222"
	);

	#[test]
	fn decode_leaf_works() {
		// when
		let (leaf, hash) = decode(LEAF.to_vec(), false).unwrap();

		// then
		assert_eq!(leaf.version.split(), (1, 5));
		assert_eq!(leaf.parent_number_and_hash, (42, H256::repeat_byte(0x45)));
		assert_eq!(leaf.beefy_next_authority_set.id, 1);
		assert_eq!(leaf.beefy_next_authority_set.len, 2);
		assert_eq!(
			hash,
			H256(hex!("2010a89c5e17f95208a0964fd87fa4bbe9e31059492748e8d8dd0765ed05ee55"))
		);

		// as returned by the RPC
		let (wrapped, _) = decode(LEAF.to_vec().encode(), true).unwrap();
		assert_eq!(wrapped, leaf);

		assert!(decode(LEAF.to_vec().encode(), false).is_err());
	}

	#[test]
	fn generate_proof_should_be_verified_correctly() {
		// given
		let mut leaves = (0..6_u8).map(H256::repeat_byte).collect::<Vec<_>>();
		leaves[3] = hash_leaf(&LEAF);

		// when
		let (root, proof) = generate_mmr_proof(leaves, 3).unwrap();

		// then
		verify_mmr_proof(root, &LEAF, &proof.encode()).unwrap();
		assert!(verify_mmr_proof(root, &LEAF[1..], &proof.encode()).is_err());
		assert!(verify_mmr_proof(H256::zero(), &LEAF, &proof.encode()).is_err());
	}

	#[test]
	fn out_of_bounds_leaf_fails() {
		assert!(generate_mmr_proof(vec![H256::zero()], 1).is_err());
	}
}
