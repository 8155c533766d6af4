// Copyright (C) 2020-2021 Parity Technologies (UK) Ltd.
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

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! A binary merkle tree over an ordered list of leaves.
//!
//! Every leaf is hashed first. Pairs of nodes are combined as `hash(left ++ right)`; the last
//! node of an odd-width layer is promoted to the next layer unchanged. The root of an empty
//! tree is all zeroes.
//!
//! BEEFY light clients use this tree to commit to a validator set: the leaves are the
//! validators' Ethereum addresses and a [`merkle_proof`] proves membership of a single
//! address at a given position.

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Output of the [`Hasher`] and type of every node in the tree.
pub type Hash = [u8; 32];

/// Supported hashing output size.
pub trait Hasher {
	/// Hash given arbitrary-length piece of data.
	fn hash(data: &[u8]) -> Hash;
}

#[cfg(feature = "keccak")]
mod keccak256 {
	use tiny_keccak::{Hasher as _, Keccak};

	/// Keccak256 hasher implementation.
	pub struct Keccak256;

	impl super::Hasher for Keccak256 {
		fn hash(data: &[u8]) -> super::Hash {
			let mut keccak = Keccak::v256();
			keccak.update(data);
			let mut output = [0_u8; 32];
			keccak.finalize(&mut output);
			output
		}
	}
}

#[cfg(feature = "keccak")]
pub use keccak256::Keccak256;

/// Construct a root hash of a binary merkle tree created from given leaves.
///
/// See the crate-level docs for the exact tree layout.
pub fn merkle_root<H, I, T>(leaves: I) -> Hash
where
	H: Hasher,
	I: IntoIterator<Item = T>,
	T: AsRef<[u8]>,
{
	let iter = leaves.into_iter().map(|l| H::hash(l.as_ref()));
	let mut next = match merkelize_row::<H, _>(iter) {
		Ok(root) => return root,
		Err(next) if next.is_empty() => return Hash::default(),
		Err(next) => next,
	};

	loop {
		#[cfg(feature = "debug")]
		log::trace!(target: "beefy", "🥩 merkle layer of {} nodes", next.len());

		next = match merkelize_row::<H, _>(next.into_iter()) {
			Ok(root) => {
				#[cfg(feature = "debug")]
				log::debug!(target: "beefy", "🥩 merkle root: 0x{}", hex::encode(&root));
				return root;
			}
			Err(next) => next,
		};
	}
}

fn merkelize_row<H, I>(mut iter: I) -> Result<Hash, Vec<Hash>>
where
	H: Hasher,
	I: Iterator<Item = Hash>,
{
	let mut next = Vec::with_capacity(iter.size_hint().0);
	loop {
		let a = iter.next();
		let b = iter.next();

		match (a, b) {
			(Some(a), Some(b)) => next.push(combine::<H>(&a, &b)),
			// Odd number of items. Promote the item to the upper layer.
			(Some(a), None) if !next.is_empty() => next.push(a),
			// Last item = root.
			(Some(a), None) => return Ok(a),
			// Finish up, no more items.
			_ => return Err(next),
		}
	}
}

fn combine<H: Hasher>(left: &Hash, right: &Hash) -> Hash {
	let mut combined = [0_u8; 64];
	combined[0..32].copy_from_slice(left);
	combined[32..64].copy_from_slice(right);
	H::hash(&combined)
}

/// A generated merkle proof.
///
/// The structure contains all necessary data to later on verify the proof and the leaf itself.
#[derive(Debug, PartialEq, Eq)]
pub struct MerkleProof<T> {
	/// Root hash of generated merkle tree.
	pub root: Hash,
	/// Proof items (does not contain the leaf hash, nor the root obviously).
	///
	/// This vec contains all inner node hashes necessary to reconstruct the root hash given the
	/// leaf hash, ordered from the bottom of the tree up.
	pub proof: Vec<Hash>,
	/// Number of leaves in the original tree.
	///
	/// This is needed to detect the layers in which the proven node got promoted.
	pub number_of_leaves: usize,
	/// Index of the leaf the proof is for (0-based).
	pub leaf_index: usize,
	/// Leaf content.
	pub leaf: T,
}

/// Construct a merkle proof for the leaf at `leaf_index`.
///
/// Returns `None` if `leaf_index` is out of bounds.
pub fn merkle_proof<H, I, T>(leaves: I, leaf_index: usize) -> Option<MerkleProof<T>>
where
	H: Hasher,
	I: IntoIterator<Item = T>,
	T: AsRef<[u8]>,
{
	let mut leaf = None;
	let mut layer = leaves
		.into_iter()
		.enumerate()
		.map(|(idx, l)| {
			let hash = H::hash(l.as_ref());
			if idx == leaf_index {
				leaf = Some(l);
			}
			hash
		})
		.collect::<Vec<_>>();
	let leaf = leaf?;

	let number_of_leaves = layer.len();
	let mut proof = Vec::new();
	let mut position = leaf_index;

	while layer.len() > 1 {
		let sibling = if position % 2 == 0 { position + 1 } else { position - 1 };
		if let Some(hash) = layer.get(sibling) {
			proof.push(*hash);
		}

		layer = layer
			.chunks(2)
			.map(|pair| match pair {
				[a, b] => combine::<H>(a, b),
				[a] => *a,
				_ => unreachable!("chunks(2) yields one or two items; qed"),
			})
			.collect();
		position /= 2;
	}

	Some(MerkleProof {
		root: layer[0],
		proof,
		number_of_leaves,
		leaf_index,
		leaf,
	})
}

/// Verify a merkle proof given the root hash, the proof items and the leaf value.
///
/// The leaf value is hashed the same way [`merkle_root`] hashes leaves. Proof items are
/// consumed bottom-up; the left/right order at every layer follows from the parity of the
/// node position. Returns `false` if `leaf_index` is out of bounds or if the proof has
/// too few or too many items for a tree of `number_of_leaves`.
pub fn verify_proof<H, P>(root: &Hash, proof: P, number_of_leaves: usize, leaf_index: usize, leaf: &[u8]) -> bool
where
	H: Hasher,
	P: IntoIterator<Item = Hash>,
{
	if leaf_index >= number_of_leaves {
		return false;
	}

	let mut proof = proof.into_iter();
	let mut hash = H::hash(leaf);
	let mut position = leaf_index;
	let mut width = number_of_leaves;

	while width > 1 {
		let promoted = width % 2 == 1 && position == width - 1;
		if !promoted {
			let sibling = match proof.next() {
				Some(sibling) => sibling,
				None => return false,
			};
			hash = if position % 2 == 0 {
				combine::<H>(&hash, &sibling)
			} else {
				combine::<H>(&sibling, &hash)
			};
		}
		position /= 2;
		width = (width + 1) / 2;
	}

	proof.next().is_none() && &hash == root
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;

	#[test]
	fn should_generate_empty_root() {
		// given
		let _ = env_logger::try_init();
		let data: Vec<[u8; 1]> = Default::default();

		// when
		let out = merkle_root::<Keccak256, _, _>(data);

		// then
		assert_eq!(
			hex::encode(&out),
			"0000000000000000000000000000000000000000000000000000000000000000"
		);
	}

	#[test]
	fn should_generate_single_root() {
		// given
		let _ = env_logger::try_init();
		let data = vec![hex!("E04CC55ebEE1cBCE552f250e85c57B70B2E2625b")];

		// when
		let out = merkle_root::<Keccak256, _, _>(data);

		// then
		assert_eq!(
			hex::encode(&out),
			"aeb47a269393297f4b0a3c9c9cfd00c7a4195255274cf39d83dabc2fcc9ff3d7"
		);
	}

	#[test]
	fn should_generate_root_pow_2() {
		// given
		let _ = env_logger::try_init();
		let data = vec![
			hex!("E04CC55ebEE1cBCE552f250e85c57B70B2E2625b"),
			hex!("25451A4de12dcCc2D166922fA938E900fCc4ED24"),
		];

		// when
		let out = merkle_root::<Keccak256, _, _>(data);

		// then
		assert_eq!(
			hex::encode(&out),
			"697ea2a8fe5b03468548a7a413424a6292ab44a82a6f5cc594c3fa7dda7ce402"
		);
	}

	#[test]
	fn should_generate_root_complex() {
		let _ = env_logger::try_init();
		let test = |root, data| {
			assert_eq!(hex::encode(&merkle_root::<Keccak256, _, _>(data)), root);
		};

		test(
			"aff1208e69c9e8be9b584b07ebac4e48a1ee9d15ce3afe20b77a4d29e4175aa3",
			vec!["a", "b", "c"],
		);

		test(
			"b8912f7269068901f231a965adfefbc10f0eedcfa61852b103efd54dac7db3d7",
			vec!["a", "b", "a"],
		);

		test(
			"dc8e73fe6903148ff5079baecc043983625c23b39f31537e322cd0deee09fa9c",
			vec!["a", "b", "a", "b"],
		);

		test(
			"fb3b3be94be9e983ba5e094c9c51a7d96a4fa2e5d8e891df00ca89ba05bb1239",
			vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"],
		);
	}

	#[test]
	fn should_generate_proof_for_promoted_leaf() {
		// given
		let data = vec!["a", "b", "c"];

		// when
		let proof = merkle_proof::<Keccak256, _, _>(data, 2).unwrap();

		// then
		assert_eq!(
			proof,
			MerkleProof {
				root: hex!("aff1208e69c9e8be9b584b07ebac4e48a1ee9d15ce3afe20b77a4d29e4175aa3"),
				proof: vec![hex!("805b21d846b189efaeb0377d6bb0d201b3872a363e607c25088f025b0c6ae1f8")],
				number_of_leaves: 3,
				leaf_index: 2,
				leaf: "c",
			}
		);
	}

	#[test]
	fn should_generate_and_verify_proof_for_every_leaf() {
		let data = vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];

		for len in 1..=data.len() {
			let leaves = &data[..len];
			let root = merkle_root::<Keccak256, _, _>(leaves);

			for index in 0..len {
				let proof = merkle_proof::<Keccak256, _, _>(leaves, index).unwrap();
				assert_eq!(proof.root, root);
				assert!(
					verify_proof::<Keccak256, _>(&root, proof.proof, len, index, proof.leaf.as_bytes()),
					"leaf {} of {} should verify",
					index,
					len
				);
			}
		}
	}

	#[test]
	fn should_not_generate_proof_out_of_bounds() {
		assert_eq!(merkle_proof::<Keccak256, _, _>(vec!["a", "b"], 2), None);
		assert_eq!(merkle_proof::<Keccak256, Vec<&str>, _>(vec![], 0), None);
	}

	#[test]
	fn should_reject_tampered_proof() {
		// given
		let data = vec!["a", "b", "c", "d", "e"];
		let root = merkle_root::<Keccak256, _, _>(&data);
		let proof = merkle_proof::<Keccak256, _, _>(&data, 1).unwrap();
		assert!(verify_proof::<Keccak256, _>(&root, proof.proof.clone(), 5, 1, b"b"));

		// wrong leaf value
		assert!(!verify_proof::<Keccak256, _>(&root, proof.proof.clone(), 5, 1, b"x"));

		// wrong position
		assert!(!verify_proof::<Keccak256, _>(&root, proof.proof.clone(), 5, 0, b"b"));

		// wrong tree width
		assert!(!verify_proof::<Keccak256, _>(&root, proof.proof.clone(), 4, 1, b"b"));

		// index out of bounds
		assert!(!verify_proof::<Keccak256, _>(&root, proof.proof.clone(), 5, 5, b"b"));

		// altered sibling
		let mut altered = proof.proof.clone();
		altered[0][0] ^= 1;
		assert!(!verify_proof::<Keccak256, _>(&root, altered, 5, 1, b"b"));

		// truncated and padded
		let truncated = proof.proof[..proof.proof.len() - 1].to_vec();
		assert!(!verify_proof::<Keccak256, _>(&root, truncated, 5, 1, b"b"));
		let mut padded = proof.proof;
		padded.push([0_u8; 32]);
		assert!(!verify_proof::<Keccak256, _>(&root, padded, 5, 1, b"b"));
	}
}
