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

//! BEEFY MMR leaves and Merkle Mountain Range inclusion proofs.
//!
//! The MMR over `leaf_count` leaves is a sequence of perfect binary trees ("mountains"), one per
//! set bit of `leaf_count`, largest first. Inner nodes are `keccak_256(left ++ right)`. The root
//! bags the mountain peaks from left to right: `acc = peak_0`, then `acc = keccak_256(acc ++
//! peak_i)` for every further peak.
//!
//! An [`MmrProof`] lists the siblings of the leaf inside its own mountain, bottom-up, followed
//! by the peaks of every other mountain, left to right.

use codec::{Decode, DecodeAll, Encode};

use crate::{keccak_256, Error, ValidatorSetId, H256};

/// A version of the [`MmrLeaf`].
///
/// The version packs a `major` (3 most significant bits) and a `minor` (5 least significant
/// bits) component. A change in `major` means the leaf layout changed in an incompatible way; a
/// change in `minor` only appends data a light client may ignore.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Encode, Decode)]
pub struct MmrLeafVersion(u8);

impl MmrLeafVersion {
	/// Create new version object from `major` and `minor` components.
	///
	/// Panics if `major` occupies more than 3 bits or `minor` more than 5 bits.
	pub fn new(major: u8, minor: u8) -> Self {
		if major > 0b111 || minor > 0b11111 {
			panic!("Version components are too big.");
		}
		let version = (major << 5) + minor;
		Self(version)
	}

	/// Split the version into `major` and `minor` sub-components.
	pub fn split(&self) -> (u8, u8) {
		let major = self.0 >> 5;
		let minor = self.0 & 0b11111;
		(major, minor)
	}
}

/// Details of the next BEEFY authority set.
#[derive(Debug, Default, PartialEq, Eq, Clone, Encode, Decode)]
pub struct BeefyNextAuthoritySet {
	/// Id of the next set.
	///
	/// Id is required to correlate BEEFY signed commitments with the validator set.
	/// Light Client can easily verify that the commitment witness it is getting is
	/// produced by the latest validator set.
	pub id: ValidatorSetId,
	/// Number of validators in the set.
	///
	/// Some BEEFY Light Clients may use an interactive protocol to verify only subset
	/// of signatures. We put set length here, so that these clients can verify the minimal
	/// number of required signatures.
	pub len: u32,
	/// Merkle Root Hash build from validator addresses.
	pub root: H256,
}

/// A BEEFY MMR leaf.
///
/// The SCALE encoding is the canonical wire layout, 113 bytes:
/// `version ++ parent_number (u32 LE) ++ parent_hash ++ parachain_heads ++
/// next_set.id (u64 LE) ++ next_set.len (u32 LE) ++ next_set.root`.
#[derive(Debug, Default, PartialEq, Eq, Clone, Encode, Decode)]
pub struct MmrLeaf {
	/// Version of the leaf format.
	pub version: MmrLeafVersion,
	/// Current block parent number and hash.
	pub parent_number_and_hash: (u32, H256),
	/// A merkle root of all registered parachain heads.
	pub parachain_heads: H256,
	/// A merkle root of the next BEEFY authority set.
	pub beefy_next_authority_set: BeefyNextAuthoritySet,
}

/// Proof of inclusion of a single leaf in an MMR.
#[derive(Debug, Default, PartialEq, Eq, Clone, Encode, Decode)]
pub struct MmrProof {
	/// Index of the leaf the proof is for (0-based).
	pub leaf_index: u64,
	/// Number of leaves in the MMR when the proof was generated.
	pub leaf_count: u64,
	/// Mountain siblings bottom-up, then the other peaks left to right.
	pub items: Vec<H256>,
}

/// Canonical encoding of `leaf`.
pub fn encode_leaf(leaf: &MmrLeaf) -> Vec<u8> {
	leaf.encode()
}

/// Decode a canonically encoded leaf. Trailing bytes are an error.
pub fn decode_leaf(mut encoded: &[u8]) -> Result<MmrLeaf, Error> {
	Ok(MmrLeaf::decode_all(&mut encoded)?)
}

/// Hash of an encoded leaf.
pub fn hash_leaf(encoded: &[u8]) -> H256 {
	keccak_256(encoded)
}

fn combine(left: &H256, right: &H256) -> H256 {
	let mut combined = [0_u8; 64];
	combined[..32].copy_from_slice(left.as_bytes());
	combined[32..].copy_from_slice(right.as_bytes());
	keccak_256(&combined)
}

/// `(first_leaf, height)` of every mountain of an MMR with `leaf_count` leaves, left to right.
fn mountains(leaf_count: u64) -> Vec<(u64, u32)> {
	let mut start = 0;
	(0..u64::BITS)
		.rev()
		.filter(|height| leaf_count & (1 << height) != 0)
		.map(|height| {
			let mountain = (start, height);
			start += 1 << height;
			mountain
		})
		.collect()
}

fn bag_peaks<I: IntoIterator<Item = H256>>(peaks: I) -> Option<H256> {
	peaks.into_iter().fold(None, |acc, peak| match acc {
		None => Some(peak),
		Some(acc) => Some(combine(&acc, &peak)),
	})
}

/// Return `true` if `leaf_hash` is the leaf at `proof.leaf_index` of the MMR with root `root`.
///
/// Fails closed on any structural mismatch: an out of range `leaf_index`, or a number of proof
/// items that does not match the MMR shape given by `leaf_count`.
pub fn verify_inclusion(leaf_hash: H256, proof: &MmrProof, root: &H256) -> bool {
	if proof.leaf_index >= proof.leaf_count {
		return false;
	}

	let mountains = mountains(proof.leaf_count);
	let (mountain, (start, height)) = match mountains
		.iter()
		.enumerate()
		.find(|(_, (start, height))| proof.leaf_index < start + (1 << height))
	{
		Some((mountain, &(start, height))) => (mountain, (start, height)),
		None => return false,
	};

	if proof.items.len() != height as usize + mountains.len() - 1 {
		return false;
	}

	let (path, other_peaks) = proof.items.split_at(height as usize);

	let mut node = leaf_hash;
	let mut position = proof.leaf_index - start;
	for sibling in path {
		node = if position % 2 == 0 {
			combine(&node, sibling)
		} else {
			combine(sibling, &node)
		};
		position /= 2;
	}

	let mut other_peaks = other_peaks.iter().copied();
	let peaks = (0..mountains.len()).map(|i| if i == mountain { Some(node) } else { other_peaks.next() });
	let peaks = match peaks.collect::<Option<Vec<_>>>() {
		Some(peaks) => peaks,
		None => return false,
	};

	bag_peaks(peaks).as_ref() == Some(root)
}

/// An append-only Merkle Mountain Range over leaf hashes.
///
/// Generates the roots and [`MmrProof`]s [`verify_inclusion`] checks.
#[derive(Debug, Default, Clone)]
pub struct MerkleMountainRange {
	leaves: Vec<H256>,
}

impl MerkleMountainRange {
	/// Return an empty MMR.
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a leaf hash, returning its index.
	pub fn push(&mut self, leaf_hash: H256) -> u64 {
		self.leaves.push(leaf_hash);
		self.leaves.len() as u64 - 1
	}

	/// Append a leaf, returning its index.
	pub fn push_leaf(&mut self, leaf: &MmrLeaf) -> u64 {
		self.push(hash_leaf(&encode_leaf(leaf)))
	}

	/// Number of leaves.
	pub fn leaf_count(&self) -> u64 {
		self.leaves.len() as u64
	}

	/// Bagged root, all zeroes for an empty MMR.
	pub fn root(&self) -> H256 {
		let peaks = mountains(self.leaf_count())
			.into_iter()
			.map(|(start, height)| mountain_root(self.mountain(start, height)));

		bag_peaks(peaks).unwrap_or_default()
	}

	/// Prove inclusion of the leaf at `leaf_index`. `None` if out of bounds.
	pub fn proof(&self, leaf_index: u64) -> Option<MmrProof> {
		if leaf_index >= self.leaf_count() {
			return None;
		}

		let mut items = Vec::new();
		let mut peaks = Vec::new();

		for (start, height) in mountains(self.leaf_count()) {
			let leaves = self.mountain(start, height);
			if (start..start + (1 << height)).contains(&leaf_index) {
				items.extend(mountain_path(leaves, (leaf_index - start) as usize));
			} else {
				peaks.push(mountain_root(leaves));
			}
		}
		items.extend(peaks);

		Some(MmrProof {
			leaf_index,
			leaf_count: self.leaf_count(),
			items,
		})
	}

	fn mountain(&self, start: u64, height: u32) -> &[H256] {
		&self.leaves[start as usize..(start + (1 << height)) as usize]
	}
}

fn next_layer(layer: &[H256]) -> Vec<H256> {
	layer.chunks(2).map(|pair| combine(&pair[0], &pair[1])).collect()
}

fn mountain_root(leaves: &[H256]) -> H256 {
	let mut layer = leaves.to_vec();
	while layer.len() > 1 {
		layer = next_layer(&layer);
	}
	layer[0]
}

fn mountain_path(leaves: &[H256], mut position: usize) -> Vec<H256> {
	let mut path = Vec::new();
	let mut layer = leaves.to_vec();
	while layer.len() > 1 {
		path.push(layer[position ^ 1]);
		layer = next_layer(&layer);
		position /= 2;
	}
	path
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;

	fn leaf() -> MmrLeaf {
		MmrLeaf {
			version: MmrLeafVersion::new(1, 5),
			parent_number_and_hash: (42, H256::repeat_byte(0x45)),
			parachain_heads: H256::repeat_byte(0x11),
			beefy_next_authority_set: BeefyNextAuthoritySet {
				id: 1,
				len: 2,
				root: H256::repeat_byte(0x22),
			},
		}
	}

	fn mmr(leaf_count: u64) -> MerkleMountainRange {
		let mut mmr = MerkleMountainRange::new();
		for i in 0..leaf_count {
			mmr.push(keccak_256(i.to_string().as_bytes()));
		}
		mmr
	}

	#[test]
	fn version_works() {
		let version = MmrLeafVersion::new(1, 5);
		assert_eq!(version.encode(), vec![0x25]);
		assert_eq!(version.split(), (1, 5));

		assert_eq!(MmrLeafVersion::new(0b111, 0b11111).split(), (7, 31));
	}

	#[test]
	#[should_panic(expected = "Version components are too big.")]
	fn version_rejects_big_components() {
		let _ = MmrLeafVersion::new(8, 0);
	}

	#[test]
	#[should_panic(expected = "Version components are too big.")]
	fn version_rejects_six_bit_minor() {
		let _ = MmrLeafVersion::new(0, 32);
	}

	#[test]
	fn leaf_encoding_golden_vector() {
		// when
		let encoded = encode_leaf(&leaf());

		// then
		assert_eq!(encoded.len(), 113);
		assert_eq!(
			encoded,
			hex!(
				"25"
				"2a000000"
				"4545454545454545454545454545454545454545454545454545454545454545"
				"1111111111111111111111111111111111111111111111111111111111111111"
				"0100000000000000"
				"02000000"
				"2222222222222222222222222222222222222222222222222222222222222222"
			)
			.to_vec()
		);
		assert_eq!(
			hash_leaf(&encoded),
			H256(hex!("2010a89c5e17f95208a0964fd87fa4bbe9e31059492748e8d8dd0765ed05ee55"))
		);
	}

	#[test]
	fn leaf_decode_works() {
		let encoded = encode_leaf(&leaf());

		assert_eq!(decode_leaf(&encoded), Ok(leaf()));

		// truncated
		assert!(matches!(decode_leaf(&encoded[..112]), Err(Error::Codec(_))));

		// trailing garbage
		let mut padded = encoded;
		padded.push(0);
		assert!(matches!(decode_leaf(&padded), Err(Error::Codec(_))));
	}

	#[test]
	fn mountains_follow_binary_decomposition() {
		assert_eq!(mountains(0), vec![]);
		assert_eq!(mountains(1), vec![(0, 0)]);
		assert_eq!(mountains(7), vec![(0, 2), (4, 1), (6, 0)]);
		assert_eq!(mountains(8), vec![(0, 3)]);
		assert_eq!(mountains(11), vec![(0, 3), (8, 1), (10, 0)]);
	}

	#[test]
	fn root_golden_vectors() {
		assert_eq!(MerkleMountainRange::new().root(), H256::zero());

		// a single leaf is its own root
		assert_eq!(
			mmr(1).root(),
			H256(hex!("044852b2a670ade5407e78fb2863c51de9fcb96542a07186fe3aeda6bb8a116d"))
		);

		assert_eq!(
			mmr(7).root(),
			H256(hex!("cd25184d914ddaa617d15fb6eede7254b671f16f5bbfb1c1b30815d9b53b2ab2"))
		);
	}

	#[test]
	fn proof_golden_vector() {
		// when
		let proof = mmr(7).proof(4).unwrap();

		// then
		assert_eq!(
			proof,
			MmrProof {
				leaf_index: 4,
				leaf_count: 7,
				items: vec![
					// sibling in the middle mountain
					H256(hex!("ceebf77a833b30520287ddd9478ff51abbdffa30aa90a8d655dba0e8a79ce0c1")),
					// left peak
					H256(hex!("9e031569905bf7098e9e3b14d5c8e2ed05f6e8dc1acaaad6a221cd6603e01d3b")),
					// right peak
					H256(hex!("e455bf8ea6e7463a1046a0b52804526e119b4bf5136279614e0b1e8e296a4e2d")),
				],
			}
		);
	}

	#[test]
	fn every_leaf_verifies() {
		for leaf_count in 1..=17 {
			let mmr = mmr(leaf_count);
			let root = mmr.root();

			for leaf_index in 0..leaf_count {
				let proof = mmr.proof(leaf_index).unwrap();
				let leaf_hash = keccak_256(leaf_index.to_string().as_bytes());
				assert!(
					verify_inclusion(leaf_hash, &proof, &root),
					"leaf {} of {} should verify",
					leaf_index,
					leaf_count
				);
			}

			assert_eq!(mmr.proof(leaf_count), None);
		}
	}

	#[test]
	fn tampered_proof_is_rejected() {
		let mmr = mmr(11);
		let root = mmr.root();
		let leaf_hash = keccak_256(b"9");
		let proof = mmr.proof(9).unwrap();
		assert!(verify_inclusion(leaf_hash, &proof, &root));

		// every single altered item
		for i in 0..proof.items.len() {
			let mut altered = proof.clone();
			altered.items[i] = H256::repeat_byte(0xaa);
			assert!(!verify_inclusion(leaf_hash, &altered, &root));
		}

		// altered leaf index
		let moved = MmrProof { leaf_index: 8, ..proof.clone() };
		assert!(!verify_inclusion(leaf_hash, &moved, &root));

		// leaf index out of range
		let out_of_range = MmrProof {
			leaf_index: 11,
			..proof.clone()
		};
		assert!(!verify_inclusion(leaf_hash, &out_of_range, &root));

		// leaf count describing another shape
		let reshaped = MmrProof {
			leaf_count: 12,
			..proof.clone()
		};
		assert!(!verify_inclusion(leaf_hash, &reshaped, &root));

		// missing and extra items
		let mut truncated = proof.clone();
		truncated.items.pop();
		assert!(!verify_inclusion(leaf_hash, &truncated, &root));
		let mut padded = proof;
		padded.items.push(H256::zero());
		assert!(!verify_inclusion(leaf_hash, &padded, &root));
	}

	#[test]
	fn leaves_can_be_proven_by_value() {
		// given
		let mut mmr = mmr(5);
		let index = mmr.push_leaf(&leaf());
		mmr.push(keccak_256(b"6"));

		// when
		let proof = mmr.proof(index).unwrap();

		// then
		let leaf_hash = hash_leaf(&encode_leaf(&leaf()));
		assert!(verify_inclusion(leaf_hash, &proof, &mmr.root()));
		assert!(!verify_inclusion(keccak_256(b"5"), &proof, &mmr.root()));
	}
}
