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

use std::{convert::TryFrom, sync::Arc};

use beefy_merkle_tree::{merkle_proof, merkle_root, verify_proof, Keccak256};
use codec::{Decode, Encode};
use log::debug;

use crate::{mmr::BeefyNextAuthoritySet, Address, Error, ValidatorSetId, H256};

/// A BEEFY validator set, committed to as a merkle root of validator addresses.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ValidatorSet {
	/// Merkle root of the validators' addresses, see [`beefy_merkle_tree`].
	pub root: H256,
	/// Number of validators in the set.
	pub len: u32,
	/// Identifier of the validator set.
	pub id: ValidatorSetId,
}

impl ValidatorSet {
	/// Commit to `addresses`, in order, as validator set `id`.
	///
	/// Positions are `u32`, so sets of more than `u32::MAX` validators are rejected.
	pub fn from_addresses(addresses: &[Address], id: ValidatorSetId) -> Result<Self, Error> {
		Ok(ValidatorSet {
			root: H256(merkle_root::<Keccak256, _, _>(addresses)),
			len: validator_count(addresses.len())?,
			id,
		})
	}
}

fn validator_count(len: usize) -> Result<u32, Error> {
	u32::try_from(len).map_err(|_| Error::TooManyValidators { got: len })
}

impl From<BeefyNextAuthoritySet> for ValidatorSet {
	fn from(next: BeefyNextAuthoritySet) -> Self {
		ValidatorSet {
			root: next.root,
			len: next.len,
			id: next.id,
		}
	}
}

/// Proof that `address` is the validator at `position`.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MembershipProof {
	/// Validator address.
	pub address: Address,
	/// Position of the validator within the set.
	pub position: u32,
	/// Sibling hashes, bottom-up.
	pub siblings: Vec<H256>,
}

impl MembershipProof {
	/// Prove membership of the validator at `position` of `addresses`.
	///
	/// Returns `None` if `position` is out of bounds.
	pub fn generate(addresses: &[Address], position: u32) -> Option<Self> {
		let proof = merkle_proof::<Keccak256, _, _>(addresses, position as usize)?;

		Some(MembershipProof {
			address: *proof.leaf,
			position,
			siblings: proof.proof.into_iter().map(H256).collect(),
		})
	}
}

/// Return `true` if `proof` shows its address at its position under `set.root`.
pub fn verify_membership(set: &ValidatorSet, proof: &MembershipProof) -> bool {
	verify_proof::<Keccak256, _>(
		&set.root.0,
		proof.siblings.iter().map(|s| s.0),
		set.len as usize,
		proof.position as usize,
		proof.address.as_bytes(),
	)
}

/// Authoritative snapshot of the active validator set.
///
/// Rotation swaps the whole snapshot. Sessions keep the `Arc` they observed, so a rotation never
/// affects a session in flight.
#[derive(Debug, Clone)]
pub struct ValidatorRegistry {
	current: Arc<ValidatorSet>,
}

impl ValidatorRegistry {
	/// Return a registry with `initial` as the active set.
	pub fn new(initial: ValidatorSet) -> Self {
		ValidatorRegistry {
			current: Arc::new(initial),
		}
	}

	/// The active validator set.
	pub fn current(&self) -> Arc<ValidatorSet> {
		self.current.clone()
	}

	/// Replace the active set with `next`, which must carry the next id.
	pub fn rotate(&mut self, next: ValidatorSet) -> Result<(), Error> {
		let current = self.current.id;
		if current.checked_add(1) != Some(next.id) {
			return Err(Error::SetIdOutOfOrder { got: next.id, current });
		}

		debug!(target: "beefy", "🥩 New active validator set id: {:?}", next.id);

		self.current = Arc::new(next);
		Ok(())
	}
}
