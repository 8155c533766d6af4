// Copyright (C) 2020 Parity Technologies (UK) Ltd.
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

use core::cmp;

use codec::{Decode, Encode};

use crate::{keccak_256, BlockNumber, ValidatorSetId, H256};

/// A commitment signed by BEEFY validators.
///
/// The commitment contains a [payload](Commitment::payload) extracted from the finalized block
/// at height [block_number](Commitment::block_number). Validators sign the keccak hash of the
/// SCALE encoding, see [`Commitment::hash`].
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Commitment {
	/// The payload being signed.
	///
	/// The MMR root hash of the BEEFY chain at `block_number`. This is the value a light
	/// client trusts once the commitment has been verified.
	pub payload: H256,

	/// Finalized block number this commitment is for.
	pub block_number: BlockNumber,

	/// BEEFY validator set supposed to sign this commitment.
	pub validator_set_id: ValidatorSetId,
}

impl Commitment {
	/// Keccak hash of the SCALE encoding, i.e. the message validators sign.
	pub fn hash(&self) -> H256 {
		self.using_encoded(keccak_256)
	}
}

impl cmp::PartialOrd for Commitment {
	fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl cmp::Ord for Commitment {
	fn cmp(&self, other: &Self) -> cmp::Ordering {
		self.validator_set_id
			.cmp(&other.validator_set_id)
			.then_with(|| self.block_number.cmp(&other.block_number))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;

	fn commitment(block_number: BlockNumber, validator_set_id: ValidatorSetId) -> Commitment {
		Commitment {
			payload: H256(hex!("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff000102030405060708090a0b0c0d0e0f")),
			block_number,
			validator_set_id,
		}
	}

	#[test]
	fn commitment_encode_decode() {
		// given
		let commitment = commitment(5, 3);

		// when
		let encoded = codec::Encode::encode(&commitment);
		let decoded = Commitment::decode(&mut &*encoded);

		// then
		assert_eq!(decoded, Ok(commitment));
		assert_eq!(
			encoded,
			hex!("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff000102030405060708090a0b0c0d0e0f05000000000000000300000000000000")
		);
	}

	#[test]
	fn commitment_hash() {
		assert_eq!(
			commitment(5, 3).hash(),
			H256(hex!("5c6f87a9c59c50085bda4963a0ebc77bfe529d81629823602b066f272bfc2e44"))
		);
	}

	#[test]
	fn commitment_ordering() {
		// given
		let a = commitment(1, 0);
		let b = commitment(2, 1);
		let c = commitment(10, 0);
		let d = commitment(10, 1);

		// then
		assert!(a < b);
		assert!(a < c);
		assert!(c < b);
		assert!(c < d);
		assert!(b < d);
	}
}
