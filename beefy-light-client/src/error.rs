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

use crate::{session::SessionId, BlockNumber, ValidatorSetId};

/// Light client errors.
///
/// Every check is fail-closed: an error aborts the whole call and leaves the light client
/// state untouched, the only exception being the `Pending -> Expired` transition of a session
/// whose seed fell out of the retention window.
#[derive(Debug, displaydoc::Display, PartialEq, Eq, Clone)]
pub enum Error {
	/// bitfield has {got} words, {validators} validators fit in {max}
	InvalidBitfieldLength { got: usize, max: usize, validators: u32 },
	/// claimed {got} signers, quorum requires {want}
	InsufficientClaim { got: u32, want: u32 },
	/// validator set id {got} does not match active set {want}
	StaleValidatorSet { got: ValidatorSetId, want: ValidatorSetId },
	/// {got} validators do not fit `u32` positions
	TooManyValidators { got: usize },
	/// validator set id {got} does not follow active set {current}
	SetIdOutOfOrder { got: ValidatorSetId, current: ValidatorSetId },
	/// initial signature for validator {position} is invalid: {reason}
	InvalidInitialSignature { position: u32, reason: Box<Error> },
	/// validator {position} is not part of the claimed bitfield
	UnclaimedPosition { position: u32 },
	/// malformed ECDSA signature
	MalformedSignature,
	/// signature of validator {position} recovers to a different address
	SignerMismatch { position: u32 },
	/// validator {position} is not a member of the validator set
	UnknownValidator { position: u32 },
	/// session locked until block {lock_block}, current block is {current}
	NotMatured { current: BlockNumber, lock_block: BlockNumber },
	/// block hash of lock block {lock_block} is no longer available
	SeedUnavailable { lock_block: BlockNumber },
	/// session {0} has expired
	Expired(SessionId),
	/// session {0} is not pending
	InvalidSessionState(SessionId),
	/// unknown session {0}
	UnknownSession(SessionId),
	/// only the original submitter may act on session {0}
	NotSubmitter(SessionId),
	/// commitment does not hash to the value recorded in the session
	CommitmentMismatch,
	/// got {got} signatures and {proofs} proofs for a challenge of {want} positions
	BitfieldPositionMismatch { got: usize, proofs: usize, want: usize },
	/// MMR leaf is not included under the commitment payload
	InvalidLeafProof,
	/// session {0} has already been completed
	AlreadyCompleted(SessionId),
	/// commitment for block {got} is not newer than block {best_known}
	StaleCommitment { got: BlockNumber, best_known: BlockNumber },
	/// codec error: {0}
	Codec(String),
}

impl std::error::Error for Error {}

impl From<codec::Error> for Error {
	fn from(err: codec::Error) -> Self {
		Error::Codec(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_works() {
		let err = Error::InsufficientClaim { got: 1, want: 2 };
		assert_eq!(err.to_string(), "claimed 1 signers, quorum requires 2");

		let err = Error::InvalidInitialSignature {
			position: 3,
			reason: Box::new(Error::SignerMismatch { position: 3 }),
		};
		assert_eq!(
			err.to_string(),
			"initial signature for validator 3 is invalid: signature of validator 3 recovers to a different address"
		);

		let err = Error::AlreadyCompleted(SessionId(7));
		assert_eq!(err.to_string(), "session 7 has already been completed");
	}
}
