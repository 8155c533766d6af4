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

//! BEEFY light client.
//!
//! Verifies on a foreign (host) chain that a quorum of a known BEEFY validator set signed a
//! [`Commitment`], and that an [`MmrLeaf`] is included under the MMR root carried by that
//! commitment.
//!
//! Verification happens in two phases. A relayer first submits the commitment hash, a bitfield
//! of claimed signers and a single signature ([`LightClient::initiate`]). Once the session has
//! matured for [`Config::lock_delay`] host blocks, the hash of the lock block seeds a random
//! subset of the claimed signers ([`LightClient::challenge`]). The relayer then proves exactly
//! that subset ([`LightClient::complete`]).

pub mod bitfield;
pub mod commitment;
pub mod mmr;
pub mod session;
pub mod signature;
pub mod validator_set;

mod client;
mod error;
mod keyring;

pub use bitfield::Bitfield;
pub use client::{CompleteCommitment, LightClient, NewCommitment, VerifiedPayload};
pub use commitment::Commitment;
pub use error::Error;
pub use keyring::Keyring;
pub use mmr::{BeefyNextAuthoritySet, MmrLeaf, MmrLeafVersion, MmrProof};
pub use session::{Config, Session, SessionId, SessionStatus};
pub use signature::Signature;
pub use validator_set::{MembershipProof, ValidatorRegistry, ValidatorSet};

pub use primitive_types::{H160, H256};

use beefy_merkle_tree::Hasher;

/// Block number, both on the BEEFY chain and on the host chain.
pub type BlockNumber = u64;

/// Monotonically increasing identifier of a BEEFY validator set.
pub type ValidatorSetId = u64;

/// Ethereum-style validator address.
pub type Address = H160;

/// Keccak-256 hash of `data`.
pub fn keccak_256(data: &[u8]) -> H256 {
	H256(beefy_merkle_tree::Keccak256::hash(data))
}

/// Host chain view used to mature sessions and to seed challenges.
///
/// The light client treats the returned block hashes as an untamperable source of entropy.
pub trait BlockHashOracle {
	/// Current host chain block number.
	fn current_block(&self) -> BlockNumber;

	/// Hash of block `number`, `None` if it is beyond the retention horizon or in the future.
	fn block_hash(&self, number: BlockNumber) -> Option<H256>;
}
