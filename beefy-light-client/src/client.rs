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

use std::sync::Arc;

use log::{debug, warn};

use crate::{
	bitfield::{create_initial_bitfield, derive_challenge_bitfield, sample_size},
	mmr::{decode_leaf, hash_leaf, verify_inclusion},
	session::{SessionStatus, SessionStore, Window},
	signature::verify_attestation,
	Address, Bitfield, BlockHashOracle, BlockNumber, Commitment, Config, Error, MembershipProof, MmrLeaf, MmrProof,
	Session, SessionId, Signature, ValidatorRegistry, ValidatorSet, ValidatorSetId, H256,
};

/// First phase submission, see [`LightClient::initiate`].
#[derive(Debug, Clone)]
pub struct NewCommitment {
	/// Hash of the commitment, see [`Commitment::hash`].
	pub commitment_hash: H256,
	/// Id of the validator set the relayer claims signed the commitment.
	pub validator_set_id: ValidatorSetId,
	/// Raw bitfield words of the claimed signers.
	pub claimed: Vec<u64>,
	/// Signature of one of the claimed signers.
	pub signature: Signature,
	/// Membership proof of that signer.
	pub proof: MembershipProof,
	/// Account submitting the commitment.
	pub submitter: Address,
}

/// Second phase submission, see [`LightClient::complete`].
#[derive(Debug, Clone)]
pub struct CompleteCommitment {
	/// The full commitment, hashing to the one given at `initiate`.
	pub commitment: Commitment,
	/// Signatures of the challenged validators, in ascending position order.
	pub signatures: Vec<Signature>,
	/// Membership proofs matching `signatures` one to one.
	pub proofs: Vec<MembershipProof>,
	/// SCALE encoded [`MmrLeaf`].
	pub leaf: Vec<u8>,
	/// Inclusion proof of `leaf` under the commitment payload.
	pub leaf_proof: MmrProof,
}

/// Outcome of a successful [`LightClient::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayload {
	/// MMR root trusted from now on.
	pub payload_root: H256,
	/// The leaf proven to be included under `payload_root`.
	pub leaf: MmrLeaf,
}

/// BEEFY light client.
///
/// Owns the validator registry and all sessions. Every operation either applies completely or
/// fails without changing state, except that a session found beyond its seed retention window
/// is moved to [`SessionStatus::Expired`]. Finished sessions only keep their status.
pub struct LightClient {
	/// active validator set
	registry: ValidatorRegistry,
	/// in-flight and finished sessions
	sessions: SessionStore,
	config: Config,
	/// block number of the latest verified commitment
	latest_beefy_block: BlockNumber,
	/// payload of the latest verified commitment
	latest_mmr_root: H256,
}

impl LightClient {
	/// Return a [`LightClient`] using an initial validator set.
	pub fn new(initial: ValidatorSet, config: Config) -> LightClient {
		LightClient {
			registry: ValidatorRegistry::new(initial),
			sessions: SessionStore::default(),
			config,
			latest_beefy_block: 0,
			latest_mmr_root: H256::zero(),
		}
	}

	/// The active validator set.
	pub fn current(&self) -> Arc<ValidatorSet> {
		self.registry.current()
	}

	/// Replace the active validator set. Sessions already in flight keep the set they observed.
	pub fn rotate(&mut self, next: ValidatorSet) -> Result<(), Error> {
		self.registry.rotate(next)
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Payload of the latest verified commitment, zero before the first one.
	pub fn latest_mmr_root(&self) -> H256 {
		self.latest_mmr_root
	}

	/// Block number of the latest verified commitment.
	pub fn latest_beefy_block(&self) -> BlockNumber {
		self.latest_beefy_block
	}

	/// Id the next session will get.
	pub fn next_session_id(&self) -> SessionId {
		self.sessions.next_id()
	}

	/// Look up a pending session.
	pub fn session(&self, id: SessionId) -> Option<&Session> {
		self.sessions.get(id).ok()
	}

	/// Status of session `id`, `None` if it was never created.
	pub fn status(&self, id: SessionId) -> Option<SessionStatus> {
		self.sessions.status(id)
	}

	/// Open a session for a commitment claimed to be signed by a quorum of the active set.
	///
	/// The session locks until [`Config::lock_delay`] host blocks from now.
	pub fn initiate<C: BlockHashOracle>(&mut self, chain: &C, new: NewCommitment) -> Result<SessionId, Error> {
		let set = self.registry.current();

		if new.validator_set_id != set.id {
			warn!(
				target: "beefy",
				"🥩 Commitment {:?} for stale validator set {}, active set is {}",
				new.commitment_hash,
				new.validator_set_id,
				set.id
			);
			return Err(Error::StaleValidatorSet {
				got: new.validator_set_id,
				want: set.id,
			});
		}

		let claimed = create_initial_bitfield(new.claimed, set.len)?;

		let position = new.proof.position;
		let invalid = |reason| Error::InvalidInitialSignature {
			position,
			reason: Box::new(reason),
		};

		if !claimed.is_set(position) {
			return Err(invalid(Error::UnclaimedPosition { position }));
		}

		verify_attestation(&new.commitment_hash, &new.signature, &new.proof, &set).map_err(invalid)?;

		let lock_block = chain.current_block().saturating_add(self.config.lock_delay);
		let id = self
			.sessions
			.insert(new.commitment_hash, claimed, new.submitter, set, lock_block);

		debug!(
			target: "beefy",
			"🥩 New session {} for commitment {:?}, locked until block {}",
			id,
			new.commitment_hash,
			lock_block
		);

		Ok(id)
	}

	/// Derive the validators the relayer has to prove for session `id`.
	///
	/// Anyone may call this. The result is a pure function of the lock block hash and the claimed
	/// bitfield.
	pub fn challenge<C: BlockHashOracle>(&mut self, chain: &C, id: SessionId) -> Result<Bitfield, Error> {
		match self.sessions.status(id) {
			Some(SessionStatus::Pending) => (),
			Some(SessionStatus::Expired) => return Err(Error::Expired(id)),
			Some(SessionStatus::Completed) => return Err(Error::InvalidSessionState(id)),
			None => return Err(Error::UnknownSession(id)),
		}

		let seed = self.seed(chain, id)?;
		let session = self.sessions.get(id)?;

		Ok(derive_challenge_bitfield(
			&seed,
			&session.claimed,
			sample_size(session.validator_set.len),
		))
	}

	/// Verify the challenged signatures and the MMR leaf, finishing session `id`.
	///
	/// Only the submitter of the session may complete it. On success the commitment payload
	/// becomes the latest trusted MMR root.
	pub fn complete<C: BlockHashOracle>(
		&mut self,
		chain: &C,
		id: SessionId,
		caller: Address,
		complete: CompleteCommitment,
	) -> Result<VerifiedPayload, Error> {
		if caller != self.sessions.get(id)?.submitter {
			return Err(Error::NotSubmitter(id));
		}

		let seed = match self.seed(chain, id) {
			Err(Error::SeedUnavailable { .. }) if self.sessions.status(id) == Some(SessionStatus::Expired) =>
				return Err(Error::Expired(id)),
			res => res?,
		};
		let session = self.sessions.get(id)?;

		let CompleteCommitment {
			commitment,
			signatures,
			proofs,
			leaf,
			leaf_proof,
		} = complete;

		let hash = commitment.hash();
		if hash != session.commitment_hash {
			return Err(Error::CommitmentMismatch);
		}

		let set = session.validator_set.clone();
		if commitment.validator_set_id != set.id {
			return Err(Error::StaleValidatorSet {
				got: commitment.validator_set_id,
				want: set.id,
			});
		}

		if commitment.block_number <= self.latest_beefy_block {
			return Err(Error::StaleCommitment {
				got: commitment.block_number,
				best_known: self.latest_beefy_block,
			});
		}

		let challenge = derive_challenge_bitfield(&seed, &session.claimed, sample_size(set.len));
		let positions = challenge.ones().collect::<Vec<_>>();

		let aligned = signatures.len() == positions.len()
			&& proofs.len() == positions.len()
			&& proofs.iter().zip(positions.iter()).all(|(p, position)| p.position == *position);

		if !aligned {
			return Err(Error::BitfieldPositionMismatch {
				got: signatures.len(),
				proofs: proofs.len(),
				want: positions.len(),
			});
		}

		for (signature, proof) in signatures.iter().zip(proofs.iter()) {
			verify_attestation(&hash, signature, proof, &set).map_err(|err| {
				warn!(target: "beefy", "🥩 Session {}: invalid signature of validator #{}: {}", id, proof.position, err);
				err
			})?;
		}

		let leaf_hash = hash_leaf(&leaf);
		let leaf = decode_leaf(&leaf).map_err(|err| {
			warn!(target: "beefy", "🥩 Session {}: undecodable leaf {:?}: {}", id, leaf_hash, err);
			Error::InvalidLeafProof
		})?;
		if !verify_inclusion(leaf_hash, &leaf_proof, &commitment.payload) {
			warn!(target: "beefy", "🥩 Session {}: leaf {:?} not included under {:?}", id, leaf_hash, commitment.payload);
			return Err(Error::InvalidLeafProof);
		}

		self.sessions.finish(id, SessionStatus::Completed);
		self.latest_beefy_block = commitment.block_number;
		self.latest_mmr_root = commitment.payload;

		debug!(
			target: "beefy",
			"🥩 Session {} completed: block {} with MMR root {:?}",
			id,
			commitment.block_number,
			commitment.payload
		);

		Ok(VerifiedPayload {
			payload_root: commitment.payload,
			leaf,
		})
	}

	/// Abandon pending session `id`. Only its submitter may do so.
	pub fn cancel(&mut self, id: SessionId, caller: Address) -> Result<(), Error> {
		if caller != self.sessions.get(id)?.submitter {
			return Err(Error::NotSubmitter(id));
		}

		self.sessions.finish(id, SessionStatus::Expired);
		debug!(target: "beefy", "🥩 Session {} cancelled", id);

		Ok(())
	}

	/// Expire every pending session whose seed is beyond the retention window at `current_block`.
	///
	/// Returns the ids of the sessions expired by this call.
	pub fn expire_stale(&mut self, current_block: BlockNumber) -> Vec<SessionId> {
		let seed_retention = self.config.seed_retention;
		let stale = self
			.sessions
			.pending()
			.filter(|session| session.window(current_block, seed_retention) == Window::Closed)
			.map(|session| session.id)
			.collect::<Vec<_>>();

		for id in &stale {
			self.sessions.finish(*id, SessionStatus::Expired);
			debug!(target: "beefy", "🥩 Session {} expired at block {}", id, current_block);
		}

		stale
	}

	/// Lock block hash of matured pending session `id`.
	///
	/// Moves the session to [`SessionStatus::Expired`] if the hash is beyond the retention window.
	fn seed<C: BlockHashOracle>(&mut self, chain: &C, id: SessionId) -> Result<H256, Error> {
		let current = chain.current_block();
		let session = self.sessions.get(id)?;
		let lock_block = session.lock_block;

		match session.window(current, self.config.seed_retention) {
			Window::Locked => Err(Error::NotMatured { current, lock_block }),
			Window::Closed => {
				self.sessions.finish(id, SessionStatus::Expired);
				debug!(target: "beefy", "🥩 Session {} expired at block {}", id, current);
				Err(Error::SeedUnavailable { lock_block })
			},
			Window::Open => chain.block_hash(lock_block).ok_or(Error::SeedUnavailable { lock_block }),
		}
	}
}
