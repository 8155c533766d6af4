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

//! Commitment verification sessions.

use std::{collections::BTreeMap, fmt, sync::Arc};

use codec::{Decode, Encode};

use crate::{Address, Bitfield, BlockNumber, Error, ValidatorSet, H256};

/// Default number of host blocks a session stays locked after `initiate`.
pub const LOCK_DELAY: BlockNumber = 45;

/// Default number of host blocks the lock block hash stays available after maturity.
pub const SEED_RETENTION: BlockNumber = 256;

/// Light client policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	/// Host blocks between `initiate` and the lock block seeding the challenge.
	///
	/// Must be large enough for the lock block hash to be unknown to the submitter when the
	/// session is created.
	pub lock_delay: BlockNumber,
	/// Host blocks after the lock block during which the session can still be completed.
	pub seed_retention: BlockNumber,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			lock_delay: LOCK_DELAY,
			seed_retention: SEED_RETENTION,
		}
	}
}

/// Handle of a [`Session`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Lifecycle of a [`Session`]. `Completed` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionStatus {
	Pending,
	Completed,
	Expired,
}

/// Where the host chain stands relative to a session's lock block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Window {
	/// The lock block has not been reached yet.
	Locked,
	/// The lock block hash can be used as a seed.
	Open,
	/// The lock block hash is beyond the retention horizon.
	Closed,
}

/// An in-flight two-phase commitment verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
	pub id: SessionId,
	/// Hash of the commitment the relayer claims was signed.
	pub commitment_hash: H256,
	/// Validators claimed to have signed, validated against the quorum.
	pub claimed: Bitfield,
	/// The only account allowed to complete or cancel the session.
	pub submitter: Address,
	/// Validator set observed at `initiate`. Unaffected by later rotations.
	pub validator_set: Arc<ValidatorSet>,
	/// Host block whose hash seeds the challenge.
	pub lock_block: BlockNumber,
}

impl Session {
	pub(crate) fn window(&self, current: BlockNumber, seed_retention: BlockNumber) -> Window {
		if current < self.lock_block {
			Window::Locked
		} else if current - self.lock_block > seed_retention {
			Window::Closed
		} else {
			Window::Open
		}
	}
}

/// Sessions by id.
///
/// Only pending sessions are kept in full. A finished session leaves its terminal status behind,
/// so later calls still report it as completed or expired.
#[derive(Debug, Default)]
pub(crate) struct SessionStore {
	pending: BTreeMap<SessionId, Session>,
	finished: BTreeMap<SessionId, SessionStatus>,
	next_id: SessionId,
}

impl SessionStore {
	/// Id the next inserted session will get.
	pub fn next_id(&self) -> SessionId {
		self.next_id
	}

	/// Store a new pending session, returning its id.
	pub fn insert(
		&mut self,
		commitment_hash: H256,
		claimed: Bitfield,
		submitter: Address,
		validator_set: Arc<ValidatorSet>,
		lock_block: BlockNumber,
	) -> SessionId {
		let id = self.next_id;
		self.next_id = SessionId(id.0 + 1);

		self.pending.insert(
			id,
			Session {
				id,
				commitment_hash,
				claimed,
				submitter,
				validator_set,
				lock_block,
			},
		);

		id
	}

	pub fn status(&self, id: SessionId) -> Option<SessionStatus> {
		if self.pending.contains_key(&id) {
			return Some(SessionStatus::Pending);
		}
		self.finished.get(&id).copied()
	}

	/// Pending session `id`.
	pub fn get(&self, id: SessionId) -> Result<&Session, Error> {
		match self.pending.get(&id) {
			Some(session) => Ok(session),
			None => Err(match self.finished.get(&id) {
				Some(SessionStatus::Completed) => Error::AlreadyCompleted(id),
				Some(_) => Error::Expired(id),
				None => Error::UnknownSession(id),
			}),
		}
	}

	/// Drop the body of pending session `id`, keeping only its terminal `status`.
	pub fn finish(&mut self, id: SessionId, status: SessionStatus) {
		if self.pending.remove(&id).is_some() {
			self.finished.insert(id, status);
		}
	}

	pub fn pending(&self) -> impl Iterator<Item = &Session> {
		self.pending.values()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn insert(store: &mut SessionStore, lock_block: BlockNumber) -> SessionId {
		store.insert(
			H256::repeat_byte(1),
			Bitfield::from_positions(&[0, 1], 2).unwrap(),
			Address::repeat_byte(2),
			Arc::new(ValidatorSet {
				root: H256::zero(),
				len: 2,
				id: 0,
			}),
			lock_block,
		)
	}

	#[test]
	fn ids_are_sequential() {
		let mut store = SessionStore::default();
		assert_eq!(store.next_id(), SessionId(0));

		assert_eq!(insert(&mut store, 10), SessionId(0));
		assert_eq!(insert(&mut store, 10), SessionId(1));
		assert_eq!(store.next_id(), SessionId(2));

		assert_eq!(store.status(SessionId(1)), Some(SessionStatus::Pending));
		assert_eq!(store.status(SessionId(2)), None);
		assert_eq!(store.get(SessionId(2)), Err(Error::UnknownSession(SessionId(2))));
	}

	#[test]
	fn window_bounds() {
		let mut store = SessionStore::default();
		let id = insert(&mut store, 100);
		let session = store.get(id).unwrap();

		assert_eq!(session.window(0, 256), Window::Locked);
		assert_eq!(session.window(99, 256), Window::Locked);
		assert_eq!(session.window(100, 256), Window::Open);
		assert_eq!(session.window(356, 256), Window::Open);
		assert_eq!(session.window(357, 256), Window::Closed);
	}

	#[test]
	fn finished_sessions_leave_their_status_behind() {
		// given
		let mut store = SessionStore::default();
		let completed = insert(&mut store, 100);
		let expired = insert(&mut store, 100);
		let pending = insert(&mut store, 100);

		// when
		store.finish(completed, SessionStatus::Completed);
		store.finish(expired, SessionStatus::Expired);
		// finishing twice keeps the first outcome
		store.finish(completed, SessionStatus::Expired);

		// then
		assert_eq!(store.get(completed), Err(Error::AlreadyCompleted(completed)));
		assert_eq!(store.get(expired), Err(Error::Expired(expired)));
		assert_eq!(store.status(completed), Some(SessionStatus::Completed));
		assert_eq!(store.status(expired), Some(SessionStatus::Expired));
		assert_eq!(store.pending().map(|s| s.id).collect::<Vec<_>>(), vec![pending]);
		assert_eq!(store.pending.len(), 1);
		assert_eq!(store.finished.len(), 2);
	}

	#[test]
	fn default_config() {
		let config = Config::default();
		assert_eq!(config.lock_delay, 45);
		assert_eq!(config.seed_retention, 256);
	}
}
