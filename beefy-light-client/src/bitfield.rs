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

//! Validator participation bitfields.
//!
//! Bit `i` of a [`Bitfield`] stands for the validator at position `i` of the validator set.
//! Bits are packed into `u64` words, least significant bit first: bit `i` lives in word
//! `i / 64` at offset `i % 64`.

use std::fmt;

use codec::{Decode, Encode};

use crate::{keccak_256, Error, H256};

const WORD_BITS: u32 = u64::BITS;

/// A fixed-length bit vector indexed by validator position.
#[derive(Debug, Clone, PartialEq, Eq, Encode)]
pub struct Bitfield {
	words: Vec<u64>,
	len: u32,
}

impl Bitfield {
	/// Return an empty bitfield for `len` validators.
	pub fn new(len: u32) -> Self {
		Bitfield {
			words: vec![0; words_for(len)],
			len,
		}
	}

	/// Build a bitfield from raw words.
	///
	/// Missing trailing words are treated as zero, bits at or above `len` are masked off.
	/// Fails if `words` has more words than `len` bits need.
	pub fn from_words(mut words: Vec<u64>, len: u32) -> Result<Self, Error> {
		let max = words_for(len);
		if words.len() > max {
			return Err(Error::InvalidBitfieldLength {
				got: words.len(),
				max,
				validators: len,
			});
		}

		words.resize(max, 0);
		let tail = len % WORD_BITS;
		if tail != 0 {
			if let Some(last) = words.last_mut() {
				*last &= (1_u64 << tail) - 1;
			}
		}

		Ok(Bitfield { words, len })
	}

	/// Build a bitfield with the given validator positions set.
	pub fn from_positions(positions: &[u32], len: u32) -> Result<Self, Error> {
		let mut bitfield = Bitfield::new(len);
		for &position in positions {
			if position >= len {
				return Err(Error::InvalidBitfieldLength {
					got: words_for(position.saturating_add(1)),
					max: words_for(len),
					validators: len,
				});
			}
			bitfield.set(position);
		}
		Ok(bitfield)
	}

	/// Number of validators covered.
	pub fn len(&self) -> u32 {
		self.len
	}

	/// `true` if the bitfield covers no validators at all.
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Packed words.
	pub fn words(&self) -> &[u64] {
		&self.words
	}

	/// Set bit `position`. Out of range positions are ignored.
	pub fn set(&mut self, position: u32) {
		if position < self.len {
			self.words[(position / WORD_BITS) as usize] |= 1 << (position % WORD_BITS);
		}
	}

	/// Return `true` if bit `position` is set.
	pub fn is_set(&self, position: u32) -> bool {
		position < self.len && self.words[(position / WORD_BITS) as usize] & (1 << (position % WORD_BITS)) != 0
	}

	/// Number of set bits.
	pub fn count_ones(&self) -> u32 {
		self.words.iter().map(|w| w.count_ones()).sum()
	}

	/// Set positions in ascending order.
	pub fn ones(&self) -> impl Iterator<Item = u32> + '_ {
		(0..self.len).filter(move |p| self.is_set(*p))
	}

	/// Return `true` if every bit set in `self` is also set in `other`.
	pub fn is_subset_of(&self, other: &Bitfield) -> bool {
		self.words
			.iter()
			.enumerate()
			.all(|(i, w)| w & !other.words.get(i).copied().unwrap_or_default() == 0)
	}
}

/// Only the canonical encoding is accepted: exactly as many words as `len` bits need, with no bit
/// set at or above `len`.
impl Decode for Bitfield {
	fn decode<I: codec::Input>(input: &mut I) -> Result<Self, codec::Error> {
		let (words, len) = <(Vec<u64>, u32)>::decode(input)?;
		let bitfield = Bitfield::from_words(words.clone(), len)
			.map_err(|_| codec::Error::from("Bitfield has more words than validators"))?;

		if bitfield.words != words {
			return Err("Non-canonical bitfield encoding".into());
		}

		Ok(bitfield)
	}
}

/// Renders the bitfield as a binary number, highest position first.
impl fmt::Display for Bitfield {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for position in (0..self.len).rev() {
			f.write_str(if self.is_set(position) { "1" } else { "0" })?;
		}
		Ok(())
	}
}

fn words_for(len: u32) -> usize {
	(len as usize + WORD_BITS as usize - 1) / WORD_BITS as usize
}

/// Minimum number of claimed signers for a validator set of `len`, i.e. more than two thirds.
pub fn quorum(len: u32) -> u32 {
	(2 * len as u64 / 3 + 1) as u32
}

/// Number of signatures a relayer has to prove for a validator set of `len`.
pub fn sample_size(len: u32) -> u32 {
	((len as u64 + 2) / 3 + 1) as u32
}

/// Validate a relayer supplied claim of signers against a validator set of `validators`.
pub fn create_initial_bitfield(claimed: Vec<u64>, validators: u32) -> Result<Bitfield, Error> {
	let bitfield = Bitfield::from_words(claimed, validators)?;

	let got = bitfield.count_ones();
	let want = quorum(validators);
	if got < want {
		return Err(Error::InsufficientClaim { got, want });
	}

	Ok(bitfield)
}

/// Pick `subset_size` distinct positions out of the ones set in `claimed`.
///
/// The selection is a partial Fisher-Yates shuffle of the claimed positions, driven by
/// `keccak_256(SCALE(seed, counter))`. It is a pure function of its inputs, so any observer
/// can re-derive the challenge. If fewer than `subset_size` bits are claimed, all of them are
/// selected.
pub fn derive_challenge_bitfield(seed: &H256, claimed: &Bitfield, subset_size: u32) -> Bitfield {
	let mut eligible = claimed.ones().collect::<Vec<_>>();
	let n = eligible.len().min(subset_size as usize);

	for k in 0..n {
		let random = (seed, k as u32).using_encoded(keccak_256);
		let mut head = [0_u8; 8];
		head.copy_from_slice(&random.as_bytes()[..8]);
		let remaining = (eligible.len() - k) as u64;
		let j = k + (u64::from_le_bytes(head) % remaining) as usize;
		eligible.swap(k, j);
	}

	let mut challenge = Bitfield::new(claimed.len());
	for position in &eligible[..n] {
		challenge.set(*position);
	}

	log::trace!(target: "beefy", "🥩 challenge bitfield {} for seed {:?}", challenge, seed);

	challenge
}

/// Return `true` if every bit set in `full` is also set in `claimed`.
pub fn verify_bitfield_subset(full: &Bitfield, claimed: &Bitfield) -> bool {
	full.is_subset_of(claimed)
}
