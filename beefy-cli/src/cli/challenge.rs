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

use crate::cli::utils::Positions;
use beefy_light_client::{
	bitfield::{derive_challenge_bitfield, quorum, sample_size},
	Bitfield, H256,
};
use structopt::StructOpt;

/// Re-derive the challenge of a session.
#[derive(Debug, StructOpt)]
#[structopt(about = "Re-derive the validators a relayer has to prove, as any observer can")]
pub struct Challenge {
	/// Hash of the session's lock block.
	pub seed: H256,
	/// Comma-separated positions of the claimed signers.
	pub claimed: Positions,
	/// Number of validators in the set.
	#[structopt(long)]
	pub validators: u32,
	/// Override the number of positions to sample.
	#[structopt(long)]
	pub subset_size: Option<u32>,
}

impl Challenge {
	pub fn run(self) -> anyhow::Result<()> {
		let subset_size = self.subset_size.unwrap_or_else(|| sample_size(self.validators));
		let (claimed, challenge) = challenge(&self.seed, &self.claimed.0, self.validators, subset_size)?;

		if claimed.count_ones() < quorum(self.validators) {
			log::warn!(
				target: "beefy",
				"🥩 {} claimed signers are short of the quorum of {}",
				claimed.count_ones(),
				quorum(self.validators)
			);
		}

		println!();
		println!("Claimed:   {}", claimed);
		println!("Challenge: {}", challenge);
		println!("Words: {:?}", challenge.words());
		println!("Positions: {:?}", challenge.ones().collect::<Vec<_>>());
		println!();

		Ok(())
	}
}

fn challenge(seed: &H256, claimed: &[u32], validators: u32, subset_size: u32) -> anyhow::Result<(Bitfield, Bitfield)> {
	let claimed = Bitfield::from_positions(claimed, validators)?;
	let challenge = derive_challenge_bitfield(seed, &claimed, subset_size);

	Ok((claimed, challenge))
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;

	#[test]
	fn challenge_matches_light_client() {
		// given
		let seed = H256(hex!("ba6b1a46b4edc8f1bd61e4cc6e4e58d7f6e0d1c4e2bb2b5e8c1fc5c2f6e6f0a1"));
		let claimed = (0..10).collect::<Vec<_>>();

		// when
		let (claimed, challenge) = challenge(&seed, &claimed, 10, 4).unwrap();

		// then
		assert_eq!(claimed.count_ones(), 10);
		assert_eq!(challenge.ones().collect::<Vec<_>>(), vec![2, 4, 5, 9]);
	}

	#[test]
	fn out_of_range_claim_fails() {
		assert!(challenge(&H256::zero(), &[0, 10], 10, 4).is_err());
	}
}
