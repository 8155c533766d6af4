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

#![warn(missing_docs)]

use crate::{keccak_256, signature::public_to_address, Address, Signature, H256};

/// Set of deterministic secp256k1 test accounts.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum Keyring {
	Alice,
	Bob,
	Charlie,
	Dave,
	Eve,
	Ferdie,
	One,
	Two,
}

impl Keyring {
	/// Sign the pre-hashed message `hash`.
	pub fn sign(self, hash: &H256) -> Signature {
		let message = secp256k1::Message::parse(hash.as_fixed_bytes());
		let (sig, recovery_id) = secp256k1::sign(&message, &self.secret());
		let rs = sig.serialize();

		Signature {
			r: H256::from_slice(&rs[..32]),
			s: H256::from_slice(&rs[32..]),
			v: recovery_id.serialize(),
		}
	}

	/// Return the secret key, derived from the seed string.
	pub fn secret(self) -> secp256k1::SecretKey {
		secp256k1::SecretKey::parse(keccak_256(self.to_seed().as_bytes()).as_fixed_bytes())
			.expect("keccak of a short seed is a valid secp256k1 scalar; qed")
	}

	/// Return public key.
	pub fn public(self) -> secp256k1::PublicKey {
		secp256k1::PublicKey::from_secret_key(&self.secret())
	}

	/// Return the Ethereum address.
	pub fn address(self) -> Address {
		public_to_address(&self.public())
	}

	/// Return seed string.
	pub fn to_seed(self) -> String {
		format!("//{}", self)
	}

	/// Iterator over all test accounts
	pub fn iter() -> impl Iterator<Item = Keyring> {
		<Self as strum::IntoEnumIterator>::iter()
	}
}
