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

//! secp256k1 signatures over commitment hashes.

use codec::{Decode, Encode};
use log::trace;

use crate::{
	keccak_256,
	validator_set::{verify_membership, MembershipProof, ValidatorSet},
	Address, Error, H256,
};

/// A recoverable ECDSA signature in Ethereum layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct Signature {
	pub r: H256,
	pub s: H256,
	/// Recovery id, either `0`/`1` or `27`/`28`.
	pub v: u8,
}

impl Signature {
	/// Split a 65 byte `r ++ s ++ v` signature.
	pub fn from_raw(raw: &[u8; 65]) -> Self {
		Signature {
			r: H256::from_slice(&raw[..32]),
			s: H256::from_slice(&raw[32..64]),
			v: raw[64],
		}
	}

	/// Join into 65 bytes `r ++ s ++ v`.
	pub fn to_raw(&self) -> [u8; 65] {
		let mut raw = [0_u8; 65];
		raw[..32].copy_from_slice(self.r.as_bytes());
		raw[32..64].copy_from_slice(self.s.as_bytes());
		raw[64] = self.v;
		raw
	}
}

/// Ethereum address of `public`: the last 20 bytes of the keccak hash of the uncompressed key.
pub fn public_to_address(public: &secp256k1::PublicKey) -> Address {
	let uncompressed = public.serialize();
	Address::from_slice(&keccak_256(&uncompressed[1..]).as_bytes()[12..])
}

/// Recover the address that signed the pre-hashed message `hash`.
///
/// Rejects recovery ids other than `0`, `1`, `27` and `28`, scalars not below the curve order
/// and high `s` values.
pub fn recover_signer(hash: &H256, signature: &Signature) -> Result<Address, Error> {
	let recovery_id = match signature.v {
		0 | 1 => signature.v,
		27 | 28 => signature.v - 27,
		_ => return Err(Error::MalformedSignature),
	};
	let recovery_id = secp256k1::RecoveryId::parse(recovery_id).map_err(|_| Error::MalformedSignature)?;

	let mut rs = [0_u8; 64];
	rs[..32].copy_from_slice(signature.r.as_bytes());
	rs[32..].copy_from_slice(signature.s.as_bytes());
	let sig = secp256k1::Signature::parse_standard(&rs).map_err(|_| Error::MalformedSignature)?;
	if sig.s.is_high() {
		return Err(Error::MalformedSignature);
	}

	let message = secp256k1::Message::parse(hash.as_fixed_bytes());
	let public = secp256k1::recover(&message, &sig, &recovery_id).map_err(|_| Error::MalformedSignature)?;

	Ok(public_to_address(&public))
}

/// Check that `signature` over `hash` was made by the validator `proof` places in `set`.
pub fn verify_attestation(
	hash: &H256,
	signature: &Signature,
	proof: &MembershipProof,
	set: &ValidatorSet,
) -> Result<(), Error> {
	let position = proof.position;
	let signer = recover_signer(hash, signature)?;

	if signer != proof.address {
		return Err(Error::SignerMismatch { position });
	}

	if !verify_membership(set, proof) {
		return Err(Error::UnknownValidator { position });
	}

	trace!(target: "beefy", "🥩 Valid signature of validator #{} ({:?}) for {:?}", position, signer, hash);

	Ok(())
}
