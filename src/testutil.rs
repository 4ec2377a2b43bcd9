
//! Test-only fixtures for building minimal, deterministic P2WPKH-shaped transactions without a
//! live wallet or blockchain. Used by this crate's own unit tests; the `tests/` integration
//! suite keeps its own copy since it cannot see `#[cfg(test)]` items of the library crate.

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{
	Address, Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
	WPubkeyHash, Witness,
};

/// A throwaway P2WPKH identity: enough to have a distinct, resolvable address, without touching
/// secp256k1 or the (out-of-scope) key-derivation engine.
pub struct Fixture {
	script_pubkey: ScriptBuf,
	network: Network,
}

impl Fixture {
	pub fn new() -> Fixture {
		let bytes: [u8; 20] = rand::random();
		let hash = WPubkeyHash::from_byte_array(bytes);
		Fixture {
			script_pubkey: ScriptBuf::new_p2wpkh(&hash),
			network: Network::Regtest,
		}
	}

	pub fn address(&self) -> Address {
		Address::from_script(&self.script_pubkey, self.network).unwrap()
	}

	pub fn address_str(&self) -> String {
		self.address().to_string()
	}

	pub fn script_pubkey(&self) -> &ScriptBuf {
		&self.script_pubkey
	}

	/// A one-input, one-output transaction paying `value_sat` to this fixture's address. The
	/// input spends an arbitrary external outpoint, as a real receive would.
	pub fn receive_tx(&self, value_sat: u64) -> Transaction {
		Transaction {
			version: Version::TWO,
			lock_time: LockTime::ZERO,
			input: vec![TxIn {
				previous_output: OutPoint::new(Txid::all_zeros(), 0),
				script_sig: ScriptBuf::new(),
				sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
				witness: Witness::new(),
			}],
			output: vec![TxOut {
				value: Amount::from_sat(value_sat),
				script_pubkey: self.script_pubkey.clone(),
			}],
		}
	}
}

impl Default for Fixture {
	fn default() -> Fixture {
		Fixture::new()
	}
}

/// A transaction spending `outpoint` and paying `value_sat` to `to`'s address.
pub fn spend(outpoint: OutPoint, to: &Fixture, value_sat: u64) -> Transaction {
	Transaction {
		version: Version::TWO,
		lock_time: LockTime::ZERO,
		input: vec![TxIn {
			previous_output: outpoint,
			script_sig: ScriptBuf::new(),
			sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
			witness: Witness::new(),
		}],
		output: vec![TxOut {
			value: Amount::from_sat(value_sat),
			script_pubkey: to.script_pubkey.clone(),
		}],
	}
}
