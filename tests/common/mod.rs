//! Fixtures for the integration suite. Duplicates `spv_wallet_core::testutil` (a `#[cfg(test)]`
//! item of the lib crate, invisible from here) plus the fake collaborators the public API needs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{
	Address, Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
	WPubkeyHash, Witness,
};

use spv_wallet_core::blockchain::{BlockchainClient, ChangeAddressSource, FeeOracle, FeeTargetCode};
use spv_wallet_core::sync::Handle;

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

/// A blockchain client whose transactions are all pre-seeded and resolved synchronously, from
/// the calling thread, as a well-warmed local cache would.
#[derive(Default)]
pub struct FakeBlockchain {
	txs: Mutex<HashMap<Txid, Transaction>>,
	pub fetch_count: AtomicUsize,
}

impl FakeBlockchain {
	pub fn new() -> Arc<FakeBlockchain> {
		Arc::new(FakeBlockchain::default())
	}

	pub fn seed(&self, tx: Transaction) {
		self.txs.lock().unwrap().insert(tx.compute_txid(), tx);
	}
}

impl BlockchainClient for FakeBlockchain {
	fn transaction_get(
		&self,
		txid: Txid,
		on_result: Box<dyn FnOnce(Result<Transaction, Box<dyn std::error::Error + Send + Sync>>) + Send>,
		_done: Handle,
	) {
		self.fetch_count.fetch_add(1, Ordering::SeqCst);
		match self.txs.lock().unwrap().get(&txid).cloned() {
			Some(tx) => on_result(Ok(tx)),
			None => on_result(Err("no such tx".into())),
		}
	}

	fn transaction_broadcast(&self, _tx: &Transaction) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		Ok(())
	}
}

pub struct FixedFeeOracle(pub Option<u64>);

impl FeeOracle for FixedFeeOracle {
	fn fee_rate_per_kb(&self, _target: FeeTargetCode) -> Option<u64> {
		self.0
	}
}

pub struct FixedChangeSource(pub Fixture);

impl ChangeAddressSource for FixedChangeSource {
	fn get_change_address(&mut self) -> Address {
		self.0.address()
	}
}
