
//! The transaction index: the wallet's authoritative view of its own transactions, outputs,
//! inputs and balance, built up from address-history notifications.

pub mod model;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use bitcoin::{Network, OutPoint, Transaction as BtcTransaction, Txid};

use crate::blockchain::{script_to_address, BlockchainClient};
use crate::config::WalletConfig;
use crate::error::{Error, Result};
use crate::sync::Synchronizer;

pub use model::{Balance, Transaction, TxIn, TxInfo, TxOut, TxType};

/// A continuation awaiting a raw-tx fetch: the `(address, height)` pair that
/// `process_tx_for_address` needs once the transaction body arrives.
struct PendingFetch {
	address: String,
	height: i32,
}

#[derive(Default)]
struct IndexState {
	transactions: HashMap<Txid, Transaction>,
	outputs: HashMap<OutPoint, TxOut>,
	inputs: HashMap<OutPoint, TxIn>,
	address_history: HashMap<String, HashSet<Txid>>,
	pending_fetches: HashMap<Txid, Vec<PendingFetch>>,
}

/// A fault raised on the autonomous indexing path. Once set, the index is considered torn
/// down: every public operation returns it until the owner rebuilds a fresh `TxIndex`.
#[derive(Debug, Clone)]
enum Fault {
	NetworkError(Txid, String),
}

impl Fault {
	fn into_error(self) -> Error {
		match self {
			Fault::NetworkError(txid, msg) => Error::NetworkError {
				txid,
				source: Box::<dyn std::error::Error + Send + Sync>::from(msg),
			},
		}
	}
}

/// The wallet's transaction index. Cheap to clone: state is shared behind an `Arc`, so clones
/// refer to the same underlying index (useful for handing a handle to the blockchain client's
/// completion callbacks).
#[derive(Clone)]
pub struct TxIndex {
	network: Network,
	state: Arc<RwLock<IndexState>>,
	sync: Synchronizer,
	blockchain: Arc<dyn BlockchainClient>,
	fault: Arc<Mutex<Option<Fault>>>,
}

impl TxIndex {
	pub fn new(config: WalletConfig, blockchain: Arc<dyn BlockchainClient>) -> TxIndex {
		TxIndex {
			network: config.network,
			state: Arc::new(RwLock::new(IndexState::default())),
			sync: Synchronizer::new(),
			blockchain,
			fault: Arc::new(Mutex::new(None)),
		}
	}

	pub fn synchronizer(&self) -> &Synchronizer {
		&self.sync
	}

	/// Unblocks every in-flight `wait_synchronized` call with `Error::Cancelled` and discards
	/// pending fetch continuations, per §5's cancellation contract. Public operations issued
	/// after shutdown still run, but any that quiesce first will observe the cancellation.
	pub fn shutdown(&self) {
		self.state.write().unwrap().pending_fetches.clear();
		self.sync.shutdown();
	}

	fn check_fault(&self) -> Result<()> {
		match self.fault.lock().unwrap().clone() {
			Some(fault) => Err(fault.into_error()),
			None => Ok(()),
		}
	}

	/// Replaces the last-known history for `address` with `entries`. Downloads (if not already
	/// cached) and indexes every retained or newly-added transaction; drops every transaction
	/// that is no longer reported.
	///
	/// Removals are applied before additions, and additions are issued in the order given in
	/// `entries`, per the ordering guarantee of §5 of the spec this crate implements.
	pub fn update_address_history(&self, address: &str, entries: &[(Txid, i32)]) -> Result<()> {
		self.check_fault()?;

		let mut seen = HashSet::with_capacity(entries.len());
		for (txid, _) in entries {
			if !seen.insert(*txid) {
				return Err(Error::DuplicateTxInHistory(*txid));
			}
		}

		// The fetch-registration bookkeeping happens under the write lock; the network call
		// itself is issued only after the lock is released, so a blockchain client that
		// resolves `transaction_get` synchronously (as this crate's own test fakes do) never
		// has to re-enter the index's lock from the thread that is still holding it.
		let mut to_fetch = Vec::new();
		{
			let mut state = self.state.write().unwrap();

			let previously_reported = state.address_history.get(address).cloned().unwrap_or_default();
			for old_txid in previously_reported.difference(&seen) {
				remove_tx_for_address(&mut state, address, *old_txid);
			}
			state.address_history.insert(address.to_string(), seen);

			for &(txid, height) in entries {
				self.register_or_process(&mut state, address, txid, height, &mut to_fetch);
			}
		}

		for txid in to_fetch {
			self.issue_fetch(txid);
		}

		Ok(())
	}

	/// Either processes `txid` immediately (already cached) or enqueues `(address, height)` to
	/// be processed once a fetch completes, appending `txid` to `to_fetch` iff this is the first
	/// pending continuation for it (i.e. no fetch is in flight yet and one must now be issued).
	fn register_or_process(
		&self,
		state: &mut IndexState,
		address: &str,
		txid: Txid,
		height: i32,
		to_fetch: &mut Vec<Txid>,
	) {
		if let Some(tx) = state.transactions.get(&txid).map(|t| t.tx.clone()) {
			process_tx_for_address(state, self.network, address, txid, tx, height);
			return;
		}

		let pending = state.pending_fetches.entry(txid).or_default();
		let already_in_flight = !pending.is_empty();
		pending.push(PendingFetch {
			address: address.to_string(),
			height,
		});
		if !already_in_flight {
			to_fetch.push(txid);
		}
	}

	/// Issues the one outstanding network fetch for `txid`, draining every queued continuation
	/// once it resolves. Must be called with the index's lock *not* held.
	fn issue_fetch(&self, txid: Txid) {
		let done = self.sync.inc_requests();
		let state_handle = self.state.clone();
		let fault_handle = self.fault.clone();
		let network = self.network;
		self.blockchain.transaction_get(
			txid,
			Box::new(move |result| {
				match result {
					Ok(tx) => {
						let mut state = state_handle.write().unwrap();
						let pending = state.pending_fetches.remove(&txid).unwrap_or_default();
						for p in pending {
							process_tx_for_address(&mut state, network, &p.address, txid, tx.clone(), p.height);
						}
					}
					Err(e) => {
						tracing::error!(%txid, error = %e, "fatal: raw tx fetch failed");
						*fault_handle.lock().unwrap() = Some(Fault::NetworkError(txid, e.to_string()));
						state_handle.write().unwrap().pending_fetches.remove(&txid);
					}
				}
			}),
			done,
		);
	}

	/// Outputs that are unspent and eligible to be spent: confirmed, or unconfirmed but built
	/// entirely from our own other outputs.
	pub fn spendable_outputs(&self) -> Result<HashMap<OutPoint, TxOut>> {
		self.sync.wait_synchronized()?;
		self.check_fault()?;
		let state = self.state.read().unwrap();
		let mut result = HashMap::new();
		for (outpoint, txout) in &state.outputs {
			if state.inputs.contains_key(outpoint) {
				continue;
			}
			let tx = state
				.transactions
				.get(&outpoint.txid)
				.expect("I1: every indexed output's tx is indexed");
			if tx.is_confirmed() || all_inputs_ours(&state, &tx.tx) {
				result.insert(*outpoint, txout.clone());
			}
		}
		Ok(result)
	}

	/// The wallet's available (spendable now) and incoming (unconfirmed, not yet spendable)
	/// balance, in satoshis.
	pub fn balance(&self) -> Result<Balance> {
		self.sync.wait_synchronized()?;
		self.check_fault()?;
		let state = self.state.read().unwrap();
		let mut balance = Balance::default();
		for (outpoint, txout) in &state.outputs {
			if state.inputs.contains_key(outpoint) {
				continue;
			}
			let tx = state
				.transactions
				.get(&outpoint.txid)
				.expect("I1: every indexed output's tx is indexed");
			if tx.is_confirmed() || all_inputs_ours(&state, &tx.tx) {
				balance.available += txout.value_sat();
			} else {
				balance.incoming += txout.value_sat();
			}
		}
		Ok(balance)
	}

	/// All indexed transactions, annotated for display and sorted by height descending, with
	/// unconfirmed transactions (`height <= 0`) ranked first.
	pub fn transactions(&self, is_change_address: impl Fn(&str) -> bool) -> Result<Vec<TxInfo>> {
		self.sync.wait_synchronized()?;
		self.check_fault()?;
		let state = self.state.read().unwrap();
		let mut infos: Vec<TxInfo> = state
			.transactions
			.iter()
			.map(|(txid, tx)| annotate(&state, *txid, tx, &is_change_address))
			.collect();
		infos.sort_by(|a, b| {
			let a_unconfirmed = a.height <= 0;
			let b_unconfirmed = b.height <= 0;
			match (a_unconfirmed, b_unconfirmed) {
				(true, true) => b.txid.cmp(&a.txid),
				(true, false) => std::cmp::Ordering::Less,
				(false, true) => std::cmp::Ordering::Greater,
				(false, false) => b.height.cmp(&a.height).then_with(|| b.txid.cmp(&a.txid)),
			}
		});
		Ok(infos)
	}
}

fn all_inputs_ours(state: &IndexState, tx: &BtcTransaction) -> bool {
	tx.input.iter().all(|txin| state.outputs.contains_key(&txin.previous_output))
}

/// Indexes `tx` (already resolved) under `address`, unless the history has since retracted it.
fn process_tx_for_address(
	state: &mut IndexState,
	network: Network,
	address: &str,
	txid: Txid,
	tx: BtcTransaction,
	height: i32,
) {
	match state.address_history.get(address) {
		Some(history) if history.contains(&txid) => {}
		_ => {
			tracing::debug!(%txid, %address, "history retracted before fetch completed, dropping");
			return;
		}
	}

	if !state.transactions.contains_key(&txid) {
		state.transactions.insert(
			txid,
			Transaction {
				tx: tx.clone(),
				height,
				addresses: HashSet::new(),
			},
		);
	}
	{
		let entry = state.transactions.get_mut(&txid).unwrap();
		entry.height = height;
		entry.addresses.insert(address.to_string());
	}

	for txin in &tx.input {
		let prev = txin.previous_output;
		if let Some(existing) = state.inputs.get(&prev) {
			if existing.tx_hash != txid {
				tracing::warn!(
					outpoint = %prev,
					previous_tx = %existing.tx_hash,
					new_tx = %txid,
					"double spend detected, last observation wins"
				);
			}
		}
		state.inputs.insert(
			prev,
			TxIn {
				txin: txin.clone(),
				tx_hash: txid,
			},
		);
	}

	for (vout, txout) in tx.output.iter().enumerate() {
		let Some(resolved) = script_to_address(&txout.script_pubkey, network) else {
			continue;
		};
		let resolved = resolved.to_string();
		if resolved == address {
			let outpoint = OutPoint {
				txid,
				vout: vout as u32,
			};
			state.outputs.insert(
				outpoint,
				TxOut {
					txout: txout.clone(),
					address: resolved,
				},
			);
		}
	}
}

/// Drops `address`'s association with `txid`; purges the transaction (and the inputs/outputs
/// it contributed) once no address references it anymore.
fn remove_tx_for_address(state: &mut IndexState, address: &str, txid: Txid) {
	let Some(transaction) = state.transactions.get_mut(&txid) else {
		return;
	};
	transaction.addresses.remove(address);
	if !transaction.addresses.is_empty() {
		return;
	}

	let tx = state.transactions.remove(&txid).unwrap().tx;
	for txin in &tx.input {
		state.inputs.remove(&txin.previous_output);
	}
	for vout in 0..tx.output.len() {
		state.outputs.remove(&OutPoint {
			txid,
			vout: vout as u32,
		});
	}
}

fn annotate(
	state: &IndexState,
	txid: Txid,
	tx: &Transaction,
	is_change_address: &impl Fn(&str) -> bool,
) -> TxInfo {
	let mut sum_our_inputs: u64 = 0;
	let mut all_inputs_ours = true;
	for txin in &tx.tx.input {
		match state.outputs.get(&txin.previous_output) {
			Some(spent) => sum_our_inputs += spent.value_sat(),
			None => all_inputs_ours = false,
		}
	}

	let mut sum_all_outputs: u64 = 0;
	let mut sum_our_receive: u64 = 0;
	let mut sum_our_change: u64 = 0;
	let mut all_outputs_ours = true;
	for (vout, txout) in tx.tx.output.iter().enumerate() {
		sum_all_outputs += txout.value.to_sat();
		let outpoint = OutPoint {
			txid,
			vout: vout as u32,
		};
		match state.outputs.get(&outpoint) {
			Some(ours) if is_change_address(&ours.address) => sum_our_change += ours.value_sat(),
			Some(ours) => sum_our_receive += ours.value_sat(),
			None => all_outputs_ours = false,
		}
	}

	let (tx_type, amount, fee) = if all_inputs_ours {
		let fee = sum_our_inputs.saturating_sub(sum_all_outputs);
		if all_outputs_ours {
			(TxType::SendSelf, sum_our_receive, Some(fee))
		} else {
			let amount = sum_all_outputs.saturating_sub(sum_our_receive).saturating_sub(sum_our_change);
			(TxType::Send, amount, Some(fee))
		}
	} else {
		let amount = (sum_our_receive + sum_our_change).saturating_sub(sum_our_inputs);
		(TxType::Receive, amount, None)
	};

	TxInfo {
		txid,
		height: tx.height,
		tx: tx.tx.clone(),
		tx_type,
		amount,
		fee,
	}
}
