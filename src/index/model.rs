
use std::collections::HashSet;

use bitcoin::{Transaction as BtcTransaction, TxIn as BtcTxIn, TxOut as BtcTxOut, Txid};
use serde::{Deserialize, Serialize};

/// A transaction the index has indexed, together with the data only the index knows: at what
/// height it confirmed (`<= 0` for unconfirmed) and which of our addresses it touches.
///
/// Per I2, `addresses` is never empty for a transaction reachable through the index's public
/// maps; a transaction whose last associating address is removed is deleted along with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
	pub tx: BtcTransaction,
	pub height: i32,
	pub(crate) addresses: HashSet<String>,
}

impl Transaction {
	pub fn is_confirmed(&self) -> bool {
		self.height > 0
	}
}

/// A transaction output known to belong to the wallet, keyed by its [`bitcoin::OutPoint`] in
/// the index's `outputs` map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxOut {
	pub txout: BtcTxOut,
	pub address: String,
}

impl TxOut {
	pub fn value_sat(&self) -> u64 {
		self.txout.value.to_sat()
	}
}

/// An input observed in some indexed transaction, keyed by the outpoint it spends.
///
/// Present for every input of every indexed transaction, whether or not the output it spends
/// is itself one of ours: a spending tx may be indexed before the output it spends is, and the
/// input record is what lets later queries still recognize the output as spent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxIn {
	pub txin: BtcTxIn,
	pub tx_hash: Txid,
}

/// The direction/shape of a transaction from the wallet's point of view, per §4.2.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
	/// Funds arriving from outside the wallet.
	Receive,
	/// Funds leaving the wallet to an external address.
	Send,
	/// Funds moved between the wallet's own addresses only.
	SendSelf,
}

/// A transaction annotated for display: its type, net wallet-relative amount, and (for sends)
/// the fee paid. `fee` is `None` for `Receive`, which has no fee concept from the recipient's
/// point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxInfo {
	pub txid: Txid,
	pub height: i32,
	pub tx: BtcTransaction,
	pub tx_type: TxType,
	pub amount: u64,
	pub fee: Option<u64>,
}

/// The wallet's confirmed-vs-incoming view of its funds, per §4.2.1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
	/// Confirmed funds, plus unconfirmed funds the wallet produced itself (all inputs ours).
	pub available: u64,
	/// Unconfirmed funds of unknown provenance arriving into the wallet.
	pub incoming: u64,
}
