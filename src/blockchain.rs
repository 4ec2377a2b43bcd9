
use bitcoin::{Address, Network, Script, Transaction, Txid};

use crate::sync::Handle;

/// A target fee-confirmation speed, as exposed by the fee oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeeTargetCode {
	Low,
	Economy,
	Normal,
	High,
}

/// The fee-rate estimation service. `None` means the target could not be estimated from
/// current network conditions, which the planner surfaces as [`crate::error::Error::FeeNotEstimable`].
pub trait FeeOracle {
	fn fee_rate_per_kb(&self, target: FeeTargetCode) -> Option<u64>;
}

/// A fresh, never-yet-used change address, sourced from the (out-of-scope) HD address engine.
/// Implementations are used from a single thread (the spend planner) and need not be `Sync`.
pub trait ChangeAddressSource {
	fn get_change_address(&mut self) -> Address;
}

/// The subset of an `Electrum`-style server query interface the index depends on.
///
/// `transaction_get` is asynchronous: the implementation owns retry/transport and calls
/// `on_result` from whatever thread the transport completes on, exactly once, holding `done`
/// until that call returns so the synchronizer keeps counting the request as outstanding for
/// its whole lifetime.
pub trait BlockchainClient: Send + Sync {
	fn transaction_get(
		&self,
		txid: Txid,
		on_result: Box<dyn FnOnce(Result<Transaction, Box<dyn std::error::Error + Send + Sync>>) + Send>,
		done: Handle,
	);

	fn transaction_broadcast(
		&self,
		tx: &Transaction,
	) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Extracts the single wallet address a scriptPubKey pays to, if any.
///
/// Mirrors the original indexer's `txscript.ExtractPkScriptAddrs`: multisig, bare scripts and
/// `OP_RETURN` outputs resolve to zero or more than one address and are skipped by returning
/// `None` rather than an error, since "not a single-address output" is an expected, common case
/// and not a parse failure.
pub fn script_to_address(script: &Script, network: Network) -> Option<Address> {
	Address::from_script(script, network).ok()
}
