
use bitcoin::Txid;

/// `InvalidAddress`, `FeeNotEstimable` and `InsufficientFunds` are recoverable and are returned
/// from the user-initiated path (building a proposal). `DuplicateTxInHistory` and `NetworkError`
/// originate on the autonomous indexing path: there is no retry policy at this layer, and a
/// caller that sees one is expected to tear the index down and resynchronize from scratch.
/// `Cancelled` is returned from `wait_synchronized` when the owner is shutting down.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid address: {0}")]
	InvalidAddress(String),

	#[error("fee rate could not be estimated for the requested target")]
	FeeNotEstimable,

	#[error("insufficient funds to build the requested transaction")]
	InsufficientFunds,

	#[error("server reported tx {0} twice in the same address history")]
	DuplicateTxInHistory(Txid),

	#[error("blockchain client error while fetching tx {txid}: {source}")]
	NetworkError {
		txid: Txid,
		source: Box<dyn std::error::Error + Send + Sync + 'static>,
	},

	#[error("synchronizer cancelled during shutdown")]
	Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
