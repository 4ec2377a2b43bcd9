
use bitcoin::Network;
use serde::{Deserialize, Serialize};

/// The conventional dust figure for a P2WPKH/P2PKH output, in satoshis: below this an output
/// costs more to spend later than it is worth, so the planner donates it to the fee instead
/// of creating it as change.
pub const DEFAULT_DUST_THRESHOLD_SAT: u64 = 546;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
	pub network: Network,
	#[serde(default = "default_dust_threshold")]
	pub dust_threshold_sat: u64,
}

fn default_dust_threshold() -> u64 {
	DEFAULT_DUST_THRESHOLD_SAT
}

impl WalletConfig {
	pub fn new(network: Network) -> WalletConfig {
		WalletConfig {
			network,
			dust_threshold_sat: DEFAULT_DUST_THRESHOLD_SAT,
		}
	}
}

impl Default for WalletConfig {
	fn default() -> WalletConfig {
		WalletConfig::new(Network::Bitcoin)
	}
}
