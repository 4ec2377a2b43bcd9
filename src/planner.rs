
//! The spend planner: turns a set of spendable outputs into a signable, fee-paying transaction.
//!
//! Coin selection is a deterministic ascending-value walk, not the teacher's random
//! extra-input/shuffled-change-index scheme: §4.3.5 of the spec this crate implements requires
//! the same inputs to always produce the same proposal, so two callers asking for the same spend
//! against the same index state get byte-identical transactions.

use std::collections::HashMap;
use std::str::FromStr;

use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{Address, Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut as BtcTxOut, Witness};

use crate::blockchain::{ChangeAddressSource, FeeOracle, FeeTargetCode};
use crate::error::{Error, Result};
use crate::index::TxOut;

/// vsize of one native-P2WPKH input: 32 (prevout txid) + 4 (vout) + 1 (empty scriptSig length)
/// + 4 (sequence) non-witness bytes, plus a (1 + 72 + 1 + 33)-byte witness stack counted at
/// quarter weight. Matches a standard single-sig P2WPKH spend.
const P2WPKH_INPUT_VSIZE: u64 = 68;

/// version (4) + locktime (4) + segwit marker/flag (2, counted at quarter weight) + input/output
/// count varints (2, one input one output being the common case).
const TX_OVERHEAD_VSIZE: u64 = 11;

/// A finished, unsigned spend ready to be handed to the (out-of-scope) signer.
#[derive(Debug, Clone)]
pub struct TxProposal {
	pub tx: Transaction,
	pub fee_sat: u64,
	/// The value delivered to the recipient, net of fee: `amount_sat` for `build_fixed_amount`,
	/// `total − fee` for `build_send_all`. The UI-facing number; callers shouldn't have to dig
	/// it back out of `tx.output[0]`.
	pub amount_sat: u64,
	pub spent_outpoints: Vec<OutPoint>,
}

/// Builds a transaction paying exactly `amount_sat` to `recipient_address`, selecting inputs
/// from `utxos` and adding a change output unless the leftover would be dust, in which case it
/// is donated to the fee instead. See §4.3 for the selection and fee rules.
pub fn build_fixed_amount(
	utxos: &HashMap<OutPoint, TxOut>,
	recipient_address: &str,
	amount_sat: u64,
	fee_target: FeeTargetCode,
	fee_oracle: &dyn FeeOracle,
	change_source: &mut dyn ChangeAddressSource,
	network: Network,
	dust_threshold_sat: u64,
) -> Result<TxProposal> {
	let recipient_script = parse_recipient(recipient_address, network)?;
	let fee_rate = fee_oracle.fee_rate_per_kb(fee_target).ok_or(Error::FeeNotEstimable)?;

	let candidates = ordered_candidates(utxos);

	let mut selected: Vec<(OutPoint, TxOut)> = Vec::new();
	let mut selected_sum: u64 = 0;

	for (outpoint, txout) in candidates {
		selected.push((outpoint, txout.clone()));
		selected_sum += txout.value_sat();

		let fee_with_change = estimate_fee(selected.len(), &[recipient_script.len(), CHANGE_SCRIPT_LEN], fee_rate);
		if selected_sum >= amount_sat.saturating_add(fee_with_change) {
			let leftover = selected_sum - amount_sat - fee_with_change;
			if leftover >= dust_threshold_sat {
				let change_address = change_source.get_change_address();
				let tx = build_transaction(
					&selected,
					vec![
						(recipient_script.clone(), amount_sat),
						(change_address.script_pubkey(), leftover),
					],
				);
				return Ok(TxProposal {
					tx,
					fee_sat: fee_with_change,
					amount_sat,
					spent_outpoints: selected.into_iter().map(|(o, _)| o).collect(),
				});
			}

			// Leftover is dust: drop the change output and donate it to the fee instead.
			// Removing an output only lowers the required fee, so the amount stays covered.
			let fee_sat = selected_sum - amount_sat;
			let tx = build_transaction(&selected, vec![(recipient_script.clone(), amount_sat)]);
			return Ok(TxProposal {
				tx,
				fee_sat,
				amount_sat,
				spent_outpoints: selected.into_iter().map(|(o, _)| o).collect(),
			});
		}
	}

	Err(Error::InsufficientFunds)
}

/// Builds a transaction spending every output in `utxos` to a single output at
/// `recipient_address`, paying the network fee out of the swept total. There is never a change
/// output: by definition nothing is left over.
pub fn build_send_all(
	utxos: &HashMap<OutPoint, TxOut>,
	recipient_address: &str,
	fee_target: FeeTargetCode,
	fee_oracle: &dyn FeeOracle,
	network: Network,
) -> Result<TxProposal> {
	let recipient_script = parse_recipient(recipient_address, network)?;
	let fee_rate = fee_oracle.fee_rate_per_kb(fee_target).ok_or(Error::FeeNotEstimable)?;

	let candidates = ordered_candidates(utxos);
	if candidates.is_empty() {
		return Err(Error::InsufficientFunds);
	}

	let total: u64 = candidates.iter().map(|(_, t)| t.value_sat()).sum();
	let fee_sat = estimate_fee(candidates.len(), &[recipient_script.len()], fee_rate);
	if total <= fee_sat {
		return Err(Error::InsufficientFunds);
	}
	let amount_sat = total - fee_sat;

	let selected: Vec<(OutPoint, TxOut)> = candidates.into_iter().map(|(o, t)| (o, t.clone())).collect();
	let tx = build_transaction(&selected, vec![(recipient_script, amount_sat)]);
	Ok(TxProposal {
		tx,
		fee_sat,
		amount_sat,
		spent_outpoints: selected.into_iter().map(|(o, _)| o).collect(),
	})
}

/// Script length of a standard change output (native P2WPKH: `OP_0 <20-byte hash>`), used for
/// the with-change fee estimate before a real change address has been requested.
const CHANGE_SCRIPT_LEN: usize = 22;

fn parse_recipient(address: &str, network: Network) -> Result<ScriptBuf> {
	let unchecked = Address::from_str(address).map_err(|e| Error::InvalidAddress(e.to_string()))?;
	let checked = unchecked
		.require_network(network)
		.map_err(|e| Error::InvalidAddress(e.to_string()))?;
	Ok(checked.script_pubkey())
}

/// Orders candidate inputs ascending by `(value, outpoint)`, the full deterministic sort key
/// required by §4.3.5: smallest value first, ties broken by txid bytes then vout.
fn ordered_candidates(utxos: &HashMap<OutPoint, TxOut>) -> Vec<(OutPoint, &TxOut)> {
	let mut candidates: Vec<(OutPoint, &TxOut)> = utxos.iter().map(|(o, t)| (*o, t)).collect();
	candidates.sort_by(|(a, a_out), (b, b_out)| {
		a_out
			.value_sat()
			.cmp(&b_out.value_sat())
			.then_with(|| a.txid.cmp(&b.txid))
			.then_with(|| a.vout.cmp(&b.vout))
	});
	candidates
}

fn estimate_fee(num_inputs: usize, output_script_lens: &[usize], fee_rate_per_kb: u64) -> u64 {
	let vsize = estimate_vsize(num_inputs, output_script_lens);
	(vsize * fee_rate_per_kb).div_ceil(1000)
}

fn estimate_vsize(num_inputs: usize, output_script_lens: &[usize]) -> u64 {
	let mut vsize = TX_OVERHEAD_VSIZE;
	vsize += P2WPKH_INPUT_VSIZE * num_inputs as u64;
	for &len in output_script_lens {
		vsize += output_vsize(len);
	}
	vsize
}

fn output_vsize(script_len: usize) -> u64 {
	8 + compact_size_len(script_len) as u64 + script_len as u64
}

fn compact_size_len(n: usize) -> usize {
	match n {
		0..=0xfc => 1,
		0xfd..=0xffff => 3,
		_ => 5,
	}
}

fn build_transaction(inputs: &[(OutPoint, TxOut)], outputs: Vec<(ScriptBuf, u64)>) -> Transaction {
	Transaction {
		version: Version::TWO,
		lock_time: LockTime::ZERO,
		input: inputs
			.iter()
			.map(|(outpoint, _)| TxIn {
				previous_output: *outpoint,
				script_sig: ScriptBuf::new(),
				sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
				witness: Witness::new(),
			})
			.collect(),
		output: outputs
			.into_iter()
			.map(|(script_pubkey, value)| BtcTxOut {
				value: Amount::from_sat(value),
				script_pubkey,
			})
			.collect(),
	}
}
