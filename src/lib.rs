// Rust Bitcoin Wallet
// Written in 2019 by
//   Steven Roose <steven@stevenroose.org>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the CC0 Public Domain Dedication
// along with this software.
// If not, see <http://creativecommons.org/publicdomain/zero/1.0/>.
//

//! # spv-wallet-core
//!
//! The transaction index and spend planner for a lightweight (SPV) Bitcoin wallet: the
//! authoritative record of the wallet's own transactions and outputs, and the coin selection
//! that turns a balance into a signable spend. Address derivation, the blockchain transport and
//! transaction signing live outside this crate.

// Coding conventions
#![forbid(unsafe_code)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]

pub mod blockchain;
pub mod config;
pub mod error;
pub mod index;
pub mod planner;
pub mod sync;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{Error, Result};
pub use index::TxIndex;
