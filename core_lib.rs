//! Host-side transaction signing for KeepKey hardware wallets
//!
//! The device holds the keys and sees the transaction one slice at a time.
//! This crate builds the transaction table, answers every request the device
//! makes during `SignTx`, and assembles the signed transaction it streams back.

pub mod chains;
pub mod config;
pub mod errors;
pub mod messages;
pub mod transport;

pub use chains::bitcoin::{sign_transaction, SignInfo, SignedTransaction, SigningSession, TransactionTable};
pub use config::{DeviceType, LinkConfig, SessionConfig};
pub use errors::{DecodeError, Result, SigningError, TransportError};
pub use transport::{open_link, DeviceLink};
