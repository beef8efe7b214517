//! Caller supplied description of a transaction to sign

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::DecodeError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputInfo {
    #[serde(default)]
    pub address_n: Vec<u32>,
    pub prev_hash: String,
    pub prev_index: u32,
    /// Hex encoded script sig; empty for inputs of the transaction being signed
    #[serde(default)]
    pub script: String,
    /// Protobuf name, e.g. `SPENDADDRESS`
    #[serde(default)]
    pub script_type: Option<String>,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub sequence: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputInfo {
    #[serde(default)]
    pub address_n: Vec<u32>,
    #[serde(default)]
    pub address: String,
    /// Protobuf name, e.g. `PAYTOADDRESS`
    pub script_type: String,
    pub amount: u64,
}

/// Already compiled output of a previous transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinOutputInfo {
    pub amount: u64,
    pub script_pubkey: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionTypeInfo {
    /// Transaction id this entry is looked up by
    pub hash: String,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub lock_time: Option<u32>,
    #[serde(default)]
    pub inputs: Vec<InputInfo>,
    #[serde(default)]
    pub outputs: Vec<OutputInfo>,
    #[serde(default)]
    pub bin_outputs: Vec<BinOutputInfo>,
    pub inputs_count: u32,
    pub outputs_count: u32,
    #[serde(default)]
    pub extra_data: String,
    #[serde(default)]
    pub extra_data_len: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInfo {
    #[serde(default)]
    pub coin_name: Option<String>,
    pub inputs: Vec<InputInfo>,
    pub outputs: Vec<OutputInfo>,
    #[serde(default)]
    pub prev_txes: Vec<TransactionTypeInfo>,
}

impl SignInfo {
    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        debug!("📄 Loading signing request from {:?}", path);
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
