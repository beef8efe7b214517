//! Bitcoin transaction model
//!
//! Builds the protobuf representation of the transaction being signed and of
//! the previous transactions its legacy inputs spend, and keeps them in a
//! [`TransactionTable`] keyed the way the device refers to them.

use std::collections::HashMap;

use log::{debug, warn};

use super::sign_info::{BinOutputInfo, InputInfo, OutputInfo, SignInfo, TransactionTypeInfo};
use crate::errors::{DecodeError, Result, SigningError};
use crate::messages::{
    InputScriptType, OutputScriptType, TransactionType, TxInputType, TxOutputBinType, TxOutputType,
};

/// Table key of the transaction being signed
pub const CURRENT_TX_KEY: &str = "";

/// Length of a transaction id
pub const TXID_LEN: usize = 32;

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|source| DecodeError::Hex { field, source }.into())
}

pub fn parse_input_script_type(name: &str) -> Result<InputScriptType> {
    InputScriptType::from_str_name(name)
        .ok_or_else(|| SigningError::UnknownScriptType(name.to_string()))
}

pub fn parse_output_script_type(name: &str) -> Result<OutputScriptType> {
    OutputScriptType::from_str_name(name)
        .ok_or_else(|| SigningError::UnknownScriptType(name.to_string()))
}

pub fn build_inputs(infos: &[InputInfo]) -> Result<Vec<TxInputType>> {
    infos
        .iter()
        .map(|info| {
            let script_type = info
                .script_type
                .as_deref()
                .map(parse_input_script_type)
                .transpose()?;
            let script_sig = decode_hex("script", &info.script)?;

            Ok(TxInputType {
                address_n: info.address_n.clone(),
                prev_hash: decode_hex("prevHash", &info.prev_hash)?,
                prev_index: info.prev_index,
                script_sig: (!script_sig.is_empty()).then_some(script_sig),
                sequence: info.sequence,
                script_type: script_type.map(|t| t as i32),
                amount: info.amount,
            })
        })
        .collect()
}

pub fn build_outputs(infos: &[OutputInfo]) -> Result<Vec<TxOutputType>> {
    infos
        .iter()
        .map(|info| {
            Ok(TxOutputType {
                address: (!info.address.is_empty()).then(|| info.address.clone()),
                address_n: info.address_n.clone(),
                amount: info.amount,
                script_type: parse_output_script_type(&info.script_type)? as i32,
                op_return_data: None,
            })
        })
        .collect()
}

pub fn build_bin_outputs(infos: &[BinOutputInfo]) -> Result<Vec<TxOutputBinType>> {
    infos
        .iter()
        .map(|info| {
            Ok(TxOutputBinType {
                amount: info.amount,
                script_pubkey: decode_hex("scriptPubkey", &info.script_pubkey)?,
            })
        })
        .collect()
}

/// Number of outputs the device will ask for
pub fn output_count(tx: &TransactionType) -> usize {
    if tx.bin_outputs.is_empty() {
        tx.outputs.len()
    } else {
        tx.bin_outputs.len()
    }
}

pub fn build_previous_transaction(info: &TransactionTypeInfo) -> Result<TransactionType> {
    let extra_data = decode_hex("extraData", &info.extra_data)?;

    let tx = TransactionType {
        version: info.version,
        inputs: build_inputs(&info.inputs)?,
        bin_outputs: build_bin_outputs(&info.bin_outputs)?,
        outputs: build_outputs(&info.outputs)?,
        lock_time: info.lock_time,
        inputs_cnt: Some(info.inputs_count),
        outputs_cnt: Some(info.outputs_count),
        extra_data_len: Some(extra_data.len() as u32),
        extra_data: (!extra_data.is_empty()).then_some(extra_data),
    };

    let checks = [
        ("inputs", info.inputs_count, tx.inputs.len()),
        ("outputs", info.outputs_count, output_count(&tx)),
    ];
    for (field, declared, actual) in checks {
        if declared as usize != actual {
            return Err(SigningError::CountMismatch {
                hash: info.hash.clone(),
                field,
                declared,
                actual,
            });
        }
    }
    if let Some(declared) = info.extra_data_len {
        let actual = tx.extra_data.as_ref().map_or(0, Vec::len);
        if declared as usize != actual {
            return Err(SigningError::CountMismatch {
                hash: info.hash.clone(),
                field: "extra data",
                declared,
                actual,
            });
        }
    }

    Ok(tx)
}

/// Inputs whose previous transaction the device must see in full
pub fn is_legacy(input: &TxInputType) -> bool {
    !matches!(
        input.script_type(),
        InputScriptType::Spendwitness | InputScriptType::Spendp2shwitness | InputScriptType::External
    )
}

/// Transactions the device may ask about during one signing session
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionTable {
    txes: HashMap<String, TransactionType>,
}

impl TransactionTable {
    /// Table holding only the transaction to sign
    pub fn new(inputs: Vec<TxInputType>, outputs: Vec<TxOutputType>) -> Self {
        let current = TransactionType {
            inputs_cnt: Some(inputs.len() as u32),
            outputs_cnt: Some(outputs.len() as u32),
            inputs,
            outputs,
            ..Default::default()
        };
        let mut txes = HashMap::new();
        txes.insert(CURRENT_TX_KEY.to_string(), current);
        Self { txes }
    }

    pub fn from_sign_info(info: &SignInfo) -> Result<Self> {
        let mut table = Self::new(build_inputs(&info.inputs)?, build_outputs(&info.outputs)?);
        for prev in &info.prev_txes {
            let hash = decode_hex("hash", &prev.hash)?;
            if hash.len() != TXID_LEN {
                return Err(SigningError::InvalidPreviousHash {
                    hash: prev.hash.clone(),
                    expected: TXID_LEN,
                    actual: hash.len(),
                });
            }
            table.insert_previous(&hash, build_previous_transaction(prev)?)?;
        }
        debug!(
            "📋 Transaction table: {} inputs, {} outputs, {} previous transactions",
            table.inputs_count(),
            table.outputs_count(),
            table.txes.len() - 1
        );
        Ok(table)
    }

    /// The empty hash is reserved for the transaction being signed
    pub fn insert_previous(&mut self, hash: &[u8], tx: TransactionType) -> Result<()> {
        if hash.is_empty() {
            return Err(SigningError::InvalidPreviousHash {
                hash: String::new(),
                expected: TXID_LEN,
                actual: 0,
            });
        }
        let key = hex::encode(hash);
        if self.txes.contains_key(&key) {
            warn!("Conflicting descriptions for prev_tx {}", key);
            return Err(SigningError::DuplicatePreviousTransaction(key));
        }
        self.txes.insert(key, tx);
        Ok(())
    }

    pub fn current(&self) -> &TransactionType {
        // Every constructor inserts the current transaction
        &self.txes[CURRENT_TX_KEY]
    }

    /// Resolve the transaction a device request refers to
    pub fn lookup(&self, tx_hash: Option<&[u8]>) -> Result<&TransactionType> {
        match tx_hash {
            None => Ok(self.current()),
            Some(hash) if hash.is_empty() => Ok(self.current()),
            Some(hash) => {
                let key = hex::encode(hash);
                self.txes
                    .get(&key)
                    .ok_or(SigningError::MissingPreviousTransaction(key))
            }
        }
    }

    /// Every legacy input must have its previous transaction in the table
    pub fn check_previous_transactions(&self) -> Result<()> {
        for input in self.current().inputs.iter().filter(|i| is_legacy(i)) {
            let key = hex::encode(&input.prev_hash);
            if !self.txes.contains_key(&key) {
                return Err(SigningError::MissingPreviousTransaction(key));
            }
        }
        Ok(())
    }

    pub fn inputs_count(&self) -> u32 {
        self.current().inputs.len() as u32
    }

    pub fn outputs_count(&self) -> u32 {
        self.current().outputs.len() as u32
    }
}
