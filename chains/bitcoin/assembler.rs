//! Final assembly of a signed transaction

use serde::Serialize;
use serde_with::{hex::Hex, serde_as};

use crate::errors::{Result, SigningError};

/// Fully signed transaction as streamed by the device
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    #[serde_as(as = "Hex")]
    pub serialized_tx: Vec<u8>,
    /// Signature per input, in input order
    #[serde_as(as = "Vec<Hex>")]
    pub signatures: Vec<Vec<u8>>,
}

impl SignedTransaction {
    pub fn to_hex(&self) -> String {
        hex::encode(&self.serialized_tx)
    }

    /// Transaction id of the serialized bytes
    pub fn txid(&self) -> std::result::Result<::bitcoin::Txid, ::bitcoin::consensus::encode::Error> {
        let tx: ::bitcoin::Transaction = ::bitcoin::consensus::encode::deserialize(&self.serialized_tx)?;
        Ok(tx.txid())
    }
}

/// Every input must be signed; reports the first unsigned input otherwise
pub fn assemble(pending_signatures: &[Option<Vec<u8>>], accumulated_bytes: &[u8]) -> Result<SignedTransaction> {
    let signatures = pending_signatures
        .iter()
        .enumerate()
        .map(|(index, signature)| signature.clone().ok_or(SigningError::IncompleteSignatures(index)))
        .collect::<Result<Vec<_>>>()?;

    Ok(SignedTransaction {
        serialized_tx: accumulated_bytes.to_vec(),
        signatures,
    })
}
