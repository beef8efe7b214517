//! Answers individual device transaction requests
//!
//! The device never sees the whole transaction at once. Each [`TxRequest`]
//! names one slice (metadata, an input, an output or a range of extra data)
//! of either the transaction being signed or one of its previous
//! transactions, and the reply must carry exactly that slice.

use super::transaction::{output_count, TransactionTable};
use crate::errors::{Result, SigningError};
use crate::messages::{RequestType, TransactionType, TxRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRequest {
    Metadata {
        tx_hash: Option<Vec<u8>>,
    },
    Input {
        tx_hash: Option<Vec<u8>>,
        index: u32,
    },
    Output {
        tx_hash: Option<Vec<u8>>,
        index: u32,
    },
    ExtraData {
        tx_hash: Option<Vec<u8>>,
        offset: u32,
        len: u32,
    },
    Finished,
}

impl DeviceRequest {
    pub fn from_tx_request(request: &TxRequest) -> Result<Self> {
        let request_type = request
            .request_type
            .and_then(RequestType::from_i32)
            .ok_or_else(|| {
                SigningError::MalformedRequest(format!(
                    "unknown request type {:?}",
                    request.request_type
                ))
            })?;

        if request_type == RequestType::Txfinished {
            return Ok(DeviceRequest::Finished);
        }

        let details = request.details.clone().unwrap_or_default();
        let tx_hash = details.tx_hash.filter(|hash| !hash.is_empty());
        let required = |value: Option<u32>, name: &str| {
            value.ok_or_else(|| {
                SigningError::MalformedRequest(format!("{:?} request without {}", request_type, name))
            })
        };

        Ok(match request_type {
            RequestType::Txmeta => DeviceRequest::Metadata { tx_hash },
            RequestType::Txinput => DeviceRequest::Input {
                index: required(details.request_index, "request_index")?,
                tx_hash,
            },
            RequestType::Txoutput => DeviceRequest::Output {
                index: required(details.request_index, "request_index")?,
                tx_hash,
            },
            RequestType::Txextradata => DeviceRequest::ExtraData {
                offset: required(details.extra_data_offset, "extra_data_offset")?,
                len: required(details.extra_data_len, "extra_data_len")?,
                tx_hash,
            },
            RequestType::Txfinished => DeviceRequest::Finished,
        })
    }
}

/// What the session does with a request
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Send this transaction slice back in a TxAck
    Reply(TransactionType),
    /// Signing is complete, nothing is sent
    Finished,
}

pub fn route(request: &DeviceRequest, table: &TransactionTable) -> Result<Route> {
    let reply = match request {
        DeviceRequest::Finished => return Ok(Route::Finished),
        DeviceRequest::Metadata { tx_hash } => metadata_only(table.lookup(tx_hash.as_deref())?),
        DeviceRequest::Input { tx_hash, index } => {
            let tx = table.lookup(tx_hash.as_deref())?;
            TransactionType {
                inputs: vec![pick("input", &tx.inputs, *index)?.clone()],
                ..Default::default()
            }
        }
        DeviceRequest::Output { tx_hash, index } => {
            let tx = table.lookup(tx_hash.as_deref())?;
            if tx.bin_outputs.is_empty() {
                TransactionType {
                    outputs: vec![pick("output", &tx.outputs, *index)?.clone()],
                    ..Default::default()
                }
            } else {
                TransactionType {
                    bin_outputs: vec![pick("output", &tx.bin_outputs, *index)?.clone()],
                    ..Default::default()
                }
            }
        }
        DeviceRequest::ExtraData {
            tx_hash,
            offset,
            len,
        } => {
            let tx = table.lookup(tx_hash.as_deref())?;
            let data = tx.extra_data.as_deref().unwrap_or_default();
            let start = *offset as usize;
            let end = start + *len as usize;
            if end > data.len() {
                return Err(SigningError::IndexOutOfRange {
                    what: "extra data",
                    index: end as u64,
                    len: data.len(),
                });
            }
            TransactionType {
                extra_data: Some(data[start..end].to_vec()),
                ..Default::default()
            }
        }
    };
    Ok(Route::Reply(reply))
}

fn pick<'a, T>(what: &'static str, items: &'a [T], index: u32) -> Result<&'a T> {
    items
        .get(index as usize)
        .ok_or(SigningError::IndexOutOfRange {
            what,
            index: index as u64,
            len: items.len(),
        })
}

/// Counts and header fields only; no line items
fn metadata_only(tx: &TransactionType) -> TransactionType {
    TransactionType {
        version: tx.version,
        lock_time: tx.lock_time,
        inputs_cnt: Some(tx.inputs.len() as u32),
        outputs_cnt: Some(output_count(tx) as u32),
        extra_data_len: Some(tx.extra_data.as_ref().map_or(0, Vec::len) as u32),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{
        TxInputType, TxOutputBinType, TxOutputType, TxRequestDetailsType,
    };

    const PREV_HASH: [u8; 4] = [0xab, 0xcd, 0xef, 0x01];

    fn table() -> TransactionTable {
        let inputs = vec![TxInputType {
            prev_hash: PREV_HASH.to_vec(),
            prev_index: 0,
            amount: Some(1000),
            ..Default::default()
        }];
        let outputs = vec![
            TxOutputType {
                address: Some("1MJ2tj2ThBE62zXbBYA5ZaN3fdve5CPAz1".to_string()),
                amount: 600,
                ..Default::default()
            },
            TxOutputType {
                address_n: vec![0x8000002c, 0x80000000, 0x80000000, 1, 0],
                amount: 300,
                ..Default::default()
            },
        ];
        let mut table = TransactionTable::new(inputs, outputs);
        table.insert_previous(
            &PREV_HASH,
            TransactionType {
                version: Some(2),
                lock_time: Some(500_000),
                inputs: vec![TxInputType::default(), TxInputType::default()],
                bin_outputs: vec![TxOutputBinType {
                    amount: 1000,
                    script_pubkey: vec![0x76, 0xa9],
                }],
                extra_data: Some(vec![1, 2, 3, 4, 5, 6]),
                ..Default::default()
            },
        )
        .unwrap();
        table
    }

    fn request(request_type: RequestType, details: TxRequestDetailsType) -> TxRequest {
        TxRequest {
            request_type: Some(request_type as i32),
            details: Some(details),
            serialized: None,
        }
    }

    fn reply(request: DeviceRequest) -> TransactionType {
        match route(&request, &table()).unwrap() {
            Route::Reply(tx) => tx,
            Route::Finished => panic!("unexpected finish"),
        }
    }

    #[test]
    fn test_parse_requests() {
        let parsed = DeviceRequest::from_tx_request(&request(
            RequestType::Txinput,
            TxRequestDetailsType {
                request_index: Some(4),
                tx_hash: Some(PREV_HASH.to_vec()),
                ..Default::default()
            },
        ))
        .unwrap();
        assert_eq!(
            parsed,
            DeviceRequest::Input {
                tx_hash: Some(PREV_HASH.to_vec()),
                index: 4
            }
        );

        let finished = TxRequest {
            request_type: Some(RequestType::Txfinished as i32),
            ..Default::default()
        };
        assert_eq!(DeviceRequest::from_tx_request(&finished).unwrap(), DeviceRequest::Finished);

        // Empty hash means the transaction being signed
        let meta = request(
            RequestType::Txmeta,
            TxRequestDetailsType {
                tx_hash: Some(vec![]),
                ..Default::default()
            },
        );
        assert_eq!(
            DeviceRequest::from_tx_request(&meta).unwrap(),
            DeviceRequest::Metadata { tx_hash: None }
        );
    }

    #[test]
    fn test_malformed_requests() {
        let missing_index = request(RequestType::Txoutput, TxRequestDetailsType::default());
        assert!(matches!(
            DeviceRequest::from_tx_request(&missing_index),
            Err(SigningError::MalformedRequest(_))
        ));

        let unknown = TxRequest {
            request_type: Some(42),
            ..Default::default()
        };
        assert!(matches!(
            DeviceRequest::from_tx_request(&unknown),
            Err(SigningError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_metadata_has_no_line_items() {
        let meta = reply(DeviceRequest::Metadata { tx_hash: None });
        assert_eq!(meta.inputs_cnt, Some(1));
        assert_eq!(meta.outputs_cnt, Some(2));
        assert_eq!(meta.extra_data_len, Some(0));
        assert!(meta.inputs.is_empty() && meta.outputs.is_empty() && meta.bin_outputs.is_empty());

        let prev = reply(DeviceRequest::Metadata {
            tx_hash: Some(PREV_HASH.to_vec()),
        });
        assert_eq!(prev.version, Some(2));
        assert_eq!(prev.lock_time, Some(500_000));
        assert_eq!(prev.inputs_cnt, Some(2));
        assert_eq!(prev.outputs_cnt, Some(1));
        assert_eq!(prev.extra_data_len, Some(6));
        assert_eq!(prev.extra_data, None);
        assert!(prev.inputs.is_empty() && prev.bin_outputs.is_empty());
    }

    #[test]
    fn test_input_slice() {
        let tx = reply(DeviceRequest::Input {
            tx_hash: None,
            index: 0,
        });
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].prev_hash, PREV_HASH.to_vec());
        assert!(tx.outputs.is_empty());
    }

    #[test]
    fn test_output_forms() {
        let structured = reply(DeviceRequest::Output {
            tx_hash: None,
            index: 1,
        });
        assert_eq!(structured.outputs.len(), 1);
        assert_eq!(structured.outputs[0].amount, 300);
        assert!(structured.bin_outputs.is_empty());

        let binary = reply(DeviceRequest::Output {
            tx_hash: Some(PREV_HASH.to_vec()),
            index: 0,
        });
        assert_eq!(binary.bin_outputs.len(), 1);
        assert_eq!(binary.bin_outputs[0].script_pubkey, vec![0x76, 0xa9]);
        assert!(binary.outputs.is_empty());
    }

    #[test]
    fn test_index_out_of_range() {
        let table = table();
        for request in [
            DeviceRequest::Input { tx_hash: None, index: 1 },
            DeviceRequest::Output { tx_hash: None, index: 2 },
            DeviceRequest::Output { tx_hash: Some(PREV_HASH.to_vec()), index: 1 },
        ] {
            assert!(
                matches!(route(&request, &table), Err(SigningError::IndexOutOfRange { .. })),
                "{:?}",
                request
            );
        }
    }

    #[test]
    fn test_extra_data_chunks() {
        let chunk = reply(DeviceRequest::ExtraData {
            tx_hash: Some(PREV_HASH.to_vec()),
            offset: 2,
            len: 4,
        });
        assert_eq!(chunk.extra_data, Some(vec![3, 4, 5, 6]));
        assert!(chunk.inputs.is_empty());

        let request = DeviceRequest::ExtraData {
            tx_hash: Some(PREV_HASH.to_vec()),
            offset: 4,
            len: 3,
        };
        assert!(matches!(
            route(&request, &table()),
            Err(SigningError::IndexOutOfRange { what: "extra data", index: 7, len: 6 })
        ));
    }

    #[test]
    fn test_unknown_hash() {
        let request = DeviceRequest::Metadata {
            tx_hash: Some(vec![0x01]),
        };
        assert!(matches!(
            route(&request, &table()),
            Err(SigningError::MissingPreviousTransaction(_))
        ));
    }

    #[test]
    fn test_finished_route() {
        assert_eq!(route(&DeviceRequest::Finished, &table()).unwrap(), Route::Finished);
    }
}
