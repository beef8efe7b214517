//! Bitcoin signing session
//!
//! Drives the device through `SignTx`, answers each `TxRequest` through the
//! router and collects the serialized transaction and the per-input
//! signatures the device streams back.

use log::{debug, error, info, warn};

use super::assembler::{assemble, SignedTransaction};
use super::router::{route, DeviceRequest, Route};
use super::transaction::TransactionTable;
use crate::config::SessionConfig;
use crate::errors::{Result, SigningError};
use crate::messages::{FailureType, Message, TxRequestSerializedType};
use crate::transport::{DeviceLink, LinkGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingRequest,
    Finished,
    Failed,
}

pub struct SigningSession<'t> {
    table: &'t TransactionTable,
    config: SessionConfig,
    state: SessionState,
    pending_signatures: Vec<Option<Vec<u8>>>,
    accumulated_bytes: Vec<u8>,
    current_message: Option<Message>,
}

impl<'t> SigningSession<'t> {
    /// Fails if a legacy input's previous transaction is not in `table`
    pub fn new(table: &'t TransactionTable, config: SessionConfig) -> Result<Self> {
        table.check_previous_transactions()?;
        Ok(Self {
            table,
            config,
            state: SessionState::Idle,
            pending_signatures: vec![None; table.inputs_count() as usize],
            accumulated_bytes: Vec::new(),
            current_message: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn accumulated_bytes(&self) -> &[u8] {
        &self.accumulated_bytes
    }

    pub fn pending_signatures(&self) -> &[Option<Vec<u8>>] {
        &self.pending_signatures
    }

    pub fn current_message(&self) -> Option<&Message> {
        self.current_message.as_ref()
    }

    /// Run the exchange until the device finishes or something fails.
    /// A session is single use.
    pub fn drive<L: DeviceLink + ?Sized>(&mut self, link: &mut L) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(SigningError::InvalidSessionState(self.state));
        }

        let result = self.exchange(link);
        match &result {
            Ok(()) => {
                self.state = SessionState::Finished;
                info!(
                    "✅ Signing finished: {} bytes, {} signatures",
                    self.accumulated_bytes.len(),
                    self.pending_signatures.iter().flatten().count()
                );
            }
            Err(e) => {
                self.state = SessionState::Failed;
                error!("❌ Signing session failed: {}", e);
            }
        }
        result
    }

    /// Hand the final state to the assembler
    pub fn finish(self) -> Result<SignedTransaction> {
        if self.state != SessionState::Finished {
            return Err(SigningError::InvalidSessionState(self.state));
        }
        assemble(&self.pending_signatures, &self.accumulated_bytes)
    }

    fn exchange<L: DeviceLink + ?Sized>(&mut self, link: &mut L) -> Result<()> {
        info!(
            "🔐 Signing {} transaction: {} inputs, {} outputs",
            self.config.coin_name,
            self.table.inputs_count(),
            self.table.outputs_count()
        );
        let first = link.begin_bitcoin_sign(
            &self.config.coin_name,
            self.table.inputs_count(),
            self.table.outputs_count(),
        )?;
        self.current_message = Some(first);
        self.state = SessionState::AwaitingRequest;

        loop {
            let request = match &self.current_message {
                Some(Message::TxRequest(request)) => request,
                Some(Message::Failure(failure)) => {
                    return Err(SigningError::DeviceRejected {
                        code: failure.code.and_then(FailureType::from_i32),
                        message: failure
                            .message
                            .clone()
                            .unwrap_or_else(|| "Signing failed".to_string()),
                    });
                }
                Some(other) => {
                    return Err(SigningError::UnexpectedMessage { kind: other.kind() });
                }
                None => {
                    return Err(SigningError::UnexpectedMessage {
                        kind: "none".to_string(),
                    });
                }
            };

            if let Some(serialized) = &request.serialized {
                absorb_serialized(
                    serialized,
                    &mut self.pending_signatures,
                    &mut self.accumulated_bytes,
                )?;
            }

            let device_request = DeviceRequest::from_tx_request(request)?;
            debug!("📥 Device request: {:?}", device_request);

            match route(&device_request, self.table)? {
                Route::Finished => return Ok(()),
                Route::Reply(tx) => {
                    let reply = link.send_transaction_ack(tx)?;
                    self.current_message = Some(reply);
                }
            }
        }
    }
}

/// Apply streamed transaction bytes and a signature, if present.
/// Nothing is applied when the signature is rejected.
fn absorb_serialized(
    serialized: &TxRequestSerializedType,
    pending_signatures: &mut [Option<Vec<u8>>],
    accumulated_bytes: &mut Vec<u8>,
) -> Result<()> {
    let signature = match (serialized.signature_index, &serialized.signature) {
        (Some(index), Some(signature)) => {
            let slot = pending_signatures.get(index as usize).ok_or(
                SigningError::IndexOutOfRange {
                    what: "signature",
                    index: index as u64,
                    len: pending_signatures.len(),
                },
            )?;
            if slot.is_some() {
                return Err(SigningError::DuplicateSignature(index));
            }
            Some((index as usize, signature))
        }
        (Some(index), None) => {
            warn!("Signature index {} arrived without a signature", index);
            None
        }
        _ => None,
    };

    if let Some(fragment) = &serialized.serialized_tx {
        accumulated_bytes.extend_from_slice(fragment);
    }
    if let Some((index, signature)) = signature {
        debug!("✍️ Signature for input {}: {}", index, hex::encode(signature));
        pending_signatures[index] = Some(signature.clone());
    }
    Ok(())
}

/// Sign the transaction in `table`, releasing `link` when done
pub fn sign_transaction<L: DeviceLink + ?Sized>(
    link: &mut L,
    table: &TransactionTable,
    config: SessionConfig,
) -> Result<SignedTransaction> {
    let mut link = LinkGuard::new(link);
    let mut session = SigningSession::new(table, config)?;
    session.drive(&mut *link)?;
    session.finish()
}
