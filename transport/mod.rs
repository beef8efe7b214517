//! Device links for KeepKey
//!
//! [`DeviceLink`] is the only surface the signing session talks to. The
//! default implementation, [`ProtocolLink`], frames protobuf messages over a
//! packet [`Transport`] (USB HID or the emulator's UDP socket).

use std::ops::{Deref, DerefMut};

use log::{debug, info, warn};

use crate::config::{DeviceType, LinkConfig};
use crate::errors::TransportError;
use crate::messages::{ButtonAck, Message, SignTx, TransactionType, TxAck};

pub mod codec;
pub mod hid;
pub mod udp;

pub use codec::{Report, REPORT_SIZE};
pub use hid::HidTransport;
pub use udp::UdpTransport;

/// Request/response exchange with a signing device
pub trait DeviceLink {
    /// Open a signing exchange; the reply is the device's first request
    fn begin_bitcoin_sign(
        &mut self,
        coin_name: &str,
        inputs_count: u32,
        outputs_count: u32,
    ) -> Result<Message, TransportError>;

    /// Answer a transaction request and wait for the next one
    fn send_transaction_ack(&mut self, tx: TransactionType) -> Result<Message, TransportError>;

    /// Release the device
    fn close(&mut self);
}

impl<L: DeviceLink + ?Sized> DeviceLink for Box<L> {
    fn begin_bitcoin_sign(
        &mut self,
        coin_name: &str,
        inputs_count: u32,
        outputs_count: u32,
    ) -> Result<Message, TransportError> {
        (**self).begin_bitcoin_sign(coin_name, inputs_count, outputs_count)
    }

    fn send_transaction_ack(&mut self, tx: TransactionType) -> Result<Message, TransportError> {
        (**self).send_transaction_ack(tx)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Holds a link for the duration of one exchange and closes it on drop
pub struct LinkGuard<'a, L: DeviceLink + ?Sized> {
    link: &'a mut L,
}

impl<'a, L: DeviceLink + ?Sized> LinkGuard<'a, L> {
    pub fn new(link: &'a mut L) -> Self {
        Self { link }
    }
}

impl<L: DeviceLink + ?Sized> Deref for LinkGuard<'_, L> {
    type Target = L;

    fn deref(&self) -> &L {
        self.link
    }
}

impl<L: DeviceLink + ?Sized> DerefMut for LinkGuard<'_, L> {
    fn deref_mut(&mut self) -> &mut L {
        self.link
    }
}

impl<L: DeviceLink + ?Sized> Drop for LinkGuard<'_, L> {
    fn drop(&mut self) {
        self.link.close();
    }
}

/// Packet level I/O
pub trait Transport {
    fn write_packet(&mut self, packet: &Report) -> Result<(), TransportError>;

    fn read_packet(&mut self) -> Result<Report, TransportError>;

    fn close(&mut self) {}
}

/// [`DeviceLink`] over a framed packet transport
pub struct ProtocolLink<T: Transport> {
    transport: T,
    closed: bool,
}

impl<T: Transport> ProtocolLink<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            closed: false,
        }
    }

    /// Send a message and return the first reply that needs the caller.
    /// Button requests are acknowledged here; the user confirms on the device.
    pub fn call(&mut self, message: Message) -> Result<Message, TransportError> {
        self.send(&message)?;
        loop {
            match self.receive()? {
                Message::ButtonRequest(request) => {
                    info!("👆 Confirm on device ({:?})", request.code());
                    self.send(&Message::ButtonAck(ButtonAck {}))?;
                }
                reply => return Ok(reply),
            }
        }
    }

    fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let (msg_type, payload) = message.encode();
        debug!("📤 Sending {} ({} bytes)", message.kind(), payload.len());
        for report in codec::encode_frames(msg_type, &payload) {
            self.transport.write_packet(&report)?;
        }
        Ok(())
    }

    fn receive(&mut self) -> Result<Message, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let mut decoder = codec::FrameDecoder::new();
        loop {
            let report = self.transport.read_packet()?;
            if let Some((msg_type, payload)) = decoder.push(&report)? {
                let message = Message::decode(msg_type, &payload)?;
                debug!("📥 Received {} ({} bytes)", message.kind(), payload.len());
                return Ok(message);
            }
        }
    }
}

impl<T: Transport> DeviceLink for ProtocolLink<T> {
    fn begin_bitcoin_sign(
        &mut self,
        coin_name: &str,
        inputs_count: u32,
        outputs_count: u32,
    ) -> Result<Message, TransportError> {
        let sign_tx = SignTx {
            outputs_count,
            inputs_count,
            coin_name: Some(coin_name.to_string()),
            ..Default::default()
        };
        self.call(sign_tx.into())
    }

    fn send_transaction_ack(&mut self, tx: TransactionType) -> Result<Message, TransportError> {
        self.call(TxAck { tx: Some(tx) }.into())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.transport.close();
            debug!("🔌 Device link closed");
        }
    }
}

impl<T: Transport> Drop for ProtocolLink<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open the link selected by `config`
pub fn open_link(config: &LinkConfig) -> Result<Box<dyn DeviceLink>, TransportError> {
    match config.device_type {
        DeviceType::Usb => {
            info!("🔌 Opening KeepKey over USB");
            Ok(Box::new(ProtocolLink::new(HidTransport::open()?)))
        }
        DeviceType::Emulator => {
            info!("🔌 Opening KeepKey emulator at {}", config.emulator_addr);
            let transport = UdpTransport::open(&config.emulator_addr).map_err(|e| {
                warn!("Failed to reach emulator at {}: {}", config.emulator_addr, e);
                e
            })?;
            Ok(Box::new(ProtocolLink::new(transport)))
        }
    }
}
