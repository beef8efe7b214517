//! UDP transport for the KeepKey emulator

use std::net::UdpSocket;

use super::{Report, Transport, REPORT_SIZE};
use crate::errors::TransportError;

pub const DEFAULT_EMULATOR_ADDR: &str = "127.0.0.1:21324";

pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub fn open(addr: &str) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind("127.0.0.1:0")?;
        socket.connect(addr)?;
        Ok(Self { socket })
    }
}

impl Transport for UdpTransport {
    fn write_packet(&mut self, packet: &Report) -> Result<(), TransportError> {
        self.socket.send(packet)?;
        Ok(())
    }

    fn read_packet(&mut self) -> Result<Report, TransportError> {
        let mut report = [0u8; REPORT_SIZE];
        let read = self.socket.recv(&mut report)?;
        if read != REPORT_SIZE {
            return Err(TransportError::Framing(format!(
                "short emulator packet: {} of {} bytes",
                read, REPORT_SIZE
            )));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packets_reach_peer() {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut transport = UdpTransport::open(&peer.local_addr().unwrap().to_string()).unwrap();

        let mut packet = [0u8; REPORT_SIZE];
        packet[0] = b'?';
        transport.write_packet(&packet).unwrap();

        let mut received = [0u8; 128];
        let (len, from) = peer.recv_from(&mut received).unwrap();
        assert_eq!(len, REPORT_SIZE);
        assert_eq!(received[0], b'?');

        peer.send_to(&packet, from).unwrap();
        assert_eq!(transport.read_packet().unwrap(), packet);
    }
}
