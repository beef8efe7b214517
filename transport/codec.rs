//! KeepKey wire framing
//!
//! Messages travel in 64-byte reports. The first report of a message starts
//! with `?##`, followed by the big-endian message type (u16) and payload
//! length (u32). Every following report starts with `?` and carries 63 bytes
//! of payload. The last report is zero padded.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::errors::TransportError;

pub const REPORT_SIZE: usize = 64;

const REPORT_MAGIC: u8 = b'?';
const HEADER_MAGIC: &[u8; 2] = b"##";
const HEADER_SIZE: usize = 2 + 2 + 4;

/// Largest payload accepted from a device
pub const MAX_PAYLOAD_LEN: usize = 1024 * 1024;

pub type Report = [u8; REPORT_SIZE];

/// Split a message into wire reports
pub fn encode_frames(msg_type: u16, payload: &[u8]) -> Vec<Report> {
    let mut framed = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    framed.put_slice(HEADER_MAGIC);
    framed.put_u16(msg_type);
    framed.put_u32(payload.len() as u32);
    framed.put_slice(payload);

    framed
        .chunks(REPORT_SIZE - 1)
        .map(|chunk| {
            let mut report = [0u8; REPORT_SIZE];
            report[0] = REPORT_MAGIC;
            report[1..=chunk.len()].copy_from_slice(chunk);
            report
        })
        .collect()
}

/// Reassembles one message from consecutive reports
#[derive(Debug, Default)]
pub struct FrameDecoder {
    header: Option<(u16, usize)>,
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a report; returns the message type and payload once complete
    pub fn push(&mut self, report: &[u8]) -> Result<Option<(u16, Bytes)>, TransportError> {
        if report.first() != Some(&REPORT_MAGIC) {
            return Err(TransportError::Framing(format!(
                "report does not start with '?': {}",
                hex::encode(&report[..report.len().min(8)])
            )));
        }
        let mut body = &report[1..];

        if self.header.is_none() {
            if body.len() < HEADER_SIZE || &body[..2] != HEADER_MAGIC {
                return Err(TransportError::Framing(
                    "first report is missing the '##' header".to_string(),
                ));
            }
            body.advance(2);
            let msg_type = body.get_u16();
            let len = body.get_u32() as usize;
            if len > MAX_PAYLOAD_LEN {
                return Err(TransportError::Framing(format!(
                    "payload length {} exceeds {} bytes",
                    len, MAX_PAYLOAD_LEN
                )));
            }
            self.header = Some((msg_type, len));
            self.buffer.reserve(len);
        }

        self.buffer.put_slice(body);

        match self.header {
            Some((msg_type, len)) if self.buffer.len() >= len => {
                let mut payload = std::mem::take(&mut self.buffer);
                payload.truncate(len);
                self.header = None;
                Ok(Some((msg_type, payload.freeze())))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_report_layout() {
        let reports = encode_frames(21, &[0xaa, 0xbb]);
        assert_eq!(reports.len(), 1);

        let report = &reports[0];
        assert_eq!(&report[..3], b"?##");
        assert_eq!(&report[3..5], &[0x00, 0x15]);
        assert_eq!(&report[5..9], &[0, 0, 0, 2]);
        assert_eq!(&report[9..11], &[0xaa, 0xbb]);
        assert!(report[11..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_multi_report_reassembly() {
        let payload: Vec<u8> = (0..200u16).map(|i| i as u8).collect();
        let reports = encode_frames(22, &payload);
        // 8 header bytes + 200 payload bytes over 63-byte chunks
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| r[0] == b'?'));

        let mut decoder = FrameDecoder::new();
        for report in &reports[..3] {
            assert!(decoder.push(report).unwrap().is_none());
        }
        let (msg_type, decoded) = decoder.push(&reports[3]).unwrap().unwrap();
        assert_eq!(msg_type, 22);
        assert_eq!(decoded.as_ref(), payload.as_slice());
    }

    #[test]
    fn test_empty_payload() {
        let reports = encode_frames(27, &[]);
        let mut decoder = FrameDecoder::new();
        let (msg_type, decoded) = decoder.push(&reports[0]).unwrap().unwrap();
        assert_eq!(msg_type, 27);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut report = encode_frames(2, &[1])[0];
        report[0] = 0;
        let mut decoder = FrameDecoder::new();
        assert!(matches!(decoder.push(&report), Err(TransportError::Framing(_))));

        let mut report = encode_frames(2, &[1])[0];
        report[1] = b'x';
        assert!(matches!(decoder.push(&report), Err(TransportError::Framing(_))));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut report = encode_frames(21, &[])[0];
        report[5..9].copy_from_slice(&u32::MAX.to_be_bytes());
        let mut decoder = FrameDecoder::new();
        assert!(matches!(decoder.push(&report), Err(TransportError::Framing(_))));

        let at_limit = (MAX_PAYLOAD_LEN as u32).to_be_bytes();
        report[5..9].copy_from_slice(&at_limit);
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(&report).unwrap().is_none());
    }
}
