//! KeepKey protocol messages used by the signing flows
//!
//! The protobuf structs are generated from `device-protocol/*.proto` at build
//! time. This module adds the [`Message`] envelope that pairs each struct with
//! its wire identifier.

use prost::Message as ProstMessage;

mod protos {
    include!(concat!(env!("OUT_DIR"), "/keepkey.rs"));
}

pub use protos::*;

macro_rules! kk_message {
    ($($name:ident),* $(,)?) => {
        /// A decoded device message tagged with its kind
        #[derive(Debug, Clone, PartialEq)]
        pub enum Message {
            $($name($name),)*
            /// Well-framed message with an identifier this crate does not model
            Unknown(u16),
        }

        impl Message {
            pub fn message_type(&self) -> Option<MessageType> {
                match self {
                    $(Message::$name(_) => Some(MessageType::$name),)*
                    Message::Unknown(_) => None,
                }
            }

            /// Wire identifier and protobuf payload
            pub fn encode(&self) -> (u16, Vec<u8>) {
                match self {
                    $(Message::$name(m) => (MessageType::$name as u16, m.encode_to_vec()),)*
                    Message::Unknown(id) => (*id, Vec::new()),
                }
            }

            pub fn decode(id: u16, payload: &[u8]) -> Result<Self, prost::DecodeError> {
                $(
                    if id == MessageType::$name as u16 {
                        return Ok(Message::$name(<$name as ProstMessage>::decode(payload)?));
                    }
                )*
                Ok(Message::Unknown(id))
            }
        }

        $(
            impl From<$name> for Message {
                fn from(msg: $name) -> Self {
                    Message::$name(msg)
                }
            }
        )*
    };
}

kk_message!(
    // Generic replies
    Success,
    Failure,

    // User interaction
    ButtonRequest,
    ButtonAck,
    PinMatrixRequest,
    PassphraseRequest,

    // Bitcoin signing
    SignTx,
    TxRequest,
    TxAck,
);

impl Message {
    /// Human readable kind, used in diagnostics
    pub fn kind(&self) -> String {
        match self.message_type() {
            Some(ty) => format!("{:?}", ty),
            None => match self {
                Message::Unknown(id) => format!("Unknown({})", id),
                _ => "Unknown".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_request_roundtrip() {
        let request = TxRequest {
            request_type: Some(RequestType::Txinput as i32),
            details: Some(TxRequestDetailsType {
                request_index: Some(3),
                ..Default::default()
            }),
            serialized: None,
        };

        let (id, payload) = Message::from(request.clone()).encode();
        assert_eq!(id, 21);

        let decoded = Message::decode(id, &payload).unwrap();
        assert_eq!(decoded, Message::TxRequest(request));
        assert_eq!(decoded.kind(), "TxRequest");
    }

    #[test]
    fn test_unknown_message_id() {
        let decoded = Message::decode(999, &[]).unwrap();
        assert_eq!(decoded, Message::Unknown(999));
        assert_eq!(decoded.message_type(), None);
        assert_eq!(decoded.kind(), "Unknown(999)");
    }

    #[test]
    fn test_script_type_names() {
        assert_eq!(
            InputScriptType::from_str_name("SPENDP2SHWITNESS"),
            Some(InputScriptType::Spendp2shwitness)
        );
        assert_eq!(InputScriptType::Spendaddress.as_str_name(), "SPENDADDRESS");
        assert_eq!(
            OutputScriptType::from_str_name("PAYTOWITNESS"),
            Some(OutputScriptType::Paytowitness)
        );
        assert_eq!(InputScriptType::from_str_name("spendaddress"), None);
    }

    #[test]
    fn test_sign_tx_defaults() {
        let sign_tx = SignTx {
            outputs_count: 2,
            inputs_count: 1,
            ..Default::default()
        };
        assert_eq!(sign_tx.coin_name(), "Bitcoin");
        assert_eq!(sign_tx.version(), 1);
    }
}
