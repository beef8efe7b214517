//! Bitcoin and UTXO chain support for KeepKey
//!
//! Provides the host side of the `SignTx` exchange:
//! - Building the transaction table from a caller description
//! - Answering the device's transaction requests
//! - Collecting the streamed serialized transaction and signatures

pub mod assembler;
pub mod router;
pub mod session;
pub mod sign_info;
pub mod transaction;

pub use assembler::{assemble, SignedTransaction};
pub use router::{route, DeviceRequest, Route};
pub use session::{sign_transaction, SessionState, SigningSession};
pub use sign_info::{BinOutputInfo, InputInfo, OutputInfo, SignInfo, TransactionTypeInfo};
pub use transaction::{
    build_bin_outputs, build_inputs, build_outputs, build_previous_transaction, TransactionTable,
    CURRENT_TX_KEY,
};
