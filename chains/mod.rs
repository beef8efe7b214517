//! Chain support for KeepKey hardware wallets

pub mod bitcoin;
