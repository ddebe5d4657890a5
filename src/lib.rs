pub mod chain;
pub mod config;
pub mod error;
pub mod mempool;
pub mod mining;
pub mod parsing;
pub mod policy;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
