//! Error plumbing shared by the stockwire crates.

pub mod error;

pub use error::FromMessage;
