//! The `utils` module provides shared pieces used across the relay: the error
//! types every layer reports through, and logging setup.

pub mod error;
pub mod logging;
