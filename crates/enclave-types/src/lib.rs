//! Foundation types for enclave.
//!
//! This crate contains the types shared by every enclave crate: the error
//! taxonomy surfaced by the virtual filesystem and the command set, and the
//! configuration loaded by the front end.

pub mod config;
pub mod error;
