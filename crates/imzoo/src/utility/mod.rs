//! # Utility Functions

pub mod init;
pub mod probability;
