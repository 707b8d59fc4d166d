//! # Conv Blocks

pub mod conv_norm;
pub mod feature_stack;
