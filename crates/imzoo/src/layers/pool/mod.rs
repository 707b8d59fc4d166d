//! # Pooling Layers

mod pool_wrapper;

pub use pool_wrapper::*;
