pub mod drop;

pub use drop::*;
