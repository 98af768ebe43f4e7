pub mod chain;
pub mod fhe;
