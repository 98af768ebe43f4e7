pub mod decryption;
pub mod purchase;
pub mod request;
