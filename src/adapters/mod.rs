pub mod ethereum_rpc;
pub mod mock_chain;
pub mod mock_fhe;
pub mod relayer;
