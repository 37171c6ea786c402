//! Brute-force discovery of an ERC20 `balances` mapping slot on a fork node,
//! followed by a direct storage write that sets an arbitrary balance.

pub mod encoding;
pub mod error;
pub mod probe;
pub mod rpc;

pub use encoding::{Address, derive_mapping_slot};
pub use error::{EncodingError, RpcError, SurgeonError};
pub use probe::{ProbeParams, SlotFound, check_balance, find_and_set};
pub use rpc::{HttpClient, JsonRpc};
