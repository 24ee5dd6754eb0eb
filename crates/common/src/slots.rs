//! Unstructured storage slots of upgradeable proxies (EIP-1967).

use alloy_primitives::{B256, U256, b256, keccak256};

/// `keccak256("eip1967.proxy.implementation") - 1`
pub const IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// `keccak256("eip1967.proxy.admin") - 1`
pub const ADMIN_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// `keccak256("eip1967.proxy.beacon") - 1`
pub const BEACON_SLOT: B256 =
    b256!("a3f0ad74e5423aebfd80d3ef4346578335a9a72aeaee59ff6cb3582b35133d50");

/// Derives an EIP-1967 slot: the hash of `label`, minus one.
pub fn eip1967_slot(label: &str) -> B256 {
    let hash = U256::from_be_bytes(keccak256(label.as_bytes()).0);
    B256::from(hash.wrapping_sub(U256::from(1)).to_be_bytes::<32>())
}
