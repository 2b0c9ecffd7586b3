pub use alloy::primitives::{Address, B256, Bytes, U256, keccak256};

/// Identifier of a chain the relay operates on, e.g. `op_sepolia`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub struct ChainId(pub String);

impl ChainId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChainId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ChainId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Scopes one opportunity to one auction.
///
/// The key is laid out as `protocolFeeReceiver || permissionId`: the first 20
/// bytes are the address of the protocol contract that checks the permission
/// and receives the auction proceedings, the remainder is the protocol-defined
/// permission id (e.g. an encoded vault id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub struct PermissionKey(Bytes);

impl PermissionKey {
    /// Length of the fee receiver address prefix.
    pub const RECEIVER_LEN: usize = 20;

    pub fn new(bytes: Bytes) -> Result<Self, InvalidPermissionKey> {
        if bytes.len() < Self::RECEIVER_LEN {
            return Err(InvalidPermissionKey(bytes.len()));
        }
        Ok(Self(bytes))
    }

    pub fn from_parts(receiver: Address, permission_id: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(Self::RECEIVER_LEN + permission_id.len());
        bytes.extend_from_slice(receiver.as_slice());
        bytes.extend_from_slice(permission_id);
        Self(bytes.into())
    }

    /// The protocol contract checking the permission and receiving proceeds.
    pub fn receiver(&self) -> Address {
        Address::from_slice(&self.0[..Self::RECEIVER_LEN])
    }

    pub fn permission_id(&self) -> &[u8] {
        &self.0[Self::RECEIVER_LEN..]
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
#[error("permission key has {0} bytes, expected at least {len}", len = PermissionKey::RECEIVER_LEN)]
pub struct InvalidPermissionKey(pub usize);

/// An amount of some ERC20 token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Asset {
    pub token: Address,
    pub amount: U256,
}

/// Hash identifying an executed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub struct TxHash(pub B256);

/// Basis points of a whole.
pub const BPS: u16 = 10_000;

/// `amount × bps / 10_000`, rounded down. Exact for every `U256` amount: the
/// amount is split at the basis point boundary so no intermediate product
/// exceeds the amount itself.
pub fn share(amount: U256, bps: u16) -> U256 {
    let whole = U256::from(BPS);
    let bps = U256::from(bps);
    amount / whole * bps + amount % whole * bps / whole
}
