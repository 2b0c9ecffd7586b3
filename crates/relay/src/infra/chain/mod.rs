//! Access to the chains the relay settles on.

use crate::domain::{
    auction::Bundle,
    eth::{self, U256},
    permission::Permission,
};

pub mod remote;
pub mod simulated;

pub use {remote::Remote, simulated::Simulated};

/// A chain executing winning bundles. Every call receives the permission
/// context of the grant that is open for the bundle's permission key, which
/// is what the protocol contracts consult in their `isPermissioned` check.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Chain: Send + Sync + 'static {
    /// Executes the opportunity's target call together with the searcher's
    /// execution payload, then calls `receiveAuctionProceedings(permissionKey)`
    /// on the key's fee receiver paying `proceeds` along with the call. Both
    /// happen in one atomic transaction: if either reverts, nothing lands.
    async fn execute(
        &self,
        bundle: &Bundle,
        proceeds: U256,
        permission: &Permission,
    ) -> Result<Receipt, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: eth::TxHash,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
