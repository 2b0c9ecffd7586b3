use {
    crate::domain::eth::{self, Address, Bytes, U256},
    std::collections::HashSet,
};

/// Identifier assigned to an opportunity when its auction round is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub struct Id(pub u64);

/// Schema version of a submitted opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub struct Version(pub String);

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A permissioned call into a protocol contract that searchers compete to
/// execute. Immutable once accepted into an auction round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opportunity {
    pub chain_id: eth::ChainId,
    pub target_contract: Address,
    pub target_calldata: Bytes,
    pub target_call_value: U256,
    pub permission_key: eth::PermissionKey,
    /// Tokens the searcher has to provide.
    pub sell_tokens: Vec<eth::Asset>,
    /// Tokens the searcher receives.
    pub buy_tokens: Vec<eth::Asset>,
    pub version: Version,
}

impl Opportunity {
    /// Checks the opportunity against the schema rules that don't depend on
    /// relay state.
    pub fn validate(&self, versions: &HashSet<Version>) -> Result<(), Invalid> {
        if !versions.contains(&self.version) {
            return Err(Invalid::UnsupportedVersion(self.version.clone()));
        }
        if self.sell_tokens.is_empty() && self.buy_tokens.is_empty() {
            return Err(Invalid::NoTokens);
        }
        for side in [&self.sell_tokens, &self.buy_tokens] {
            let mut seen = HashSet::new();
            for asset in side {
                if asset.amount.is_zero() {
                    return Err(Invalid::NonPositiveAmount(asset.token));
                }
                if !seen.insert(asset.token) {
                    return Err(Invalid::DuplicateToken(asset.token));
                }
            }
        }
        Ok(())
    }

    /// The minimum bid implied by the token amounts: the share of the surplus
    /// a searcher gets by providing `sell_tokens` and receiving `buy_tokens`.
    pub fn reserve(&self, reserve_bps: u16) -> U256 {
        let sum = |assets: &[eth::Asset]| {
            assets
                .iter()
                .fold(U256::ZERO, |acc, asset| acc.saturating_add(asset.amount))
        };
        let surplus = sum(&self.buy_tokens).saturating_sub(sum(&self.sell_tokens));
        eth::share(surplus, reserve_bps)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Invalid {
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(Version),
    #[error("opportunity neither sells nor buys any token")]
    NoTokens,
    #[error("amount of token {0} is not a positive integer")]
    NonPositiveAmount(Address),
    #[error("token {0} is listed more than once")]
    DuplicateToken(Address),
    #[error(transparent)]
    PermissionKey(#[from] eth::InvalidPermissionKey),
}
