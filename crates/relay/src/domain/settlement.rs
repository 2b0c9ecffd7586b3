//! Settlement of auction winners.
//!
//! The winning bundle runs inside the permission window of its key: the grant
//! is opened, the bundle executed in one transaction with the
//! `receiveAuctionProceedings` callback paying the protocol its share of the
//! bid, and the grant closed again, whatever the outcome. Failed settlements
//! are reported, never retried.

use {
    crate::{
        domain::{
            auction::Winner,
            eth::{self, U256},
            permission,
        },
        infra::{chain, observe},
    },
    std::{collections::HashMap, sync::Arc, time::Duration},
};

#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound for waiting on the grant, the execution and the callback.
    pub timeout: Duration,
    /// Share of the bid paid to the protocol, in basis points.
    pub protocol_share_bps: u16,
}

/// A chain the relay settles on.
#[derive(Clone)]
pub struct Network {
    pub registry: permission::Registry,
    pub chain: Arc<dyn chain::Chain>,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    pub tx_hash: eth::TxHash,
    /// Paid to the protocol's fee receiver.
    pub protocol_proceeds: U256,
    /// Kept by the relayer.
    pub relayer_fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementFailed {
    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error("settlement timed out")]
    Timeout,
    #[error("chain {0} is not supported")]
    UnsupportedChain(eth::ChainId),
    #[error("chain error: {0}")]
    Chain(String),
}

impl From<chain::Error> for SettlementFailed {
    fn from(err: chain::Error) -> Self {
        match err {
            chain::Error::Reverted(reason) => Self::Reverted(reason),
            chain::Error::Other(err) => Self::Chain(format!("{err:#}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Settled(Settled),
    Failed(SettlementFailed),
}

impl From<Result<Settled, SettlementFailed>> for Outcome {
    fn from(result: Result<Settled, SettlementFailed>) -> Self {
        match result {
            Ok(settled) => Self::Settled(settled),
            Err(err) => Self::Failed(err),
        }
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    config: Config,
    networks: HashMap<eth::ChainId, Network>,
}

impl Dispatcher {
    pub fn new(config: Config, networks: HashMap<eth::ChainId, Network>) -> Self {
        Self { config, networks }
    }

    pub fn chains(&self) -> impl Iterator<Item = &eth::ChainId> {
        self.networks.keys()
    }

    /// The permission registry protocol contracts on the chain consult.
    pub fn registry(&self, chain_id: &eth::ChainId) -> Option<&permission::Registry> {
        self.networks.get(chain_id).map(|network| &network.registry)
    }

    pub async fn settle(&self, winner: &Winner) -> Outcome {
        observe::settling(winner);
        let result = self.try_settle(winner).await;
        observe::settled(winner, &result);
        result.into()
    }

    async fn try_settle(&self, winner: &Winner) -> Result<Settled, SettlementFailed> {
        let bundle = &winner.bundle;
        let network = self
            .networks
            .get(&bundle.chain_id)
            .ok_or_else(|| SettlementFailed::UnsupportedChain(bundle.chain_id.clone()))?;
        let protocol_proceeds = self.protocol_share(bundle.bid_amount);
        let relayer_fee = bundle.bid_amount - protocol_proceeds;

        let settle = async {
            let grant = network.registry.open(bundle.permission_key.clone()).await;
            let receipt = network
                .chain
                .execute(bundle, protocol_proceeds, grant.permission())
                .await?;
            grant.close();
            Ok::<_, SettlementFailed>(Settled {
                tx_hash: receipt.tx_hash,
                protocol_proceeds,
                relayer_fee,
            })
        };
        tokio::time::timeout(self.config.timeout, settle)
            .await
            .map_err(|_| SettlementFailed::Timeout)?
    }

    fn protocol_share(&self, bid: U256) -> U256 {
        eth::share(bid, self.config.protocol_share_bps)
    }
}
