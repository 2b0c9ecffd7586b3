use {
    crate::{
        domain::{auction, eth, opportunity, settlement},
        infra::chain,
    },
    std::{collections::HashSet, time::Duration},
};

pub mod file;

/// Configuration of the relay.
#[derive(Debug, Clone)]
pub struct Config {
    pub auction: auction::Config,
    pub settlement: settlement::Config,
    /// How long decided rounds stay queryable.
    pub round_retention: Duration,
    pub versions: HashSet<opportunity::Version>,
    pub chains: Vec<Chain>,
}

#[derive(Debug, Clone)]
pub struct Chain {
    pub id: eth::ChainId,
    pub kind: ChainKind,
}

#[derive(Debug, Clone)]
pub enum ChainKind {
    /// In-process chain with a protocol contract at each of the addresses.
    Simulated {
        latency: Duration,
        protocols: Vec<eth::Address>,
    },
    /// Transactions are forwarded to an external submitter.
    Remote(chain::remote::Config),
}
