pub use load::load;
use {
    crate::domain::eth,
    serde::Deserialize,
    std::time::Duration,
    url::Url,
};

mod load;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Config {
    /// How long an auction round collects bids before it is closed.
    #[serde(with = "humantime_serde", default = "default_bid_collection_period")]
    bid_collection_period: Duration,

    /// Upper bound for settling the winner of a round, including the wait for
    /// a conflicting grant of the same permission key.
    #[serde(with = "humantime_serde", default = "default_settlement_timeout")]
    settlement_timeout: Duration,

    /// Minimum bid as a share of the surplus of an opportunity, in basis
    /// points.
    #[serde(default = "default_reserve_bps")]
    reserve_bps: u16,

    /// Share of the winning bid paid to the protocol, in basis points. The
    /// relayer keeps the rest.
    #[serde(default = "default_protocol_share_bps")]
    protocol_share_bps: u16,

    /// How long decided rounds can still be queried.
    #[serde(with = "humantime_serde", default = "default_round_retention")]
    round_retention: Duration,

    /// Accepted opportunity schema versions.
    #[serde(default = "default_supported_versions")]
    supported_versions: Vec<String>,

    #[serde(rename = "chain")]
    chains: Vec<ChainConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum ChainConfig {
    /// An in-process chain. Useful for development and tests.
    Simulated {
        id: String,

        /// Time every transaction takes to be included.
        #[serde(with = "humantime_serde", default)]
        latency: Duration,

        /// Addresses of the protocol contracts deployed on the chain.
        #[serde(default)]
        protocols: Vec<eth::Address>,
    },
    /// Forwards transactions to an external submitter.
    Remote {
        id: String,

        /// Base url of the submitter.
        url: Url,

        #[serde(with = "humantime_serde", default = "default_remote_timeout")]
        timeout: Duration,
    },
}

fn default_bid_collection_period() -> Duration {
    Duration::from_secs(1)
}

fn default_settlement_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_reserve_bps() -> u16 {
    5_000
}

fn default_protocol_share_bps() -> u16 {
    8_000
}

fn default_round_retention() -> Duration {
    Duration::from_secs(600)
}

fn default_supported_versions() -> Vec<String> {
    vec!["v1".to_owned()]
}

fn default_remote_timeout() -> Duration {
    Duration::from_secs(10)
}
