use {
    crate::{
        domain::{auction, eth, opportunity, settlement},
        infra::{
            self,
            chain,
            config::{ChainKind, file},
        },
    },
    anyhow::{Context, ensure},
    std::{collections::HashSet, path::Path},
    tokio::fs,
};

/// Load the relay configuration from a TOML file.
///
/// # Panics
///
/// This method panics if the config is invalid or on I/O errors.
pub async fn load(path: &Path) -> infra::Config {
    let data = fs::read_to_string(path)
        .await
        .unwrap_or_else(|e| panic!("I/O error while reading {path:?}: {e:?}"));
    parse(&data).unwrap_or_else(|e| panic!("invalid configuration in {path:?}: {e:#}"))
}

fn parse(data: &str) -> anyhow::Result<infra::Config> {
    let config: file::Config = toml::de::from_str(data).context("TOML syntax error")?;

    ensure!(
        config.reserve_bps <= eth::BPS,
        "reserve-bps must not exceed {}",
        eth::BPS
    );
    ensure!(
        config.protocol_share_bps <= eth::BPS,
        "protocol-share-bps must not exceed {}",
        eth::BPS
    );
    ensure!(
        !config.bid_collection_period.is_zero(),
        "bid-collection-period must be positive"
    );
    ensure!(!config.chains.is_empty(), "at least one chain is required");

    let mut ids = HashSet::new();
    let chains = config
        .chains
        .into_iter()
        .map(|entry| {
            let chain = match entry {
                file::ChainConfig::Simulated {
                    id,
                    latency,
                    protocols,
                } => infra::config::Chain {
                    id: id.into(),
                    kind: ChainKind::Simulated { latency, protocols },
                },
                file::ChainConfig::Remote { id, mut url, timeout } => {
                    // Endpoints are resolved relative to the base url.
                    if !url.path().ends_with('/') {
                        url.set_path(&format!("{}/", url.path()));
                    }
                    infra::config::Chain {
                        id: id.into(),
                        kind: ChainKind::Remote(chain::remote::Config { url, timeout }),
                    }
                }
            };
            ensure!(ids.insert(chain.id.clone()), "chain {} is configured twice", chain.id);
            Ok(chain)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(infra::Config {
        auction: auction::Config {
            bid_collection_period: config.bid_collection_period,
            reserve_bps: config.reserve_bps,
        },
        settlement: settlement::Config {
            timeout: config.settlement_timeout,
            protocol_share_bps: config.protocol_share_bps,
        },
        round_retention: config.round_retention,
        versions: config
            .supported_versions
            .into_iter()
            .map(opportunity::Version)
            .collect(),
        chains,
    })
}
