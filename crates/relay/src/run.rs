use {
    crate::{
        domain::{
            Relay,
            settlement::{Dispatcher, Network},
        },
        infra::{
            self,
            Api,
            chain::{self, Chain},
            cli,
            config::{self, ChainKind},
            observe,
        },
    },
    clap::Parser,
    std::{net::SocketAddr, sync::Arc, time::Duration},
    tokio::sync::oneshot,
};

/// How often decided rounds are checked against their retention.
const PRUNE_INTERVAL: Duration = Duration::from_secs(30);

pub async fn start(args: impl Iterator<Item = String>) {
    run(args, None).await
}

/// This function exists to enable running the relay for testing. The
/// `addr_sender` parameter is used so that the testing framework can get the
/// address of the server and connect to it. Outside the test suite, the
/// `addr_sender` parameter is unused.
pub async fn run(
    args: impl Iterator<Item = String>,
    addr_sender: Option<oneshot::Sender<SocketAddr>>,
) {
    let args = cli::Args::parse_from(args);
    observe::init(&args.log, args.stderr_threshold, args.use_json_logs);
    let config = config::file::load(&args.config).await;
    tracing::info!(?config, "loaded configuration");

    let relay = relay(&config);
    let pruning = tokio::spawn(prune(relay.clone(), config.round_retention));

    let (shutdown_sender, shutdown_receiver) = oneshot::channel();
    let serve = Api {
        relay,
        addr: args.addr,
        addr_sender,
    }
    .serve(async {
        let _ = shutdown_receiver.await;
    });

    futures::pin_mut!(serve);
    tokio::select! {
        result = &mut serve => panic!("serve task exited: {result:?}"),
        _ = shutdown_signal() => {
            shutdown_sender.send(()).expect("failed to send shutdown signal");
            match tokio::time::timeout(Duration::from_secs(10), serve).await {
                Ok(inner) => inner.expect("API failed during shutdown"),
                Err(_) => panic!("API shutdown exceeded timeout"),
            }
        }
    };
    pruning.abort();
}

fn relay(config: &infra::Config) -> Relay {
    let networks = config
        .chains
        .iter()
        .map(|chain| {
            (
                chain.id.clone(),
                Network {
                    registry: Default::default(),
                    chain: self::chain(chain),
                },
            )
        })
        .collect();
    Relay::new(
        config.auction.clone(),
        config.versions.clone(),
        Dispatcher::new(config.settlement.clone(), networks),
    )
}

fn chain(config: &config::Chain) -> Arc<dyn Chain> {
    match &config.kind {
        ChainKind::Simulated { latency, protocols } => Arc::new(
            chain::Simulated::with_protocols(*latency, protocols.iter().copied()),
        ),
        ChainKind::Remote(remote) => Arc::new(
            chain::Remote::new(remote.clone())
                .unwrap_or_else(|err| panic!("initialize chain {}: {err:#}", config.id)),
        ),
    }
}

async fn prune(relay: Relay, retention: Duration) {
    let mut interval = tokio::time::interval(PRUNE_INTERVAL);
    loop {
        interval.tick().await;
        relay.prune(retention);
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    // Intercept signals for graceful shutdown. Kubernetes sends sigterm, Ctrl-C
    // sends sigint.
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await
    };
    let sigint = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("install SIGINT handler")
            .recv()
            .await
    };
    futures::pin_mut!(sigint);
    futures::pin_mut!(sigterm);
    futures::future::select(sigterm, sigint).await;
}

#[cfg(windows)]
async fn shutdown_signal() {
    // No support for signal handling on Windows.
    std::future::pending().await
}
