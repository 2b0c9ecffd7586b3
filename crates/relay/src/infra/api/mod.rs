use {
    crate::domain::Relay,
    futures::Future,
    std::net::SocketAddr,
    tokio::sync::oneshot,
};

mod error;
pub mod routes;

/// Request bodies are small JSON documents; anything beyond this is rejected.
const REQUEST_BODY_LIMIT: usize = 1024 * 1024;

pub struct Api {
    pub relay: Relay,
    pub addr: SocketAddr,
    /// If this channel is specified, the bound address will be sent to it. This
    /// allows the relay to bind to 0.0.0.0:0 during testing.
    pub addr_sender: Option<oneshot::Sender<SocketAddr>>,
}

impl Api {
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let app = router(self.relay);

        // Start the server.
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(port = local_addr.port(), "serving relay");
        if let Some(addr_sender) = self.addr_sender {
            // The receiver only goes away if the caller lost interest in the
            // address.
            let _ = addr_sender.send(local_addr);
        }
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

fn router(relay: Relay) -> axum::Router {
    let mut app = axum::Router::new();

    // Add the metrics and healthz endpoints.
    app = routes::metrics(app);
    app = routes::healthz(app);

    let v1 = axum::Router::new();
    let v1 = routes::opportunities(v1);
    let v1 = routes::bids(v1);
    let v1 = routes::rounds(v1);
    app = app.nest("/v1", v1.with_state(State(relay)));

    app.layer(axum::extract::DefaultBodyLimit::max(REQUEST_BODY_LIMIT))
        .layer(
            tower::ServiceBuilder::new()
                .layer(tower_http::trace::TraceLayer::new_for_http())
                .layer(tower_http::cors::CorsLayer::permissive()),
        )
}

#[derive(Debug, Clone)]
struct State(Relay);

impl State {
    fn relay(&self) -> &Relay {
        &self.0
    }
}
