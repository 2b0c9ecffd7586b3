/// Metrics for the relay.
#[derive(Debug, Clone, prometheus_metric_storage::MetricStorage)]
pub struct Metrics {
    /// Results of opportunity submissions.
    #[metric(labels("chain", "result"))]
    pub opportunities: prometheus::IntCounterVec,
    /// Results of bid submissions.
    #[metric(labels("chain", "result"))]
    pub bids: prometheus::IntCounterVec,
    /// How auction rounds ended.
    #[metric(labels("chain", "outcome"))]
    pub rounds: prometheus::IntCounterVec,
    /// Results of settling round winners.
    #[metric(labels("chain", "result"))]
    pub settlements: prometheus::IntCounterVec,
    /// Number of permission grants currently open.
    pub active_grants: prometheus::IntGauge,
    /// How often opening a grant had to wait for a conflicting one.
    pub grant_contentions: prometheus::IntCounter,
}

/// Setup the metrics registry.
pub fn init() {
    observe::metrics::setup_registry_reentrant(Some("relay".to_owned()), None);
}

/// Get the metrics instance.
pub fn get() -> &'static Metrics {
    Metrics::instance(observe::metrics::get_storage_registry())
        .expect("unexpected error getting metrics instance")
}
