mod bids;
mod healthz;
mod metrics;
mod opportunities;
mod rounds;

pub(super) use {
    bids::bids,
    healthz::healthz,
    metrics::metrics,
    opportunities::opportunities,
    rounds::rounds,
};
