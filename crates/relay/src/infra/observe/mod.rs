//! This module implements the observability for the relay. It exposes
//! functions which represent events that are meaningful to the system. These
//! functions are called when the corresponding events occur. They log the event
//! and update the metrics, if the event is worth measuring.

use crate::domain::{
    auction::{Bid, BidError, Closed, Winner},
    eth,
    intake::{SubmitError, Submitted},
    opportunity,
    settlement::{SettlementFailed, Settled},
};

mod metrics;

/// Setup the observability. The log arguments configure the tokio tracing
/// framework.
pub fn init(log: &str, stderr_threshold: Option<tracing::Level>, use_json_logs: bool) {
    observe::tracing::initialize(&observe::Config::new(
        log,
        stderr_threshold,
        use_json_logs,
    ));
    metrics::init();
}

/// Observe the result of an opportunity submission.
pub fn submitted(chain_id: &eth::ChainId, result: &Result<Submitted, SubmitError>) {
    let label = match result {
        Ok(submitted) => {
            tracing::info!(
                %chain_id,
                id = %submitted.id,
                coalesced = submitted.coalesced,
                "accepted opportunity"
            );
            if submitted.coalesced {
                "Coalesced"
            } else {
                "Opened"
            }
        }
        Err(err) => {
            tracing::debug!(%chain_id, ?err, "rejected opportunity");
            match err {
                SubmitError::Validation(_) => "ValidationError",
                SubmitError::UnsupportedChain(_) => "UnsupportedChainError",
                SubmitError::DuplicateKey(_) => "DuplicateKeyError",
            }
        }
    };
    metrics::get()
        .opportunities
        .with_label_values(&[chain_id.as_str(), label])
        .inc();
}

/// Observe that a protocol withdrew its opportunity.
pub fn removed(chain_id: &eth::ChainId, id: opportunity::Id) {
    tracing::info!(%chain_id, %id, "removed opportunity");
}

/// Observe the result of a bid submission.
pub fn bid(chain_id: &eth::ChainId, id: opportunity::Id, result: &Result<Bid, BidError>) {
    let label = match result {
        Ok(bid) => {
            tracing::debug!(
                %chain_id,
                %id,
                searcher = %bid.searcher,
                amount = %bid.amount,
                "accepted bid"
            );
            "Accepted"
        }
        Err(err) => {
            tracing::debug!(%chain_id, %id, ?err, "rejected bid");
            match err {
                BidError::Late => "LateBidError",
                BidError::Insufficient { .. } => "InsufficientBidError",
                BidError::Zero => "ValidationError",
            }
        }
    };
    metrics::get()
        .bids
        .with_label_values(&[chain_id.as_str(), label])
        .inc();
}

/// Observe the decision of an auction round.
pub fn round_closed(chain_id: &eth::ChainId, id: opportunity::Id, closed: &Closed) {
    let label = match closed {
        Closed::Winner(winner) => {
            tracing::info!(
                %chain_id,
                %id,
                searcher = %winner.bid.searcher,
                amount = %winner.bid.amount,
                "round closed with winner"
            );
            "Winner"
        }
        Closed::NoWinner => {
            tracing::info!(%chain_id, %id, "round closed without winner");
            "NoWinner"
        }
        Closed::Expired => {
            tracing::info!(%chain_id, %id, "round expired");
            "Expired"
        }
    };
    metrics::get()
        .rounds
        .with_label_values(&[chain_id.as_str(), label])
        .inc();
}

/// Observe that the settlement of a winner is about to start.
pub fn settling(winner: &Winner) {
    tracing::debug!(
        chain_id = %winner.bundle.chain_id,
        id = %winner.opportunity_id,
        permission_key = %winner.bundle.permission_key,
        "settling winner"
    );
}

/// Observe the result of settling a winner.
pub fn settled(winner: &Winner, result: &Result<Settled, SettlementFailed>) {
    let chain_id = &winner.bundle.chain_id;
    let id = winner.opportunity_id;
    let label = match result {
        Ok(settled) => {
            tracing::info!(
                %chain_id,
                %id,
                tx_hash = %settled.tx_hash,
                protocol_proceeds = %settled.protocol_proceeds,
                relayer_fee = %settled.relayer_fee,
                "settled"
            );
            "Success"
        }
        Err(err) => {
            tracing::warn!(%chain_id, %id, ?err, "failed to settle");
            match err {
                SettlementFailed::Reverted(_) => "Reverted",
                SettlementFailed::Timeout => "Timeout",
                SettlementFailed::UnsupportedChain(_) => "UnsupportedChain",
                SettlementFailed::Chain(_) => "ChainError",
            }
        }
    };
    metrics::get()
        .settlements
        .with_label_values(&[chain_id.as_str(), label])
        .inc();
}

/// Observe that a permission grant was opened.
pub fn grant_opened(key: &eth::PermissionKey) {
    tracing::trace!(%key, "opened permission grant");
    metrics::get().active_grants.inc();
}

/// Observe that a permission grant was closed.
pub fn grant_closed(key: &eth::PermissionKey) {
    tracing::trace!(%key, "closed permission grant");
    metrics::get().active_grants.dec();
}

/// Observe that opening a grant has to wait for a conflicting grant.
pub fn grant_contended(key: &eth::PermissionKey) {
    tracing::debug!(%key, "waiting for conflicting permission grant");
    metrics::get().grant_contentions.inc();
}

/// Observe that decided rounds past their retention were forgotten.
pub fn pruned() {
    tracing::trace!("pruned decided rounds");
}
