//! Auction rounds over opportunities.
//!
//! All rounds are kept in a registry keyed by `(chain id, permission key)`.
//! Every round has its own lock so bids on unrelated rounds never contend.

use {
    crate::{
        domain::{
            eth::{self, U256},
            opportunity::{self, Opportunity},
            settlement,
        },
        infra::observe,
    },
    dashmap::{DashMap, mapref::entry::Entry},
    std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    },
    tokio::{sync::Mutex, time::Instant},
};

mod round;

pub use round::{Bid, BidError, Bundle, Closed, NewBid, Status, Winner};

#[derive(Debug, Clone)]
pub struct Config {
    /// How long a round collects bids after it was opened.
    pub bid_collection_period: Duration,
    /// Share of the surplus implied by the opportunity's token amounts that a
    /// bid has to reach, in basis points.
    pub reserve_bps: u16,
}

/// Key of the registry of rounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub chain_id: eth::ChainId,
    pub permission_key: eth::PermissionKey,
}

impl Key {
    fn of(opportunity: &Opportunity) -> Self {
        Self {
            chain_id: opportunity.chain_id.clone(),
            permission_key: opportunity.permission_key.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Round {
    pub id: opportunity::Id,
    pub opportunity: Opportunity,
    pub deadline: Instant,
    pub reserve: U256,
    state: Mutex<round::State>,
}

/// Result of opening a round for an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opened {
    pub id: opportunity::Id,
    pub deadline: Instant,
    /// The opportunity was identical to the one of an open round and got
    /// merged into it.
    pub coalesced: bool,
}

/// Snapshot of a round.
#[derive(Debug, Clone)]
pub struct View {
    pub id: opportunity::Id,
    pub opportunity: Opportunity,
    pub status: Status,
    pub bids: usize,
    pub reserve: U256,
    pub settlement: Option<settlement::Outcome>,
}

#[derive(Debug, thiserror::Error)]
#[error("permission key {} already has an open round on chain {}", .0.permission_key, .0.chain_id)]
pub struct DuplicateKey(pub Key);

#[derive(Debug, thiserror::Error)]
#[error("opportunity not found")]
pub struct NotFound;

#[derive(Debug, thiserror::Error)]
pub enum SubmitBidError {
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error(transparent)]
    Rejected(#[from] BidError),
}

#[derive(Debug)]
pub struct Engine {
    config: Config,
    /// Latest round per key.
    rounds: DashMap<Key, Arc<Round>>,
    /// All rounds that were not pruned yet.
    by_id: DashMap<opportunity::Id, Arc<Round>>,
    next_id: AtomicU64,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rounds: Default::default(),
            by_id: Default::default(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Opens a round for the opportunity. An identical opportunity submitted
    /// again while its round is open is coalesced into that round.
    pub async fn open(&self, opportunity: Opportunity) -> Result<Opened, DuplicateKey> {
        let key = Key::of(&opportunity);
        loop {
            let existing = match self.rounds.entry(key.clone()) {
                Entry::Vacant(entry) => {
                    let round = Arc::new(self.round(opportunity));
                    entry.insert(round.clone());
                    self.by_id.insert(round.id, round.clone());
                    return Ok(Opened {
                        id: round.id,
                        deadline: round.deadline,
                        coalesced: false,
                    });
                }
                Entry::Occupied(entry) => entry.get().clone(),
            };

            if existing.state.lock().await.is_open() {
                return if existing.opportunity == opportunity {
                    Ok(Opened {
                        id: existing.id,
                        deadline: existing.deadline,
                        coalesced: true,
                    })
                } else {
                    Err(DuplicateKey(key))
                };
            }

            // Decided rounds never reopen, so the key is free. Only unlink the
            // round we looked at; a concurrent submission may have replaced it
            // already.
            self.rounds
                .remove_if(&key, |_, round| Arc::ptr_eq(round, &existing));
        }
    }

    fn round(&self, opportunity: Opportunity) -> Round {
        Round {
            id: opportunity::Id(self.next_id.fetch_add(1, Ordering::Relaxed)),
            reserve: opportunity.reserve(self.config.reserve_bps),
            deadline: Instant::now() + self.config.bid_collection_period,
            opportunity,
            state: Mutex::new(round::State::new()),
        }
    }

    /// Accepts a bid into an open round.
    pub async fn submit_bid(
        &self,
        id: opportunity::Id,
        bid: NewBid,
    ) -> Result<Bid, SubmitBidError> {
        let round = self.get(id)?;
        let mut state = round.state.lock().await;
        let result = state.bid(bid, round.deadline, round.reserve);
        observe::bid(&round.opportunity.chain_id, id, &result);
        Ok(result?)
    }

    /// Closes the round and selects the winner. Closing a decided round is a
    /// no-op returning the recorded outcome; the boolean tells whether this
    /// call performed the transition.
    pub async fn close_round(&self, id: opportunity::Id) -> Result<(Closed, bool), NotFound> {
        let round = self.get(id)?;
        let mut state = round.state.lock().await;
        if let Some(closed) = state.close(id, &round.opportunity) {
            observe::round_closed(&round.opportunity.chain_id, id, &closed);
            return Ok((closed, true));
        }
        match &state.status {
            Status::Closed(closed) => Ok((closed.clone(), false)),
            Status::Open => unreachable!("closing an open round always decides it"),
        }
    }

    /// Expires the open round of the opportunity with the given key.
    pub async fn expire(
        &self,
        chain_id: &eth::ChainId,
        permission_key: &eth::PermissionKey,
    ) -> Result<opportunity::Id, NotFound> {
        let key = Key {
            chain_id: chain_id.clone(),
            permission_key: permission_key.clone(),
        };
        let round = self
            .rounds
            .get(&key)
            .map(|round| round.clone())
            .ok_or(NotFound)?;
        let mut state = round.state.lock().await;
        if !state.expire() {
            return Err(NotFound);
        }
        observe::round_closed(chain_id, round.id, &Closed::Expired);
        Ok(round.id)
    }

    /// Records the result of settling the winner of a round.
    pub async fn record_settlement(&self, id: opportunity::Id, outcome: settlement::Outcome) {
        let Ok(round) = self.get(id) else {
            return;
        };
        round.state.lock().await.settlement = Some(outcome);
    }

    pub async fn view(&self, id: opportunity::Id) -> Result<View, NotFound> {
        let round = self.get(id)?;
        let state = round.state.lock().await;
        Ok(View {
            id,
            opportunity: round.opportunity.clone(),
            status: state.status.clone(),
            bids: state.bids.len(),
            reserve: round.reserve,
            settlement: state.settlement.clone(),
        })
    }

    /// Rounds still accepting bids, optionally restricted to one chain.
    pub async fn open_rounds(&self, chain_id: Option<&eth::ChainId>) -> Vec<Arc<Round>> {
        let candidates: Vec<_> = self
            .rounds
            .iter()
            .filter(|entry| chain_id.is_none_or(|chain_id| entry.key().chain_id == *chain_id))
            .map(|entry| entry.value().clone())
            .collect();

        let mut open = Vec::new();
        for round in candidates {
            if round.state.lock().await.is_open() {
                open.push(round);
            }
        }
        open.sort_by_key(|round| round.id);
        open
    }

    /// Forgets rounds that were decided more than `retention` ago and are not
    /// waiting for a settlement result anymore.
    pub fn prune(&self, retention: Duration) {
        let now = Instant::now();
        let expired = |round: &Arc<Round>| {
            round.state.try_lock().is_ok_and(|state| {
                let settled = match &state.status {
                    Status::Closed(Closed::Winner(_)) => state.settlement.is_some(),
                    Status::Closed(_) => true,
                    Status::Open => false,
                };
                settled
                    && state
                        .closed_at
                        .is_some_and(|closed_at| now.duration_since(closed_at) >= retention)
            })
        };
        self.by_id.retain(|_, round| !expired(round));
        self.rounds.retain(|_, round| !expired(round));
    }

    fn get(&self, id: opportunity::Id) -> Result<Arc<Round>, NotFound> {
        self.by_id
            .get(&id)
            .map(|round| round.clone())
            .ok_or(NotFound)
    }
}
