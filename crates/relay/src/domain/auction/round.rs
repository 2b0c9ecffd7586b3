use {
    crate::domain::{
        eth::{self, Address, Bytes, U256},
        opportunity::{self, Opportunity},
        settlement,
    },
    chrono::{DateTime, Utc},
    std::cmp::Reverse,
    tokio::time::Instant,
};

/// A bid as submitted by a searcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBid {
    pub searcher: Address,
    pub amount: U256,
    /// Calls of the searcher executed together with the opportunity.
    pub execution_payload: Bytes,
}

/// A bid accepted into a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bid {
    pub searcher: Address,
    pub amount: U256,
    pub execution_payload: Bytes,
    pub submitted_at: DateTime<Utc>,
    /// Order in which the round accepted its bids. Breaks ties between bids
    /// that carry the same timestamp.
    sequence: u64,
}

/// The transaction executed for the winner of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub chain_id: eth::ChainId,
    pub permission_key: eth::PermissionKey,
    pub target_contract: Address,
    pub target_calldata: Bytes,
    pub target_call_value: U256,
    pub searcher: Address,
    pub bid_amount: U256,
    pub execution_payload: Bytes,
}

impl Bundle {
    fn new(opportunity: &Opportunity, bid: &Bid) -> Self {
        Self {
            chain_id: opportunity.chain_id.clone(),
            permission_key: opportunity.permission_key.clone(),
            target_contract: opportunity.target_contract,
            target_calldata: opportunity.target_calldata.clone(),
            target_call_value: opportunity.target_call_value,
            searcher: bid.searcher,
            bid_amount: bid.amount,
            execution_payload: bid.execution_payload.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub opportunity_id: opportunity::Id,
    pub bid: Bid,
    pub bundle: Bundle,
}

/// The decided state of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closed {
    Winner(Box<Winner>),
    NoWinner,
    /// The opportunity was removed before the round was closed.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Open,
    Closed(Closed),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BidError {
    #[error("the auction round is no longer accepting bids")]
    Late,
    #[error("bid of {amount} is below the reserve of {reserve}")]
    Insufficient { amount: U256, reserve: U256 },
    #[error("bid amount must be positive")]
    Zero,
}

/// Mutable part of a round, guarded by the round's lock.
#[derive(Debug)]
pub(super) struct State {
    pub status: Status,
    pub bids: Vec<Bid>,
    pub settlement: Option<settlement::Outcome>,
    pub closed_at: Option<Instant>,
    next_sequence: u64,
}

impl State {
    pub fn new() -> Self {
        Self {
            status: Status::Open,
            bids: Vec::new(),
            settlement: None,
            closed_at: None,
            next_sequence: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, Status::Open)
    }

    /// Adds a bid to the open round. A searcher has at most one bid per round,
    /// so a new bid replaces its previous one.
    pub fn bid(
        &mut self,
        bid: NewBid,
        deadline: Instant,
        reserve: U256,
    ) -> Result<Bid, BidError> {
        if !self.is_open() || Instant::now() >= deadline {
            return Err(BidError::Late);
        }
        if bid.amount.is_zero() {
            return Err(BidError::Zero);
        }
        if bid.amount < reserve {
            return Err(BidError::Insufficient {
                amount: bid.amount,
                reserve,
            });
        }

        let bid = Bid {
            searcher: bid.searcher,
            amount: bid.amount,
            execution_payload: bid.execution_payload,
            submitted_at: Utc::now(),
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.bids.retain(|existing| existing.searcher != bid.searcher);
        self.bids.push(bid.clone());
        Ok(bid)
    }

    /// Performs the closing transition. Returns `None` if the round was
    /// already decided.
    pub fn close(&mut self, id: opportunity::Id, opportunity: &Opportunity) -> Option<Closed> {
        if !self.is_open() {
            return None;
        }
        let closed = match select_winner(&self.bids) {
            Some(bid) => Closed::Winner(Box::new(Winner {
                opportunity_id: id,
                bundle: Bundle::new(opportunity, bid),
                bid: bid.clone(),
            })),
            None => Closed::NoWinner,
        };
        self.bids.clear();
        self.finish(closed.clone());
        Some(closed)
    }

    /// Marks the open round as expired. Returns `false` if the round was
    /// already decided.
    pub fn expire(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.bids.clear();
        self.finish(Closed::Expired);
        true
    }

    fn finish(&mut self, closed: Closed) {
        self.status = Status::Closed(closed);
        self.closed_at = Some(Instant::now());
    }
}

/// The highest bid wins. Equal amounts go to the bid that was submitted first.
fn select_winner(bids: &[Bid]) -> Option<&Bid> {
    bids.iter()
        .max_by_key(|bid| (bid.amount, Reverse(bid.sequence)))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::domain::opportunity::tests::opportunity,
        alloy::primitives::address,
        std::time::Duration,
    };

    const ALICE: Address = address!("00000000000000000000000000000000000000a1");
    const BOB: Address = address!("00000000000000000000000000000000000000b0");
    const CAROL: Address = address!("00000000000000000000000000000000000000c0");

    fn bid(searcher: Address, amount: u64) -> NewBid {
        NewBid {
            searcher,
            amount: U256::from(amount),
            execution_payload: Bytes::from_static(&[0xbe, 0xef]),
        }
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn winner(closed: Option<Closed>) -> Winner {
        match closed {
            Some(Closed::Winner(winner)) => *winner,
            other => panic!("expected a winner, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn highest_bid_wins() {
        let opportunity = opportunity("development", b"vault-1");
        let mut state = State::new();
        state.bid(bid(ALICE, 950), deadline(), U256::ZERO).unwrap();
        state.bid(bid(BOB, 1000), deadline(), U256::ZERO).unwrap();
        state.bid(bid(CAROL, 10), deadline(), U256::ZERO).unwrap();

        let winner = winner(state.close(opportunity::Id(1), &opportunity));
        assert_eq!(winner.bid.searcher, BOB);
        assert_eq!(winner.bundle.bid_amount, U256::from(1000));
        assert_eq!(winner.bundle.target_contract, opportunity.target_contract);
        assert_eq!(winner.bundle.target_calldata, opportunity.target_calldata);
        assert_eq!(winner.bundle.permission_key, opportunity.permission_key);
        assert_eq!(
            winner.bundle.execution_payload,
            Bytes::from_static(&[0xbe, 0xef])
        );
    }

    #[tokio::test]
    async fn ties_go_to_the_earliest_bid() {
        let opportunity = opportunity("development", b"vault-1");
        let mut state = State::new();
        state.bid(bid(ALICE, 1000), deadline(), U256::ZERO).unwrap();
        state.bid(bid(BOB, 1000), deadline(), U256::ZERO).unwrap();

        let winner = winner(state.close(opportunity::Id(1), &opportunity));
        assert_eq!(winner.bid.searcher, ALICE);
    }

    #[tokio::test]
    async fn resubmitted_bid_replaces_previous_one() {
        let opportunity = opportunity("development", b"vault-1");
        let mut state = State::new();
        state.bid(bid(ALICE, 1000), deadline(), U256::ZERO).unwrap();
        state.bid(bid(BOB, 1000), deadline(), U256::ZERO).unwrap();
        state.bid(bid(ALICE, 900), deadline(), U256::ZERO).unwrap();
        assert_eq!(state.bids.len(), 2);

        let winner = winner(state.close(opportunity::Id(1), &opportunity));
        assert_eq!(winner.bid.searcher, BOB);
    }

    #[tokio::test]
    async fn rejects_invalid_bids() {
        let mut state = State::new();
        assert_eq!(
            state.bid(bid(ALICE, 0), deadline(), U256::ZERO),
            Err(BidError::Zero)
        );
        assert_eq!(
            state.bid(bid(ALICE, 49), deadline(), U256::from(50)),
            Err(BidError::Insufficient {
                amount: U256::from(49),
                reserve: U256::from(50),
            })
        );
        assert_eq!(
            state.bid(bid(ALICE, 100), Instant::now(), U256::ZERO),
            Err(BidError::Late)
        );
        assert!(state.bids.is_empty());
    }

    #[tokio::test]
    async fn closing_is_performed_once() {
        let opportunity = opportunity("development", b"vault-1");
        let mut state = State::new();
        assert_eq!(
            state.close(opportunity::Id(1), &opportunity),
            Some(Closed::NoWinner)
        );
        assert_eq!(state.close(opportunity::Id(1), &opportunity), None);
        assert!(!state.expire());
        assert_eq!(state.status, Status::Closed(Closed::NoWinner));
        assert_eq!(
            state.bid(bid(ALICE, 100), deadline(), U256::ZERO),
            Err(BidError::Late)
        );
    }

    #[tokio::test]
    async fn expired_round_discards_bids() {
        let opportunity = opportunity("development", b"vault-1");
        let mut state = State::new();
        state.bid(bid(ALICE, 100), deadline(), U256::ZERO).unwrap();
        assert!(state.expire());
        assert!(state.bids.is_empty());
        assert_eq!(state.close(opportunity::Id(1), &opportunity), None);
        assert_eq!(state.status, Status::Closed(Closed::Expired));
    }
}
