use {
    crate::domain::{
        auction::{self, Closed, Status},
        eth::{self, Address, Bytes, U256},
        settlement::{Outcome, SettlementFailed},
    },
    chrono::{DateTime, Utc},
    serde::Serialize,
    serde_with::{DisplayFromStr, serde_as},
};

/// Status of an auction round.
#[serde_as]
#[derive(Debug, Serialize)]
pub struct Round {
    opportunity_id: u64,
    chain_id: String,
    permission_key: Bytes,
    status: RoundStatus,
    /// Number of bids currently in the round.
    bids: usize,
    #[serde_as(as = "DisplayFromStr")]
    reserve: U256,
    winner: Option<Winner>,
    settlement: Option<Settlement>,
}

impl Round {
    pub fn new(view: &auction::View) -> Self {
        let (status, winner) = match &view.status {
            Status::Open => (RoundStatus::Open, None),
            Status::Closed(Closed::Winner(winner)) => {
                (RoundStatus::Closed, Some(Winner::new(winner)))
            }
            Status::Closed(Closed::NoWinner) => (RoundStatus::Closed, None),
            Status::Closed(Closed::Expired) => (RoundStatus::Expired, None),
        };
        let settlement = match (&view.settlement, &winner) {
            (Some(outcome), _) => Some(Settlement::new(outcome)),
            (None, Some(_)) => Some(Settlement::Pending),
            (None, None) => None,
        };
        Self {
            opportunity_id: view.id.0,
            chain_id: view.opportunity.chain_id.to_string(),
            permission_key: view.opportunity.permission_key.as_bytes().clone(),
            status,
            bids: view.bids,
            reserve: view.reserve,
            winner,
            settlement,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum RoundStatus {
    Open,
    Closed,
    Expired,
}

#[serde_as]
#[derive(Debug, Serialize)]
struct Winner {
    searcher: Address,
    #[serde_as(as = "DisplayFromStr")]
    amount: U256,
    submitted_at: DateTime<Utc>,
}

impl Winner {
    fn new(winner: &auction::Winner) -> Self {
        Self {
            searcher: winner.bid.searcher,
            amount: winner.bid.amount,
            submitted_at: winner.bid.submitted_at,
        }
    }
}

#[serde_as]
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Settlement {
    Pending,
    Settled {
        tx_hash: eth::B256,
        #[serde_as(as = "DisplayFromStr")]
        protocol_proceeds: U256,
        #[serde_as(as = "DisplayFromStr")]
        relayer_fee: U256,
    },
    Failed {
        reason: String,
    },
}

impl Settlement {
    fn new(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Settled(settled) => Self::Settled {
                tx_hash: settled.tx_hash.0,
                protocol_proceeds: settled.protocol_proceeds,
                relayer_fee: settled.relayer_fee,
            },
            Outcome::Failed(err) => Self::Failed {
                reason: match err {
                    SettlementFailed::Reverted(_) => "reverted",
                    SettlementFailed::Timeout => "timeout",
                    SettlementFailed::UnsupportedChain(_) => "unsupported_chain",
                    SettlementFailed::Chain(_) => "chain_error",
                }
                .to_owned(),
            },
        }
    }
}
