use {
    crate::domain::{
        auction,
        eth::{Address, Bytes, U256},
        opportunity,
    },
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    serde_with::{DisplayFromStr, serde_as},
};

impl NewBid {
    pub fn into_domain(self) -> auction::NewBid {
        auction::NewBid {
            searcher: self.searcher,
            amount: self.amount,
            execution_payload: self.execution_payload,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewBid {
    searcher: Address,
    #[serde_as(as = "DisplayFromStr")]
    amount: U256,
    /// Calls of the searcher executed together with the opportunity.
    #[serde(default)]
    execution_payload: Bytes,
}

#[serde_as]
#[derive(Debug, Serialize)]
pub struct Accepted {
    opportunity_id: u64,
    searcher: Address,
    #[serde_as(as = "DisplayFromStr")]
    amount: U256,
    submitted_at: DateTime<Utc>,
}

impl Accepted {
    pub fn new(id: opportunity::Id, bid: &auction::Bid) -> Self {
        Self {
            opportunity_id: id.0,
            searcher: bid.searcher,
            amount: bid.amount,
            submitted_at: bid.submitted_at,
        }
    }
}
