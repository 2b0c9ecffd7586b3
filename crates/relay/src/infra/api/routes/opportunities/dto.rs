use {
    crate::domain::{
        eth::{self, Address, Bytes, U256},
        opportunity::{self, Opportunity},
    },
    serde::{Deserialize, Serialize},
    serde_with::{DisplayFromStr, serde_as},
};

impl NewOpportunity {
    pub fn into_domain(self) -> Result<Opportunity, opportunity::Invalid> {
        Ok(Opportunity {
            chain_id: self.chain_id.into(),
            target_contract: self.target_contract,
            target_calldata: self.target_calldata,
            target_call_value: self.target_call_value,
            permission_key: eth::PermissionKey::new(self.permission_key)?,
            sell_tokens: self.sell_tokens.into_iter().map(Into::into).collect(),
            buy_tokens: self.buy_tokens.into_iter().map(Into::into).collect(),
            version: opportunity::Version(self.version),
        })
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewOpportunity {
    target_calldata: Bytes,
    chain_id: String,
    target_contract: Address,
    permission_key: Bytes,
    #[serde_as(as = "DisplayFromStr")]
    target_call_value: U256,
    sell_tokens: Vec<TokenAmount>,
    buy_tokens: Vec<TokenAmount>,
    version: String,
}

#[serde_as]
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TokenAmount {
    #[serde_as(as = "DisplayFromStr")]
    amount: U256,
    token: Address,
}

impl From<TokenAmount> for eth::Asset {
    fn from(value: TokenAmount) -> Self {
        Self {
            token: value.token,
            amount: value.amount,
        }
    }
}

impl From<&eth::Asset> for TokenAmount {
    fn from(value: &eth::Asset) -> Self {
        Self {
            amount: value.amount,
            token: value.token,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OpportunityId {
    opportunity_id: u64,
}

impl OpportunityId {
    pub fn new(id: opportunity::Id) -> Self {
        Self {
            opportunity_id: id.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Filter {
    pub chain_id: Option<String>,
}

/// An opportunity that is still accepting bids.
#[serde_as]
#[derive(Debug, Serialize)]
pub struct Listed {
    opportunity_id: u64,
    target_calldata: Bytes,
    chain_id: String,
    target_contract: Address,
    permission_key: Bytes,
    #[serde_as(as = "DisplayFromStr")]
    target_call_value: U256,
    sell_tokens: Vec<TokenAmount>,
    buy_tokens: Vec<TokenAmount>,
    version: String,
}

impl Listed {
    pub fn new(id: opportunity::Id, opportunity: &Opportunity) -> Self {
        Self {
            opportunity_id: id.0,
            target_calldata: opportunity.target_calldata.clone(),
            chain_id: opportunity.chain_id.to_string(),
            target_contract: opportunity.target_contract,
            permission_key: opportunity.permission_key.as_bytes().clone(),
            target_call_value: opportunity.target_call_value,
            sell_tokens: opportunity.sell_tokens.iter().map(Into::into).collect(),
            buy_tokens: opportunity.buy_tokens.iter().map(Into::into).collect(),
            version: opportunity.version.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Removal {
    pub chain_id: String,
    pub permission_key: Bytes,
}
