use {
    crate::{
        domain::{
            auction::{self, Engine},
            eth,
            opportunity::{self, Opportunity},
        },
        infra::observe,
    },
    std::{collections::HashSet, sync::Arc},
};

/// Validates opportunities submitted by protocols and opens their auction
/// rounds.
#[derive(Debug)]
pub struct Intake {
    chains: HashSet<eth::ChainId>,
    versions: HashSet<opportunity::Version>,
    engine: Arc<Engine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submitted {
    pub id: opportunity::Id,
    /// Deadline of the round the opportunity belongs to.
    pub deadline: tokio::time::Instant,
    /// The opportunity was already being auctioned and the existing round is
    /// reused.
    pub coalesced: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] opportunity::Invalid),
    #[error("chain {0} is not supported")]
    UnsupportedChain(eth::ChainId),
    #[error(transparent)]
    DuplicateKey(#[from] auction::DuplicateKey),
}

impl Intake {
    pub fn new(
        chains: HashSet<eth::ChainId>,
        versions: HashSet<opportunity::Version>,
        engine: Arc<Engine>,
    ) -> Self {
        Self {
            chains,
            versions,
            engine,
        }
    }

    pub async fn submit(&self, opportunity: Opportunity) -> Result<Submitted, SubmitError> {
        let chain_id = opportunity.chain_id.clone();
        let result = self.open(opportunity).await;
        observe::submitted(&chain_id, &result);
        result
    }

    async fn open(&self, opportunity: Opportunity) -> Result<Submitted, SubmitError> {
        if !self.chains.contains(&opportunity.chain_id) {
            return Err(SubmitError::UnsupportedChain(opportunity.chain_id));
        }
        opportunity.validate(&self.versions)?;
        let opened = self.engine.open(opportunity).await?;
        Ok(Submitted {
            id: opened.id,
            deadline: opened.deadline,
            coalesced: opened.coalesced,
        })
    }

    /// Withdraws the opportunity with the given key. Its round expires without
    /// being settled.
    pub async fn remove(
        &self,
        chain_id: &eth::ChainId,
        permission_key: &eth::PermissionKey,
    ) -> Result<opportunity::Id, auction::NotFound> {
        let id = self.engine.expire(chain_id, permission_key).await?;
        observe::removed(chain_id, id);
        Ok(id)
    }

    /// Opportunities that are still accepting bids.
    pub async fn opportunities(
        &self,
        chain_id: Option<&eth::ChainId>,
    ) -> Vec<(opportunity::Id, Opportunity)> {
        self.engine
            .open_rounds(chain_id)
            .await
            .into_iter()
            .map(|round| (round.id, round.opportunity.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::domain::{
            eth::U256,
            opportunity::tests::{TOKEN_A, opportunity},
        },
        std::time::Duration,
    };

    fn intake() -> Intake {
        Intake::new(
            [
                eth::ChainId::from("development"),
                eth::ChainId::from("op_sepolia"),
            ]
            .into_iter()
            .collect(),
            [opportunity::Version::from("v1")].into_iter().collect(),
            Arc::new(Engine::new(auction::Config {
                bid_collection_period: Duration::from_secs(10),
                reserve_bps: 5_000,
            })),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn opens_round_for_valid_opportunity() {
        let intake = intake();
        let submitted = intake
            .submit(opportunity("development", b"vault-1"))
            .await
            .unwrap();

        assert!(!submitted.coalesced);
        let listed = intake.opportunities(None).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, submitted.id);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_resubmission_returns_existing_id() {
        let intake = intake();
        let first = intake
            .submit(opportunity("development", b"vault-1"))
            .await
            .unwrap();
        let second = intake
            .submit(opportunity("development", b"vault-1"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.coalesced);
    }

    #[tokio::test(start_paused = true)]
    async fn different_opportunity_for_open_key_is_duplicate() {
        let intake = intake();
        intake
            .submit(opportunity("development", b"vault-1"))
            .await
            .unwrap();
        let mut other = opportunity("development", b"vault-1");
        other.buy_tokens[0].amount = U256::from(2000);

        assert!(matches!(
            intake.submit(other).await,
            Err(SubmitError::DuplicateKey(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_unsupported_chain() {
        let intake = intake();
        assert!(matches!(
            intake.submit(opportunity("mainnet", b"vault-1")).await,
            Err(SubmitError::UnsupportedChain(chain)) if chain.as_str() == "mainnet"
        ));
        assert!(intake.opportunities(None).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_invalid_opportunity() {
        let intake = intake();
        let mut invalid = opportunity("development", b"vault-1");
        invalid.sell_tokens[0].amount = U256::ZERO;

        assert!(matches!(
            intake.submit(invalid).await,
            Err(SubmitError::Validation(opportunity::Invalid::NonPositiveAmount(token)))
                if token == TOKEN_A
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn removed_opportunity_is_no_longer_listed() {
        let intake = intake();
        let withdrawn = opportunity("development", b"vault-1");
        let submitted = intake.submit(withdrawn.clone()).await.unwrap();
        intake
            .submit(opportunity("op_sepolia", b"vault-1"))
            .await
            .unwrap();

        let removed = intake
            .remove(&withdrawn.chain_id, &withdrawn.permission_key)
            .await
            .unwrap();
        assert_eq!(removed, submitted.id);

        let listed = intake.opportunities(None).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].1.chain_id.as_str(), "op_sepolia");
        assert!(
            intake
                .opportunities(Some(&eth::ChainId::from("development")))
                .await
                .is_empty()
        );
        assert!(
            intake
                .remove(&withdrawn.chain_id, &withdrawn.permission_key)
                .await
                .is_err()
        );
    }
}
