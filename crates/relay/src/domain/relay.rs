use {
    crate::{
        domain::{
            auction::{self, Bid, Closed, Engine, NewBid, Winner},
            eth,
            intake::{Intake, SubmitError, Submitted},
            opportunity::{self, Opportunity},
            permission,
            settlement::Dispatcher,
        },
        infra::observe,
    },
    std::{collections::HashSet, sync::Arc, time::Duration},
    tracing::Instrument,
};

/// The auction service: accepts opportunities, runs their rounds and settles
/// the winners.
#[derive(Debug, Clone)]
pub struct Relay(Arc<Inner>);

#[derive(Debug)]
struct Inner {
    intake: Intake,
    engine: Arc<Engine>,
    dispatcher: Dispatcher,
}

impl Relay {
    pub fn new(
        auction: auction::Config,
        versions: HashSet<opportunity::Version>,
        dispatcher: Dispatcher,
    ) -> Self {
        let engine = Arc::new(Engine::new(auction));
        let chains = dispatcher.chains().cloned().collect();
        Self(Arc::new(Inner {
            intake: Intake::new(chains, versions, engine.clone()),
            engine,
            dispatcher,
        }))
    }

    /// Submits an opportunity. A newly opened round is closed automatically
    /// once its bid collection period is over.
    pub async fn submit(&self, opportunity: Opportunity) -> Result<Submitted, SubmitError> {
        let submitted = self.0.intake.submit(opportunity).await?;
        if !submitted.coalesced {
            self.close_at_deadline(submitted);
        }
        Ok(submitted)
    }

    fn close_at_deadline(&self, submitted: Submitted) {
        let relay = self.clone();
        let id = submitted.id;
        tokio::spawn(
            async move {
                tokio::time::sleep_until(submitted.deadline).await;
                if let Err(err) = relay.close(id).await {
                    // The round was pruned in the meantime.
                    tracing::debug!(?err, "round vanished before its deadline");
                }
            }
            .instrument(tracing::info_span!("round", %id)),
        );
    }

    pub async fn bid(
        &self,
        id: opportunity::Id,
        bid: NewBid,
    ) -> Result<Bid, auction::SubmitBidError> {
        self.0.engine.submit_bid(id, bid).await
    }

    /// Closes the round and settles its winner. Only the call that actually
    /// decides the round settles; every other call returns the recorded
    /// outcome right away.
    pub async fn close(&self, id: opportunity::Id) -> Result<Closed, auction::NotFound> {
        let (closed, transitioned) = self.0.engine.close_round(id).await?;
        if let (Closed::Winner(winner), true) = (&closed, transitioned) {
            // The settlement outlives the caller so its outcome is recorded
            // even if the caller goes away.
            let settlement = tokio::spawn(
                self.clone()
                    .settle(id, (**winner).clone())
                    .instrument(tracing::Span::current()),
            );
            if let Err(err) = settlement.await {
                tracing::error!(?err, %id, "settlement task failed");
            }
        }
        Ok(closed)
    }

    async fn settle(self, id: opportunity::Id, winner: Winner) {
        let outcome = self.0.dispatcher.settle(&winner).await;
        self.0.engine.record_settlement(id, outcome).await;
    }

    pub async fn remove(
        &self,
        chain_id: &eth::ChainId,
        permission_key: &eth::PermissionKey,
    ) -> Result<opportunity::Id, auction::NotFound> {
        self.0.intake.remove(chain_id, permission_key).await
    }

    pub async fn opportunities(
        &self,
        chain_id: Option<&eth::ChainId>,
    ) -> Vec<(opportunity::Id, Opportunity)> {
        self.0.intake.opportunities(chain_id).await
    }

    pub async fn round(&self, id: opportunity::Id) -> Result<auction::View, auction::NotFound> {
        self.0.engine.view(id).await
    }

    /// The permission registry of the chain.
    pub fn permissions(&self, chain_id: &eth::ChainId) -> Option<&permission::Registry> {
        self.0.dispatcher.registry(chain_id)
    }

    pub fn prune(&self, retention: Duration) {
        self.0.engine.prune(retention);
        observe::pruned();
    }
}
