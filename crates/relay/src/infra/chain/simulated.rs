//! An in-process chain. Protocol contracts are plain Rust values implementing
//! [`Contract`]; every successful transaction is appended to a journal that
//! can be inspected afterwards.

use {
    super::{Chain, Error, Receipt},
    crate::domain::{
        auction::Bundle,
        eth::{self, Address, Bytes, U256},
        permission::Permission,
    },
    std::{
        collections::HashMap,
        sync::{
            Arc,
            Mutex,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    },
};

/// A protocol contract deployed on the simulated chain.
pub trait Contract: Send + Sync {
    /// The opportunity's target call.
    fn call(&self, call: &Call, permission: &Permission) -> Result<(), Revert>;

    /// The fee receiver callback paying the protocol's share of a bid.
    fn receive_auction_proceedings(
        &self,
        permission_key: &eth::PermissionKey,
        amount: U256,
        permission: &Permission,
    ) -> Result<(), Revert>;
}

#[derive(Debug, Clone)]
pub struct Call {
    /// The searcher whose bid won the auction.
    pub searcher: Address,
    pub calldata: Bytes,
    pub value: U256,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct Revert(pub String);

/// A protocol that only accepts calls while the relay holds a permission for
/// it. The calldata of the target call is the permission id it checks.
#[derive(Debug, Clone, Copy)]
pub struct Protocol {
    pub address: Address,
}

impl Contract for Protocol {
    fn call(&self, call: &Call, permission: &Permission) -> Result<(), Revert> {
        if !permission.is_permissioned(self.address, &call.calldata) {
            return Err(Revert("not permissioned".into()));
        }
        Ok(())
    }

    fn receive_auction_proceedings(
        &self,
        permission_key: &eth::PermissionKey,
        _: U256,
        permission: &Permission,
    ) -> Result<(), Revert> {
        if permission_key.receiver() != self.address
            || !permission.is_permissioned(self.address, permission_key.permission_id())
        {
            return Err(Revert("proceeds outside of the relay's execution".into()));
        }
        Ok(())
    }
}

/// Successful transactions recorded by the simulated chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Executed {
        tx_hash: eth::TxHash,
        target: Address,
        searcher: Address,
        bid_amount: U256,
    },
    ProceedsPaid {
        receiver: Address,
        permission_key: eth::PermissionKey,
        amount: U256,
    },
}

#[derive(Clone)]
pub struct Simulated(Arc<Inner>);

struct Inner {
    contracts: HashMap<Address, Arc<dyn Contract>>,
    /// Time every transaction takes to be included.
    latency: Duration,
    journal: Mutex<Vec<Event>>,
    nonce: AtomicU64,
}

impl Simulated {
    pub fn new(
        latency: Duration,
        contracts: impl IntoIterator<Item = (Address, Arc<dyn Contract>)>,
    ) -> Self {
        Self(Arc::new(Inner {
            contracts: contracts.into_iter().collect(),
            latency,
            journal: Default::default(),
            nonce: Default::default(),
        }))
    }

    /// A chain with a [`Protocol`] contract deployed at each of the addresses.
    pub fn with_protocols(latency: Duration, protocols: impl IntoIterator<Item = Address>) -> Self {
        Self::new(
            latency,
            protocols.into_iter().map(|address| {
                (
                    address,
                    Arc::new(Protocol { address }) as Arc<dyn Contract>,
                )
            }),
        )
    }

    pub fn journal(&self) -> Vec<Event> {
        self.0.journal.lock().unwrap().clone()
    }

    fn contract(&self, address: Address) -> Result<&Arc<dyn Contract>, Error> {
        self.0
            .contracts
            .get(&address)
            .ok_or_else(|| Error::Reverted(format!("no contract deployed at {address}")))
    }

    /// Lands the events of one transaction together.
    fn commit(&self, events: impl IntoIterator<Item = Event>) {
        self.0.journal.lock().unwrap().extend(events);
    }

    async fn include(&self) {
        if !self.0.latency.is_zero() {
            tokio::time::sleep(self.0.latency).await;
        }
    }

    fn tx_hash(&self, bundle: &Bundle) -> eth::TxHash {
        let nonce = self.0.nonce.fetch_add(1, Ordering::Relaxed);
        let mut data = nonce.to_be_bytes().to_vec();
        data.extend_from_slice(bundle.target_contract.as_slice());
        data.extend_from_slice(&bundle.target_calldata);
        data.extend_from_slice(bundle.searcher.as_slice());
        data.extend_from_slice(&bundle.execution_payload);
        eth::TxHash(eth::keccak256(data))
    }
}

impl std::fmt::Debug for Simulated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulated")
            .field("contracts", &self.0.contracts.keys().collect::<Vec<_>>())
            .field("latency", &self.0.latency)
            .finish()
    }
}

#[async_trait::async_trait]
impl Chain for Simulated {
    async fn execute(
        &self,
        bundle: &Bundle,
        proceeds: U256,
        permission: &Permission,
    ) -> Result<Receipt, Error> {
        self.include().await;
        let receiver = bundle.permission_key.receiver();
        let call = Call {
            searcher: bundle.searcher,
            calldata: bundle.target_calldata.clone(),
            value: bundle.target_call_value,
        };
        // Contracts only check, they keep no state. Reverting is therefore
        // just not committing the transaction's events.
        self.contract(bundle.target_contract)?
            .call(&call, permission)
            .map_err(|revert| Error::Reverted(revert.0))?;
        self.contract(receiver)?
            .receive_auction_proceedings(&bundle.permission_key, proceeds, permission)
            .map_err(|revert| Error::Reverted(revert.0))?;

        let tx_hash = self.tx_hash(bundle);
        self.commit([
            Event::Executed {
                tx_hash,
                target: bundle.target_contract,
                searcher: bundle.searcher,
                bid_amount: bundle.bid_amount,
            },
            Event::ProceedsPaid {
                receiver,
                permission_key: bundle.permission_key.clone(),
                amount: proceeds,
            },
        ]);
        Ok(Receipt { tx_hash })
    }
}
