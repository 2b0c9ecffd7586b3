//! Forwards transactions to an external submitter over HTTP. The submitter is
//! responsible for signing and broadcasting one transaction that runs the
//! bundle and pays the protocol; the relay only hands it the bundle while the
//! grant for the bundle's permission key is open.

use {
    super::{Chain, Error, Receipt},
    crate::domain::{
        auction::Bundle,
        eth::{self, Address, Bytes, U256},
        permission::Permission,
    },
    anyhow::Context,
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    serde_with::{DisplayFromStr, serde_as},
    std::time::Duration,
    url::Url,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Remote {
    client: reqwest::Client,
    config: Config,
}

impl Remote {
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let client = reqwest::ClientBuilder::new()
            .timeout(config.timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { client, config })
    }

    async fn post<T, R>(&self, path: &str, body: &T) -> Result<R, Error>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.config.url.join(path).context("invalid submitter url")?;
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .with_context(|| format!("send request to {url}"))?
            .error_for_status()
            .with_context(|| format!("submitter at {url} rejected request"))?;
        let response: dto::Response<R> = response
            .json()
            .await
            .with_context(|| format!("decode response of {url}"))?;
        match response {
            dto::Response::Success(inner) => Ok(inner),
            dto::Response::Reverted { reason } => Err(Error::Reverted(reason)),
        }
    }
}

/// The submitter cannot see the relay's grants, so every call makes sure the
/// grant is still open before the transaction leaves the process.
fn ensure_active(permission: &Permission) -> Result<(), Error> {
    if !permission.is_active() {
        return Err(Error::Reverted("permission grant is closed".into()));
    }
    Ok(())
}

#[async_trait::async_trait]
impl Chain for Remote {
    async fn execute(
        &self,
        bundle: &Bundle,
        proceeds: U256,
        permission: &Permission,
    ) -> Result<Receipt, Error> {
        ensure_active(permission)?;
        let executed: dto::Executed = self
            .post("execute", &dto::Execute::new(bundle, proceeds))
            .await?;
        Ok(Receipt {
            tx_hash: eth::TxHash(executed.tx_hash),
        })
    }
}

mod dto {
    use super::*;

    /// One transaction running the target call, the searcher's payload and
    /// the `receiveAuctionProceedings` callback paying `proceeds` to the fee
    /// receiver.
    #[serde_as]
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Execute {
        chain_id: String,
        permission_key: Bytes,
        target_contract: Address,
        target_calldata: Bytes,
        #[serde_as(as = "DisplayFromStr")]
        target_call_value: U256,
        searcher: Address,
        #[serde_as(as = "DisplayFromStr")]
        bid_amount: U256,
        execution_payload: Bytes,
        fee_receiver: Address,
        #[serde_as(as = "DisplayFromStr")]
        proceeds: U256,
    }

    impl Execute {
        pub fn new(bundle: &Bundle, proceeds: U256) -> Self {
            Self {
                chain_id: bundle.chain_id.to_string(),
                permission_key: bundle.permission_key.as_bytes().clone(),
                target_contract: bundle.target_contract,
                target_calldata: bundle.target_calldata.clone(),
                target_call_value: bundle.target_call_value,
                searcher: bundle.searcher,
                bid_amount: bundle.bid_amount,
                execution_payload: bundle.execution_payload.clone(),
                fee_receiver: bundle.permission_key.receiver(),
                proceeds,
            }
        }
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Executed {
        pub tx_hash: eth::B256,
    }

    #[derive(Debug, Deserialize)]
    #[serde(tag = "status", rename_all = "camelCase")]
    pub enum Response<T> {
        Success(T),
        Reverted { reason: String },
    }

}
