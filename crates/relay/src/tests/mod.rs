//! Tests exercising the HTTP API of a relay backed by a simulated chain.

use {
    crate::{
        domain::{
            Relay,
            auction,
            eth,
            opportunity::{
                self,
                tests::{PROTOCOL, TOKEN_A, TOKEN_B},
            },
            permission,
            settlement::{self, Dispatcher, Network},
        },
        infra::{
            Api,
            chain::{self, simulated::Event},
        },
    },
    alloy::primitives::{U256, address},
    maplit::{hashmap, hashset},
    reqwest::StatusCode,
    serde_json::{Value, json},
    std::{net::SocketAddr, sync::Arc, time::Duration},
    tokio::sync::oneshot,
};

const ALICE: eth::Address = address!("00000000000000000000000000000000000000a1");
const BOB: eth::Address = address!("00000000000000000000000000000000000000b0");

/// A relay serving on a random local port.
struct Setup {
    url: String,
    client: reqwest::Client,
    chain: chain::Simulated,
    relay: Relay,
}

impl Setup {
    async fn new() -> Self {
        observe::tracing::initialize_reentrant(&observe::Config::new(
            "warn,relay=debug",
            None,
            false,
        ));
        let chain = chain::Simulated::with_protocols(Duration::ZERO, [PROTOCOL]);
        let dispatcher = Dispatcher::new(
            settlement::Config {
                timeout: Duration::from_secs(5),
                protocol_share_bps: 8_000,
            },
            hashmap! {
                eth::ChainId::from("development") => Network {
                    registry: permission::Registry::default(),
                    chain: Arc::new(chain.clone()),
                },
            },
        );
        // Rounds are closed explicitly, the deadline never passes during a
        // test.
        let relay = Relay::new(
            auction::Config {
                bid_collection_period: Duration::from_secs(3600),
                reserve_bps: 5_000,
            },
            hashset! { opportunity::Version::from("v1") },
            dispatcher,
        );

        let (addr_sender, addr_receiver) = oneshot::channel::<SocketAddr>();
        let api = Api {
            relay: relay.clone(),
            addr: "127.0.0.1:0".parse().unwrap(),
            addr_sender: Some(addr_sender),
        };
        tokio::spawn(api.serve(futures::future::pending()));
        let addr = addr_receiver.await.unwrap();

        Self {
            url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            chain,
            relay,
        }
    }

    async fn post(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}{path}", self.url))
            .json(body)
            .send()
            .await
            .unwrap();
        (response.status(), response.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(format!("{}{path}", self.url))
            .send()
            .await
            .unwrap();
        (response.status(), response.json().await.unwrap())
    }

    async fn delete(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let response = self
            .client
            .delete(format!("{}{path}", self.url))
            .json(body)
            .send()
            .await
            .unwrap();
        (response.status(), response.json().await.unwrap())
    }

    /// Submits an opportunity and returns its id.
    async fn submit(&self, opportunity: &Value) -> u64 {
        let (status, body) = self.post("/v1/opportunities", opportunity).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["opportunity_id"].as_u64().unwrap()
    }

    async fn bid(&self, id: u64, searcher: eth::Address, amount: u64) -> (StatusCode, Value) {
        self.post(
            &format!("/v1/opportunities/{id}/bids"),
            &json!({
                "searcher": searcher,
                "amount": amount.to_string(),
            }),
        )
        .await
    }
}

fn permission_key(permission_id: &[u8]) -> String {
    eth::PermissionKey::from_parts(PROTOCOL, permission_id)
        .as_bytes()
        .to_string()
}

/// An opportunity selling 900 of token A for 1000 of token B. The simulated
/// protocol accepts its target call while the relay holds the permission.
fn liquidation(permission_id: &[u8]) -> Value {
    json!({
        "target_calldata": eth::Bytes::copy_from_slice(permission_id),
        "chain_id": "development",
        "target_contract": PROTOCOL,
        "permission_key": permission_key(permission_id),
        "target_call_value": "0",
        "sell_tokens": [{ "token": TOKEN_A, "amount": "900" }],
        "buy_tokens": [{ "token": TOKEN_B, "amount": "1000" }],
        "version": "v1",
    })
}

#[tokio::test]
async fn highest_bid_wins_and_is_settled() {
    let setup = Setup::new().await;
    let id = setup.submit(&liquidation(b"vault-1")).await;

    let (status, listed) = setup.get("/v1/opportunities?chain_id=development").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["opportunity_id"], id);
    assert_eq!(listed[0]["sell_tokens"][0]["amount"], "900");

    let (status, accepted) = setup.bid(id, ALICE, 950).await;
    assert_eq!(status, StatusCode::OK, "{accepted}");
    assert_eq!(accepted["amount"], "950");
    let (status, _) = setup.bid(id, BOB, 1000).await;
    assert_eq!(status, StatusCode::OK);

    let (status, round) = setup.get(&format!("/v1/opportunities/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(round["status"], "open");
    assert_eq!(round["bids"], 2);
    assert_eq!(round["reserve"], "50");

    let (status, round) = setup
        .post(&format!("/v1/opportunities/{id}/close"), &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{round}");
    assert_eq!(round["status"], "closed");
    assert_eq!(round["winner"]["searcher"], json!(BOB));
    assert_eq!(round["winner"]["amount"], "1000");
    assert_eq!(round["settlement"]["status"], "settled");
    assert_eq!(round["settlement"]["protocol_proceeds"], "800");
    assert_eq!(round["settlement"]["relayer_fee"], "200");

    let permission_key = eth::PermissionKey::from_parts(PROTOCOL, b"vault-1");
    assert!(setup.chain.journal().contains(&Event::ProceedsPaid {
        receiver: PROTOCOL,
        permission_key,
        amount: U256::from(800),
    }));
    let registry = setup.relay.permissions(&"development".into()).unwrap();
    assert!(!registry.is_permissioned(PROTOCOL, b"vault-1"));

    let (_, listed) = setup.get("/v1/opportunities").await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn round_without_bids_has_no_winner() {
    let setup = Setup::new().await;
    let id = setup.submit(&liquidation(b"vault-1")).await;

    let (status, round) = setup
        .post(&format!("/v1/opportunities/{id}/close"), &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(round["status"], "closed");
    assert_eq!(round["winner"], Value::Null);
    assert_eq!(round["settlement"], Value::Null);
    assert!(setup.chain.journal().is_empty());
}

#[tokio::test]
async fn reverting_target_fails_settlement() {
    let setup = Setup::new().await;
    let mut opportunity = liquidation(b"vault-1");
    opportunity["target_calldata"] = json!("0x1234");
    let id = setup.submit(&opportunity).await;
    setup.bid(id, ALICE, 950).await;

    let (_, round) = setup
        .post(&format!("/v1/opportunities/{id}/close"), &json!({}))
        .await;
    assert_eq!(round["settlement"]["status"], "failed");
    assert_eq!(round["settlement"]["reason"], "reverted");
    assert!(setup.chain.journal().is_empty());
}

#[tokio::test]
async fn resubmission_is_coalesced_and_conflicts_are_rejected() {
    let setup = Setup::new().await;
    let opportunity = liquidation(b"vault-1");
    let id = setup.submit(&opportunity).await;
    assert_eq!(setup.submit(&opportunity).await, id);

    let mut conflicting = opportunity.clone();
    conflicting["buy_tokens"][0]["amount"] = json!("2000");
    let (status, body) = setup.post("/v1/opportunities", &conflicting).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "DuplicateKeyError");

    // A different permission key opens a round of its own.
    assert_ne!(setup.submit(&liquidation(b"vault-2")).await, id);
}

#[tokio::test]
async fn rejects_invalid_opportunities() {
    let setup = Setup::new().await;

    let mut unsupported_version = liquidation(b"vault-1");
    unsupported_version["version"] = json!("v2");
    let mut zero_amount = liquidation(b"vault-1");
    zero_amount["sell_tokens"][0]["amount"] = json!("0");
    let mut short_key = liquidation(b"vault-1");
    short_key["permission_key"] = json!("0x1234");
    let mut unknown_field = liquidation(b"vault-1");
    unknown_field["deadline"] = json!(42);
    for opportunity in [unsupported_version, zero_amount, short_key, unknown_field] {
        let (status, body) = setup.post("/v1/opportunities", &opportunity).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{opportunity}");
        assert_eq!(body["errorType"], "ValidationError", "{opportunity}");
    }

    let mut unsupported_chain = liquidation(b"vault-1");
    unsupported_chain["chain_id"] = json!("mainnet");
    let (status, body) = setup.post("/v1/opportunities", &unsupported_chain).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "UnsupportedChainError");

    let (_, listed) = setup.get("/v1/opportunities").await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn rejects_invalid_bids() {
    let setup = Setup::new().await;
    let id = setup.submit(&liquidation(b"vault-1")).await;

    let (status, body) = setup.bid(id, ALICE, 10).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "InsufficientBidError");

    let (status, body) = setup.bid(id, ALICE, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "ValidationError");

    let (status, body) = setup
        .post(
            &format!("/v1/opportunities/{id}/bids"),
            &json!({ "searcher": ALICE, "amount": "-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "ValidationError");

    let (status, body) = setup.bid(id + 100, ALICE, 950).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorType"], "OpportunityNotFound");

    setup
        .post(&format!("/v1/opportunities/{id}/close"), &json!({}))
        .await;
    let (status, body) = setup.bid(id, ALICE, 950).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "LateBidError");
}

#[tokio::test]
async fn unknown_round_is_not_found() {
    let setup = Setup::new().await;
    let (status, body) = setup.get("/v1/opportunities/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorType"], "OpportunityNotFound");

    let (status, _) = setup
        .post("/v1/opportunities/42/close", &json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_round_id_is_a_validation_error() {
    let setup = Setup::new().await;

    let (status, body) = setup.get("/v1/opportunities/vault-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "ValidationError");

    let (status, body) = setup
        .post("/v1/opportunities/vault-1/close", &json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "ValidationError");

    let (status, body) = setup
        .post(
            "/v1/opportunities/-1/bids",
            &json!({ "searcher": ALICE, "amount": "950" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "ValidationError");
}

#[tokio::test]
async fn removed_opportunity_expires() {
    let setup = Setup::new().await;
    let id = setup.submit(&liquidation(b"vault-1")).await;
    setup.bid(id, ALICE, 950).await;

    let removal = json!({
        "chain_id": "development",
        "permission_key": permission_key(b"vault-1"),
    });
    let (status, body) = setup.delete("/v1/opportunities", &removal).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["opportunity_id"], id);

    let (_, round) = setup.get(&format!("/v1/opportunities/{id}")).await;
    assert_eq!(round["status"], "expired");
    assert_eq!(round["winner"], Value::Null);
    assert!(setup.chain.journal().is_empty());

    let (status, body) = setup.delete("/v1/opportunities", &removal).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorType"], "OpportunityNotFound");

    // The key is free for a new round.
    assert_ne!(setup.submit(&liquidation(b"vault-1")).await, id);
}

#[tokio::test]
async fn serves_health_and_metrics() {
    let setup = Setup::new().await;
    setup.submit(&liquidation(b"vault-1")).await;

    let response = reqwest::get(format!("{}/healthz", setup.url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let metrics = reqwest::get(format!("{}/metrics", setup.url))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("opportunities"), "{metrics}");
}
