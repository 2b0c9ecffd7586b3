use {
    crate::{
        domain::opportunity,
        infra::api::{State, error},
    },
    axum::{
        Json,
        extract::{
            Path,
            rejection::{JsonRejection, PathRejection},
        },
    },
};

mod dto;

pub(in crate::infra::api) fn bids(router: axum::Router<State>) -> axum::Router<State> {
    router.route("/opportunities/{id}/bids", axum::routing::post(route))
}

async fn route(
    state: axum::extract::State<State>,
    id: Result<Path<u64>, PathRejection>,
    bid: Result<Json<dto::NewBid>, JsonRejection>,
) -> Result<Json<dto::Accepted>, error::Response> {
    let Path(id) = id.map_err(error::malformed)?;
    let id = opportunity::Id(id);
    let Json(bid) = bid.map_err(error::malformed)?;
    let bid = state.relay().bid(id, bid.into_domain()).await?;
    Ok(Json(dto::Accepted::new(id, &bid)))
}
