use {
    crate::{
        domain::opportunity,
        infra::api::{State, error},
    },
    axum::{
        Json,
        extract::{Path, rejection::PathRejection},
    },
};

mod dto;

pub(in crate::infra::api) fn rounds(router: axum::Router<State>) -> axum::Router<State> {
    router
        .route("/opportunities/{id}", axum::routing::get(round))
        .route("/opportunities/{id}/close", axum::routing::post(close))
}

async fn round(
    state: axum::extract::State<State>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<dto::Round>, error::Response> {
    let Path(id) = id.map_err(error::malformed)?;
    let view = state.relay().round(opportunity::Id(id)).await?;
    Ok(Json(dto::Round::new(&view)))
}

/// Closes the round right away. Settles the winner before responding if this
/// request decided the round.
async fn close(
    state: axum::extract::State<State>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<dto::Round>, error::Response> {
    let Path(id) = id.map_err(error::malformed)?;
    let id = opportunity::Id(id);
    state.relay().close(id).await?;
    let view = state.relay().round(id).await?;
    Ok(Json(dto::Round::new(&view)))
}
