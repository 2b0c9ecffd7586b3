use {
    crate::{
        domain::{eth, intake::SubmitError},
        infra::api::{State, error},
    },
    axum::{
        Json,
        extract::{Query, rejection::JsonRejection},
        http::StatusCode,
    },
    tracing::Instrument,
};

mod dto;

pub(in crate::infra::api) fn opportunities(
    router: axum::Router<State>,
) -> axum::Router<State> {
    router.route(
        "/opportunities",
        axum::routing::post(submit).get(list).delete(remove),
    )
}

async fn submit(
    state: axum::extract::State<State>,
    opportunity: Result<Json<dto::NewOpportunity>, JsonRejection>,
) -> Result<(StatusCode, Json<dto::OpportunityId>), error::Response> {
    let handle_request = async {
        let Json(opportunity) = opportunity.map_err(error::malformed)?;
        let opportunity = opportunity
            .into_domain()
            .map_err(SubmitError::Validation)?;
        let submitted = state.relay().submit(opportunity).await?;
        Ok::<_, error::Response>((
            StatusCode::CREATED,
            Json(dto::OpportunityId::new(submitted.id)),
        ))
    };

    handle_request
        .instrument(tracing::info_span!("/opportunities"))
        .await
}

async fn list(
    state: axum::extract::State<State>,
    filter: Query<dto::Filter>,
) -> Json<Vec<dto::Listed>> {
    let chain_id = filter.0.chain_id.map(eth::ChainId::from);
    let opportunities = state.relay().opportunities(chain_id.as_ref()).await;
    Json(
        opportunities
            .iter()
            .map(|(id, opportunity)| dto::Listed::new(*id, opportunity))
            .collect(),
    )
}

async fn remove(
    state: axum::extract::State<State>,
    removal: Result<Json<dto::Removal>, JsonRejection>,
) -> Result<Json<dto::OpportunityId>, error::Response> {
    let Json(removal) = removal.map_err(error::malformed)?;
    let permission_key =
        eth::PermissionKey::new(removal.permission_key).map_err(error::malformed)?;
    let id = state
        .relay()
        .remove(&removal.chain_id.into(), &permission_key)
        .await?;
    Ok(Json(dto::OpportunityId::new(id)))
}
