use super::{AppState, blocking, required, respond};
use crate::{
    Result, search,
    types::{RegionQuery, RegionResponse},
};
use axum::{
    Json,
    extract::{Query, State},
    response::Response,
};

pub async fn get_region(State(state): State<AppState>, Query(query): Query<RegionQuery>) -> Response {
    let callback = query.callback.clone();
    respond(callback, region(state, query).await)
}

pub async fn post_region(State(state): State<AppState>, Json(body): Json<RegionQuery>) -> Response {
    let callback = body.callback.clone();
    respond(callback, region(state, body).await)
}

async fn region(state: AppState, query: RegionQuery) -> Result<RegionResponse> {
    let limit = query.effective_limit();
    let version = required(query.version, "version")?;
    let species = required(query.species, "species")?;
    let region = query.region.unwrap_or_default();

    let snps = blocking(move || {
        search::by_region(&state.catalog, &region, &version, &species, limit)
    })
    .await?;
    Ok(RegionResponse::from(snps))
}
