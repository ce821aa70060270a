use super::{AppState, blocking, required, respond};
use crate::{
    Result, search,
    types::{SnpsQuery, SnpsResponse},
};
use axum::{
    Json,
    extract::{RawQuery, State},
    response::Response,
};

pub async fn get_snps(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let query = SnpsQuery::from_query_string(query.as_deref().unwrap_or_default());
    let callback = query.callback.clone();
    respond(callback, lookup(state, query).await)
}

pub async fn post_snps(State(state): State<AppState>, Json(body): Json<SnpsQuery>) -> Response {
    let callback = body.callback.clone();
    respond(callback, lookup(state, body).await)
}

async fn lookup(state: AppState, query: SnpsQuery) -> Result<SnpsResponse> {
    let version = required(query.version, "version")?;
    let species = required(query.species, "species")?;
    let ids = query.ids;

    let result =
        blocking(move || search::by_ids(&state.catalog, &ids, &version, &species)).await?;
    Ok(SnpsResponse::from(result))
}
