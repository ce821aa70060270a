use super::{AppState, blocking, required, respond};
use crate::{
    Result, search,
    types::{MetaInfo, StoreQuery, VersionsResponse},
};
use axum::{
    extract::{Query, State},
    response::Response,
};

/// Every catalogued store with its metadata, newest version first.
pub async fn get_versions(State(state): State<AppState>, Query(query): Query<StoreQuery>) -> Response {
    let result = blocking(move || search::versions(&state.catalog))
        .await
        .map(|versions| VersionsResponse { versions });
    respond(query.callback, result)
}

pub async fn get_meta(State(state): State<AppState>, Query(query): Query<StoreQuery>) -> Response {
    let callback = query.callback.clone();
    respond(callback, meta(state, query).await)
}

async fn meta(state: AppState, query: StoreQuery) -> Result<MetaInfo> {
    let version = required(query.version, "version")?;
    let species = required(query.species, "species")?;
    blocking(move || search::meta(&state.catalog, &version, &species)).await
}
