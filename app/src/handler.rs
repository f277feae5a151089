use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    models::{CommonSymbol, Exchange, ExchangeStats, LatestPrice, PriceComparison},
    Error as CommonError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use store::{PriceStore, StoreError};
use tracing::error;

pub type SharedStore = Arc<PriceStore>;

// Wrapper so common::Error can become an HTTP response
#[derive(Debug)]
pub struct ApiError(CommonError);

impl From<CommonError> for ApiError {
    fn from(err: CommonError) -> Self {
        ApiError(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CommonError::ExchangeError(_) | CommonError::HttpError(_) => StatusCode::BAD_GATEWAY,
            CommonError::ParseError(_) => StatusCode::BAD_REQUEST,
            CommonError::DbError(_) | CommonError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DifferencesQuery {
    pub limit: Option<usize>,
    pub all: Option<bool>,
}

// Largest differences, latest cycle unless all=true
pub async fn top_differences(
    State(store): State<SharedStore>,
    Query(query): Query<DifferencesQuery>,
) -> Result<Json<Vec<PriceComparison>>, ApiError> {
    let limit = query.limit.unwrap_or(10);
    let rows = if query.all.unwrap_or(false) {
        store.get_top_differences_all_time(limit).await?
    } else {
        store.get_top_differences(limit).await?
    };
    Ok(Json(rows))
}

pub async fn exchange_stats(
    State(store): State<SharedStore>,
) -> Result<Json<BTreeMap<Exchange, ExchangeStats>>, ApiError> {
    Ok(Json(store.get_exchange_stats().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct PricesQuery {
    pub exchange: Option<String>,
}

pub async fn latest_prices(
    State(store): State<SharedStore>,
    Query(query): Query<PricesQuery>,
) -> Result<Json<Vec<LatestPrice>>, ApiError> {
    let exchange = query
        .exchange
        .as_deref()
        .map(str::parse::<Exchange>)
        .transpose()?;
    Ok(Json(store.get_latest_prices(exchange).await?))
}

pub async fn common_symbols(
    State(store): State<SharedStore>,
) -> Result<Json<Vec<CommonSymbol>>, ApiError> {
    Ok(Json(store.get_common_symbols().await?))
}
