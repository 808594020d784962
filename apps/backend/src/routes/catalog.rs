//! Catalog browsing and redemption endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::services::redemption;
use crate::AppState;

/// GET /api/catalog/categories
pub async fn categories(State(state): State<AppState>) -> Result<Json<CategoryListResponse>> {
    let categories = state.db.list_categories(true).await?;
    Ok(Json(CategoryListResponse { categories }))
}

/// GET /api/catalog/products
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductListResponse>> {
    let products = state.db.list_products(query.category_id, true).await?;
    Ok(Json(ProductListResponse { products }))
}

/// POST /api/exchanges
/// Redeems a product for points
pub async fn redeem(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<RedeemRequest>,
) -> Result<(StatusCode, Json<RedeemResponse>)> {
    let response = redemption::redeem(
        &state.db,
        auth.user_id,
        payload.product_id,
        payload.quantity,
        state.clock.now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/exchanges
pub async fn list_exchanges(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<ExchangeListQuery>,
) -> Result<Json<ExchangeListResponse>> {
    let status = parse_status(query.status.as_deref())?;
    let exchanges = state.db.list_exchanges(Some(auth.user_id), status).await?;
    Ok(Json(ExchangeListResponse { exchanges }))
}

/// Parse an optional `status` query parameter
pub fn parse_status(status: Option<&str>) -> Result<Option<ExchangeStatus>> {
    status
        .map(|s| {
            ExchangeStatus::from_str(s)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown exchange status: {}", s)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_parses_known_values() {
        assert_eq!(parse_status(None).unwrap(), None);
        assert_eq!(
            parse_status(Some("pending")).unwrap(),
            Some(ExchangeStatus::Pending)
        );
        assert!(parse_status(Some("shipped")).is_err());
    }
}
