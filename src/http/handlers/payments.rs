use crate::domain::order::PaymentMethod;
use crate::domain::payment::{CheckoutRequest, CheckoutResponse, OrderView};
use crate::error::PaymentError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

pub async fn create_payment(
    State(state): State<AppState>,
    Path(method): Path<String>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, PaymentError> {
    let method: PaymentMethod = method
        .parse()
        .map_err(|_| PaymentError::Validation(format!("Invalid payment method: {method}")))?;
    let resp = state.payment_service.create_payment(method, req).await?;
    Ok(Json(resp))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, PaymentError> {
    let order = state.ledger.get_order(order_id).await?;
    Ok(Json(order.into()))
}

pub async fn health() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "ok")
}
