use crate::domain::payment::WebhookAck;
use crate::error::PaymentError;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

/// Raw bytes are kept intact so signatures verify against what was sent.
pub async fn handle_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, PaymentError> {
    let ack = state
        .webhook_reconciler
        .handle_webhook(&provider, &body, &headers)
        .await?;
    Ok(Json(ack))
}
