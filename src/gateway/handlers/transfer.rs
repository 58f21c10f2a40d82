//! Transfer handler

use std::sync::Arc;

use axum::{Json, extract::State};

use super::super::state::AppState;
use super::super::types::{ApiResult, CreateTransferRequest, TransferData, ok};

/// POST /api/v1/transfers
///
/// Replaying a request with the same `idempotency_key` returns the original
/// outcome; reusing the key for a different transfer is a 409.
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTransferRequest>,
) -> ApiResult<TransferData> {
    let request = req.into_request(state.amount_decimals)?;
    tracing::debug!(
        key = %request.idempotency_key,
        source = %request.source,
        destination = %request.destination,
        amount = request.amount,
        "Transfer request received"
    );

    let result = state.engine.execute(request).await?;
    ok(TransferData::from_result(&result, state.amount_decimals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Currency;
    use crate::gateway::types::error_codes;
    use crate::transfer::TransferEngine;
    use axum::http::StatusCode;
    use std::time::Duration;

    async fn setup() -> (Arc<AppState>, u64, u64) {
        let engine = TransferEngine::in_memory(Duration::from_millis(100));
        let eur = Currency::new("EUR").unwrap();
        let a = engine.open_account(eur.clone(), 10_000).await.unwrap().id;
        let b = engine.open_account(eur, 5_000).await.unwrap().id;
        (Arc::new(AppState::new(engine, None, 2)), a.get(), b.get())
    }

    fn body(key: &str, from: u64, to: u64, amount: &str) -> CreateTransferRequest {
        CreateTransferRequest {
            idempotency_key: Some(key.to_string()),
            from_account: from,
            to_account: to,
            amount: amount.to_string(),
            currency: "EUR".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_transfer() {
        let (state, a, b) = setup().await;
        let (status, Json(resp)) = create_transfer(State(state), Json(body("t-1", a, b, "30")))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        let data = resp.data.unwrap();
        assert_eq!(data.status, "COMPLETED");
        assert_eq!(data.amount, "30.00");
        assert_eq!(data.from_balance, "70.00");
        assert_eq!(data.to_balance, "80.00");
    }

    #[tokio::test]
    async fn test_replay_returns_same_body() {
        let (state, a, b) = setup().await;
        let (_, Json(first)) = create_transfer(State(state.clone()), Json(body("t-1", a, b, "5")))
            .await
            .unwrap();
        let (_, Json(second)) = create_transfer(State(state.clone()), Json(body("t-1", a, b, "5")))
            .await
            .unwrap();
        assert_eq!(first.data, second.data);

        let err = create_transfer(State(state), Json(body("t-1", a, b, "6")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, error_codes::DUPLICATE_REQUEST);
    }

    #[tokio::test]
    async fn test_insufficient_funds_is_422() {
        let (state, a, b) = setup().await;
        let err = create_transfer(State(state), Json(body("t-1", a, b, "1000")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, error_codes::INSUFFICIENT_FUNDS);
    }

    #[tokio::test]
    async fn test_self_transfer_is_400() {
        let (state, a, _) = setup().await;
        let err = create_transfer(State(state), Json(body("t-1", a, a, "1")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, error_codes::INVALID_PARAMETER);
    }
}
