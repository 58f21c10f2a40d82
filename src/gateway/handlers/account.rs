//! Account handlers: open, balance inquiry, transfer history

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use super::super::state::AppState;
use super::super::types::{
    AccountData, ApiResult, OpenAccountRequest, TransferRecordData, created, ok,
};
use crate::core_types::AccountId;

/// POST /api/v1/accounts
pub async fn open_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OpenAccountRequest>,
) -> ApiResult<AccountData> {
    let (currency, balance) = req.parse(state.amount_decimals)?;
    let account = state.engine.open_account(currency, balance).await?;
    created(AccountData::from_account(&account, state.amount_decimals))
}

/// GET /api/v1/accounts/{id}
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<AccountData> {
    let account = state.engine.account(AccountId::new(id)).await?;
    ok(AccountData::from_account(&account, state.amount_decimals))
}

/// GET /api/v1/accounts/{id}/transfers
pub async fn get_account_transfers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Vec<TransferRecordData>> {
    let records = state.engine.transfers(AccountId::new(id)).await?;
    ok(records
        .iter()
        .map(|r| TransferRecordData::from_record(r, state.amount_decimals))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::error_codes;
    use crate::transfer::TransferEngine;
    use axum::http::StatusCode;
    use std::time::Duration;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(
            TransferEngine::in_memory(Duration::from_millis(100)),
            None,
            2,
        ))
    }

    #[tokio::test]
    async fn test_open_and_get_account() {
        let state = state();
        let (status, Json(body)) = open_account(
            State(state.clone()),
            Json(OpenAccountRequest {
                currency: "EUR".into(),
                balance: "100.50".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let opened = body.data.unwrap();
        assert_eq!(opened.balance, "100.50");

        let (_, Json(body)) = get_account(State(state), Path(opened.account_id))
            .await
            .unwrap();
        assert_eq!(body.data.unwrap(), opened);
    }

    #[tokio::test]
    async fn test_unknown_account_is_404() {
        let err = get_account(State(state()), Path(77)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, error_codes::ACCOUNT_NOT_FOUND);

        let err = get_account_transfers(State(state()), Path(77))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_open_account_rejects_bad_input() {
        let err = open_account(
            State(state()),
            Json(OpenAccountRequest {
                currency: "EURO".into(),
                balance: "1".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
