//! capstan-bank — the demo banking API the controller deploys.
//!
//! Three routes over no persistent state: a welcome/health endpoint, a
//! balance read, and a withdrawal that can be made to fail on demand.
//! The failure flag is injected at startup and immutable for the life of
//! the process; flipping it means shipping a new revision, which is what
//! gives the release controller something to roll back.

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::{error, info};

/// Service state, fixed at startup.
#[derive(Debug, Clone)]
pub struct BankState {
    /// Simulate a database outage on withdrawals.
    pub fail_withdrawals: bool,
}

/// Build the bank API router.
pub fn router(state: BankState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/balance", get(balance))
        .route("/withdraw", get(withdraw))
        .with_state(state)
}

/// GET /
async fn home() -> Json<Value> {
    info!("home endpoint called");
    Json(json!({
        "message": "Welcome to Simple Bank API v1.0",
        "status": "healthy"
    }))
}

#[derive(Deserialize)]
struct BalanceQuery {
    account_id: Option<String>,
}

/// GET /balance?account_id=
async fn balance(Query(query): Query<BalanceQuery>) -> Json<Value> {
    let account_id = query.account_id.unwrap_or_else(default_account);
    let balance = stable_balance(&account_id);
    info!(account = %account_id, balance, "balance read");
    Json(json!({ "account_id": account_id, "balance": balance }))
}

#[derive(Deserialize)]
struct WithdrawQuery {
    account_id: Option<String>,
    amount: Option<u64>,
}

/// GET /withdraw?account_id=&amount=
async fn withdraw(
    State(state): State<BankState>,
    Query(query): Query<WithdrawQuery>,
) -> (StatusCode, Json<Value>) {
    let account_id = query.account_id.unwrap_or_else(default_account);

    if state.fail_withdrawals {
        error!(account = %account_id, "simulated database outage, rejecting withdrawal");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal Server Error: Cannot connect to database." })),
        );
    }

    let amount = query.amount.unwrap_or(50);
    info!(account = %account_id, amount, "withdrawal processed");
    (
        StatusCode::OK,
        Json(json!({
            "account_id": account_id,
            "withdrawn": amount,
            "status": "success"
        })),
    )
}

fn default_account() -> String {
    "default_account".to_string()
}

/// Stable balance in 100..=9999 derived from the account id, so repeated
/// reads of the same account agree without any stored state.
fn stable_balance(account_id: &str) -> u64 {
    let digest = Sha256::digest(account_id.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    100 + u64::from_be_bytes(prefix) % 9900
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn welcome_reports_healthy() {
        let body = home().await.0;
        assert_eq!(body["message"], "Welcome to Simple Bank API v1.0");
        assert_eq!(body["status"], "healthy");
    }

    #[test]
    fn balance_is_stable_and_in_range() {
        let first = stable_balance("alice");
        let second = stable_balance("alice");
        assert_eq!(first, second);
        assert!((100..=9999).contains(&first));
        assert!((100..=9999).contains(&stable_balance("bob")));
    }

    #[tokio::test]
    async fn balance_defaults_the_account() {
        let body = balance(Query(BalanceQuery { account_id: None })).await.0;
        assert_eq!(body["account_id"], "default_account");
        assert_eq!(body["balance"], stable_balance("default_account"));
    }

    #[tokio::test]
    async fn withdraw_succeeds_with_default_amount() {
        let state = BankState {
            fail_withdrawals: false,
        };
        let (status, body) = withdraw(
            State(state),
            Query(WithdrawQuery {
                account_id: Some("alice".to_string()),
                amount: None,
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0["withdrawn"], 50);
        assert_eq!(body.0["status"], "success");
    }

    #[tokio::test]
    async fn withdraw_fails_when_flag_is_on() {
        let state = BankState {
            fail_withdrawals: true,
        };
        let (status, body) = withdraw(
            State(state),
            Query(WithdrawQuery {
                account_id: None,
                amount: Some(25),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body.0["error"],
            "Internal Server Error: Cannot connect to database."
        );
    }
}
