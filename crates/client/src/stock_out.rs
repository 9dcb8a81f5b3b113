//! Stock-out: take units out of a stock record without ever overdrawing it.
//!
//! The client validates the request, reads the record for an early
//! sufficiency check, then commits through the server's atomic transaction
//! endpoint. The server is the authority: a commit that loses a race comes
//! back rejected and is reported as insufficient stock with the fresh
//! quantity. A commit the server accepted is never reported as failed, even
//! when its response body cannot be read.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use gudang_core::{DomainError, StockId};
use gudang_inventory::{
    DEFAULT_STOCK_OUT_REASON, MovementKind, StockMovement, StockRecord, movement_note,
    validate_requested_quantity,
};

use crate::error::ApiError;
use crate::gateway::InventoryGateway;
use crate::wire::StockTransaction;

/// Progress of one stock-out, observable through [`StockOut::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockOutState {
    #[default]
    Idle,
    Validating,
    Committing,
    Succeeded,
    Failed,
}

/// What to do about the movement log after a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementLogPolicy {
    /// Post to `/riwayat-stok/` only when the commit response carries no movement.
    #[default]
    FallbackWhenMissing,
    /// Trust the server to log; never post a movement from the client.
    ServerOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockOutRequest {
    pub stock_id: StockId,
    /// Signed as entered; non-positive values are rejected before any call.
    pub quantity: i64,
    pub reason: String,
    pub note: String,
}

impl StockOutRequest {
    pub fn new(stock_id: StockId, quantity: i64) -> Self {
        Self {
            stock_id,
            quantity,
            reason: DEFAULT_STOCK_OUT_REASON.to_string(),
            note: String::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockOutOutcome {
    /// The record as the server left it.
    pub stock: StockRecord,
    pub movement: Option<StockMovement>,
    /// Non-fatal problems, e.g. the movement log could not be written.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StockOutError {
    #[error("quantity must be positive, got {requested}")]
    InvalidQuantity { requested: i64 },

    #[error("stock record unavailable: {0}")]
    RecordUnavailable(ApiError),

    #[error("insufficient stock: requested {requested}, available {current}")]
    InsufficientStock { current: u32, requested: u32 },

    #[error("stock-out rejected: {0}")]
    CommitRejected(ApiError),
}

impl StockOutError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            StockOutError::RecordUnavailable(e) | StockOutError::CommitRejected(e) => Some(e),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            StockOutError::InvalidQuantity { .. } => {
                "Quantity must be greater than zero.".to_string()
            }
            StockOutError::RecordUnavailable(e) => {
                format!("Could not load the stock record. {}", e.user_message())
            }
            StockOutError::InsufficientStock { current, requested } => format!(
                "Insufficient stock: {current} available, {requested} requested."
            ),
            StockOutError::CommitRejected(e) => e.user_message(),
        }
    }
}

fn from_domain(err: DomainError, requested: i64) -> StockOutError {
    match err {
        DomainError::InsufficientStock {
            available,
            requested,
        } => StockOutError::InsufficientStock {
            current: available,
            requested,
        },
        _ => StockOutError::InvalidQuantity { requested },
    }
}

/// Runs stock-outs against a gateway and publishes their progress.
pub struct StockOut {
    gateway: Arc<dyn InventoryGateway>,
    policy: MovementLogPolicy,
    state: watch::Sender<StockOutState>,
}

impl StockOut {
    pub fn new(gateway: Arc<dyn InventoryGateway>) -> Self {
        let (state, _) = watch::channel(StockOutState::Idle);
        Self {
            gateway,
            policy: MovementLogPolicy::default(),
            state,
        }
    }

    pub fn with_policy(mut self, policy: MovementLogPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<StockOutState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> StockOutState {
        *self.state.borrow()
    }

    fn enter(&self, next: StockOutState) {
        self.state.send_replace(next);
    }

    pub async fn run(&self, request: StockOutRequest) -> Result<StockOutOutcome, StockOutError> {
        let result = self.execute(&request).await;
        match &result {
            Ok(outcome) => {
                self.enter(StockOutState::Succeeded);
                tracing::info!(
                    stock_id = %request.stock_id,
                    quantity = request.quantity,
                    remaining = outcome.stock.quantity,
                    "stock-out committed"
                );
            }
            Err(err) => {
                self.enter(StockOutState::Failed);
                tracing::info!(
                    stock_id = %request.stock_id,
                    quantity = request.quantity,
                    error = %err,
                    "stock-out failed"
                );
            }
        }
        result
    }

    async fn execute(&self, request: &StockOutRequest) -> Result<StockOutOutcome, StockOutError> {
        self.enter(StockOutState::Validating);
        let requested = validate_requested_quantity(request.quantity).map_err(|_| {
            StockOutError::InvalidQuantity {
                requested: request.quantity,
            }
        })?;

        let current = self
            .gateway
            .fetch_stock(request.stock_id)
            .await
            .map_err(StockOutError::RecordUnavailable)?;
        let expected = current
            .plan_stock_out(requested)
            .map_err(|e| from_domain(e, request.quantity))?;

        self.enter(StockOutState::Committing);
        let tx = StockTransaction {
            stock_id: request.stock_id,
            kind: MovementKind::Out,
            quantity: requested,
            note: movement_note(&request.reason, &request.note),
        };

        let mut warnings = Vec::new();
        let (stock, logged) = match self.gateway.commit_stock_transaction(&tx).await {
            Ok(receipt) => (receipt.stock, receipt.movement),
            // 2xx: the stock is already decremented and must not be reported as failed.
            Err(err) if err.is_undecodable_success() => {
                tracing::warn!(
                    stock_id = %request.stock_id,
                    error = %err,
                    "commit accepted with an unreadable response, re-reading stock"
                );
                let stock = match self.gateway.fetch_stock(request.stock_id).await {
                    Ok(fresh) => fresh,
                    Err(fetch_err) => {
                        warnings.push(format!(
                            "Stock updated, but the new quantity could not be confirmed: {}",
                            fetch_err.user_message()
                        ));
                        current.with_quantity(expected)
                    }
                };
                (stock, None)
            }
            Err(err) => return Err(self.explain_rejection(request.stock_id, requested, err).await),
        };

        let movement = match (logged, self.policy) {
            (Some(movement), _) => Some(movement),
            (None, MovementLogPolicy::ServerOnly) => None,
            (None, MovementLogPolicy::FallbackWhenMissing) => {
                match self.gateway.record_movement(&tx).await {
                    Ok(movement) => Some(movement),
                    Err(err) => {
                        tracing::warn!(
                            stock_id = %request.stock_id,
                            error = %err,
                            "movement log entry not recorded"
                        );
                        warnings.push(format!(
                            "Stock updated, but the movement log entry was not saved: {}",
                            err.user_message()
                        ));
                        None
                    }
                }
            }
        };

        Ok(StockOutOutcome {
            stock,
            movement,
            warnings,
        })
    }

    /// A rejected commit usually means another stock-out got there first;
    /// re-read the record to say so with the current numbers.
    async fn explain_rejection(
        &self,
        stock_id: StockId,
        requested: u32,
        err: ApiError,
    ) -> StockOutError {
        if !matches!(err.status_code(), Some(400 | 409)) {
            return StockOutError::CommitRejected(err);
        }
        match self.gateway.fetch_stock(stock_id).await {
            Ok(fresh) if fresh.quantity < requested => StockOutError::InsufficientStock {
                current: fresh.quantity,
                requested,
            },
            _ => StockOutError::CommitRejected(err),
        }
    }
}

/// One-shot stock-out with the default movement-log policy.
pub async fn stock_out(
    gateway: Arc<dyn InventoryGateway>,
    request: StockOutRequest,
) -> Result<StockOutOutcome, StockOutError> {
    StockOut::new(gateway).run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::testing::{InMemoryGateway, stock};

    fn gateway_with_record() -> Arc<InMemoryGateway> {
        let fake = Arc::new(InMemoryGateway::new());
        fake.insert_stock(stock(7, 50, 10));
        fake
    }

    #[tokio::test]
    async fn takes_requested_units_out() {
        let fake = gateway_with_record();
        let op = StockOut::new(fake.clone());
        let outcome = op
            .run(StockOutRequest::new(StockId::new(7), 20))
            .await
            .unwrap();

        assert_eq!(outcome.stock.quantity, 30);
        assert_eq!(fake.stock_quantity(7), Some(30));
        assert_eq!(op.state(), StockOutState::Succeeded);
        assert!(outcome.warnings.is_empty());

        let movement = outcome.movement.unwrap();
        assert_eq!(movement.kind, MovementKind::Out);
        assert_eq!(movement.quantity, 20);
        assert_eq!(movement.note, "Penjualan");
    }

    #[tokio::test]
    async fn overdraw_is_refused_without_committing() {
        let fake = gateway_with_record();
        let op = StockOut::new(fake.clone());
        let err = op
            .run(StockOutRequest::new(StockId::new(7), 60))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StockOutError::InsufficientStock {
                current: 50,
                requested: 60
            }
        );
        assert_eq!(fake.stock_quantity(7), Some(50));
        assert_eq!(fake.calls().writes(), 0);
        assert_eq!(op.state(), StockOutState::Failed);
    }

    #[tokio::test]
    async fn non_positive_quantity_makes_no_calls() {
        for quantity in [0, -5] {
            let fake = gateway_with_record();
            let err = stock_out(fake.clone(), StockOutRequest::new(StockId::new(7), quantity))
                .await
                .unwrap_err();
            assert_eq!(err, StockOutError::InvalidQuantity { requested: quantity });
            assert_eq!(fake.calls().total(), 0);
        }
    }

    #[tokio::test]
    async fn missing_record_is_unavailable() {
        let fake = Arc::new(InMemoryGateway::new());
        let err = stock_out(fake, StockOutRequest::new(StockId::new(99), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StockOutError::RecordUnavailable(_)));
        assert_eq!(err.api_error().and_then(ApiError::status_code), Some(404));
    }

    #[tokio::test]
    async fn concurrent_stock_outs_never_overdraw() {
        let fake = gateway_with_record();
        // Both requests read 50 before either commits.
        fake.gate_fetches(2);

        let a = StockOut::new(fake.clone());
        let b = StockOut::new(fake.clone());
        let (ra, rb) = tokio::join!(
            a.run(StockOutRequest::new(StockId::new(7), 30)),
            b.run(StockOutRequest::new(StockId::new(7), 30)),
        );

        let (ok, err) = match (ra, rb) {
            (Ok(ok), Err(err)) | (Err(err), Ok(ok)) => (ok, err),
            other => panic!("expected exactly one success, got {other:?}"),
        };
        assert_eq!(ok.stock.quantity, 20);
        assert_eq!(
            err,
            StockOutError::InsufficientStock {
                current: 20,
                requested: 30
            }
        );
        assert_eq!(fake.stock_quantity(7), Some(20));
        assert_eq!(fake.calls().commit, 2);
    }

    #[tokio::test]
    async fn movement_log_failure_is_a_warning() {
        let fake = gateway_with_record();
        fake.fail_movement_log();

        let outcome = stock_out(
            fake.clone(),
            StockOutRequest::new(StockId::new(7), 5)
                .with_reason("Rusak")
                .with_note("pecah"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.stock.quantity, 45);
        assert!(outcome.movement.is_none());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(fake.stock_quantity(7), Some(45));
    }

    #[tokio::test]
    async fn server_logged_movement_is_not_posted_again() {
        let fake = gateway_with_record();
        fake.server_logs_movements();

        let outcome = stock_out(
            fake.clone(),
            StockOutRequest::new(StockId::new(7), 5)
                .with_reason("Rusak")
                .with_note("pecah"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.movement.unwrap().note, "Rusak - pecah");
        assert_eq!(fake.calls().record_movement, 0);
        assert_eq!(fake.movements().len(), 1);
    }

    #[tokio::test]
    async fn server_only_policy_skips_the_fallback() {
        let fake = gateway_with_record();
        let op = StockOut::new(fake.clone()).with_policy(MovementLogPolicy::ServerOnly);
        let outcome = op
            .run(StockOutRequest::new(StockId::new(7), 5))
            .await
            .unwrap();
        assert!(outcome.movement.is_none());
        assert_eq!(fake.calls().record_movement, 0);
    }

    #[tokio::test]
    async fn expired_session_is_rejected_not_insufficient() {
        let fake = Arc::new(InMemoryGateway::with_session(Session::new()));
        fake.insert_stock(stock(7, 50, 10));

        let err = stock_out(fake, StockOutRequest::new(StockId::new(7), 5))
            .await
            .unwrap_err();
        assert!(matches!(err, StockOutError::CommitRejected(ref e) if e.is_auth_required()));
        assert!(err.user_message().contains("Authentication required"));
    }

    #[tokio::test]
    async fn accepted_commit_with_unreadable_body_still_succeeds() {
        let fake = gateway_with_record();
        fake.unreadable_receipts();
        let op = StockOut::new(fake.clone());

        let outcome = op
            .run(StockOutRequest::new(StockId::new(7), 20))
            .await
            .unwrap();

        assert_eq!(op.state(), StockOutState::Succeeded);
        assert_eq!(outcome.stock.quantity, 30);
        assert_eq!(fake.stock_quantity(7), Some(30));
        assert_eq!(fake.calls().commit, 1);
        assert_eq!(fake.calls().fetch_stock, 2);
        assert_eq!(fake.calls().record_movement, 1);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.movement.unwrap().quantity, 20);
    }

    #[tokio::test]
    async fn subscribers_observe_final_state() {
        let fake = gateway_with_record();
        let op = StockOut::new(fake);
        let mut rx = op.subscribe();
        assert_eq!(*rx.borrow(), StockOutState::Idle);

        op.run(StockOutRequest::new(StockId::new(7), 1)).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), StockOutState::Succeeded);
    }
}
