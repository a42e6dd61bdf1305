use crate::handlers;
use crate::state::AppState;
use crate::store::RecordStore;
use axum::{
    Router,
    routing::{get, post},
};

pub fn router<S: RecordStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/", get(handlers::index::<S>))
        .route(
            "/api/users/:user/attendance",
            get(handlers::get_attendance::<S>).post(handlers::register_attendance::<S>),
        )
        .route("/api/users/:user/sales", post(handlers::register_sale::<S>))
        .route(
            "/api/users/:user/sales/summary",
            get(handlers::get_sales_summary::<S>),
        )
        .route(
            "/api/demo/sales/summary",
            get(handlers::get_demo_sales_summary::<S>),
        )
        .route("/api/orders/:id", get(handlers::get_order::<S>))
        .route("/api/visits/validate", post(handlers::validate_visit))
        .with_state(state)
}
