use crate::capture::DataUrlSource;
use crate::errors::AppError;
use crate::models::{
    AmountInput, AttendanceHistoryResponse, AttendanceRecord, OrderValidationResponse,
    RegisterAttendanceRequest, RegisterSaleRequest, SaleRecord, SalesSummary, VisitDateRequest,
};
use crate::orders::{find_order, validate_visit_date, validation_view};
use crate::sales::{new_sale, parse_amount, sales_from_orders, validate_amount};
use crate::state::AppState;
use crate::store::RecordStore;
use crate::ui::render_index;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
};
use chrono::{Local, Utc};
use serde::Deserialize;
use tracing::info;

const DEFAULT_USER: &str = "colaborador";

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub user: Option<String>,
}

pub async fn index<S: RecordStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<IndexQuery>,
) -> Result<Html<String>, AppError> {
    let user = query
        .user
        .filter(|user| !user.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_USER.to_string());
    let history = state.attendance.history(&user).await?;
    let sales = state.store.sales(&user).await?;
    let summary = state.sales.summary(&sales, Utc::now());
    Ok(Html(render_index(&user, history.next_kind, &summary)))
}

pub async fn get_attendance<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path(user): Path<String>,
) -> Result<Json<AttendanceHistoryResponse>, AppError> {
    Ok(Json(state.attendance.history(&user).await?))
}

pub async fn register_attendance<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path(user): Path<String>,
    Json(payload): Json<RegisterAttendanceRequest>,
) -> Result<(StatusCode, Json<AttendanceRecord>), AppError> {
    let camera = DataUrlSource::new(payload.image);
    let record = state.attendance.register_event(&user, &camera).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_sales_summary<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path(user): Path<String>,
) -> Result<Json<SalesSummary>, AppError> {
    let records = state.store.sales(&user).await?;
    Ok(Json(state.sales.summary(&records, Utc::now())))
}

pub async fn register_sale<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path(user): Path<String>,
    Json(payload): Json<RegisterSaleRequest>,
) -> Result<(StatusCode, Json<SaleRecord>), AppError> {
    let amount = match payload.amount {
        AmountInput::Number(value) => validate_amount(value)?,
        AmountInput::Text(text) => parse_amount(&text)?,
    };
    let sale = new_sale(&payload.description, amount, Utc::now())?;

    state.store.append_sale(&user, sale.clone()).await?;
    info!(user = %user, id = %sale.id, amount = sale.amount, "registered sale");
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn get_demo_sales_summary<S: RecordStore>(
    State(state): State<AppState<S>>,
) -> Json<SalesSummary> {
    let records = sales_from_orders(&state.orders);
    Json(state.sales.summary(&records, Utc::now()))
}

pub async fn get_order<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<OrderValidationResponse>, AppError> {
    let order = find_order(&state.orders, &id)?;
    Ok(Json(validation_view(order, &state.qr_image_base_url)?))
}

pub async fn validate_visit(
    Json(payload): Json<VisitDateRequest>,
) -> Result<Json<VisitDateRequest>, AppError> {
    let date = validate_visit_date(payload.date, Local::now().date_naive())?;
    Ok(Json(VisitDateRequest { date }))
}
