//! Escrow Handlers
//!
//! Lock, settle and inspect deals.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use escrowdesk_types::{Deal, PartyId};

use crate::dto::*;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, Caller};
use crate::state::AppState;

/// `POST /api/escrow/lock` - the caller becomes the buyer
pub async fn lock(
    State(state): State<Arc<AppState>>,
    Caller(buyer): Caller,
    ApiJson(req): ApiJson<LockRequest>,
) -> ApiResult<Json<LockResponse>> {
    let seller = req
        .seller
        .as_deref()
        .and_then(|s| PartyId::parse(s.trim()).ok())
        .ok_or(ApiError::InvalidSeller)?;
    let amount = req.amount()?;
    let timeout_secs = req.timeout_secs();

    let id = state.ledger.create(buyer, seller, timeout_secs, amount)?;
    let deal = state.ledger.get_deal(id)?;
    state.persist().await;

    Ok(Json(LockResponse {
        id: id.value(),
        deadline: deal.deadline,
        deal: DealView::from(&deal),
    }))
}

/// `POST /api/escrow/release`
pub async fn release(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<SettleRequest>,
) -> ApiResult<Json<DealView>> {
    let deal = state.ledger.release_to_seller(req.deal_id()?, caller)?;
    settled(&state, deal).await
}

/// `POST /api/escrow/refund`
pub async fn refund(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<SettleRequest>,
) -> ApiResult<Json<DealView>> {
    let deal = state.ledger.refund_to_buyer(req.deal_id()?, caller)?;
    settled(&state, deal).await
}

/// `POST /api/escrow/expire`
pub async fn expire(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<SettleRequest>,
) -> ApiResult<Json<DealView>> {
    let deal = state.ledger.expire(req.deal_id()?, caller)?;
    settled(&state, deal).await
}

async fn settled(state: &AppState, deal: Deal) -> ApiResult<Json<DealView>> {
    state.persist().await;
    Ok(Json(DealView::from(&deal)))
}

/// `GET /api/escrow/:id`
pub async fn get_deal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DealView>> {
    let deal = state.ledger.get_deal(parse_deal_id(&id)?)?;
    Ok(Json(DealView::from(&deal)))
}

/// `GET /api/escrow?offset=&limit=`
pub async fn list_deals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<DealListResponse> {
    let (offset, limit) = (query.offset(), query.limit());
    let deals = state.ledger.deals(offset, limit);

    Json(DealListResponse {
        count: state.ledger.deal_count(),
        offset,
        limit,
        deals: deals.iter().map(DealView::from).collect(),
    })
}

/// `GET /api/balances/:address` - total paid out to an address
pub async fn balance(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> ApiResult<Json<BalanceResponse>> {
    let party = PartyId::parse(address.trim())
        .map_err(|_| ApiError::InvalidParameter(format!("invalid address '{}'", address)))?;
    let balance = state.ledger.balance_of(&party);

    Ok(Json(BalanceResponse {
        address: party.to_string(),
        balance_eth: balance.to_string(),
        balance_wei: balance.base_units().to_string(),
    }))
}
