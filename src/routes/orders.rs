//! # 구매(Order) 라우트 핸들러
//!
//! - `POST /api/certificates/{id}/orders` → 로그인한 호출자가 인증서를 구매합니다.
//!
//! 구매 기록은 `?userCertificates` / `?userId=` 검색의 근거가 됩니다.

use crate::{
    error::AppError, middleware::auth::AuthUser, models::Order, routes::AppState,
    services::certificates,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

/// 비용은 구매 시점의 인증서 가격입니다. 인증서가 없으면 404.
pub async fn purchase_certificate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = certificates::purchase(&state.pool, auth.user_id, id).await?;
    Ok((StatusCode::CREATED, Json(order)))
}
