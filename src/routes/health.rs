//! # 헬스체크(Health Check) 핸들러
//!
//! ## 엔드포인트
//! - `GET /api/health` → `{ "status": "ok", "database": "ok" }`
//!
//! 데이터베이스까지 한 번 왕복해 봅니다. 연결 풀이 고갈되었거나 DB 파일에
//! 접근할 수 없으면 500이 됩니다.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{error::AppError, routes::AppState};

/// `GET /health` — 서버와 데이터베이스 상태를 확인합니다.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(Json(json!({
        "status": "ok",
        "database": "ok"
    })))
}
