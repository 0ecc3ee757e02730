//! # 태그 API 라우트 핸들러
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | GET | /api/tags | `list_tags` | 태그 목록 (이름순, page/perPage) |
//! | GET | /api/tags/{id} | `get_tag` | 단일 태그 |
//! | POST | /api/tags | `create_tag` | 태그 생성 (ADMIN, 이미 있으면 그 태그) |
//! | DELETE | /api/tags/{id} | `delete_tag` | 태그 삭제 (ADMIN) |
//!
//! 태그 생성은 인증서 생성과 같은 태그 해석기를 거칩니다.
//! 같은 이름으로 두 번 만들어도 행은 하나이고 같은 태그가 돌아옵니다.

use std::collections::HashMap;

use crate::{
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    routes::AppState,
    services::{query, tags},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

/// `GET /tags?page=1&perPage=20` — 태그 목록 한 페이지.
pub async fn list_tags(
    State(state): State<AppState>,
    Query(criteria): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Tag>>, AppError> {
    let page = query::page_directive(&criteria, state.page_limits)?;
    let mut conn = state.pool.acquire().await?;
    let found = tags::find_all(&mut conn, page).await?;
    Ok(Json(found))
}

/// `GET /tags/{id}` — 없으면 404.
pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Tag>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let tag = tags::find_by_id(&mut conn, id).await?;
    Ok(Json(tag))
}

/// `POST /tags` + `{ "name": "spa" }` — 201 + 태그.
pub async fn create_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
    auth.require_admin()?;
    let name = req.into_name()?;

    let mut conn = state.pool.acquire().await?;
    let id = tags::resolve(&mut conn, &name).await?;
    Ok((StatusCode::CREATED, Json(Tag { id, name })))
}

/// `DELETE /tags/{id}` — 인증서와의 연결은 함께 지워집니다.
pub async fn delete_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;
    let mut conn = state.pool.acquire().await?;
    tags::delete(&mut conn, id).await?;
    Ok(StatusCode::OK)
}
