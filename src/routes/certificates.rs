//! # 인증서(Certificate) 라우트 핸들러
//!
//! ## 엔드포인트
//! | 메서드 | 경로 | 권한 | 설명 |
//! |--------|------|------|------|
//! | GET | /api/certificates | 공개 | 검색 (name, description, tag*, sortBy, order, page, perPage) |
//! | GET | /api/certificates?userCertificates | 로그인 | 내가 구매한 인증서 |
//! | GET | /api/certificates?userId=7 | ADMIN | 특정 사용자가 구매한 인증서 |
//! | GET | /api/certificates/{id} | 공개 | 단일 조회 |
//! | POST | /api/certificates | ADMIN | 생성 → 201 |
//! | PATCH | /api/certificates/{id}?tagAction= | ADMIN | 부분 업데이트 |
//! | PUT | /api/certificates/{id}?price | ADMIN | 가격만 변경 |
//! | DELETE | /api/certificates/{id} | ADMIN | 삭제 (없으면 404) |
//!
//! 핸들러는 요청에서 값을 꺼내고 권한을 확인한 뒤 서비스 계층에 넘기는 일만 합니다.
//! 토큰은 서비스 계층까지 가지 않고, 사용자 id만 평범한 값으로 전달됩니다.

use std::collections::HashMap;

use crate::{
    config::PageLimits,
    error::AppError,
    middleware::auth::{AuthError, AuthUser},
    models::*,
    services::certificates,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;

/// 태그 필터용 쿼리 키. `?tag=x&tag=y`처럼 반복됩니다.
const TAG_KEY: &str = "tag";
/// 호출자 자신이 구매한 인증서만 (값 없이 키만 있어도 됨)
const USER_CERTIFICATES_KEY: &str = "userCertificates";
/// 지정한 사용자가 구매한 인증서만 (관리자 전용)
const USER_ID_KEY: &str = "userId";

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
#[derive(Clone)]
pub struct AppState {
    /// SQLite 연결 풀 (내부적으로 Arc로 공유)
    pub pool: SqlitePool,
    /// JWT 서명 검증용 비밀키
    pub jwt_secret: String,
    /// 목록 조회의 페이지 크기 기본값/상한
    pub page_limits: PageLimits,
}

/// `PATCH /certificates/{id}`의 쿼리 파라미터
#[derive(Debug, Deserialize)]
pub struct TagActionParams {
    #[serde(rename = "tagAction")]
    pub tag_action: Option<String>,
}

/// `GET /certificates` — 조건 검색.
///
/// 쿼리 문자열을 `Vec<(키, 값)>`으로 받습니다. `HashMap`으로 받으면
/// 반복되는 `tag` 키가 하나만 남기 때문입니다.
///
/// 인증은 선택입니다. `userCertificates`/`userId`가 있을 때만 필요하므로
/// `Result<AuthUser, AuthError>`로 받아서 그때 `?`로 401을 돌려줍니다.
pub async fn list_certificates(
    State(state): State<AppState>,
    auth: Result<AuthUser, AuthError>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Certificate>>, AppError> {
    let mut criteria = HashMap::new();
    let mut tag_names = Vec::new();
    for (key, value) in params {
        if key == TAG_KEY {
            if !value.trim().is_empty() {
                tag_names.push(value);
            }
        } else {
            criteria.insert(key, value);
        }
    }

    let owner_id = owner_filter(&criteria, auth)?;
    let found = certificates::find_by_criteria(
        &state.pool,
        &criteria,
        &tag_names,
        owner_id,
        state.page_limits,
    )
    .await?;
    Ok(Json(found))
}

/// 소유자 필터를 정합니다.
///
/// - `userId=7`: ADMIN만, 7번 사용자의 구매 목록
/// - `userCertificates`: 로그인한 호출자 자신의 구매 목록
/// - 둘 다 없으면 소유자 필터 없음 (인증 불필요)
fn owner_filter(
    criteria: &HashMap<String, String>,
    auth: Result<AuthUser, AuthError>,
) -> Result<Option<i64>, AppError> {
    if let Some(raw) = criteria.get(USER_ID_KEY) {
        let caller = auth?;
        caller.require_admin()?;
        let user_id = raw.trim().parse::<i64>().map_err(|_| {
            AppError::IncorrectInput(format!("userId must be an integer, got '{}'", raw))
        })?;
        return Ok(Some(user_id));
    }

    if criteria.contains_key(USER_CERTIFICATES_KEY) {
        return Ok(Some(auth?.user_id));
    }

    Ok(None)
}

/// `GET /certificates/{id}` — 단일 조회. 없으면 404.
pub async fn get_certificate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Certificate>, AppError> {
    let certificate = certificates::find_by_id(&state.pool, id).await?;
    Ok(Json(certificate))
}

/// `POST /certificates` — 생성. 201 + 저장된 인증서.
pub async fn create_certificate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateCertificateRequest>,
) -> Result<(StatusCode, Json<Certificate>), AppError> {
    auth.require_admin()?;
    let created = certificates::create(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /certificates/{id}?tagAction=ADD` — 부분 업데이트.
pub async fn update_certificate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Query(params): Query<TagActionParams>,
    Json(req): Json<UpdateCertificateRequest>,
) -> Result<Json<Certificate>, AppError> {
    auth.require_admin()?;
    let updated =
        certificates::update(&state.pool, id, req, params.tag_action.as_deref()).await?;
    Ok(Json(updated))
}

/// `PUT /certificates/{id}?price` + `{ "price": 12.5 }` — 가격만 변경.
pub async fn update_certificate_price(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<PriceRequest>,
) -> Result<Json<Certificate>, AppError> {
    auth.require_admin()?;
    let updated = certificates::update_price(&state.pool, id, req.price).await?;
    Ok(Json(updated))
}

/// `DELETE /certificates/{id}` — 삭제. 지운 행이 없으면 404.
pub async fn delete_certificate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;
    if certificates::delete(&state.pool, id).await? == 0 {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::OK)
}
