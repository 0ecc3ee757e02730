//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들과, 이들을 URL에 연결한 라우터입니다.
//!
//! 각 하위 모듈:
//! - `certificates`: 인증서 검색/CRUD 핸들러 (+ 공유 상태 `AppState`)
//! - `health`: 서버/DB 상태 확인
//! - `orders`: 인증서 구매
//! - `tags`: 태그 카탈로그

pub mod certificates;
pub mod health;
pub mod orders;
pub mod tags;

// main.rs와 테스트에서 `routes::AppState`처럼 바로 접근할 수 있게 재공개합니다.
pub use certificates::*;
pub use health::*;
pub use orders::*;
pub use tags::*;

use axum::{
    routing::{get, post},
    Router,
};

/// 모든 API 라우트를 `/api` 아래에 모은 라우터.
///
/// CORS/트레이스 같은 전역 레이어는 main.rs에서 씌웁니다.
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        // {id}는 URL 경로 파라미터 (Path<i64>로 핸들러에서 추출)
        .route(
            "/certificates",
            get(list_certificates).post(create_certificate),
        )
        .route(
            "/certificates/{id}",
            get(get_certificate)
                .patch(update_certificate)
                .put(update_certificate_price)
                .delete(delete_certificate),
        )
        .route("/certificates/{id}/orders", post(purchase_certificate))
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", get(get_tag).delete(delete_tag))
        .route("/health", get(health_check))
        .with_state(state);

    Router::new().nest("/api", api_routes)
}
