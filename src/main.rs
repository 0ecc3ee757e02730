//! # 기프트 인증서 카탈로그 서버 진입점
//!
//! 이 파일은 애플리케이션의 **시작점(entry point)**입니다.
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 데이터베이스 연결 풀 생성
//! 4. 데이터베이스 마이그레이션 실행
//! 5. API 라우터 설정
//! 6. HTTP 서버 시작

// ── 모듈 선언 ──
// Rust에서는 파일 시스템 구조가 곧 모듈 구조입니다.
mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod specification;

// 테스트 빌드에서만 컴파일되는 공용 헬퍼 (인메모리 DB 등)
#[cfg(test)]
mod test_support;

use anyhow::Result; // anyhow::Result: 어떤 에러 타입이든 담을 수 있는 범용 Result 타입
use config::Config;
use routes::AppState;
use sqlx::sqlite::SqlitePoolOptions; // SQLite 연결 풀 설정 옵션
use tower_http::{
    cors::{Any, CorsLayer}, // CORS(Cross-Origin Resource Sharing) 설정
    trace::TraceLayer,      // HTTP 요청/응답 로깅 미들웨어
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt}; // 로깅 초기화 유틸리티

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .ok(): .env 파일이 없어도 에러 없이 넘어갑니다. (시스템 환경변수만 사용)
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅(tracing) 초기화 ──
    // EnvFilter: RUST_LOG 환경변수로 로그 레벨을 제어합니다.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "giftcert=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    // DATABASE_URL, JWT_SECRET이 없으면 `?`로 에러를 전파하고 종료합니다.
    let config = Config::from_env()?;
    tracing::info!(
        "Starting gift certificate catalog on {}:{} (perPage default {}, max {})",
        config.host,
        config.port,
        config.page_limits.default_size,
        config.page_limits.max_size
    );

    // ── 4단계: SQLite 연결 풀 생성 ──
    // 풀에서 연결을 빌려 쓰고 반환합니다. 요청마다 새 연결을 만들지 않습니다.
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // ── 5단계: 데이터베이스 마이그레이션 실행 ──
    // sqlx::migrate!는 컴파일 타임에 ./migrations 폴더의 SQL 파일들을 포함시킵니다.
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    // ── 6단계: 애플리케이션 상태(State) 생성 ──
    // SqlitePool은 내부적으로 Arc이므로 clone해도 같은 풀을 가리킵니다.
    let state = AppState {
        pool,
        jwt_secret: config.jwt_secret.clone(),
        page_limits: config.page_limits,
    };

    // ── 7단계: CORS 미들웨어 설정 ──
    // 개발 환경에서는 Any(모두 허용)로 설정합니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // ── 8단계: 라우터 조립 ──
    // /api 아래의 모든 라우트에 CORS와 요청 로깅을 씌웁니다.
    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // ── 9단계: 서버 시작 ──
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Ctrl+C로 종료할 때까지 요청을 처리합니다.
    axum::serve(listener, app).await?;

    Ok(())
}
