//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 저장소와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 서비스 계층(services/)이 이 모듈의 함수를 호출합니다.
//!
//! 각 하위 모듈:
//! - `criteria`: `Specification` → SQL 절 변환
//! - `certificates`: 인증서 조회/생성/수정/삭제 쿼리
//! - `orders`: 구매 기록 쿼리
//! - `tags`: 태그 조회/생성/삭제 쿼리

pub mod certificates;
pub mod criteria;
pub mod orders;
pub mod tags;

// `crate::db::query_certificates`처럼 바로 접근할 수 있게 재공개합니다.
pub use certificates::*;
pub use orders::*;
pub use tags::*;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::AppError;

/// 쓰기 트랜잭션을 시작합니다.
///
/// 기본 `BEGIN`(DEFERRED)은 첫 쓰기에서야 쓰기 잠금을 잡습니다. 그 사이
/// 다른 연결이 먼저 커밋하면 SQLite는 busy_timeout을 기다리지 않고 바로
/// `SQLITE_BUSY`를 돌려줍니다. 읽고 나서 쓰는 서비스들은 `BEGIN IMMEDIATE`로
/// 시작해서 잠금을 처음부터 잡고, 경합은 busy_timeout 대기로 풀리게 합니다.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, AppError> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}
