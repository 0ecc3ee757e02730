//! # 구매 기록 쿼리 모듈
//!
//! 사용자와 인증서의 구매 관계(`orders`)를 기록합니다.
//! 소유자 필터(`Specification::Owner`)는 이 테이블을 조회합니다.

use crate::error::AppError;
use crate::models::{Order, Price};
use sqlx::SqliteConnection;

/// 구매 기록을 넣고, 저장된 행을 그대로 돌려줍니다.
///
/// `RETURNING`: INSERT한 행의 컬럼을 같은 문장에서 바로 읽어옵니다.
pub async fn create_order(
    conn: &mut SqliteConnection,
    user_id: i64,
    certificate_id: i64,
    cost: Price,
    now: &str,
) -> Result<Order, AppError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (user_id, certificate_id, cost, purchase_date)
        VALUES (?, ?, ?, ?)
        RETURNING id, user_id, certificate_id, cost, purchase_date
        "#,
    )
    .bind(user_id)
    .bind(certificate_id)
    .bind(cost)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(order)
}
