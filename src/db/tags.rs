//! # 태그 데이터베이스 쿼리 모듈
//!
//! 태그 조회/생성/삭제 쿼리입니다.
//! 함수들은 `&mut SqliteConnection`을 받습니다. 풀에서 빌린 연결
//! (`PoolConnection`)이든 트랜잭션(`Transaction`)이든 역참조(Deref)로
//! `SqliteConnection`이 되므로, 같은 함수를 트랜잭션 안팎에서 씁니다.
//!
//! ## 테이블 구조
//! - `tags`: 태그 엔티티 (id, name UNIQUE, 검색용 name_folded)
//! - `certificate_tags`: 인증서와 태그의 다대다(N:M) 관계 테이블

use crate::db::criteria;
use crate::error::AppError;
use crate::models::{fold_case, Tag};
use crate::specification::Specification;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

/// 조건에 맞는 태그 목록을 조회합니다.
///
/// 일치하는 태그가 없으면 빈 Vec을 돌려줍니다 (에러 아님).
pub async fn query_tags(
    conn: &mut SqliteConnection,
    spec: &Specification,
) -> Result<Vec<Tag>, AppError> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT t.id, t.name FROM tags t");
    criteria::push_tag_filters(&mut qb, spec)?;
    criteria::push_tag_order(&mut qb, spec);
    criteria::push_page(&mut qb, spec);

    let tags = qb.build_query_as::<Tag>().fetch_all(&mut *conn).await?;
    Ok(tags)
}

/// 이름이 정확히 같은 태그 하나를 찾습니다.
pub async fn find_tag_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Tag>, AppError> {
    let tags = query_tags(conn, &Specification::TagName(name.to_string())).await?;
    // name에 UNIQUE 제약이 있어서 많아야 한 행입니다.
    Ok(tags.into_iter().next())
}

/// 태그를 넣되, 같은 이름이 이미 있으면 아무것도 하지 않습니다.
///
/// - `Some(id)`: 이번 호출이 새 행을 만들었음
/// - `None`: 같은 이름의 행이 이미 있었음 (다른 요청이 먼저 넣었을 수 있음)
///
/// `ON CONFLICT (name) DO NOTHING`: UNIQUE 제약 위반을 에러 대신 "무시"로
/// 처리합니다. 삽입 시도 자체가 중복 여부의 최종 판정이 됩니다.
pub async fn insert_tag_if_absent(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<i64>, AppError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "INSERT INTO tags (name, name_folded) VALUES (?, ?) \
         ON CONFLICT (name) DO NOTHING RETURNING id",
    )
    .bind(name)
    .bind(fold_case(name))
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|(id,)| id))
}

/// id로 태그를 삭제하고 영향받은 행 수를 돌려줍니다.
///
/// `certificate_tags`의 `ON DELETE CASCADE` 덕분에 인증서와의 연결도 함께 지워집니다.
pub async fn delete_tag(conn: &mut SqliteConnection, id: i64) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
