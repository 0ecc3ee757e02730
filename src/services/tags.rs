//! # 태그 해석기 (TagResolver)
//!
//! 태그 이름을 저장된 태그 id로 바꿉니다. 없으면 한 번만 만듭니다.
//!
//! ## 동시성
//! 같은 새 이름을 여러 요청이 동시에 해석해도 태그 행은 하나만 생깁니다.
//! "조회 후 삽입"만으로는 두 요청이 모두 "없음"을 보고 둘 다 넣을 수 있으므로,
//! `tags.name`의 UNIQUE 제약을 최종 판정으로 삼습니다:
//!
//! 1. 이름으로 조회 → 있으면 그 id
//! 2. `INSERT ... ON CONFLICT (name) DO NOTHING RETURNING id`
//!    → 새로 넣었으면 그 id
//! 3. 충돌로 아무것도 안 넣었으면 (다른 요청이 이겼음) 다시 조회해서 이긴 쪽의 id
//!
//! 3단계에서도 못 찾으면(이긴 쪽 행이 그 사이 삭제됨) 처음부터 한 번 더 시도하고,
//! 그래도 안 되면 `Conflict`입니다.

use std::collections::HashSet;

use crate::db;
use crate::error::AppError;
use crate::models::Tag;
use crate::specification::{Page, Specification};
use sqlx::SqliteConnection;

/// 이름을 태그 id로 해석합니다. 없으면 만듭니다.
///
/// 같은 이름으로 몇 번을 불러도 같은 id를 돌려주고, 행은 하나뿐입니다.
pub async fn resolve(conn: &mut SqliteConnection, name: &str) -> Result<i64, AppError> {
    if let Some(id) = try_resolve(conn, name).await? {
        return Ok(id);
    }

    tracing::warn!(tag = name, "tag vanished after insert conflict, retrying once");
    try_resolve(conn, name).await?.ok_or_else(|| {
        AppError::Conflict(format!("could not resolve tag '{}'", name))
    })
}

async fn try_resolve(conn: &mut SqliteConnection, name: &str) -> Result<Option<i64>, AppError> {
    if let Some(tag) = db::find_tag_by_name(conn, name).await? {
        return Ok(Some(tag.id));
    }

    if let Some(id) = db::insert_tag_if_absent(conn, name).await? {
        tracing::debug!(tag = name, id, "created tag");
        return Ok(Some(id));
    }

    // 삽입이 충돌했음: 다른 요청이 먼저 만들었으므로 그 행을 읽습니다.
    Ok(db::find_tag_by_name(conn, name).await?.map(|tag| tag.id))
}

/// 여러 이름을 해석합니다. 중복 이름은 한 번만 해석하고,
/// 처음 나온 순서를 유지합니다.
pub async fn resolve_all<S>(conn: &mut SqliteConnection, names: &[S]) -> Result<Vec<Tag>, AppError>
where
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for name in names {
        let name: &str = name.as_ref();
        if !seen.insert(name) {
            continue;
        }
        let id = resolve(conn, name).await?;
        tags.push(Tag {
            id,
            name: name.to_string(),
        });
    }
    Ok(tags)
}

/// 이미 있는 태그만 찾습니다. 없는 이름은 건너뛰고, 새로 만들지 않습니다.
///
/// 태그 제거(REMOVE)처럼 새 태그가 생기면 안 되는 경로에서 씁니다.
pub async fn lookup_all<S>(conn: &mut SqliteConnection, names: &[S]) -> Result<Vec<Tag>, AppError>
where
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for name in names {
        let name: &str = name.as_ref();
        if !seen.insert(name) {
            continue;
        }
        if let Some(tag) = db::find_tag_by_name(conn, name).await? {
            tags.push(tag);
        }
    }
    Ok(tags)
}

/// id로 태그를 찾습니다. 없으면 `NotFound`.
pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Tag, AppError> {
    db::query_tags(conn, &Specification::TagId(id))
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::NotFound)
}

/// 전체 태그를 이름순으로 한 페이지 조회합니다.
pub async fn find_all(conn: &mut SqliteConnection, page: Page) -> Result<Vec<Tag>, AppError> {
    db::query_tags(conn, &Specification::All.and(Specification::Page(page))).await
}

/// 태그를 삭제합니다. 없으면 `NotFound`.
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<(), AppError> {
    if db::delete_tag(conn, id).await? == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(id, "deleted tag");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_pool, tag_rows_named, FileDb};

    #[tokio::test]
    async fn resolve_creates_once_and_then_returns_existing_id() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = resolve(&mut conn, "for_rent").await.unwrap();
        let second = resolve(&mut conn, "for_rent").await.unwrap();

        assert_eq!(first, second);
        drop(conn);
        assert_eq!(tag_rows_named(&pool, "for_rent").await, 1);
    }

    #[tokio::test]
    async fn names_are_case_sensitive() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let lower = resolve(&mut conn, "spa").await.unwrap();
        let upper = resolve(&mut conn, "SPA").await.unwrap();
        assert_ne!(lower, upper);
    }

    #[tokio::test]
    async fn resolve_all_collapses_duplicates() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let tags = resolve_all(&mut conn, &["x", "y", "x"]).await.unwrap();
        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn lookup_all_never_creates() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        resolve(&mut conn, "known").await.unwrap();

        let tags = lookup_all(&mut conn, &["known", "unknown"]).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "known");
        drop(conn);
        assert_eq!(tag_rows_named(&pool, "unknown").await, 0);
    }

    #[tokio::test]
    async fn delete_missing_tag_is_not_found() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        assert!(matches!(delete(&mut conn, 999).await, Err(AppError::NotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolution_of_a_new_name_creates_one_row() {
        let db = FileDb::new(8).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let pool = db.pool.clone();
            handles.push(tokio::spawn(async move {
                let mut conn = pool.acquire().await.unwrap();
                resolve(&mut conn, "limited-edition").await.unwrap()
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }

        assert_eq!(ids.len(), 1, "every caller must see the same id");
        assert_eq!(tag_rows_named(&db.pool, "limited-edition").await, 1);
        db.close().await;
    }
}
