//! # 인증서 서비스 (CertificateQueryService)
//!
//! 라우트 핸들러가 부르는 인증서 유스케이스입니다.
//! 검증 → (트랜잭션) → 저장소 호출 → 결과 반환의 흐름을 가집니다.
//!
//! 여러 문장을 실행하는 변경(생성, 수정, 구매)은 하나의 트랜잭션으로 묶습니다.
//! 중간에 실패하면 `Transaction`이 drop되면서 자동으로 롤백되므로,
//! "인증서는 생겼는데 태그 연결은 없는" 상태가 남지 않습니다.
//! 트랜잭션은 `db::begin_write`(BEGIN IMMEDIATE)로 엽니다.

use std::collections::HashMap;

use crate::config::PageLimits;
use crate::db;
use crate::error::AppError;
use crate::models::{
    now_timestamp, Certificate, CreateCertificateRequest, Order, Tag, TagAction,
    UpdateCertificateRequest,
};
use crate::services::{merge, query, tags};
use sqlx::{SqliteConnection, SqlitePool};

/// id로 인증서를 찾습니다. 없으면 `NotFound`.
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Certificate, AppError> {
    let mut conn = pool.acquire().await?;
    db::get_certificate(&mut conn, id)
        .await?
        .ok_or(AppError::NotFound)
}

/// 검색 조건으로 인증서 한 페이지를 조회합니다.
///
/// `owner_id`가 있으면 그 사용자가 구매한 인증서로 좁힙니다.
pub async fn find_by_criteria(
    pool: &SqlitePool,
    criteria: &HashMap<String, String>,
    tag_names: &[String],
    owner_id: Option<i64>,
    limits: PageLimits,
) -> Result<Vec<Certificate>, AppError> {
    let spec = query::compose(criteria, tag_names, owner_id, limits)?;
    let mut conn = pool.acquire().await?;
    db::query_certificates(&mut conn, &spec).await
}

/// 인증서를 만들고, 저장된 모습(id, 날짜, 태그 포함)을 돌려줍니다.
///
/// 본문의 태그 이름은 태그 해석기로 id로 바꾼 뒤 연결합니다.
/// 없는 태그는 이 트랜잭션 안에서 만들어집니다.
pub async fn create(
    pool: &SqlitePool,
    request: CreateCertificateRequest,
) -> Result<Certificate, AppError> {
    let new = request.validate()?;
    let now = now_timestamp();

    let mut tx = db::begin_write(pool).await?;
    let id = db::create_certificate(&mut tx, &new, &now).await?;
    let linked = tags::resolve_all(&mut tx, &new.tag_names).await?;
    db::link_tags(&mut tx, id, &linked).await?;
    let created = db::get_certificate(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::Internal("Failed to retrieve created certificate".to_string()))?;
    tx.commit().await?;

    tracing::info!(id, name = %created.name, tags = ?created.tag_names(), "created certificate");
    Ok(created)
}

/// 부분 업데이트.
///
/// `raw_action`은 `tagAction` 쿼리 파라미터 원문입니다
/// (해석 규칙은 `merge::resolve_tag_action`).
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    patch: UpdateCertificateRequest,
    raw_action: Option<&str>,
) -> Result<Certificate, AppError> {
    patch.validate()?;
    let action = merge::resolve_tag_action(raw_action, &patch)?;

    let mut tx = db::begin_write(pool).await?;
    let existing = db::get_certificate(&mut tx, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let resolved = tags_for_action(&mut tx, action, &patch.tag_names()).await?;
    let merged = merge::merge(existing, &patch, action, resolved)?;
    let updated = db::update_certificate(&mut tx, &merged).await?;
    tx.commit().await?;

    tracing::info!(id, ?action, "updated certificate");
    Ok(updated)
}

/// 가격만 바꿉니다. 다른 필드와 태그는 그대로입니다.
pub async fn update_price(
    pool: &SqlitePool,
    id: i64,
    price: Option<f64>,
) -> Result<Certificate, AppError> {
    let mut tx = db::begin_write(pool).await?;
    let existing = db::get_certificate(&mut tx, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let merged = merge::merge_price(existing, price)?;
    let updated = db::update_certificate(&mut tx, &merged).await?;
    tx.commit().await?;

    tracing::info!(id, price = %updated.price, "updated certificate price");
    Ok(updated)
}

/// 인증서를 삭제하고 지운 행 수(0 또는 1)를 돌려줍니다.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64, AppError> {
    let mut conn = pool.acquire().await?;
    let removed = db::delete_certificate(&mut conn, id).await?;
    if removed > 0 {
        tracing::info!(id, "deleted certificate");
    }
    Ok(removed)
}

/// 인증서를 구매합니다. 비용은 구매 시점의 가격입니다.
pub async fn purchase(
    pool: &SqlitePool,
    user_id: i64,
    certificate_id: i64,
) -> Result<Order, AppError> {
    let mut tx = db::begin_write(pool).await?;
    let certificate = db::get_certificate(&mut tx, certificate_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let order = db::create_order(
        &mut tx,
        user_id,
        certificate.id,
        certificate.price,
        &now_timestamp(),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(order_id = order.id, user_id, certificate_id, "purchased certificate");
    Ok(order)
}

/// 태그 연산에 필요한 태그를 준비합니다.
///
/// REMOVE는 있는 태그만 찾고 새로 만들지 않습니다.
async fn tags_for_action(
    conn: &mut SqliteConnection,
    action: TagAction,
    names: &[&str],
) -> Result<Vec<Tag>, AppError> {
    match action {
        TagAction::Add | TagAction::Replace => tags::resolve_all(conn, names).await,
        TagAction::Remove => tags::lookup_all(conn, names).await,
        TagAction::None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Price, TagInput};
    use crate::test_support::{limits, memory_pool, new_certificate, tag_rows_named, FileDb};

    async fn seed(pool: &SqlitePool, name: &str, tags: &[&str]) -> Certificate {
        let new = new_certificate(name, tags);
        create(
            pool,
            CreateCertificateRequest {
                name: Some(new.name),
                description: Some(new.description),
                price: Some(new.price.as_decimal()),
                duration: Some(new.duration),
                tags: new
                    .tag_names
                    .into_iter()
                    .map(|name| TagInput { name })
                    .collect(),
            },
        )
        .await
        .unwrap()
    }

    fn criteria(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn names(certificates: &[Certificate]) -> Vec<&str> {
        certificates.iter().map(|c| c.name.as_str()).collect()
    }

    async fn search(pool: &SqlitePool, pairs: &[(&str, &str)], tags: &[&str]) -> Vec<Certificate> {
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        find_by_criteria(pool, &criteria(pairs), &tags, None, limits())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_assigns_id_dates_and_tags() {
        let pool = memory_pool().await;
        let created = seed(&pool, "Spa day", &["relax", "spa"]).await;

        assert!(created.id > 0);
        assert_eq!(created.create_date, created.last_update_date);
        assert_eq!(created.tag_names(), vec!["relax", "spa"]);
        assert_eq!(find_by_id(&pool, created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn invalid_create_writes_nothing() {
        let pool = memory_pool().await;
        let result = create(
            &pool,
            CreateCertificateRequest {
                name: Some("ok".to_string()),
                description: Some("ok".to_string()),
                price: Some(-1.0),
                duration: Some(1),
                tags: vec![TagInput {
                    name: "orphan".to_string(),
                }],
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::IncorrectInput(_))));
        assert!(search(&pool, &[], &[]).await.is_empty());
        assert_eq!(tag_rows_named(&pool, "orphan").await, 0);
    }

    #[tokio::test]
    async fn find_missing_certificate_is_not_found() {
        let pool = memory_pool().await;
        assert!(matches!(find_by_id(&pool, 404).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn pagination_returns_the_requested_slice() {
        let pool = memory_pool().await;
        for name in ["e", "c", "a", "d", "b"] {
            seed(&pool, name, &[]).await;
        }

        let page = search(&pool, &[("sortBy", "name"), ("page", "2"), ("perPage", "2")], &[]).await;
        assert_eq!(names(&page), vec!["c", "d"]);

        let last = search(&pool, &[("sortBy", "name"), ("page", "3"), ("perPage", "2")], &[]).await;
        assert_eq!(names(&last), vec!["e"]);

        let beyond = search(&pool, &[("page", "9"), ("perPage", "2")], &[]).await;
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn sorting_by_name_descending_ignores_case() {
        let pool = memory_pool().await;
        for name in ["beta", "Alpha", "gamma"] {
            seed(&pool, name, &[]).await;
        }

        let sorted = search(&pool, &[("sortBy", "name"), ("order", "desc")], &[]).await;
        assert_eq!(names(&sorted), vec!["gamma", "beta", "Alpha"]);
    }

    #[tokio::test]
    async fn tag_filters_are_conjunctive() {
        let pool = memory_pool().await;
        seed(&pool, "A", &["x", "y"]).await;
        seed(&pool, "B", &["x"]).await;

        assert_eq!(names(&search(&pool, &[], &["x", "y"]).await), vec!["A"]);
        assert_eq!(names(&search(&pool, &[], &["x"]).await), vec!["A", "B"]);
        assert!(search(&pool, &[], &["missing"]).await.is_empty());
    }

    #[tokio::test]
    async fn adding_criteria_only_narrows_results() {
        let pool = memory_pool().await;
        seed(&pool, "Spa weekend", &["relax"]).await;
        seed(&pool, "spa evening", &["relax", "evening"]).await;
        seed(&pool, "Climbing", &["sport"]).await;

        let broad = search(&pool, &[], &[]).await;
        let by_name = search(&pool, &[("name", "SPA")], &[]).await;
        let by_name_and_tag = search(&pool, &[("name", "SPA")], &["evening"]).await;

        assert_eq!(broad.len(), 3);
        assert_eq!(by_name.len(), 2);
        assert_eq!(names(&by_name_and_tag), vec!["spa evening"]);
        assert!(by_name_and_tag.iter().all(|c| by_name.contains(c)));
        assert!(by_name.iter().all(|c| broad.contains(c)));
    }

    #[tokio::test]
    async fn description_filter_is_case_insensitive() {
        let pool = memory_pool().await;
        seed(&pool, "Dinner", &[]).await;

        let found = search(&pool, &[("description", "DINNER DESC")], &[]).await;
        assert_eq!(names(&found), vec!["Dinner"]);
    }

    #[tokio::test]
    async fn name_filter_folds_non_ascii_case() {
        let pool = memory_pool().await;
        seed(&pool, "Сертификат Spa", &[]).await;
        seed(&pool, "Gift", &[]).await;

        let found = search(&pool, &[("name", "сертификат")], &[]).await;
        assert_eq!(names(&found), vec!["Сертификат Spa"]);

        let found = search(&pool, &[("description", "СЕРТИФИКАТ SPA DESC")], &[]).await;
        assert_eq!(names(&found), vec!["Сертификат Spa"]);
    }

    #[tokio::test]
    async fn renamed_certificate_is_found_by_its_new_name() {
        let pool = memory_pool().await;
        let created = seed(&pool, "Gift", &[]).await;

        let rename = UpdateCertificateRequest {
            name: Some("Ärger Ticket".to_string()),
            ..Default::default()
        };
        update(&pool, created.id, rename, None).await.unwrap();

        assert_eq!(names(&search(&pool, &[("name", "ärger")], &[]).await), vec!["Ärger Ticket"]);
        assert!(search(&pool, &[("name", "gift")], &[]).await.is_empty());
    }

    #[tokio::test]
    async fn update_applies_tag_actions() {
        let pool = memory_pool().await;
        let created = seed(&pool, "Gift", &["x", "y"]).await;

        let add = UpdateCertificateRequest {
            tags: Some(vec![TagInput {
                name: "z".to_string(),
            }]),
            ..Default::default()
        };
        let added = update(&pool, created.id, add, Some("ADD")).await.unwrap();
        assert_eq!(added.tag_names(), vec!["x", "y", "z"]);

        let remove = UpdateCertificateRequest {
            tags: Some(vec![
                TagInput {
                    name: "x".to_string(),
                },
                TagInput {
                    name: "never-seen".to_string(),
                },
            ]),
            ..Default::default()
        };
        let removed = update(&pool, created.id, remove, Some("remove")).await.unwrap();
        assert_eq!(removed.tag_names(), vec!["y", "z"]);
        assert_eq!(tag_rows_named(&pool, "never-seen").await, 0);

        let replace = UpdateCertificateRequest {
            name: Some("Renamed".to_string()),
            tags: Some(Vec::new()),
            ..Default::default()
        };
        let replaced = update(&pool, created.id, replace, None).await.unwrap();
        assert_eq!(replaced.name, "Renamed");
        assert!(replaced.tags.is_empty());
        assert_eq!(replaced.create_date, created.create_date);
        assert!(replaced.last_update_date >= created.last_update_date);
    }

    #[tokio::test]
    async fn update_of_missing_certificate_is_not_found() {
        let pool = memory_pool().await;
        let result = update(&pool, 77, UpdateCertificateRequest::default(), None).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn negative_price_leaves_certificate_unchanged() {
        let pool = memory_pool().await;
        let created = seed(&pool, "Gift", &["x"]).await;

        let result = update_price(&pool, created.id, Some(-1.0)).await;
        assert!(matches!(result, Err(AppError::IncorrectInput(_))));
        assert_eq!(find_by_id(&pool, created.id).await.unwrap(), created);

        let repriced = update_price(&pool, created.id, Some(25.5)).await.unwrap();
        assert_eq!(repriced.price, Price::from_decimal(25.5).unwrap());
        assert_eq!(repriced.tags, created.tags);
        assert_eq!(repriced.name, created.name);
    }

    #[tokio::test]
    async fn delete_reports_affected_rows() {
        let pool = memory_pool().await;
        let created = seed(&pool, "Gift", &["x"]).await;

        assert_eq!(delete(&pool, 999).await.unwrap(), 0);
        assert_eq!(delete(&pool, created.id).await.unwrap(), 1);
        assert!(matches!(find_by_id(&pool, created.id).await, Err(AppError::NotFound)));
        // 태그 자체는 남습니다.
        assert_eq!(tag_rows_named(&pool, "x").await, 1);
    }

    #[tokio::test]
    async fn owner_filter_goes_through_orders() {
        let pool = memory_pool().await;
        let bought = seed(&pool, "Bought", &[]).await;
        seed(&pool, "Not bought", &[]).await;

        let order = purchase(&pool, 7, bought.id).await.unwrap();
        assert_eq!(order.cost, bought.price);
        assert_eq!(order.user_id, 7);

        let owned = find_by_criteria(&pool, &HashMap::new(), &[], Some(7), limits())
            .await
            .unwrap();
        assert_eq!(names(&owned), vec!["Bought"]);

        let nobody = find_by_criteria(&pool, &HashMap::new(), &[], Some(8), limits())
            .await
            .unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn purchase_of_missing_certificate_is_not_found() {
        let pool = memory_pool().await;
        assert!(matches!(purchase(&pool, 1, 5).await, Err(AppError::NotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_share_one_new_tag() {
        let db = FileDb::new(8).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let pool = db.pool.clone();
            handles.push(tokio::spawn(async move {
                seed(&pool, &format!("gift {}", i), &["shared"]).await
            }));
        }

        let mut tag_ids = Vec::new();
        for handle in handles {
            let created = handle.await.unwrap();
            tag_ids.push(created.tags[0].id);
        }

        tag_ids.dedup();
        assert_eq!(tag_ids.len(), 1);
        assert_eq!(tag_rows_named(&db.pool, "shared").await, 1);
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_tag_additions_share_one_new_tag() {
        let db = FileDb::new(8).await;
        let mut ids = Vec::new();
        for i in 0..8 {
            ids.push(seed(&db.pool, &format!("gift {}", i), &["old"]).await.id);
        }

        // 읽고 나서 쓰는 트랜잭션 여러 개가 같은 새 태그를 동시에 만듭니다.
        let mut handles = Vec::new();
        for id in ids {
            let pool = db.pool.clone();
            handles.push(tokio::spawn(async move {
                let patch = UpdateCertificateRequest {
                    tags: Some(vec![TagInput {
                        name: "fresh".to_string(),
                    }]),
                    ..Default::default()
                };
                update(&pool, id, patch, Some("ADD")).await
            }));
        }

        for handle in handles {
            let updated = handle.await.unwrap().unwrap();
            assert_eq!(updated.tag_names(), vec!["fresh", "old"]);
        }
        assert_eq!(tag_rows_named(&db.pool, "fresh").await, 1);
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_purchases_and_reprices_all_succeed() {
        let db = FileDb::new(8).await;
        let id = seed(&db.pool, "Gift", &[]).await.id;

        let mut handles = Vec::new();
        for i in 0..8i64 {
            let pool = db.pool.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    purchase(&pool, i, id).await.map(|_| ())
                } else {
                    update_price(&pool, id, Some(i as f64)).await.map(|_| ())
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        db.close().await;
    }
}
