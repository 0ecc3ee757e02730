//! # 인증서 데이터베이스 쿼리 모듈
//!
//! `certificates` 테이블과 `certificate_tags` 관계 테이블에 대한 쿼리입니다.
//! 조회는 `Specification`을 받아 동적 SQL로 바꾸고, 생성/수정/삭제는 id 기준입니다.
//!
//! 인증서 행을 먼저 가져온 뒤, 그 id들에 붙은 태그를 한 번의 쿼리로 모아서
//! 각 인증서의 `tags` 필드를 채웁니다 (N+1 쿼리 방지).

use std::collections::HashMap;

use crate::db::criteria;
use crate::error::AppError;
use crate::models::{fold_case, Certificate, NewCertificate, Tag};
use crate::specification::Specification;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const CERTIFICATE_COLUMNS: &str =
    "c.id, c.name, c.description, c.price, c.duration, c.create_date, c.last_update_date";

/// 조건에 맞는 인증서 목록을 태그와 함께 조회합니다.
///
/// 조건의 필터/정렬/페이지를 모두 반영합니다.
/// 일치하는 인증서가 없으면 빈 Vec입니다.
pub async fn query_certificates(
    conn: &mut SqliteConnection,
    spec: &Specification,
) -> Result<Vec<Certificate>, AppError> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM certificates c",
        CERTIFICATE_COLUMNS
    ));
    criteria::push_certificate_filters(&mut qb, spec);
    criteria::push_certificate_order(&mut qb, spec);
    criteria::push_page(&mut qb, spec);

    let mut certificates = qb
        .build_query_as::<Certificate>()
        .fetch_all(&mut *conn)
        .await?;

    attach_tags(conn, &mut certificates).await?;
    Ok(certificates)
}

/// id로 인증서 하나를 조회합니다.
///
/// - `Ok(Some(..))`: 찾음
/// - `Ok(None)`: 없음 (404 처리는 호출자 몫)
pub async fn get_certificate(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Certificate>, AppError> {
    let certificates = query_certificates(conn, &Specification::Id(id)).await?;
    Ok(certificates.into_iter().next())
}

/// 새 인증서 행을 넣고 저장소가 부여한 id를 돌려줍니다.
///
/// 태그 연결은 `link_tags`로 따로 합니다. 호출자가 같은 트랜잭션 안에서
/// 두 함수를 부르면 "인증서만 있고 태그는 없는" 중간 상태가 밖으로 보이지 않습니다.
pub async fn create_certificate(
    conn: &mut SqliteConnection,
    new: &NewCertificate,
    now: &str,
) -> Result<i64, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO certificates
            (name, name_folded, description, description_folded, price, duration,
             create_date, last_update_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.name)
    .bind(fold_case(&new.name))
    .bind(&new.description)
    .bind(fold_case(&new.description))
    .bind(new.price)
    .bind(new.duration)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    // last_insert_rowid(): INTEGER PRIMARY KEY 테이블에서는 방금 넣은 행의 id입니다.
    Ok(result.last_insert_rowid())
}

/// 인증서에 태그들을 연결합니다.
///
/// `INSERT OR IGNORE`: 이미 같은 (certificate_id, tag_id) 쌍이 있으면 무시합니다.
pub async fn link_tags(
    conn: &mut SqliteConnection,
    certificate_id: i64,
    tags: &[Tag],
) -> Result<(), AppError> {
    for tag in tags {
        sqlx::query("INSERT OR IGNORE INTO certificate_tags (certificate_id, tag_id) VALUES (?, ?)")
            .bind(certificate_id)
            .bind(tag.id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// 메모리에서 병합이 끝난 인증서를 통째로 저장하고, 다시 읽어서 돌려줍니다.
///
/// `create_date`는 건드리지 않고, 검색용 `*_folded` 컬럼은 새 값으로 다시 접습니다. 태그 연결은 인증서의 `tags`와
/// 정확히 같아지도록 지우고 다시 넣습니다.
///
/// 행이 없으면 `NotFound`입니다.
pub async fn update_certificate(
    conn: &mut SqliteConnection,
    certificate: &Certificate,
) -> Result<Certificate, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE certificates
        SET name = ?, name_folded = ?, description = ?, description_folded = ?,
            price = ?, duration = ?, last_update_date = ?
        WHERE id = ?
        "#,
    )
    .bind(&certificate.name)
    .bind(fold_case(&certificate.name))
    .bind(&certificate.description)
    .bind(fold_case(&certificate.description))
    .bind(certificate.price)
    .bind(certificate.duration)
    .bind(&certificate.last_update_date)
    .bind(certificate.id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    sqlx::query("DELETE FROM certificate_tags WHERE certificate_id = ?")
        .bind(certificate.id)
        .execute(&mut *conn)
        .await?;
    link_tags(conn, certificate.id, &certificate.tags).await?;

    get_certificate(conn, certificate.id)
        .await?
        .ok_or(AppError::Internal(
            "Failed to retrieve updated certificate".to_string(),
        ))
}

/// id로 인증서를 삭제하고 영향받은 행 수를 돌려줍니다.
///
/// 0이면 "없음"이라는 뜻이고, 404로 바꾸는 일은 호출자가 합니다.
/// 태그 연결과 구매 기록은 `ON DELETE CASCADE`로 함께 지워집니다.
pub async fn delete_certificate(conn: &mut SqliteConnection, id: i64) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM certificates WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// 인증서들의 태그를 한 번에 조회해서 채웁니다.
async fn attach_tags(
    conn: &mut SqliteConnection,
    certificates: &mut [Certificate],
) -> Result<(), AppError> {
    if certificates.is_empty() {
        return Ok(());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT ct.certificate_id, t.id, t.name \
         FROM certificate_tags ct \
         JOIN tags t ON t.id = ct.tag_id \
         WHERE ct.certificate_id IN (",
    );
    let mut ids = qb.separated(", ");
    for certificate in certificates.iter() {
        ids.push_bind(certificate.id);
    }
    ids.push_unseparated(")");
    qb.push(" ORDER BY t.name, t.id");

    let rows: Vec<(i64, i64, String)> = qb.build_query_as().fetch_all(&mut *conn).await?;

    // certificate_id → 태그 목록
    let mut by_certificate: HashMap<i64, Vec<Tag>> = HashMap::new();
    for (certificate_id, id, name) in rows {
        by_certificate
            .entry(certificate_id)
            .or_default()
            .push(Tag { id, name });
    }

    for certificate in certificates.iter_mut() {
        certificate.tags = by_certificate.remove(&certificate.id).unwrap_or_default();
    }
    Ok(())
}
