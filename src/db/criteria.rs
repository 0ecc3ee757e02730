//! # Specification → SQL 변환
//!
//! `Specification` 값을 `sqlx::QueryBuilder`에 WHERE / ORDER BY / LIMIT 절로
//! 이어 붙입니다. 조건 값은 전부 `push_bind`로 바인딩하므로
//! 사용자 입력이 SQL 문자열에 직접 들어가지 않습니다.
//!
//! 별칭 규칙: 인증서는 `c`, 태그는 `t`로 FROM 절에 들어와 있어야 합니다.

use sqlx::{QueryBuilder, Sqlite};

use crate::error::AppError;
use crate::models::fold_case;
use crate::specification::{SortField, SortOrder, Specification};

/// `certificates c`에 대한 WHERE 절을 붙입니다.
///
/// 태그 조건은 `EXISTS` 서브쿼리로 표현합니다. 태그 조건이 여러 개면
/// 각각이 AND로 묶이므로 "모든 태그를 가진 인증서"만 남습니다.
/// 존재하지 않는 태그 이름은 어떤 행과도 일치하지 않아 결과가 비게 됩니다.
pub fn push_certificate_filters(qb: &mut QueryBuilder<'_, Sqlite>, spec: &Specification) {
    qb.push(" WHERE 1 = 1");
    for filter in spec.filters() {
        qb.push(" AND ");
        match filter {
            Specification::Id(id) => {
                qb.push("c.id = ").push_bind(*id);
            }
            Specification::TagId(tag_id) => {
                qb.push(
                    "EXISTS (SELECT 1 FROM certificate_tags ct \
                     WHERE ct.certificate_id = c.id AND ct.tag_id = ",
                )
                .push_bind(*tag_id)
                .push(")");
            }
            Specification::TagName(name) => {
                qb.push(
                    "EXISTS (SELECT 1 FROM certificate_tags ct \
                     JOIN tags tn ON tn.id = ct.tag_id \
                     WHERE ct.certificate_id = c.id AND tn.name = ",
                )
                .push_bind(name.clone())
                .push(")");
            }
            Specification::NameContains(needle) => {
                // LIKE 대신 instr: %, _ 같은 와일드카드 문자를 이스케이프할 필요가 없습니다.
                // 양쪽 모두 fold_case로 접은 값이라 비ASCII 대소문자도 무시됩니다.
                qb.push("instr(c.name_folded, ")
                    .push_bind(fold_case(needle))
                    .push(") > 0");
            }
            Specification::DescriptionContains(needle) => {
                qb.push("instr(c.description_folded, ")
                    .push_bind(fold_case(needle))
                    .push(") > 0");
            }
            Specification::Owner(user_id) => {
                qb.push(
                    "EXISTS (SELECT 1 FROM orders o \
                     WHERE o.certificate_id = c.id AND o.user_id = ",
                )
                .push_bind(*user_id)
                .push(")");
            }
            // filters()는 이 variant들을 돌려주지 않습니다.
            Specification::All
            | Specification::Sort { .. }
            | Specification::Page(_)
            | Specification::And(_) => {
                qb.push("1 = 1");
            }
        }
    }
}

/// `tags t`에 대한 WHERE 절을 붙입니다.
///
/// 태그에는 설명과 소유자가 없으므로 그 조건은 `IncorrectInput`입니다.
pub fn push_tag_filters(
    qb: &mut QueryBuilder<'_, Sqlite>,
    spec: &Specification,
) -> Result<(), AppError> {
    qb.push(" WHERE 1 = 1");
    for filter in spec.filters() {
        qb.push(" AND ");
        match filter {
            Specification::Id(id) | Specification::TagId(id) => {
                qb.push("t.id = ").push_bind(*id);
            }
            Specification::TagName(name) => {
                qb.push("t.name = ").push_bind(name.clone());
            }
            Specification::NameContains(needle) => {
                qb.push("instr(t.name_folded, ")
                    .push_bind(fold_case(needle))
                    .push(") > 0");
            }
            Specification::DescriptionContains(_) | Specification::Owner(_) => {
                return Err(AppError::IncorrectInput(
                    "criterion is not applicable to tags".to_string(),
                ));
            }
            Specification::All
            | Specification::Sort { .. }
            | Specification::Page(_)
            | Specification::And(_) => {
                qb.push("1 = 1");
            }
        }
    }
    Ok(())
}

/// 인증서 ORDER BY 절. 같은 값이면 항상 id 오름차순으로 정렬해서
/// 같은 데이터에 대한 페이지 결과가 매번 같도록 합니다.
pub fn push_certificate_order(qb: &mut QueryBuilder<'_, Sqlite>, spec: &Specification) {
    match spec.sort() {
        Some((field, order)) => {
            let column = match field {
                SortField::Name => "c.name COLLATE NOCASE",
                SortField::Date => "c.create_date",
            };
            qb.push(" ORDER BY ")
                .push(column)
                .push(direction(order))
                .push(", c.id ASC");
        }
        None => {
            qb.push(" ORDER BY c.id ASC");
        }
    }
}

/// 태그 ORDER BY 절. 정렬 지시자가 없으면 이름순입니다.
/// 태그에는 생성 시각이 없으므로 `Date`는 id(생성 순서)로 대신합니다.
pub fn push_tag_order(qb: &mut QueryBuilder<'_, Sqlite>, spec: &Specification) {
    let (field, order) = spec
        .sort()
        .unwrap_or((SortField::Name, SortOrder::Asc));
    match field {
        SortField::Name => {
            qb.push(" ORDER BY t.name")
                .push(direction(order))
                .push(", t.id ASC");
        }
        SortField::Date => {
            qb.push(" ORDER BY t.id").push(direction(order));
        }
    }
}

/// LIMIT / OFFSET 절. 페이지 지시자가 없으면 아무것도 붙이지 않습니다.
pub fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, spec: &Specification) {
    if let Some(page) = spec.page() {
        qb.push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
    }
}

fn direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => " ASC",
        SortOrder::Desc => " DESC",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::Page;

    fn certificate_sql(spec: &Specification) -> String {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT c.id FROM certificates c");
        push_certificate_filters(&mut qb, spec);
        push_certificate_order(&mut qb, spec);
        push_page(&mut qb, spec);
        qb.sql().to_string()
    }

    #[test]
    fn match_all_has_no_conditions() {
        let sql = certificate_sql(&Specification::All);
        assert_eq!(
            sql,
            "SELECT c.id FROM certificates c WHERE 1 = 1 ORDER BY c.id ASC"
        );
    }

    #[test]
    fn every_tag_name_becomes_its_own_exists_clause() {
        let spec = Specification::TagName("x".into()).and(Specification::TagName("y".into()));
        let sql = certificate_sql(&spec);
        assert_eq!(sql.matches("EXISTS").count(), 2);
        assert!(!sql.contains("'x'"), "values must be bound, not inlined");
    }

    #[test]
    fn sort_falls_back_to_id_and_page_becomes_limit_offset() {
        let spec = Specification::Sort {
            field: SortField::Date,
            order: SortOrder::Desc,
        }
        .and(Specification::Page(Page::new(3, 4, 100).unwrap()));
        let sql = certificate_sql(&spec);
        assert!(sql.ends_with("ORDER BY c.create_date DESC, c.id ASC LIMIT ? OFFSET ?"));
    }

    #[test]
    fn substring_filters_use_folded_columns() {
        let spec = Specification::NameContains("Сертификат".into())
            .and(Specification::DescriptionContains("Spa".into()));
        let sql = certificate_sql(&spec);
        assert!(sql.contains("instr(c.name_folded, ?)"));
        assert!(sql.contains("instr(c.description_folded, ?)"));
        assert!(!sql.contains("lower("));
    }

    #[test]
    fn tag_queries_reject_certificate_only_criteria() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT t.id FROM tags t");
        let result = push_tag_filters(&mut qb, &Specification::Owner(1));
        assert!(matches!(result, Err(AppError::IncorrectInput(_))));
    }
}
