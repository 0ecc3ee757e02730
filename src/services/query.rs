//! # 검색 조건 조립 (QueryComposer)
//!
//! HTTP 쿼리 파라미터(문자열 맵)와 태그 이름 목록, 소유자 id를 받아
//! 하나의 `Specification`으로 합성합니다.
//!
//! 순수 함수입니다. 저장소에 접근하지 않고, 입력을 바꾸지 않으며,
//! 같은 입력에는 항상 같은 조건을 돌려줍니다.
//!
//! ## 인식하는 키
//! | 키 | 효과 |
//! |---|---|
//! | `name` | 이름 부분 일치 (대소문자 무시) |
//! | `description` | 설명 부분 일치 (대소문자 무시) |
//! | `sortBy` | `name` 또는 `date` 정렬 |
//! | `order` | `asc`(기본) 또는 `desc`, sortBy가 있을 때만 의미 있음 |
//! | `page`, `perPage` | 페이지 지시자 |
//!
//! 그 밖의 키는 무시합니다.

use std::collections::{HashMap, HashSet};

use crate::config::PageLimits;
use crate::error::AppError;
use crate::specification::{Page, SortField, SortOrder, Specification};

pub const NAME_KEY: &str = "name";
pub const DESCRIPTION_KEY: &str = "description";
pub const SORT_BY_KEY: &str = "sortBy";
pub const ORDER_KEY: &str = "order";
pub const PAGE_KEY: &str = "page";
pub const PER_PAGE_KEY: &str = "perPage";

/// 검색 조건을 조립합니다.
///
/// - 태그 이름이 여러 개면 모두 가진 인증서만 일치합니다 (AND).
/// - 없는 태그 이름은 에러가 아니라 "빈 결과"가 됩니다.
/// - page/perPage가 없거나 숫자가 아니면 기본값, 1 미만이면 `IncorrectInput`.
pub fn compose(
    criteria: &HashMap<String, String>,
    tag_names: &[String],
    owner_id: Option<i64>,
    limits: PageLimits,
) -> Result<Specification, AppError> {
    let mut parts = Vec::new();

    if let Some(needle) = non_empty(criteria, NAME_KEY) {
        parts.push(Specification::NameContains(needle.to_string()));
    }
    if let Some(needle) = non_empty(criteria, DESCRIPTION_KEY) {
        parts.push(Specification::DescriptionContains(needle.to_string()));
    }

    // 같은 이름이 두 번 와도 조건은 한 번만
    let mut seen = HashSet::new();
    for name in tag_names {
        if seen.insert(name.as_str()) {
            parts.push(Specification::TagName(name.clone()));
        }
    }

    if let Some(owner_id) = owner_id {
        parts.push(Specification::Owner(owner_id));
    }

    if let Some(sort) = sort_directive(criteria)? {
        parts.push(sort);
    }
    let page = page_directive(criteria, limits)?;
    parts.push(Specification::Page(page));

    let spec = Specification::all_of(parts);
    tracing::debug!(
        match_all = spec.is_match_all(),
        page = page.number(),
        per_page = page.size(),
        ?spec,
        "composed certificate query"
    );
    Ok(spec)
}

/// 페이지 지시자만 만듭니다. 태그 목록처럼 다른 조건이 없는 조회에서 씁니다.
pub fn page_directive(
    criteria: &HashMap<String, String>,
    limits: PageLimits,
) -> Result<Page, AppError> {
    let number = numeric(criteria, PAGE_KEY).unwrap_or(1);
    let size = numeric(criteria, PER_PAGE_KEY).unwrap_or(limits.default_size);
    Page::new(number, size, limits.max_size)
}

fn sort_directive(criteria: &HashMap<String, String>) -> Result<Option<Specification>, AppError> {
    let Some(raw_field) = non_empty(criteria, SORT_BY_KEY) else {
        return Ok(None);
    };

    let field = match raw_field.to_ascii_lowercase().as_str() {
        "name" => SortField::Name,
        "date" => SortField::Date,
        other => {
            return Err(AppError::IncorrectInput(format!(
                "sortBy must be 'name' or 'date', got '{}'",
                other
            )))
        }
    };

    let order = match non_empty(criteria, ORDER_KEY).map(str::to_ascii_lowercase) {
        None => SortOrder::default(),
        Some(raw) if raw == "asc" => SortOrder::Asc,
        Some(raw) if raw == "desc" => SortOrder::Desc,
        Some(other) => {
            return Err(AppError::IncorrectInput(format!(
                "order must be 'asc' or 'desc', got '{}'",
                other
            )))
        }
    };

    Ok(Some(Specification::Sort { field, order }))
}

/// 값이 있고 공백만이 아닐 때만 돌려줍니다.
fn non_empty<'a>(criteria: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    criteria
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// 숫자로 읽히는 값만 돌려줍니다. 숫자가 아니면 None (→ 기본값).
fn numeric(criteria: &HashMap<String, String>, key: &str) -> Option<i64> {
    non_empty(criteria, key).and_then(|value| value.parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PAGE_SIZE;
    use proptest::prelude::*;

    fn criteria(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn compose_with(pairs: &[(&str, &str)], tags: &[&str]) -> Result<Specification, AppError> {
        let tags = tags.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        compose(&criteria(pairs), &tags, None, PageLimits::default())
    }

    #[test]
    fn empty_criteria_is_match_all_with_default_page() {
        let spec = compose_with(&[], &[]).unwrap();
        assert!(spec.is_match_all());
        assert_eq!(spec.sort(), None);

        let page = spec.page().unwrap();
        assert_eq!(page.number(), 1);
        assert_eq!(page.size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn recognised_keys_become_filters() {
        let spec = compose_with(
            &[("name", "Spa"), ("description", "relax"), ("sortBy", "date"), ("order", "DESC")],
            &["x"],
        )
        .unwrap();

        let filters = spec.filters();
        assert!(filters.contains(&&Specification::NameContains("Spa".into())));
        assert!(filters.contains(&&Specification::DescriptionContains("relax".into())));
        assert!(filters.contains(&&Specification::TagName("x".into())));
        assert_eq!(spec.sort(), Some((SortField::Date, SortOrder::Desc)));
    }

    #[test]
    fn order_defaults_to_ascending() {
        let spec = compose_with(&[("sortBy", "name")], &[]).unwrap();
        assert_eq!(spec.sort(), Some((SortField::Name, SortOrder::Asc)));
    }

    #[test]
    fn duplicate_tag_names_collapse() {
        let spec = compose_with(&[], &["x", "y", "x"]).unwrap();
        assert_eq!(spec.filters().len(), 2);
    }

    #[test]
    fn owner_is_threaded_through() {
        let spec = compose(&HashMap::new(), &[], Some(42), PageLimits::default()).unwrap();
        assert_eq!(spec.filters(), vec![&Specification::Owner(42)]);
    }

    #[test]
    fn non_numeric_paging_falls_back_to_defaults() {
        let spec = compose_with(&[("page", "two"), ("perPage", "")], &[]).unwrap();
        let page = spec.page().unwrap();
        assert_eq!((page.number(), page.size()), (1, DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn out_of_range_paging_is_rejected() {
        assert!(matches!(
            compose_with(&[("page", "0")], &[]),
            Err(AppError::IncorrectInput(_))
        ));
        assert!(matches!(
            compose_with(&[("perPage", "-5")], &[]),
            Err(AppError::IncorrectInput(_))
        ));
    }

    #[test]
    fn unknown_sort_field_or_order_is_rejected() {
        assert!(compose_with(&[("sortBy", "price")], &[]).is_err());
        assert!(compose_with(&[("sortBy", "name"), ("order", "up")], &[]).is_err());
    }

    #[test]
    fn compose_is_deterministic() {
        let pairs = [("name", "a"), ("sortBy", "name"), ("page", "3")];
        assert_eq!(
            compose_with(&pairs, &["x", "y"]).unwrap(),
            compose_with(&pairs, &["x", "y"]).unwrap()
        );
    }

    proptest! {
        #[test]
        fn unknown_keys_compose_to_match_all(
            entries in proptest::collection::hash_map("[a-zA-Z]{1,10}", ".{0,12}", 0..8)
        ) {
            let known = [NAME_KEY, DESCRIPTION_KEY, SORT_BY_KEY, ORDER_KEY, PAGE_KEY, PER_PAGE_KEY];
            let entries: HashMap<String, String> = entries
                .into_iter()
                .filter(|(key, _)| !known.contains(&key.as_str()))
                .collect();

            let spec = compose(&entries, &[], None, PageLimits::default()).unwrap();
            prop_assert!(spec.is_match_all());
            prop_assert_eq!(spec, compose(&HashMap::new(), &[], None, PageLimits::default()).unwrap());
        }
    }
}
