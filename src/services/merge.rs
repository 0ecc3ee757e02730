//! # 인증서 병합 (CertificateMerger)
//!
//! 부분 업데이트 본문을 저장된 인증서 위에 덮어씁니다.
//! 저장소에 접근하지 않는 순수 함수들이며, 저장은 호출자가 같은
//! 트랜잭션 안에서 합니다.
//!
//! ## 규칙
//! - 본문에 있는 필드는 덮어쓰고, 없는 필드는 그대로 둡니다.
//! - `last_update_date`는 병합할 때마다 반드시 앞으로 갑니다. 같은 밀리초 안에
//!   다시 바뀌면 이전 값에 1ms를 더합니다.
//! - 태그 집합은 `TagAction`에 따라 합집합/차집합/교체/유지합니다.
//!   태그의 정체성은 이름이 아니라 id입니다.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::error::AppError;
use crate::models::{
    format_timestamp, now_timestamp, Certificate, Price, Tag, TagAction,
    UpdateCertificateRequest,
};

/// `tagAction` 쿼리 파라미터를 실제로 적용할 연산으로 정합니다.
///
/// - 값이 있으면 그 값 (`ADD`/`REMOVE`/`REPLACE`/`NONE`, 대소문자 무시)
/// - 파라미터가 없거나 빈 값(`?tagAction=`)이면 둘을 같게 취급합니다:
///   본문에 `tags` 필드가 있으면 `REPLACE`, 없으면 `NONE`
///   (있는 필드는 덮어쓴다는 PATCH 규칙을 태그에도 적용)
/// - 알 수 없는 값은 `IncorrectInput`
pub fn resolve_tag_action(
    raw: Option<&str>,
    patch: &UpdateCertificateRequest,
) -> Result<TagAction, AppError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.parse(),
        None if patch.tags.is_some() => Ok(TagAction::Replace),
        None => Ok(TagAction::None),
    }
}

/// 부분 업데이트를 병합합니다.
///
/// `tags`는 본문의 태그 이름들을 호출자가 미리 해석한 결과입니다
/// (`ADD`/`REPLACE`는 `tags::resolve_all`, `REMOVE`는 `tags::lookup_all`).
/// `NONE`이면 무시됩니다.
///
/// 본문의 가격이 최소 단위로 떨어지지 않으면 `IncorrectInput`.
pub fn merge(
    existing: Certificate,
    patch: &UpdateCertificateRequest,
    action: TagAction,
    tags: Vec<Tag>,
) -> Result<Certificate, AppError> {
    let mut merged = existing;

    if let Some(name) = &patch.name {
        merged.name = name.clone();
    }
    if let Some(description) = &patch.description {
        merged.description = description.clone();
    }
    if let Some(price) = patch.price {
        merged.price = Price::from_decimal(price)?;
    }
    if let Some(duration) = patch.duration {
        merged.duration = duration;
    }

    merged.tags = match action {
        TagAction::Add => union(merged.tags, tags),
        TagAction::Remove => {
            let removed: HashSet<i64> = tags.iter().map(|tag| tag.id).collect();
            merged
                .tags
                .into_iter()
                .filter(|tag| !removed.contains(&tag.id))
                .collect()
        }
        TagAction::Replace => union(Vec::new(), tags),
        TagAction::None => merged.tags,
    };

    merged.last_update_date = advance(&merged.last_update_date);
    Ok(merged)
}

/// 가격만 바꾸는 제한된 병합. 다른 필드와 태그는 건드리지 않습니다.
///
/// 가격이 없거나(null), 음수이거나, 유한하지 않으면 `IncorrectInput`.
pub fn merge_price(existing: Certificate, price: Option<f64>) -> Result<Certificate, AppError> {
    let price =
        price.ok_or_else(|| AppError::IncorrectInput("price is required".to_string()))?;
    let price = Price::from_decimal(price)?;

    let mut merged = existing;
    merged.price = price;
    merged.last_update_date = advance(&merged.last_update_date);
    Ok(merged)
}

/// id 기준 합집합. 결과는 이름순(같으면 id순)으로 정렬합니다.
fn union(base: Vec<Tag>, extra: Vec<Tag>) -> Vec<Tag> {
    let mut seen = HashSet::new();
    let mut tags: Vec<Tag> = base
        .into_iter()
        .chain(extra)
        .filter(|tag| seen.insert(tag.id))
        .collect();
    tags.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    tags
}

/// 현재 시각. 이전 값보다 늦지 않으면(같은 밀리초, 시계 역행) 이전 값 + 1ms.
///
/// 타임스탬프는 고정 폭 형식이라 문자열 비교가 곧 시간 비교입니다.
fn advance(previous: &str) -> String {
    let now = now_timestamp();
    if now.as_str() > previous {
        return now;
    }
    match DateTime::parse_from_rfc3339(previous) {
        Ok(previous) => format_timestamp(previous.with_timezone(&Utc) + Duration::milliseconds(1)),
        Err(_) => now,
    }
}
