//! # 데이터 모델 모듈
//!
//! 카탈로그에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! - `certificate`: 기프트 인증서와 생성/수정 요청 본문
//! - `order`: 사용자 구매 기록 (소유자 필터의 근거)
//! - `price`: 최소 화폐 단위 정수로 다루는 가격
//! - `tag`: 태그와 태그 생성 요청 본문
//! - `user`: 인증된 호출자의 역할(Role)
//!
//! `pub use X::*;`로 재공개하여 `crate::models::Certificate`처럼 짧게 씁니다.

pub mod certificate;
pub mod order;
pub mod price;
pub mod tag;
pub mod user;

pub use certificate::*;
pub use order::*;
pub use price::*;
pub use tag::*;
pub use user::*;

use chrono::{DateTime, SecondsFormat, Utc};

/// 현재 시각을 저장용 문자열로 만듭니다.
///
/// 형식은 `2026-10-16T07:04:00.123Z`로, SQLite의
/// `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` 기본값과 같습니다.
/// 자릿수가 고정이라 문자열 비교가 곧 시간 비교가 됩니다.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 부분 문자열 검색용 대소문자 접기.
///
/// SQLite 내장 `lower()`는 ASCII만 바꾸므로, 접은 값을 Rust에서 만들어
/// `*_folded` 컬럼에 함께 저장하고 검색어도 같은 함수로 접습니다.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}
