//! # 태그 모델 정의
//!
//! 태그는 여러 인증서가 함께 참조하는 라벨입니다.
//! 이름은 저장소 전체에서 유일하며(대소문자 구분), 한 번 만들어지면
//! 수정되지 않고 생성/삭제만 됩니다.
//!
//! ## 구조체 역할
//! - `Tag`: 데이터베이스에 저장된 태그 (응답용)
//! - `TagInput`: 요청 본문 안의 태그 `{ "name": "..." }`
//! - `CreateTagRequest`: `POST /api/tags`의 요청 본문

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 태그 이름 최대 길이 (문자 수)
pub const MAX_TAG_NAME_LENGTH: usize = 50;

/// 태그 엔티티 — DB의 `tags` 테이블 한 행(row)에 대응합니다.
///
/// `Hash`, `Eq`까지 derive해서 집합 연산(태그 병합)에 바로 쓸 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    /// 저장소가 부여한 정수 식별자
    pub id: i64,
    /// 태그 이름 (예: "spa", "for_rent")
    pub name: String,
}

/// 요청 본문에 들어 있는 태그 한 개.
///
/// 클라이언트가 `{ "id": 3, "name": "spa" }`처럼 id를 같이 보내도
/// 무시합니다. 태그의 정체성은 항상 이름으로 다시 찾습니다.
#[derive(Debug, Clone, Deserialize)]
pub struct TagInput {
    pub name: String,
}

/// 태그 생성 요청 — `POST /api/tags`
///
/// 이름이 빠진 경우도 400으로 응답하려고 Option으로 받습니다.
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: Option<String>,
}

impl CreateTagRequest {
    /// 이름을 검증하고 꺼냅니다.
    pub fn into_name(self) -> Result<String, AppError> {
        let name = self
            .name
            .ok_or_else(|| AppError::IncorrectInput("tag name is required".to_string()))?;
        validate_tag_name(&name)?;
        Ok(name)
    }
}

/// 태그 이름 검증: 공백만으로 이루어지지 않고, 최대 길이 이하.
pub fn validate_tag_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::IncorrectInput(
            "tag name must not be blank".to_string(),
        ));
    }
    if name.chars().count() > MAX_TAG_NAME_LENGTH {
        return Err(AppError::IncorrectInput(format!(
            "tag name must be at most {} characters",
            MAX_TAG_NAME_LENGTH
        )));
    }
    Ok(())
}
