//! # 기프트 인증서 모델 정의
//!
//! ## 구조체 역할
//! - `Certificate`: 저장된 인증서 + 연결된 태그 집합 (응답용)
//! - `CreateCertificateRequest` → 검증 후 `NewCertificate`
//! - `UpdateCertificateRequest`: PATCH 부분 업데이트 본문
//! - `PriceRequest`: 가격만 바꾸는 PUT 본문
//! - `TagAction`: PATCH 시 태그 집합에 적용할 연산
//!
//! JSON 필드 이름은 camelCase(`createDate`, `lastUpdateDate`)이고,
//! DB 컬럼은 snake_case입니다. `#[serde(rename_all)]`은 JSON에만
//! 적용되고 `sqlx::FromRow`는 필드 이름 그대로 컬럼을 찾습니다.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::price::Price;
use super::tag::{validate_tag_name, Tag, TagInput};
use crate::error::AppError;

pub const MAX_CERTIFICATE_NAME_LENGTH: usize = 50;
pub const MAX_CERTIFICATE_DESCRIPTION_LENGTH: usize = 200;
pub const MIN_CERTIFICATE_DURATION: i64 = 1;

/// 인증서 엔티티 — `certificates` 테이블 한 행 + `certificate_tags` 조인 결과.
///
/// `tags`는 테이블 컬럼이 아니므로 `#[sqlx(skip)]`으로 행 매핑에서 제외하고
/// (빈 Vec 기본값), 저장소 계층이 별도 쿼리로 채웁니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Price,
    /// 유효 기간 (일 단위, 1 이상)
    pub duration: i64,
    /// 생성 시각. 생성 후에는 바뀌지 않습니다.
    pub create_date: String,
    /// 마지막 수정 시각. 모든 변경마다 앞으로 당겨집니다.
    pub last_update_date: String,
    /// 연결된 태그 (id 중복 없음, 이름순)
    #[sqlx(skip)]
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Certificate {
    /// 태그 이름 목록
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

/// 인증서 생성 요청 — `POST /api/certificates`
///
/// 필수 필드도 Option으로 받습니다. 필드가 빠졌을 때 JSON 파싱 에러(422)가
/// 아니라 검증 에러(400 IncorrectInput)로 응답하기 위해서입니다.
#[derive(Debug, Deserialize)]
pub struct CreateCertificateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<i64>,
    #[serde(default)]
    pub tags: Vec<TagInput>,
}

/// 검증을 통과한 생성 요청
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub duration: i64,
    pub tag_names: Vec<String>,
}

impl CreateCertificateRequest {
    /// 모든 필수 필드가 있고 범위 안에 있는지 확인한 뒤 `NewCertificate`로 바꿉니다.
    pub fn validate(self) -> Result<NewCertificate, AppError> {
        let name = self.name.ok_or_else(|| missing("name"))?;
        let description = self.description.ok_or_else(|| missing("description"))?;
        let price = self.price.ok_or_else(|| missing("price"))?;
        let duration = self.duration.ok_or_else(|| missing("duration"))?;

        validate_name(&name)?;
        validate_description(&description)?;
        let price = Price::from_decimal(price)?;
        validate_duration(duration)?;

        let tag_names = self.tags.into_iter().map(|t| t.name).collect::<Vec<_>>();
        for tag_name in &tag_names {
            validate_tag_name(tag_name)?;
        }

        Ok(NewCertificate {
            name,
            description,
            price,
            duration,
            tag_names,
        })
    }
}

/// 인증서 부분 업데이트 요청 — `PATCH /api/certificates/:id`
///
/// 있는 필드는 덮어쓰고, 없는 필드(None)는 그대로 둡니다.
/// `tags`는 `TagAction`과 함께 해석됩니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCertificateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<i64>,
    pub tags: Option<Vec<TagInput>>,
}

impl UpdateCertificateRequest {
    /// 들어온 필드만 검증합니다.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(price) = self.price {
            Price::from_decimal(price)?;
        }
        if let Some(duration) = self.duration {
            validate_duration(duration)?;
        }
        for tag_name in self.tag_names() {
            validate_tag_name(tag_name)?;
        }
        Ok(())
    }

    /// 본문에 실린 태그 이름들 (tags 필드가 없으면 빈 목록)
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags
            .iter()
            .flatten()
            .map(|t| t.name.as_str())
            .collect()
    }
}

/// 가격 변경 요청 — `PUT /api/certificates/:id?price`
#[derive(Debug, Deserialize)]
pub struct PriceRequest {
    pub price: Option<f64>,
}

/// PATCH 시 태그 집합에 적용할 연산 (`tagAction` 쿼리 파라미터)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAction {
    /// 기존 태그 ∪ 요청 태그
    Add,
    /// 기존 태그 − 요청 태그
    Remove,
    /// 기존 태그를 버리고 요청 태그로 교체
    Replace,
    /// 태그 집합은 그대로
    None,
}

impl FromStr for TagAction {
    type Err = AppError;

    /// 대소문자를 구분하지 않습니다 (`add`, `ADD` 모두 허용).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ADD" => Ok(TagAction::Add),
            "REMOVE" => Ok(TagAction::Remove),
            "REPLACE" => Ok(TagAction::Replace),
            "NONE" => Ok(TagAction::None),
            other => Err(AppError::IncorrectInput(format!(
                "invalid tag action: {}",
                other
            ))),
        }
    }
}

fn missing(field: &str) -> AppError {
    AppError::IncorrectInput(format!("{} is required", field))
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() || name.chars().count() > MAX_CERTIFICATE_NAME_LENGTH {
        return Err(AppError::IncorrectInput(format!(
            "name must be 1..={} characters and not blank",
            MAX_CERTIFICATE_NAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.trim().is_empty()
        || description.chars().count() > MAX_CERTIFICATE_DESCRIPTION_LENGTH
    {
        return Err(AppError::IncorrectInput(format!(
            "description must be 1..={} characters and not blank",
            MAX_CERTIFICATE_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}

fn validate_duration(duration: i64) -> Result<(), AppError> {
    if duration < MIN_CERTIFICATE_DURATION {
        return Err(AppError::IncorrectInput(format!(
            "duration must be at least {} day",
            MIN_CERTIFICATE_DURATION
        )));
    }
    Ok(())
}
