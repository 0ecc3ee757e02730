//! # 검색 조건(Specification) 모듈
//!
//! 인증서/태그 조회 조건을 저장소 문법(SQL)과 분리해서 표현하는 값 타입입니다.
//! 호출자는 조건을 조립해서 넘기기만 하고, SQL로 바꾸는 일은
//! `db::criteria`가 맡습니다.
//!
//! ## 왜 enum인가?
//! 조건의 종류가 닫혀 있으므로(closed set) 합 타입(sum type)으로 표현합니다.
//! 저장소 계층은 `match`로 모든 variant를 빠짐없이 처리해야 하므로,
//! 새 조건을 추가하면 처리하지 않은 곳을 컴파일러가 알려 줍니다.
//!
//! ## variant 종류
//! | variant | 의미 |
//! |---|---|
//! | `All` | 항상 일치 |
//! | `Id` | 엔티티 자신의 id가 같음 |
//! | `TagId` | 인증서가 해당 id의 태그를 가짐 (태그 조회에서는 태그 id) |
//! | `TagName` | 태그 이름이 정확히 같음 (대소문자 구분) |
//! | `NameContains` | 이름에 부분 문자열 포함 (대소문자 무시) |
//! | `DescriptionContains` | 설명에 부분 문자열 포함 (대소문자 무시) |
//! | `Owner` | 해당 사용자가 구매한 인증서 |
//! | `Sort` | 필터가 아님. 정렬 정보 |
//! | `Page` | 필터가 아님. offset/limit 정보 |
//! | `And` | 모든 하위 조건이 일치 |

use crate::error::AppError;

/// 정렬 기준 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    /// 생성 시각(createDate)
    Date,
}

/// 정렬 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// 페이지 지시자. `Page::new`로만 만들 수 있어서 항상 유효합니다.
///
/// - `number`, `size`는 모두 1 이상
/// - `offset() = (number - 1) * size`는 음수가 되거나 넘치지 않음
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: i64,
    size: i64,
}

impl Page {
    /// 페이지 번호와 크기를 검증합니다.
    ///
    /// - 1 미만이면 `IncorrectInput`
    /// - `size`가 `max_size`보다 크면 `max_size`로 잘라냅니다
    /// - offset 계산이 i64를 넘치면 `IncorrectInput`
    pub fn new(number: i64, size: i64, max_size: i64) -> Result<Self, AppError> {
        if number < 1 {
            return Err(AppError::IncorrectInput(format!(
                "page must be at least 1, got {}",
                number
            )));
        }
        if size < 1 {
            return Err(AppError::IncorrectInput(format!(
                "perPage must be at least 1, got {}",
                size
            )));
        }
        let size = size.min(max_size.max(1));
        // checked_mul: 곱셈이 넘치면 None을 돌려줍니다 (panic 대신)
        (number - 1)
            .checked_mul(size)
            .ok_or_else(|| AppError::IncorrectInput("page is out of range".to_string()))?;
        Ok(Self { number, size })
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    /// 건너뛸 행 수 = (number - 1) × size
    pub fn offset(&self) -> i64 {
        // new()에서 넘치지 않음을 확인했습니다.
        (self.number - 1) * self.size
    }

    pub fn limit(&self) -> i64 {
        self.size
    }
}

/// 인증서/태그 조회 조건
///
/// 불변 값이며 `and()`로 합성합니다. `Clone`이 싸지는 않지만
/// 조건 트리는 요청당 한 번 만들어지고 읽기만 합니다.
#[derive(Debug, Clone, PartialEq)]
pub enum Specification {
    All,
    Id(i64),
    TagId(i64),
    TagName(String),
    NameContains(String),
    DescriptionContains(String),
    Owner(i64),
    Sort { field: SortField, order: SortOrder },
    Page(Page),
    And(Vec<Specification>),
}

impl Specification {
    /// 두 조건의 논리곱(conjunction).
    ///
    /// - `All`은 항등원이라 버립니다: `All.and(x) == x`
    /// - 중첩된 `And`는 한 단계로 펼칩니다
    pub fn and(self, other: Specification) -> Specification {
        match (self, other) {
            (Specification::All, other) => other,
            (this, Specification::All) => this,
            (Specification::And(mut left), Specification::And(right)) => {
                left.extend(right);
                Specification::And(left)
            }
            (Specification::And(mut left), other) => {
                left.push(other);
                Specification::And(left)
            }
            (this, Specification::And(right)) => {
                let mut parts = Vec::with_capacity(right.len() + 1);
                parts.push(this);
                parts.extend(right);
                Specification::And(parts)
            }
            (this, other) => Specification::And(vec![this, other]),
        }
    }

    /// 여러 조건을 한 번에 합성합니다. 빈 입력이면 `All`.
    pub fn all_of<I>(parts: I) -> Specification
    where
        I: IntoIterator<Item = Specification>,
    {
        parts
            .into_iter()
            .fold(Specification::All, Specification::and)
    }

    /// 행을 걸러 내는 조건만 평평하게 모읍니다.
    ///
    /// `All`, `Sort`, `Page`는 필터가 아니므로 빠집니다.
    /// 결과가 비어 있으면 이 조건은 "전체 일치"와 같습니다.
    pub fn filters(&self) -> Vec<&Specification> {
        let mut out = Vec::new();
        self.collect_filters(&mut out);
        out
    }

    fn collect_filters<'a>(&'a self, out: &mut Vec<&'a Specification>) {
        match self {
            Specification::All | Specification::Sort { .. } | Specification::Page(_) => {}
            Specification::And(parts) => {
                for part in parts {
                    part.collect_filters(out);
                }
            }
            leaf => out.push(leaf),
        }
    }

    /// 필터 관점에서 전체 일치인지 여부
    pub fn is_match_all(&self) -> bool {
        self.filters().is_empty()
    }

    /// 정렬 지시자. 여러 개면 마지막 것이 이깁니다.
    pub fn sort(&self) -> Option<(SortField, SortOrder)> {
        match self {
            Specification::Sort { field, order } => Some((*field, *order)),
            Specification::And(parts) => parts.iter().rev().find_map(Specification::sort),
            _ => None,
        }
    }

    /// 페이지 지시자. 여러 개면 마지막 것이 이깁니다.
    pub fn page(&self) -> Option<Page> {
        match self {
            Specification::Page(page) => Some(*page),
            Specification::And(parts) => parts.iter().rev().find_map(Specification::page),
            _ => None,
        }
    }
}
