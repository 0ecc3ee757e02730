//! # 가격 (고정 소수점)
//!
//! 가격은 최소 화폐 단위(센트)의 정수로 저장합니다. `f64`로는 0.1 같은 값을
//! 정확히 나타낼 수 없어서, 더하거나 비교할 때 오차가 생깁니다.
//!
//! JSON에서는 여전히 `19.99` 같은 10진수로 주고받습니다.
//! 입력은 소수점 아래 두 자리까지만 받습니다.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

/// 1 단위 = 100 최소 단위
const MINOR_PER_UNIT: i64 = 100;

/// 0 이상인 가격. DB에는 최소 단위 정수(INTEGER)로 들어갑니다.
///
/// `#[sqlx(transparent)]`: 안쪽 `i64`와 같은 방식으로 바인딩/디코딩합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Price(i64);

impl Price {
    /// 10진수 가격을 최소 단위로 바꿉니다.
    ///
    /// 유한하지 않거나, 음수이거나, 소수점 아래가 두 자리를 넘으면 `IncorrectInput`.
    pub fn from_decimal(value: f64) -> Result<Self, AppError> {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::IncorrectInput(
                "price must be a non-negative number".to_string(),
            ));
        }

        let scaled = value * MINOR_PER_UNIT as f64;
        let rounded = scaled.round();
        // 19.99 * 100 = 1998.9999999999998 같은 이진 표현 오차는 허용합니다.
        if (scaled - rounded).abs() > 1e-6 {
            return Err(AppError::IncorrectInput(
                "price must have at most two decimal places".to_string(),
            ));
        }
        if rounded >= i64::MAX as f64 {
            return Err(AppError::IncorrectInput("price is too large".to_string()));
        }

        Ok(Self(rounded as i64))
    }

    pub fn minor_units(self) -> i64 {
        self.0
    }

    /// JSON 출력용. 최소 단위 정수를 100으로 나눈 값이라
    /// `1999` → `19.99`처럼 가장 가까운 10진 표현으로 나갑니다.
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / MINOR_PER_UNIT as f64
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_PER_UNIT,
            self.0 % MINOR_PER_UNIT
        )
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Price::from_decimal(value).map_err(serde::de::Error::custom)
    }
}
