//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 URL
//! - `JWT_SECRET`: JWT 토큰 서명 검증에 사용할 비밀키
//! - `HOST`: 서버 바인딩 주소
//! - `PORT`: 서버 포트 번호
//! - `DEFAULT_PAGE_SIZE`: perPage가 없을 때 쓰는 페이지 크기
//! - `MAX_PAGE_SIZE`: perPage의 상한

use std::env;

/// 페이지 크기 기본값 (perPage 생략 시)
pub const DEFAULT_PAGE_SIZE: i64 = 10;
/// 페이지 크기 상한 기본값
pub const MAX_PAGE_SIZE: i64 = 100;

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후,
/// 애플리케이션 전체에서 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 URL (예: "sqlite:data/giftcert.db?mode=rwc")
    pub database_url: String,
    /// JWT 토큰 검증에 사용하는 비밀키
    pub jwt_secret: String,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 3000)
    pub port: u16,
    /// 목록 조회의 페이지 크기 설정
    pub page_limits: PageLimits,
}

/// 페이지네이션 크기 설정
///
/// QueryComposer에 그대로 전달되는 순수 값입니다.
/// `Copy`를 derive했으므로 함수에 넘겨도 소유권이 이동하지 않고 복사됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// perPage가 없거나 숫자가 아닐 때 쓰는 크기
    pub default_size: i64,
    /// perPage가 이 값보다 크면 이 값으로 잘라냅니다
    pub max_size: i64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: MAX_PAGE_SIZE,
        }
    }
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `JWT_SECRET`은 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있어 환경변수가 없어도 동작합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        let max_size = parse_positive("MAX_PAGE_SIZE").unwrap_or(MAX_PAGE_SIZE);
        // 기본 크기가 상한보다 크면 상한으로 맞춥니다.
        let default_size = parse_positive("DEFAULT_PAGE_SIZE")
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(max_size);

        Ok(Self {
            database_url: env::var("DATABASE_URL")?, // 필수: 없으면 에러
            jwt_secret: env::var("JWT_SECRET")?,     // 필수: 없으면 에러
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            // .parse(): 문자열을 u16으로 변환, 실패 시 기본값 3000 사용
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            page_limits: PageLimits {
                default_size,
                max_size,
            },
        })
    }
}

/// 양의 정수 환경변수를 읽습니다. 없거나, 숫자가 아니거나, 1 미만이면 None.
fn parse_positive(key: &str) -> Option<i64> {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|value| *value >= 1)
}
