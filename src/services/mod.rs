//! # 서비스 계층 (비즈니스 로직)
//!
//! 라우트 핸들러와 데이터베이스 계층 사이에서 규칙을 담당합니다.
//!
//! 각 하위 모듈:
//! - `certificates`: 인증서 조회/생성/수정/삭제/구매 유스케이스
//! - `merge`: 부분 업데이트 병합 (순수 함수)
//! - `query`: HTTP 검색 파라미터 → `Specification` 조립 (순수 함수)
//! - `tags`: 태그 이름 → id 해석, 태그 카탈로그

pub mod certificates;
pub mod merge;
pub mod query;
pub mod tags;
