//! # 미들웨어 모듈
//!
//! - `auth`: Bearer JWT 검증과 역할(Role) 확인

pub mod auth;
