use serde::{Deserialize, Serialize};

/// 호출자의 역할. JWT의 `role` 클레임에 대문자 그대로 들어 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}
