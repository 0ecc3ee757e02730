use serde::{Deserialize, Serialize};

use super::price::Price;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub certificate_id: i64,
    /// 구매 시점의 인증서 가격
    pub cost: Price,
    pub purchase_date: String,
}
