use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub business_name: String,
    pub owner_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub service_types: Vec<String>,
    pub created_at: NaiveDateTime,
}
