use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub default_business_name: String,
    pub default_business_email: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "slotbook.db".to_string()),
            default_business_name: env::var("DEFAULT_BUSINESS_NAME")
                .unwrap_or_else(|_| "Soft Water Services".to_string()),
            default_business_email: env::var("DEFAULT_BUSINESS_EMAIL")
                .unwrap_or_else(|_| "garrett@example.com".to_string()),
        }
    }
}
