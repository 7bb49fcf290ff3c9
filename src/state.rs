use chrono::Duration;
use std::sync::Arc;

use crate::config::Config;
use crate::db::{EmployeeStore, UserStore};
use crate::services::employee::EmployeeService;
use crate::utils::jwt::JwtAuth;

/// Shared handler state, registered once as `web::Data<AppState>`.
pub struct AppState {
    pub employees: EmployeeService,
    pub users: Arc<dyn UserStore>,
    pub jwt: JwtAuth,
    pub page_size: usize,
}

impl AppState {
    pub fn new(
        config: &Config,
        employee_store: Arc<dyn EmployeeStore>,
        user_store: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            employees: EmployeeService::new(employee_store),
            users: user_store,
            jwt: JwtAuth::new(
                &config.jwt_secret,
                Duration::seconds(config.jwt_expiration_seconds),
                Duration::days(config.jwt_refresh_expiration_days),
                &config.jwt_auth_header_prefix,
            ),
            page_size: config.page_size,
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::auth::ensure_user;
    use crate::db::MemoryStore;

    pub const TEST_USER: &str = "test_user";
    pub const TEST_PASSWORD: &str = "test123456";

    pub fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "JWT_SECRET" => Some("test-secret".to_string()),
            _ => None,
        })
        .expect("test config")
    }

    /// Memory-backed state with one known user.
    pub async fn memory_state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(&test_config(), store.clone(), store);
        ensure_user(state.users.as_ref(), TEST_USER, TEST_PASSWORD)
            .await
            .expect("seed user");
        state
    }
}
