pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::filters::employee::EmployeeFilter;
use crate::models::employee::{Employee, EmployeeChanges, NewEmployee};
use crate::models::user::User;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("an employee with this email already exists")]
    DuplicateEmail,
    #[error("a user with this username already exists")]
    DuplicateUsername,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Slice of an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

/// One page of matches plus the total number of matches.
#[derive(Debug, Clone)]
pub struct Listing {
    pub count: usize,
    pub items: Vec<Employee>,
}

/// Durable employee table. Writes must check email uniqueness atomically
/// with the write itself; names arrive already normalized.
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn create(&self, employee: NewEmployee) -> Result<Employee, StoreError>;

    async fn get(&self, id: i64) -> Result<Employee, StoreError>;

    /// Applies `changes` and refreshes `updated`. `id` and `created` never change.
    async fn update(&self, id: i64, changes: EmployeeChanges) -> Result<Employee, StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Matches ordered by name ascending, ties broken by id.
    async fn list(&self, filter: &EmployeeFilter, window: Window) -> Result<Listing, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;
}

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}
