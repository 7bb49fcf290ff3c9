use async_trait::async_trait;
use chrono::Utc;
use log::info;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{EmployeeStore, Listing, StoreError, UserStore, Window};
use crate::filters::employee::EmployeeFilter;
use crate::models::employee::{Employee, EmployeeChanges, NewEmployee};
use crate::models::user::User;

const CREATE_EMPLOYEES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS employees (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    email VARCHAR(100) NOT NULL,
    department VARCHAR(100) NOT NULL,
    gender VARCHAR(1) NOT NULL CHECK (gender IN ('M', 'F')),
    birthdate DATE,
    hire_date DATE,
    created TIMESTAMPTZ NOT NULL,
    updated TIMESTAMPTZ NOT NULL,
    CONSTRAINT employees_email_key UNIQUE (email)
)
"#;

const CREATE_EMPLOYEES_NAME_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS employees_name_idx ON employees (name, id)";

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id UUID PRIMARY KEY,
    username VARCHAR(150) NOT NULL UNIQUE,
    password TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL
)
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the tables if they are missing. Safe to run on every start.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        for statement in [
            CREATE_EMPLOYEES_TABLE,
            CREATE_EMPLOYEES_NAME_INDEX,
            CREATE_USERS_TABLE,
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema ready");
        Ok(())
    }
}

/// Unique violations (SQLSTATE 23505) become `duplicate`; anything else is a
/// plain database error.
fn map_write_error(err: sqlx::Error, duplicate: StoreError) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => duplicate,
        _ => StoreError::Database(err),
    }
}

fn update_query(id: i64, changes: EmployeeChanges) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("UPDATE employees SET ");
    let mut separated = query.separated(", ");

    if let Some(name) = changes.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name);
    }
    if let Some(email) = changes.email {
        separated.push("email = ");
        separated.push_bind_unseparated(email);
    }
    if let Some(department) = changes.department {
        separated.push("department = ");
        separated.push_bind_unseparated(department);
    }
    if let Some(gender) = changes.gender {
        separated.push("gender = ");
        separated.push_bind_unseparated(gender.as_str());
    }
    if let Some(birthdate) = changes.birthdate {
        separated.push("birthdate = ");
        separated.push_bind_unseparated(birthdate);
    }
    if let Some(hire_date) = changes.hire_date {
        separated.push("hire_date = ");
        separated.push_bind_unseparated(hire_date);
    }
    separated.push("updated = ");
    separated.push_bind_unseparated(Utc::now());

    query.push(" WHERE id = ");
    query.push_bind(id);
    query.push(" RETURNING *");
    query
}

#[async_trait]
impl EmployeeStore for PgStore {
    async fn create(&self, employee: NewEmployee) -> Result<Employee, StoreError> {
        let now = Utc::now();
        sqlx::query_as::<_, Employee>(
            "INSERT INTO employees (name, email, department, gender, birthdate, hire_date, created, updated) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING *",
        )
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.department)
        .bind(employee.gender.as_str())
        .bind(employee.birthdate)
        .bind(employee.hire_date)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_write_error(err, StoreError::DuplicateEmail))
    }

    async fn get(&self, id: i64) -> Result<Employee, StoreError> {
        sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, id: i64, changes: EmployeeChanges) -> Result<Employee, StoreError> {
        let mut query = update_query(id, changes);
        query
            .build_query_as::<Employee>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_write_error(err, StoreError::DuplicateEmail))?
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, filter: &EmployeeFilter, window: Window) -> Result<Listing, StoreError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM employees");
        filter.push_where(&mut count_query);
        let count: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM employees");
        filter.push_where(&mut query);
        query.push(" ORDER BY name ASC, id ASC LIMIT ");
        query.push_bind(window.limit as i64);
        query.push(" OFFSET ");
        query.push_bind(window.offset as i64);

        let items = query
            .build_query_as::<Employee>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Listing {
            count: count.max(0) as usize,
            items,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (user_id, username, password, is_active, created_at) \
             VALUES ($1, $2, $3, TRUE, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_write_error(err, StoreError::DuplicateUsername))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }
}
