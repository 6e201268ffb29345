//! PostgreSQL credential store
//!
//! Tables `users` and `refresh_token`. Every operation is a single statement,
//! so a lookup racing a delete of the same refresh token sees either the row
//! or `NotFound`, never a half-deleted state.

use std::time::Duration;

use async_trait::async_trait;
use authgate_core::{
    models::validate_email, AuthGateError, AuthToken, DatabaseConfig, Result, User, UserUpdate,
    PAGE_SIZE,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};

use super::{
    insufficient_tokens, insufficient_users, token_not_found, user_not_found, CredentialStore,
    RefreshTokenRepository, UserRepository,
};

const USER_COLUMNS: &str = "id, email, password, active, email_verified, email_subscribed, \
                            admin, created, last_login, last_action";

const CREATE_USERS: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id               BIGSERIAL PRIMARY KEY,
        email            TEXT NOT NULL,
        password         TEXT NOT NULL,
        active           BOOLEAN NOT NULL DEFAULT TRUE,
        email_verified   BOOLEAN NOT NULL DEFAULT FALSE,
        email_subscribed BOOLEAN NOT NULL DEFAULT TRUE,
        admin            BOOLEAN NOT NULL DEFAULT FALSE,
        created          TIMESTAMPTZ NOT NULL,
        last_login       TIMESTAMPTZ NOT NULL,
        last_action      TIMESTAMPTZ NOT NULL
    )
"#;

const CREATE_REFRESH_TOKEN: &str = r#"
    CREATE TABLE IF NOT EXISTS refresh_token (
        seq          BIGSERIAL,
        id           TEXT PRIMARY KEY,
        token_string TEXT NOT NULL,
        expires      BIGINT NOT NULL
    )
"#;

fn db_error(context: &str) -> impl FnOnce(sqlx::Error) -> AuthGateError + '_ {
    move |e| AuthGateError::Database(format!("{context}: {e}"))
}

/// Row offset of `page`, or `None` when it cannot be represented
fn page_offset(page: u64) -> Option<i64> {
    page.checked_mul(PAGE_SIZE)
        .and_then(|offset| i64::try_from(offset).ok())
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password: String,
    active: bool,
    email_verified: bool,
    email_subscribed: bool,
    admin: bool,
    created: DateTime<Utc>,
    last_login: DateTime<Utc>,
    last_action: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password,
            active: row.active,
            email_verified: row.email_verified,
            email_subscribed: row.email_subscribed,
            admin: row.admin,
            created: row.created,
            last_login: row.last_login,
            last_action: row.last_action,
        }
    }
}

#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    id: String,
    token_string: String,
    expires: i64,
}

impl From<RefreshTokenRow> for AuthToken {
    fn from(row: RefreshTokenRow) -> Self {
        AuthToken {
            uuid: row.id,
            token_string: row.token_string,
            expires: row.expires,
        }
    }
}

/// PostgreSQL-backed credential store
#[derive(Clone)]
pub struct PgStore {
    users: PgUserRepository,
    refresh_tokens: PgRefreshTokenRepository,
    pool: PgPool,
}

impl PgStore {
    /// Connect using the configured URL, pool size and timeout
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.postgres_url)
            .await
            .map_err(|e| AuthGateError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self::from_pool(pool))
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            users: PgUserRepository { pool: pool.clone() },
            refresh_tokens: PgRefreshTokenRepository { pool: pool.clone() },
            pool,
        }
    }

    /// Create both tables if they do not exist
    pub async fn init_schema(&self) -> Result<()> {
        for statement in [CREATE_USERS, CREATE_REFRESH_TOKEN] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error("failed to create schema"))?;
        }
        Ok(())
    }
}

impl CredentialStore for PgStore {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn refresh_tokens(&self) -> &dyn RefreshTokenRepository {
        &self.refresh_tokens
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_id(&self, id: i64) -> Result<User> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("failed to get user"))?;

        row.map(User::from).ok_or_else(user_not_found)
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        validate_email(email)?;

        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 ORDER BY id LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("failed to get user"))?;

        row.map(User::from).ok_or_else(user_not_found)
    }

    async fn get_all(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("failed to list users"))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn get_page(&self, page: u64) -> Result<Vec<User>> {
        let offset = page_offset(page).ok_or_else(insufficient_users)?;

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(PAGE_SIZE as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("failed to list users"))?;

        // No rows at this offset means the page starts beyond the last record
        if rows.is_empty() {
            return Err(insufficient_users());
        }
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        admin: bool,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let user = User::new(email, password_hash, admin, now)?;

        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (
                email, password, active, email_verified, email_subscribed,
                admin, created, last_login, last_action
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(user.email_verified)
        .bind(user.email_subscribed)
        .bind(user.admin)
        .bind(user.created)
        .bind(user.last_login)
        .bind(user.last_action)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("failed to insert user"))?;

        Ok(row.into())
    }

    async fn update(&self, id: i64, update: &UserUpdate) -> Result<User> {
        update.validate()?;
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut fields = builder.separated(", ");
        if let Some(email) = &update.email {
            fields.push("email = ").push_bind_unseparated(email.clone());
        }
        if let Some(password) = &update.password {
            fields.push("password = ").push_bind_unseparated(password.clone());
        }
        if let Some(active) = update.active {
            fields.push("active = ").push_bind_unseparated(active);
        }
        if let Some(verified) = update.email_verified {
            fields.push("email_verified = ").push_bind_unseparated(verified);
        }
        if let Some(subscribed) = update.email_subscribed {
            fields.push("email_subscribed = ").push_bind_unseparated(subscribed);
        }
        if let Some(admin) = update.admin {
            fields.push("admin = ").push_bind_unseparated(admin);
        }
        builder.push(" WHERE id = ").push_bind(id);
        builder.push(" RETURNING ").push(USER_COLUMNS);

        let row: Option<UserRow> = builder
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("failed to update user"))?;

        row.map(User::from).ok_or_else(user_not_found)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("failed to delete user"))?;

        if result.rows_affected() == 0 {
            return Err(user_not_found());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn insert(&self, token: &AuthToken) -> Result<()> {
        sqlx::query("INSERT INTO refresh_token (id, token_string, expires) VALUES ($1, $2, $3)")
            .bind(&token.uuid)
            .bind(&token.token_string)
            .bind(token.expires)
            .execute(&self.pool)
            .await
            .map_err(db_error("failed to insert refresh token"))?;

        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<AuthToken> {
        let row: Option<RefreshTokenRow> =
            sqlx::query_as("SELECT id, token_string, expires FROM refresh_token WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("failed to get refresh token"))?;

        row.map(AuthToken::from).ok_or_else(token_not_found)
    }

    async fn get_all(&self) -> Result<Vec<AuthToken>> {
        let rows: Vec<RefreshTokenRow> =
            sqlx::query_as("SELECT id, token_string, expires FROM refresh_token ORDER BY seq")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("failed to list refresh tokens"))?;

        Ok(rows.into_iter().map(AuthToken::from).collect())
    }

    async fn get_page(&self, page: u64) -> Result<Vec<AuthToken>> {
        let offset = page_offset(page).ok_or_else(insufficient_tokens)?;

        let rows: Vec<RefreshTokenRow> = sqlx::query_as(
            "SELECT id, token_string, expires FROM refresh_token ORDER BY seq LIMIT $1 OFFSET $2",
        )
        .bind(PAGE_SIZE as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("failed to list refresh tokens"))?;

        if rows.is_empty() {
            return Err(insufficient_tokens());
        }
        Ok(rows.into_iter().map(AuthToken::from).collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("failed to delete refresh token"))?;

        if result.rows_affected() == 0 {
            return Err(token_not_found());
        }
        Ok(())
    }

    async fn delete_expired(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE expires <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_error("failed to purge refresh tokens"))?;

        Ok(result.rows_affected())
    }
}
