//! In-memory credential store
//!
//! Each table is a `Vec` behind a `tokio::sync::RwLock`, so insertion order
//! is the page order and every operation is atomic with respect to the others
//! on the same table. Contents are lost on restart.

use async_trait::async_trait;
use authgate_core::{
    models::validate_email, paginate, AuthGateError, AuthToken, Result, User, UserUpdate,
};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    insufficient_tokens, insufficient_users, token_not_found, user_not_found, CredentialStore,
    RefreshTokenRepository, UserRepository,
};

#[derive(Default)]
struct UserTable {
    rows: Vec<User>,
    last_id: i64,
}

/// Users held in process memory
#[derive(Default)]
pub struct MemoryUserRepository {
    table: RwLock<UserTable>,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn get_by_id(&self, id: i64) -> Result<User> {
        let table = self.table.read().await;
        table
            .rows
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(user_not_found)
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        validate_email(email)?;

        let table = self.table.read().await;
        table
            .rows
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(user_not_found)
    }

    async fn get_all(&self) -> Result<Vec<User>> {
        Ok(self.table.read().await.rows.clone())
    }

    async fn get_page(&self, page: u64) -> Result<Vec<User>> {
        let table = self.table.read().await;
        paginate(&table.rows, page).ok_or_else(insufficient_users)
    }

    async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        admin: bool,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let mut user = User::new(email, password_hash, admin, now)?;

        let mut table = self.table.write().await;
        table.last_id += 1;
        user.id = table.last_id;
        table.rows.push(user.clone());

        Ok(user)
    }

    async fn update(&self, id: i64, update: &UserUpdate) -> Result<User> {
        update.validate()?;

        let mut table = self.table.write().await;
        let user = table
            .rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(user_not_found)?;
        update.apply_to(user);

        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut table = self.table.write().await;
        let index = table
            .rows
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(user_not_found)?;
        table.rows.remove(index);
        Ok(())
    }
}

/// Refresh tokens held in process memory
#[derive(Default)]
pub struct MemoryRefreshTokenRepository {
    rows: RwLock<Vec<AuthToken>>,
}

#[async_trait]
impl RefreshTokenRepository for MemoryRefreshTokenRepository {
    async fn insert(&self, token: &AuthToken) -> Result<()> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|t| t.uuid == token.uuid) {
            return Err(AuthGateError::Database(format!(
                "refresh token {} already exists",
                token.uuid
            )));
        }
        rows.push(token.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<AuthToken> {
        let rows = self.rows.read().await;
        rows.iter()
            .find(|t| t.uuid == id)
            .cloned()
            .ok_or_else(token_not_found)
    }

    async fn get_all(&self) -> Result<Vec<AuthToken>> {
        Ok(self.rows.read().await.clone())
    }

    async fn get_page(&self, page: u64) -> Result<Vec<AuthToken>> {
        let rows = self.rows.read().await;
        paginate(&rows, page).ok_or_else(insufficient_tokens)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut rows = self.rows.write().await;
        let index = rows
            .iter()
            .position(|t| t.uuid == id)
            .ok_or_else(token_not_found)?;
        rows.remove(index);
        Ok(())
    }

    async fn delete_expired(&self, now: i64) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|t| !t.is_expired_at(now));
        Ok((before - rows.len()) as u64)
    }
}

/// Both in-memory tables
#[derive(Default)]
pub struct MemoryStore {
    users: MemoryUserRepository,
    refresh_tokens: MemoryRefreshTokenRepository,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn refresh_tokens(&self) -> &dyn RefreshTokenRepository {
        &self.refresh_tokens
    }
}
