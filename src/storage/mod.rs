pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::models::{Car, Invitation, Member, NewCar, NewInvitation, NewMember};

pub use postgres::Database;

/// Обычная недоступность базы — это значение, а не паника:
/// сценарии ветвятся по нему и просят пользователя зайти позже.
#[derive(Debug)]
pub enum StorageError {
    Unavailable(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Unavailable(e) => write!(f, "storage unavailable: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Порт хранилища. Ядро знает только эти операции; за ними живут
/// Postgres в проде и память в тестах.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_member_by_tg_id(&self, tg_id: i64) -> StorageResult<Option<Member>>;
    async fn get_member_by_username(&self, username: &str) -> StorageResult<Option<Member>>;
    async fn create_member(&self, member: NewMember) -> StorageResult<Member>;
    async fn update_member(&self, member: &Member) -> StorageResult<()>;

    async fn get_car(&self, id: i64) -> StorageResult<Option<Car>>;
    async fn get_cars_by_member(&self, member_id: i64) -> StorageResult<Vec<Car>>;
    async fn get_cars_by_plate(&self, plate: &str) -> StorageResult<Vec<Car>>;
    async fn create_car(&self, car: NewCar) -> StorageResult<Car>;
    async fn update_car(&self, car: &Car) -> StorageResult<()>;

    async fn create_invitation(&self, invitation: NewInvitation) -> StorageResult<Invitation>;
    async fn update_invitation(&self, invitation: &Invitation) -> StorageResult<()>;
    async fn get_invitations_by_car(&self, car_id: i64) -> StorageResult<Vec<Invitation>>;
    async fn get_invitations_by_plate(&self, plate: &str) -> StorageResult<Vec<Invitation>>;
}
