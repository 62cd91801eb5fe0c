//! Storage contracts the handlers talk to.
//!
//! `MongoStore` is the production implementation; `MemoryStore` keeps the
//! same contract in process memory.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::account::ProfileChanges;
use crate::models::admin::Admin;
use crate::models::post::{Page, Post, PostFilter, Reply};
use crate::models::student::{Mood, Student};
use crate::models::user::User;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique index rejected the write; carries the field name.
    #[error("duplicate value for unique field `{0}`")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] mongodb::bson::ser::Error),

    #[error("malformed record: {0}")]
    Malformed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Patient and therapist accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn insert_student(&self, student: &Student) -> StoreResult<()>;
    async fn find_student_by_email(&self, email: &str) -> StoreResult<Option<Student>>;
    async fn find_student_by_id(&self, id: &str) -> StoreResult<Option<Student>>;
    /// Returns the updated student, or `None` if it does not exist.
    async fn update_student_profile(
        &self,
        id: &str,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<Student>>;
    /// Replaces the whole mood sub-document.
    async fn set_student_mood(&self, id: &str, mood: &Mood) -> StoreResult<Option<Student>>;
    /// Newest first.
    async fn list_students(&self) -> StoreResult<Vec<Student>>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn insert_admin(&self, admin: &Admin) -> StoreResult<()>;
    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>>;
    async fn find_admin_by_id(&self, id: &str) -> StoreResult<Option<Admin>>;
    async fn update_admin_profile(
        &self,
        id: &str,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<Admin>>;
}

/// Peer-support board. Every read and mutation ignores inactive posts.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert_post(&self, post: &Post) -> StoreResult<()>;
    async fn find_active_post(&self, id: &str) -> StoreResult<Option<Post>>;
    /// One page of matching posts, newest first, plus the total match count.
    async fn list_active_posts(
        &self,
        filter: &PostFilter,
        page: Page,
    ) -> StoreResult<(Vec<Post>, u64)>;
    /// Posts created by `ip_hash` at or after `since`, active or not.
    async fn count_posts_since(&self, ip_hash: &str, since: DateTime<Utc>) -> StoreResult<u64>;
    /// Atomically adds one like; returns the new count.
    async fn increment_likes(&self, id: &str) -> StoreResult<Option<i64>>;
    /// Atomically appends a reply; returns the new reply count.
    async fn push_reply(&self, id: &str, reply: &Reply) -> StoreResult<Option<usize>>;
}

pub trait Store: UserRepository + StudentRepository + AdminRepository + PostRepository {}

impl<T> Store for T where T: UserRepository + StudentRepository + AdminRepository + PostRepository {}
