use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use regex::RegexBuilder;
use tokio::sync::RwLock;

use super::{
    AdminRepository, PostRepository, StoreError, StoreResult, StudentRepository, UserRepository,
};
use crate::models::account::ProfileChanges;
use crate::models::admin::Admin;
use crate::models::post::{Page, Post, PostFilter, Reply};
use crate::models::student::{Mood, Student};
use crate::models::user::User;

/// Process-local store with the same contract as `MongoStore`, including
/// unique emails and the active-post filter.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    students: RwLock<Vec<Student>>,
    admins: RwLock<Vec<Admin>>,
    posts: RwLock<Vec<Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// `emails` yields `(id, email)` pairs; an account keeping its own email is fine.
fn email_taken<'a>(
    mut emails: impl Iterator<Item = (&'a str, &'a str)>,
    id: &str,
    email: &str,
) -> bool {
    emails.any(|(other_id, other_email)| other_id != id && other_email == email)
}

/// Canonical lowercase hex of a post id, matching how MongoDB resolves an
/// `ObjectId` whatever the input case.
fn post_key(id: &str) -> Option<String> {
    ObjectId::parse_str(id).ok().map(|oid| oid.to_hex())
}

fn apply_changes(
    name: &mut String,
    email: &mut String,
    password: &mut String,
    updated_at: &mut DateTime<Utc>,
    changes: &ProfileChanges,
) {
    if let Some(n) = &changes.name {
        *name = n.clone();
    }
    if let Some(e) = &changes.email {
        *email = e.clone();
    }
    if let Some(p) = &changes.password {
        *password = p.clone();
    }
    *updated_at = Utc::now();
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".into()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl StudentRepository for MemoryStore {
    async fn insert_student(&self, student: &Student) -> StoreResult<()> {
        let mut students = self.students.write().await;
        if students.iter().any(|s| s.email == student.email) {
            return Err(StoreError::Duplicate("email".into()));
        }
        students.push(student.clone());
        Ok(())
    }

    async fn find_student_by_email(&self, email: &str) -> StoreResult<Option<Student>> {
        Ok(self.students.read().await.iter().find(|s| s.email == email).cloned())
    }

    async fn find_student_by_id(&self, id: &str) -> StoreResult<Option<Student>> {
        Ok(self.students.read().await.iter().find(|s| s.id == id).cloned())
    }

    async fn update_student_profile(
        &self,
        id: &str,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<Student>> {
        let mut students = self.students.write().await;
        if let Some(email) = &changes.email {
            let emails = students.iter().map(|s| (s.id.as_str(), s.email.as_str()));
            if email_taken(emails, id, email) {
                return Err(StoreError::Duplicate("email".into()));
            }
        }
        let Some(student) = students.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        apply_changes(
            &mut student.name,
            &mut student.email,
            &mut student.password,
            &mut student.updated_at,
            changes,
        );
        Ok(Some(student.clone()))
    }

    async fn set_student_mood(&self, id: &str, mood: &Mood) -> StoreResult<Option<Student>> {
        let mut students = self.students.write().await;
        Ok(students.iter_mut().find(|s| s.id == id).map(|student| {
            student.mood = Some(mood.clone());
            student.updated_at = Utc::now();
            student.clone()
        }))
    }

    async fn list_students(&self) -> StoreResult<Vec<Student>> {
        let mut students = self.students.read().await.clone();
        students.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(students)
    }
}

#[async_trait]
impl AdminRepository for MemoryStore {
    async fn insert_admin(&self, admin: &Admin) -> StoreResult<()> {
        let mut admins = self.admins.write().await;
        if admins.iter().any(|a| a.email == admin.email) {
            return Err(StoreError::Duplicate("email".into()));
        }
        admins.push(admin.clone());
        Ok(())
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>> {
        Ok(self.admins.read().await.iter().find(|a| a.email == email).cloned())
    }

    async fn find_admin_by_id(&self, id: &str) -> StoreResult<Option<Admin>> {
        Ok(self.admins.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn update_admin_profile(
        &self,
        id: &str,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<Admin>> {
        let mut admins = self.admins.write().await;
        if let Some(email) = &changes.email {
            let emails = admins.iter().map(|a| (a.id.as_str(), a.email.as_str()));
            if email_taken(emails, id, email) {
                return Err(StoreError::Duplicate("email".into()));
            }
        }
        let Some(admin) = admins.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        apply_changes(
            &mut admin.name,
            &mut admin.email,
            &mut admin.password,
            &mut admin.updated_at,
            changes,
        );
        Ok(Some(admin.clone()))
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        self.posts.write().await.push(post.clone());
        Ok(())
    }

    async fn find_active_post(&self, id: &str) -> StoreResult<Option<Post>> {
        let Some(key) = post_key(id) else {
            return Ok(None);
        };
        Ok(self
            .posts
            .read()
            .await
            .iter()
            .find(|p| p.is_active && p.id == key)
            .cloned())
    }

    async fn list_active_posts(
        &self,
        filter: &PostFilter,
        page: Page,
    ) -> StoreResult<(Vec<Post>, u64)> {
        let search = match &filter.search {
            Some(text) => Some(
                RegexBuilder::new(&regex::escape(text))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| StoreError::Malformed(e.to_string()))?,
            ),
            None => None,
        };

        let mut matching: Vec<Post> = self
            .posts
            .read()
            .await
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| filter.category.map_or(true, |c| p.category == c))
            .filter(|p| search.as_ref().map_or(true, |re| re.is_match(&p.content)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let posts = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok((posts, total))
    }

    async fn count_posts_since(&self, ip_hash: &str, since: DateTime<Utc>) -> StoreResult<u64> {
        Ok(self
            .posts
            .read()
            .await
            .iter()
            .filter(|p| p.ip_hash == ip_hash && p.created_at >= since)
            .count() as u64)
    }

    async fn increment_likes(&self, id: &str) -> StoreResult<Option<i64>> {
        let Some(key) = post_key(id) else {
            return Ok(None);
        };
        let mut posts = self.posts.write().await;
        Ok(posts
            .iter_mut()
            .find(|p| p.is_active && p.id == key)
            .map(|post| {
                post.likes += 1;
                post.updated_at = Utc::now();
                post.likes
            }))
    }

    async fn push_reply(&self, id: &str, reply: &Reply) -> StoreResult<Option<usize>> {
        let Some(key) = post_key(id) else {
            return Ok(None);
        };
        let mut posts = self.posts.write().await;
        Ok(posts
            .iter_mut()
            .find(|p| p.is_active && p.id == key)
            .map(|post| {
                post.replies.push(reply.clone());
                post.updated_at = Utc::now();
                post.replies.len()
            }))
    }
}
