use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use log::{debug, info};
use mongodb::bson::{doc, oid::ObjectId, to_bson, DateTime as BsonDateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use super::{
    AdminRepository, PostRepository, StoreError, StoreResult, StudentRepository, UserRepository,
};
use crate::models::account::ProfileChanges;
use crate::models::admin::Admin;
use crate::models::post::{Page, Post, PostCategory, PostFilter, Reply};
use crate::models::student::{Mood, MoodFrequency, MoodStatus, Student};
use crate::models::user::{Role, User};

const USERS: &str = "users";
const STUDENTS: &str = "students";
const ADMINS: &str = "admins";
const POSTS: &str = "peer_support_posts";

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store. Create one per process.
pub struct MongoStore {
    pub client: Client,
    pub db: Database,
}

impl MongoStore {
    pub async fn init(uri: &str, db_name: &str) -> StoreResult<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        Ok(MongoStore { client, db })
    }

    pub async fn ping(&self) -> StoreResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Unique emails per account collection, plus the lookups the board
    /// runs on every request.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        for name in [USERS, STUDENTS, ADMINS] {
            let index = IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.db.collection::<Document>(name).create_index(index).await?;
        }

        let posts = self.db.collection::<Document>(POSTS);
        posts
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "ipHash": 1, "createdAt": -1 })
                    .build(),
            )
            .await?;
        posts
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "isActive": 1, "category": 1, "createdAt": -1 })
                    .build(),
            )
            .await?;

        info!("MongoDB indexes ensured on {}", self.db.name());
        Ok(())
    }

    fn users(&self) -> Collection<UserDocument> {
        self.db.collection(USERS)
    }

    fn students(&self) -> Collection<StudentDocument> {
        self.db.collection(STUDENTS)
    }

    fn admins(&self) -> Collection<AdminDocument> {
        self.db.collection(ADMINS)
    }

    fn posts(&self) -> Collection<PostDocument> {
        self.db.collection(POSTS)
    }
}

/// Maps a duplicate-key failure on `field` to `StoreError::Duplicate`.
fn map_write_error(err: mongodb::error::Error, field: &str) -> StoreError {
    let code = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => Some(write_error.code),
        ErrorKind::Command(command_error) => Some(command_error.code),
        _ => None,
    };
    if code == Some(DUPLICATE_KEY) {
        StoreError::Duplicate(field.to_string())
    } else {
        StoreError::Database(err)
    }
}

fn to_bson_date(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

fn from_bson_date(dt: BsonDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}

fn profile_update(changes: &ProfileChanges) -> Document {
    let mut set_doc = doc! { "updatedAt": to_bson_date(Utc::now()) };
    if let Some(name) = &changes.name {
        set_doc.insert("name", name);
    }
    if let Some(email) = &changes.email {
        set_doc.insert("email", email);
    }
    if let Some(password) = &changes.password {
        set_doc.insert("password", password);
    }
    doc! { "$set": set_doc }
}

/* -------------------------------------------------------------------------- */
/* Account documents                                                          */
/* -------------------------------------------------------------------------- */

// Every stored timestamp is a native BSON date, so sorts and range queries
// compare instants rather than strings.

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    password: String,
    role: Role,
    created_at: BsonDateTime,
}

impl From<&User> for UserDocument {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            password: u.password.clone(),
            role: u.role,
            created_at: to_bson_date(u.created_at),
        }
    }
}

impl From<UserDocument> for User {
    fn from(d: UserDocument) -> Self {
        Self {
            id: d.id,
            name: d.name,
            email: d.email,
            password: d.password,
            role: d.role,
            created_at: from_bson_date(d.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoodDocument {
    status: MoodStatus,
    frequency: MoodFrequency,
    last_recorded: BsonDateTime,
}

impl From<&Mood> for MoodDocument {
    fn from(m: &Mood) -> Self {
        Self {
            status: m.status,
            frequency: m.frequency,
            last_recorded: to_bson_date(m.last_recorded),
        }
    }
}

impl From<MoodDocument> for Mood {
    fn from(d: MoodDocument) -> Self {
        Self {
            status: d.status,
            frequency: d.frequency,
            last_recorded: from_bson_date(d.last_recorded),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudentDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    password: String,
    #[serde(default)]
    mood: Option<MoodDocument>,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl From<&Student> for StudentDocument {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            email: s.email.clone(),
            password: s.password.clone(),
            mood: s.mood.as_ref().map(MoodDocument::from),
            created_at: to_bson_date(s.created_at),
            updated_at: to_bson_date(s.updated_at),
        }
    }
}

impl From<StudentDocument> for Student {
    fn from(d: StudentDocument) -> Self {
        Self {
            id: d.id,
            name: d.name,
            email: d.email,
            password: d.password,
            mood: d.mood.map(Mood::from),
            created_at: from_bson_date(d.created_at),
            updated_at: from_bson_date(d.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    password: String,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl From<&Admin> for AdminDocument {
    fn from(a: &Admin) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
            email: a.email.clone(),
            password: a.password.clone(),
            created_at: to_bson_date(a.created_at),
            updated_at: to_bson_date(a.updated_at),
        }
    }
}

impl From<AdminDocument> for Admin {
    fn from(d: AdminDocument) -> Self {
        Self {
            id: d.id,
            name: d.name,
            email: d.email,
            password: d.password,
            created_at: from_bson_date(d.created_at),
            updated_at: from_bson_date(d.updated_at),
        }
    }
}

#[async_trait]
impl UserRepository for MongoStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.users()
            .insert_one(UserDocument::from(user))
            .await
            .map_err(|e| map_write_error(e, "email"))?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "email": email }).await?.map(User::from))
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "_id": id }).await?.map(User::from))
    }
}

#[async_trait]
impl StudentRepository for MongoStore {
    async fn insert_student(&self, student: &Student) -> StoreResult<()> {
        self.students()
            .insert_one(StudentDocument::from(student))
            .await
            .map_err(|e| map_write_error(e, "email"))?;
        Ok(())
    }

    async fn find_student_by_email(&self, email: &str) -> StoreResult<Option<Student>> {
        Ok(self
            .students()
            .find_one(doc! { "email": email })
            .await?
            .map(Student::from))
    }

    async fn find_student_by_id(&self, id: &str) -> StoreResult<Option<Student>> {
        Ok(self.students().find_one(doc! { "_id": id }).await?.map(Student::from))
    }

    async fn update_student_profile(
        &self,
        id: &str,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<Student>> {
        let updated = self
            .students()
            .find_one_and_update(doc! { "_id": id }, profile_update(changes))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| map_write_error(e, "email"))?;
        Ok(updated.map(Student::from))
    }

    async fn set_student_mood(&self, id: &str, mood: &Mood) -> StoreResult<Option<Student>> {
        let mood = to_bson(&MoodDocument::from(mood))?;
        let update = doc! { "$set": { "mood": mood, "updatedAt": to_bson_date(Utc::now()) } };
        let updated = self
            .students()
            .find_one_and_update(doc! { "_id": id }, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(Student::from))
    }

    async fn list_students(&self) -> StoreResult<Vec<Student>> {
        let documents: Vec<StudentDocument> = self
            .students()
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(documents.into_iter().map(Student::from).collect())
    }
}

#[async_trait]
impl AdminRepository for MongoStore {
    async fn insert_admin(&self, admin: &Admin) -> StoreResult<()> {
        self.admins()
            .insert_one(AdminDocument::from(admin))
            .await
            .map_err(|e| map_write_error(e, "email"))?;
        Ok(())
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>> {
        Ok(self.admins().find_one(doc! { "email": email }).await?.map(Admin::from))
    }

    async fn find_admin_by_id(&self, id: &str) -> StoreResult<Option<Admin>> {
        Ok(self.admins().find_one(doc! { "_id": id }).await?.map(Admin::from))
    }

    async fn update_admin_profile(
        &self,
        id: &str,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<Admin>> {
        let updated = self
            .admins()
            .find_one_and_update(doc! { "_id": id }, profile_update(changes))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| map_write_error(e, "email"))?;
        Ok(updated.map(Admin::from))
    }
}

/* -------------------------------------------------------------------------- */
/* Peer-support documents                                                     */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    content: String,
    category: PostCategory,
    likes: i64,
    #[serde(default)]
    replies: Vec<ReplyDocument>,
    anonymous_id: String,
    ip_hash: String,
    is_active: bool,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyDocument {
    content: String,
    anonymous_id: String,
    is_volunteer: bool,
    timestamp: BsonDateTime,
}

impl From<&Reply> for ReplyDocument {
    fn from(r: &Reply) -> Self {
        Self {
            content: r.content.clone(),
            anonymous_id: r.anonymous_id.clone(),
            is_volunteer: r.is_volunteer,
            timestamp: to_bson_date(r.timestamp),
        }
    }
}

impl From<ReplyDocument> for Reply {
    fn from(r: ReplyDocument) -> Self {
        Self {
            content: r.content,
            anonymous_id: r.anonymous_id,
            is_volunteer: r.is_volunteer,
            timestamp: from_bson_date(r.timestamp),
        }
    }
}

impl TryFrom<&Post> for PostDocument {
    type Error = StoreError;

    fn try_from(p: &Post) -> Result<Self, Self::Error> {
        let id = ObjectId::parse_str(&p.id)
            .map_err(|e| StoreError::Malformed(format!("post id {}: {}", p.id, e)))?;
        Ok(Self {
            id,
            content: p.content.clone(),
            category: p.category,
            likes: p.likes,
            replies: p.replies.iter().map(ReplyDocument::from).collect(),
            anonymous_id: p.anonymous_id.clone(),
            ip_hash: p.ip_hash.clone(),
            is_active: p.is_active,
            created_at: to_bson_date(p.created_at),
            updated_at: to_bson_date(p.updated_at),
        })
    }
}

impl From<PostDocument> for Post {
    fn from(d: PostDocument) -> Self {
        Self {
            id: d.id.to_hex(),
            content: d.content,
            category: d.category,
            likes: d.likes,
            replies: d.replies.into_iter().map(Reply::from).collect(),
            anonymous_id: d.anonymous_id,
            ip_hash: d.ip_hash,
            is_active: d.is_active,
            created_at: from_bson_date(d.created_at),
            updated_at: from_bson_date(d.updated_at),
        }
    }
}

/// Filter for an active post by hex id; `None` when the id is not an ObjectId.
fn active_post_filter(id: &str) -> Option<Document> {
    ObjectId::parse_str(id)
        .ok()
        .map(|oid| doc! { "_id": oid, "isActive": true })
}

#[async_trait]
impl PostRepository for MongoStore {
    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        let document = PostDocument::try_from(post)?;
        self.posts().insert_one(&document).await?;
        Ok(())
    }

    async fn find_active_post(&self, id: &str) -> StoreResult<Option<Post>> {
        let Some(filter) = active_post_filter(id) else {
            return Ok(None);
        };
        Ok(self.posts().find_one(filter).await?.map(Post::from))
    }

    async fn list_active_posts(
        &self,
        filter: &PostFilter,
        page: Page,
    ) -> StoreResult<(Vec<Post>, u64)> {
        let mut query = doc! { "isActive": true };
        if let Some(category) = filter.category {
            query.insert("category", category.as_str());
        }
        if let Some(search) = &filter.search {
            query.insert(
                "content",
                doc! { "$regex": regex::escape(search), "$options": "i" },
            );
        }
        debug!("Listing posts with filter {:?}", query);

        let total = self.posts().count_documents(query.clone()).await?;
        let documents: Vec<PostDocument> = self
            .posts()
            .find(query)
            .sort(doc! { "createdAt": -1 })
            .skip(page.offset())
            .limit(page.size as i64)
            .await?
            .try_collect()
            .await?;

        Ok((documents.into_iter().map(Post::from).collect(), total))
    }

    async fn count_posts_since(&self, ip_hash: &str, since: DateTime<Utc>) -> StoreResult<u64> {
        let filter = doc! {
            "ipHash": ip_hash,
            "createdAt": { "$gte": to_bson_date(since) },
        };
        Ok(self.posts().count_documents(filter).await?)
    }

    async fn increment_likes(&self, id: &str) -> StoreResult<Option<i64>> {
        let Some(filter) = active_post_filter(id) else {
            return Ok(None);
        };
        let update = doc! {
            "$inc": { "likes": 1 },
            "$set": { "updatedAt": to_bson_date(Utc::now()) },
        };
        let updated = self
            .posts()
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(|d| d.likes))
    }

    async fn push_reply(&self, id: &str, reply: &Reply) -> StoreResult<Option<usize>> {
        let Some(filter) = active_post_filter(id) else {
            return Ok(None);
        };
        let reply_doc = to_bson(&ReplyDocument::from(reply))?;
        let update = doc! {
            "$push": { "replies": reply_doc },
            "$set": { "updatedAt": to_bson_date(Utc::now()) },
        };
        let updated = self
            .posts()
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(|d| d.replies.len()))
    }
}
