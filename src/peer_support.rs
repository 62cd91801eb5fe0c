//! Anonymous peer-support board: `/api/peer-support/posts`.

use std::net::{IpAddr, SocketAddr};

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use log::{debug, info, warn};
use mongodb::bson::oid::ObjectId;
use rand::Rng;
use serde_json::json;
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::post::{
    CreatePostRequest, CreateReplyRequest, ListPostsQuery, Page, Pagination, Post, PostCategory,
    PostFilter, PostView, Reply,
};

const MAX_SEARCH_LENGTH: usize = 100;

/// Display handle of the form `Student_XNNN`, fresh for every post and reply.
pub fn anonymous_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let letter = rng.gen_range(b'A'..=b'Z') as char;
    let number: u16 = rng.gen_range(0..1000);
    format!("Student_{}{:03}", letter, number)
}

/// Salted SHA-256 of the client address, hex encoded. Raw IPs are never stored.
pub fn hash_ip(ip: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(ip.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Best-effort client address: Forwarded / X-Forwarded-For first, then the
/// peer address, without the port.
pub fn client_ip(req: &HttpRequest) -> String {
    let info = req.connection_info();
    let Some(raw) = info.realip_remote_addr() else {
        return "unknown".to_string();
    };
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }
    if let Ok(ip) = raw.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        return ip.to_string();
    }
    raw.to_string()
}

fn ensure_post_id(id: &str) -> ApiResult<()> {
    ObjectId::parse_str(id)
        .map(|_| ())
        .map_err(|_| ApiError::BadRequest("Invalid post id".to_string()))
}

fn post_not_found() -> ApiError {
    ApiError::NotFound("Post not found".to_string())
}

/// GET /api/peer-support/posts
pub async fn list_posts(
    data: web::Data<AppState>,
    query: web::Query<ListPostsQuery>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    let page = Page::new(query.page, query.limit);

    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(raw.parse::<PostCategory>().map_err(ApiError::BadRequest)?),
    };
    let search = query
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if search.as_ref().is_some_and(|s| s.chars().count() > MAX_SEARCH_LENGTH) {
        return Err(ApiError::BadRequest(format!(
            "Search text must be at most {} characters",
            MAX_SEARCH_LENGTH
        )));
    }

    let filter = PostFilter { category, search };
    let (posts, total) = data.store.list_active_posts(&filter, page).await?;
    debug!("Listed {} of {} posts (page {})", posts.len(), total, page.number);

    let posts: Vec<PostView> = posts.iter().map(PostView::from).collect();
    Ok(HttpResponse::Ok().json(json!({
        "posts": posts,
        "pagination": Pagination::new(page, total),
    })))
}

/// POST /api/peer-support/posts
pub async fn create_post(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreatePostRequest>,
) -> ApiResult<HttpResponse> {
    let mut payload = payload.into_inner();
    payload.content = payload.content.trim().to_string();
    payload.validate()?;

    let config = &data.config;
    let ip_hash = hash_ip(&client_ip(&req), &config.ip_hash_salt);
    let window_start = Utc::now() - Duration::seconds(config.post_rate_window_secs);
    let recent = data.store.count_posts_since(&ip_hash, window_start).await?;
    if recent >= config.post_rate_limit {
        warn!("Post rate limit hit for {} ({} recent posts)", &ip_hash[..12], recent);
        return Err(ApiError::TooManyRequests(
            "Too many posts. Please wait before posting again.".to_string(),
        ));
    }

    let now = Utc::now();
    let post = Post {
        id: ObjectId::new().to_hex(),
        content: payload.content,
        category: payload.category,
        likes: 0,
        replies: Vec::new(),
        anonymous_id: anonymous_id(&mut rand::thread_rng()),
        ip_hash,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    data.store.insert_post(&post).await?;
    info!("Peer support post created: {} [{}]", post.id, post.category);

    Ok(HttpResponse::Created().json(json!({ "post": PostView::from(&post) })))
}

/// GET /api/peer-support/posts/{id}
pub async fn get_post(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    ensure_post_id(&id)?;

    let post = data
        .store
        .find_active_post(&id)
        .await?
        .ok_or_else(post_not_found)?;
    Ok(HttpResponse::Ok().json(json!({ "post": PostView::from(&post) })))
}

/// POST /api/peer-support/posts/{id}/like
pub async fn like_post(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    ensure_post_id(&id)?;

    let likes = data
        .store
        .increment_likes(&id)
        .await?
        .ok_or_else(post_not_found)?;
    Ok(HttpResponse::Ok().json(json!({ "likes": likes })))
}

/// POST /api/peer-support/posts/{id}/reply
pub async fn reply_to_post(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<CreateReplyRequest>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    ensure_post_id(&id)?;

    let mut payload = payload.into_inner();
    payload.content = payload.content.trim().to_string();
    payload.validate()?;

    let reply = Reply {
        content: payload.content,
        anonymous_id: anonymous_id(&mut rand::thread_rng()),
        is_volunteer: payload.is_volunteer,
        timestamp: Utc::now(),
    };
    let reply_count = data
        .store
        .push_reply(&id, &reply)
        .await?
        .ok_or_else(post_not_found)?;
    info!("Reply added to post {} ({} replies)", id, reply_count);

    Ok(HttpResponse::Created().json(json!({ "reply": reply, "replyCount": reply_count })))
}
