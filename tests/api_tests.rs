use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};

use chrono::{Duration, Utc};
use therapy_api::auth::create_token;
use therapy_api::models::post::{Post, PostCategory};
use therapy_api::models::user::Role;
use therapy_api::store::{MemoryStore, PostRepository};
use therapy_api::{routes, AppState, Authentication, Config};

const SECRET: &str = "test-secret";

fn test_config() -> Config {
    Config {
        mongo_uri: "mongodb://unused".to_string(),
        database_name: "therapy_test".to_string(),
        jwt_secret: SECRET.to_string(),
        bind_address: "127.0.0.1:0".to_string(),
        frontend_origin: "http://localhost:3000".to_string(),
        token_ttl_hours: 1,
        bcrypt_cost: 4,
        ip_hash_salt: "salt".to_string(),
        post_rate_limit: 5,
        post_rate_window_secs: 3600,
    }
}

macro_rules! spawn_app {
    () => {
        spawn_app!(Arc::new(MemoryStore::new()))
    };
    ($store:expr) => {
        test::init_service(
            App::new()
                .wrap(Authentication::new(SECRET))
                .app_data(web::Data::new(AppState {
                    store: $store,
                    config: test_config(),
                }))
                .configure(routes),
        )
        .await
    };
}

/// Sends a request and returns the status plus the JSON body.
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

fn new_post(content: &str, ip: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/peer-support/posts")
        .insert_header(("x-forwarded-for", ip.to_string()))
        .set_json(json!({ "content": content }))
}

/* -------------------------------------------------------------------------- */
/* Patient / therapist accounts                                               */
/* -------------------------------------------------------------------------- */

#[actix_web::test]
async fn register_login_and_session() {
    let app = spawn_app!();

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "Dr. Rivera",
            "email": "Rivera@Clinic.org",
            "password": "longenough",
            "role": "therapist"
        }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "rivera@clinic.org");
    assert_eq!(body["user"]["role"], "therapist");
    assert!(body["user"].get("password").is_none());

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "rivera@clinic.org", "password": "longenough" }))
    );
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/auth/session")
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Dr. Rivera");
}

#[actix_web::test]
async fn duplicate_registration_conflicts() {
    let app = spawn_app!();
    let register = || {
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "Pat",
            "email": "pat@example.com",
            "password": "longenough",
            "role": "patient"
        }))
    };

    let (status, _) = send!(app, register());
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send!(app, register());
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn registration_validates_fields_and_role() {
    let app = spawn_app!();

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "Pat",
            "email": "not-an-email",
            "password": "short",
            "role": "patient"
        }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].get("email").is_some());
    assert!(body["details"].get("password").is_some());

    let (status, _) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "Pat",
            "email": "pat@example.com",
            "password": "longenough",
            "role": "admin"
        }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "Pat",
            "email": "pat@example.com",
            "password": "longenough",
            "role": "wizard"
        }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
}

#[actix_web::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let app = spawn_app!();
    let (status, _) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "Pat",
            "email": "pat@example.com",
            "password": "longenough",
            "role": "patient"
        }))
    );
    assert_eq!(status, StatusCode::CREATED);

    let (status, wrong_pw) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "pat@example.com", "password": "nottheone" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "nobody@example.com", "password": "whatever1" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw, unknown);
}

#[actix_web::test]
async fn session_requires_a_valid_token() {
    let app = spawn_app!();

    let (status, _) = send!(app, test::TestRequest::get().uri("/api/auth/session"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/auth/session")
            .insert_header(bearer("garbage.token.value"))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

/* -------------------------------------------------------------------------- */
/* Peer support                                                               */
/* -------------------------------------------------------------------------- */

#[actix_web::test]
async fn create_post_assigns_anonymous_id_and_hides_ip_hash() {
    let app = spawn_app!();

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/peer-support/posts")
            .insert_header(("x-forwarded-for", "198.51.100.7"))
            .set_json(json!({ "content": "  Exams are getting to me  ", "category": "academic" }))
    );
    assert_eq!(status, StatusCode::CREATED);
    let post = &body["post"];
    assert_eq!(post["content"], "Exams are getting to me");
    assert_eq!(post["category"], "academic");
    assert_eq!(post["likes"], 0);
    assert_eq!(post["replyCount"], 0);
    let anonymous_id = post["anonymousId"].as_str().unwrap();
    assert!(anonymous_id.starts_with("Student_"));
    assert_eq!(anonymous_id.len(), "Student_X123".len());
    assert!(post.get("ipHash").is_none());
    assert!(post.get("isActive").is_none());
}

#[actix_web::test]
async fn post_content_is_bounded() {
    let app = spawn_app!();

    let (status, body) = send!(app, new_post(&"a".repeat(2001), "198.51.100.1"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].get("content").is_some());

    let (status, _) = send!(app, new_post("    ", "198.51.100.1"));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send!(app, new_post(&"a".repeat(2000), "198.51.100.1"));
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/peer-support/posts")
            .set_json(json!({ "content": "hi", "category": "gaming" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn sixth_post_within_the_hour_is_rate_limited() {
    let app = spawn_app!();

    for i in 0..5 {
        let (status, _) = send!(app, new_post(&format!("post {}", i), "203.0.113.50"));
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, body) = send!(app, new_post("one too many", "203.0.113.50"));
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());

    let (status, _) = send!(app, new_post("someone else", "203.0.113.51"));
    assert_eq!(status, StatusCode::CREATED);
}

#[actix_web::test]
async fn list_paginates_filters_and_searches() {
    let app = spawn_app!();

    let seed = [
        ("Panic attacks before class", "anxiety", "10.1.0.1"),
        ("Cannot sleep again", "stress", "10.1.0.2"),
        ("Feeling lonely [week 3]", "loneliness", "10.1.0.3"),
        ("Anxious about finals", "anxiety", "10.1.0.4"),
    ];
    for (content, category, ip) in seed {
        let (status, _) = send!(
            app,
            test::TestRequest::post()
                .uri("/api/peer-support/posts")
                .insert_header(("x-forwarded-for", ip))
                .set_json(json!({ "content": content, "category": category }))
        );
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send!(
        app,
        test::TestRequest::get().uri("/api/peer-support/posts?page=1&limit=3")
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"].as_array().unwrap().len(), 3);
    assert_eq!(body["pagination"]["total"], 4);
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["pagination"]["hasMore"], true);

    let (_, body) = send!(
        app,
        test::TestRequest::get().uri("/api/peer-support/posts?page=2&limit=3")
    );
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["hasMore"], false);

    let (_, body) = send!(
        app,
        test::TestRequest::get().uri("/api/peer-support/posts?category=anxiety")
    );
    let posts = body["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert!(posts.iter().all(|p| p["category"] == "anxiety"));

    let (_, body) = send!(
        app,
        test::TestRequest::get().uri("/api/peer-support/posts?category=all&search=ANXIOUS")
    );
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["posts"][0]["content"], "Anxious about finals");

    // regex metacharacters are matched literally
    let (_, body) = send!(
        app,
        test::TestRequest::get().uri("/api/peer-support/posts?search=%5Bweek")
    );
    assert_eq!(body["pagination"]["total"], 1);

    let (status, _) = send!(
        app,
        test::TestRequest::get().uri("/api/peer-support/posts?category=gaming")
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send!(
        app,
        test::TestRequest::get().uri("/api/peer-support/posts?page=abc")
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn like_counts_up_and_rejects_unknown_posts() {
    let app = spawn_app!();
    let (_, body) = send!(app, new_post("Small win today", "10.2.0.1"));
    let id = body["post"]["id"].as_str().unwrap().to_string();

    for expected in 1..=2 {
        let (status, body) = send!(
            app,
            test::TestRequest::post().uri(&format!("/api/peer-support/posts/{}/like", id))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["likes"], expected);
    }

    let missing = ObjectId::new().to_hex();
    let (status, body) = send!(
        app,
        test::TestRequest::post().uri(&format!("/api/peer-support/posts/{}/like", missing))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");

    let (status, _) = send!(
        app,
        test::TestRequest::post().uri("/api/peer-support/posts/not-an-id/like")
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn replies_are_appended() {
    let app = spawn_app!();
    let (_, body) = send!(app, new_post("Anyone else nervous?", "10.3.0.1"));
    let id = body["post"]["id"].as_str().unwrap().to_string();
    let reply_uri = format!("/api/peer-support/posts/{}/reply", id);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&reply_uri)
            .set_json(json!({ "content": "You are not alone", "isVolunteer": true }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["replyCount"], 1);
    assert_eq!(body["reply"]["isVolunteer"], true);
    assert!(body["reply"]["anonymousId"].as_str().unwrap().starts_with("Student_"));

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&reply_uri)
            .set_json(json!({ "content": "Same here" }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["replyCount"], 2);
    assert_eq!(body["reply"]["isVolunteer"], false);

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&reply_uri)
            .set_json(json!({ "content": "x".repeat(1001) }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send!(
        app,
        test::TestRequest::get().uri(&format!("/api/peer-support/posts/{}", id))
    );
    assert_eq!(status, StatusCode::OK);
    let replies = body["post"]["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["content"], "You are not alone");
    assert_eq!(replies[1]["content"], "Same here");

    let missing = ObjectId::new().to_hex();
    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/peer-support/posts/{}/reply", missing))
            .set_json(json!({ "content": "hello?" }))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn page_past_the_end_is_empty() {
    let app = spawn_app!();
    let (status, _) = send!(app, new_post("only post", "10.4.0.1"));
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/peer-support/posts?page=18446744073709551615&limit=10")
    );
    assert_eq!(status, StatusCode::OK);
    assert!(body["posts"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["hasMore"], false);
}

#[actix_web::test]
async fn hidden_posts_are_not_reachable() {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    let hidden = Post {
        id: ObjectId::new().to_hex(),
        content: "Removed by a moderator".to_string(),
        category: PostCategory::Other,
        likes: 0,
        replies: Vec::new(),
        anonymous_id: "Student_H404".to_string(),
        ip_hash: "moderated".to_string(),
        is_active: false,
        created_at: now,
        updated_at: now,
    };
    store.insert_post(&hidden).await.unwrap();
    let app = spawn_app!(store.clone());

    let uri = format!("/api/peer-support/posts/{}", hidden.id);
    let (status, _) = send!(app, test::TestRequest::get().uri(&uri));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send!(app, test::TestRequest::post().uri(&format!("{}/like", uri)));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("{}/reply", uri))
            .set_json(json!({ "content": "still there?" }))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send!(app, test::TestRequest::get().uri("/api/peer-support/posts"));
    assert_eq!(body["pagination"]["total"], 0);
}

#[actix_web::test]
async fn malformed_post_ids_are_rejected() {
    let app = spawn_app!();

    let (status, body) = send!(
        app,
        test::TestRequest::get().uri("/api/peer-support/posts/not-an-id")
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid post id");

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/peer-support/posts/12345/reply")
            .set_json(json!({ "content": "hello" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn post_ids_are_case_insensitive() {
    let app = spawn_app!();
    let (_, body) = send!(app, new_post("Upper or lower", "10.5.0.1"));
    let id = body["post"]["id"].as_str().unwrap().to_uppercase();

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri(&format!("/api/peer-support/posts/{}/like", id))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["likes"], 1);

    let (status, _) = send!(
        app,
        test::TestRequest::get().uri(&format!("/api/peer-support/posts/{}", id))
    );
    assert_eq!(status, StatusCode::OK);
}

/* -------------------------------------------------------------------------- */
/* Students and admins                                                        */
/* -------------------------------------------------------------------------- */

/// Registers a student or admin account and returns its bearer token.
macro_rules! register_token {
    ($app:expr, $uri:expr, $email:expr) => {{
        let (status, body) = send!(
            $app,
            test::TestRequest::post().uri($uri).set_json(json!({
                "name": "Test Account",
                "email": $email,
                "password": "longenough"
            }))
        );
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }};
}

#[actix_web::test]
async fn student_profile_and_mood() {
    let app = spawn_app!();
    let token = register_token!(app, "/api/student/auth/register", "sam@uni.edu");

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/student/profile")
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student"]["email"], "sam@uni.edu");
    assert!(body["student"]["mood"].is_null());

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri("/api/student/mood")
            .insert_header(bearer(&token))
            .set_json(json!({ "status": "anxious", "frequency": "often" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mood"]["status"], "anxious");
    assert!(body["mood"]["lastRecorded"].is_string());

    let (_, _) = send!(
        app,
        test::TestRequest::put()
            .uri("/api/student/mood")
            .insert_header(bearer(&token))
            .set_json(json!({ "status": "calm", "frequency": "sometimes" }))
    );
    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/student/mood")
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mood"]["status"], "calm");
    assert_eq!(body["mood"]["frequency"], "sometimes");

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri("/api/student/mood")
            .insert_header(bearer(&token))
            .set_json(json!({ "status": "ecstatic", "frequency": "often" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri("/api/student/profile")
            .insert_header(bearer(&token))
            .set_json(json!({ "name": "Samantha" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student"]["name"], "Samantha");

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri("/api/student/profile")
            .insert_header(bearer(&token))
            .set_json(json!({}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn student_login_and_email_conflicts() {
    let app = spawn_app!();
    let token = register_token!(app, "/api/student/auth/register", "one@uni.edu");
    register_token!(app, "/api/student/auth/register", "two@uni.edu");

    let (status, _) = send!(
        app,
        test::TestRequest::post().uri("/api/student/auth/register").set_json(json!({
            "name": "Again", "email": "ONE@uni.edu", "password": "longenough"
        }))
    );
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri("/api/student/profile")
            .insert_header(bearer(&token))
            .set_json(json!({ "email": "two@uni.edu" }))
    );
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/student/auth/login")
            .set_json(json!({ "email": "one@uni.edu", "password": "longenough" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/student/auth/login")
            .set_json(json!({ "email": "one@uni.edu", "password": "wrongpass" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn role_guards() {
    let app = spawn_app!();
    let student = register_token!(app, "/api/student/auth/register", "stu@uni.edu");
    let admin = register_token!(app, "/api/admin/auth/register", "boss@uni.edu");

    let (status, _) = send!(app, test::TestRequest::get().uri("/api/student/profile"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/student/mood")
            .insert_header(bearer(&admin))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/admin/students")
            .insert_header(bearer(&student))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/auth/session")
            .insert_header(bearer(&student))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_profile_and_roster() {
    let app = spawn_app!();
    let admin = register_token!(app, "/api/admin/auth/register", "admin@uni.edu");
    register_token!(app, "/api/student/auth/register", "a@uni.edu");
    register_token!(app, "/api/student/auth/register", "b@uni.edu");

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/admin/students")
            .insert_header(bearer(&admin))
    );
    assert_eq!(status, StatusCode::OK);
    let students = body["students"].as_array().unwrap();
    assert_eq!(students.len(), 2);
    assert_eq!(students[0]["email"], "b@uni.edu");
    assert_eq!(students[1]["email"], "a@uni.edu");
    assert!(students.iter().all(|s| s.get("password").is_none()));

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri("/api/admin/profile")
            .insert_header(bearer(&admin))
            .set_json(json!({ "name": "Head Admin", "password": "evenlongerpass" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["admin"]["name"], "Head Admin");

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/admin/auth/login")
            .set_json(json!({ "email": "admin@uni.edu", "password": "longenough" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/admin/auth/login")
            .set_json(json!({ "email": "admin@uni.edu", "password": "evenlongerpass" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["admin"]["name"], "Head Admin");

    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/admin/profile")
            .insert_header(bearer(&admin))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["admin"]["email"], "admin@uni.edu");
}

#[actix_web::test]
async fn tokens_for_missing_accounts_get_not_found() {
    let app = spawn_app!();
    let token_for = |role| create_token("ghost-account", role, SECRET, Duration::hours(1)).unwrap();

    let student = token_for(Role::Student);
    for uri in ["/api/student/profile", "/api/student/mood"] {
        let (status, body) = send!(
            app,
            test::TestRequest::get().uri(uri).insert_header(bearer(&student))
        );
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["error"], "Student not found");
    }
    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri("/api/student/mood")
            .insert_header(bearer(&student))
            .set_json(json!({ "status": "sad", "frequency": "rarely" }))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let admin = token_for(Role::Admin);
    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/admin/profile")
            .insert_header(bearer(&admin))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Admin not found");

    let patient = token_for(Role::Patient);
    let (status, body) = send!(
        app,
        test::TestRequest::get()
            .uri("/api/auth/session")
            .insert_header(bearer(&patient))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}
