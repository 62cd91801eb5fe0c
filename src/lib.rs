pub mod admin;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod peer_support;
pub mod store;
pub mod student;

use actix_web::web;

pub use app_state::AppState;
pub use config::Config;
pub use middleware::Authentication;

use crate::error::{json_error_handler, query_error_handler};

/// Registers every route. The caller wraps the app in `Authentication` and
/// provides `web::Data<AppState>`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        // NextAuth-style credential accounts
        .service(
            web::scope("/api/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .route("/session", web::get().to(auth::session)),
        )
        // PEER SUPPORT
        .service(
            web::scope("/api/peer-support/posts")
                .route("", web::get().to(peer_support::list_posts))
                .route("", web::post().to(peer_support::create_post))
                .route("/{id}", web::get().to(peer_support::get_post))
                .route("/{id}/like", web::post().to(peer_support::like_post))
                .route("/{id}/reply", web::post().to(peer_support::reply_to_post)),
        )
        // STUDENTS
        .service(
            web::scope("/api/student")
                .route("/auth/register", web::post().to(student::register))
                .route("/auth/login", web::post().to(student::login))
                .route("/profile", web::get().to(student::get_profile))
                .route("/profile", web::put().to(student::update_profile))
                .route("/mood", web::get().to(student::get_mood))
                .route("/mood", web::put().to(student::update_mood)),
        )
        // ADMINS
        .service(
            web::scope("/api/admin")
                .route("/auth/register", web::post().to(admin::register))
                .route("/auth/login", web::post().to(admin::login))
                .route("/profile", web::get().to(admin::get_profile))
                .route("/profile", web::put().to(admin::update_profile))
                .route("/students", web::get().to(admin::list_students)),
        );
}
