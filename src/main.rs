// src/main.rs

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info};

use therapy_api::store::{MongoStore, Store};
use therapy_api::{routes, AppState, Authentication, Config};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        error!("{}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let mongodb = MongoStore::init(&config.mongo_uri, &config.database_name)
        .await
        .map_err(io::Error::other)?;
    if let Err(e) = mongodb.ping().await {
        error!("MongoDB is not reachable: {}", e);
        return Err(io::Error::other(e));
    }
    mongodb.ensure_indexes().await.map_err(io::Error::other)?;
    let store: Arc<dyn Store> = Arc::new(mongodb);

    let bind_address = config.bind_address.clone();
    info!("Server running at http://{}", bind_address);
    info!("Allowed CORS Origin: {}", config.frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config.frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Authentication::new(&config.jwt_secret))
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(AppState {
                store: store.clone(),
                config: config.clone(),
            }))
            .configure(routes)
    })
    .bind(bind_address)?
    .run()
    .await
}
