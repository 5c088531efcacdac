pub mod handlers;

use crate::{error::StudioError, studio::Studio};
use actix_web::{http::StatusCode, middleware, web, App, HttpResponse, HttpServer, ResponseError};
use serde_json::json;

impl ResponseError for StudioError {
    fn status_code(&self) -> StatusCode {
        match self {
            StudioError::Unauthenticated => StatusCode::UNAUTHORIZED,
            StudioError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            StudioError::NotFound => StatusCode::NOT_FOUND,
            StudioError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("Request failed: {}", self);
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/generate", web::post().to(handlers::generate))
            .route("/feed", web::get().to(handlers::feed))
            .service(
                web::resource("/feed/save")
                    .route(web::get().to(handlers::saved_ids))
                    .route(web::post().to(handlers::save))
                    .route(web::delete().to(handlers::unsave)),
            )
            .route("/collection", web::get().to(handlers::collection))
            .route("/history", web::get().to(handlers::history))
            .route("/me", web::get().to(handlers::me))
            .route("/health", web::get().to(handlers::health))
            .service(
                web::resource("/image/{id}")
                    .route(web::get().to(handlers::get_image))
                    .route(web::delete().to(handlers::delete_image)),
            ),
    )
    .route("/auth/callback", web::get().to(handlers::auth_callback))
    .route(
        "/storage/v1/object/public/{bucket}/{path:.*}",
        web::get().to(handlers::public_object),
    );
}

pub async fn run(studio: Studio, port: u16) -> std::io::Result<()> {
    let data = web::Data::new(studio);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::new("%r %s %Dms"))
            .configure(routes)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
