pub mod auth;
pub mod employee;

use actix_web::web;

use crate::errors::{AppError, NOT_FOUND};

/// Mounts every route along with the extractor error handlers that keep
/// rejected bodies, paths and queries in the JSON error shape.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::ParseError(format!("JSON parse error - {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|_err, _req| {
        AppError::NotFound(NOT_FOUND.to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::ParseError(format!("Query parse error - {}", err)).into()
    }))
    .service(
        web::resource("/auth/token")
            .route(web::post().to(auth::obtain_token)),
    )
    .service(
        web::resource("/auth/token/refresh")
            .route(web::post().to(auth::refresh_token)),
    )
    .service(
        web::resource("/employees")
            .route(web::get().to(employee::get_employees))
            .route(web::post().to(employee::create_employee)),
    )
    .service(
        web::resource("/employees/{id}")
            .route(web::get().to(employee::get_employee))
            .route(web::put().to(employee::replace_employee))
            .route(web::patch().to(employee::update_employee))
            .route(web::delete().to(employee::delete_employee)),
    );
}
