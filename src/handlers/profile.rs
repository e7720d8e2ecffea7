// src/handlers/profile.rs
// DOCUMENTATION: The caller's own profile

use crate::errors::VillageError;
use crate::handlers::auth::current_profile;
use crate::models::EditProfileRequest;
use crate::services::profile_service;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use sqlx::PgPool;

/// GET /profile
pub async fn get_profile(
    pool: web::Data<PgPool>,
    req: HttpRequest,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    Ok(HttpResponse::Ok().json(caller.to_response()))
}

/// PUT /profile
pub async fn edit_profile(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    body: web::Json<EditProfileRequest>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let updated = profile_service::edit_profile(pool.get_ref(), &caller, &body).await?;
    Ok(HttpResponse::Ok().json(updated.to_response()))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/profile", web::get().to(get_profile))
        .route("/profile", web::put().to(edit_profile));
}
