// src/handlers/groups.rs
// DOCUMENTATION: HTTP handlers for groups

use crate::errors::VillageError;
use crate::handlers::auth::current_profile;
use crate::models::GroupRequest;
use crate::services::group_service;
use crate::services::Notifiers;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// GET /groups
pub async fn list_groups(
    pool: web::Data<PgPool>,
    req: HttpRequest,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let groups = group_service::list_groups(pool.get_ref(), &caller).await?;
    Ok(HttpResponse::Ok().json(json!({ "groups": groups })))
}

/// POST /groups
pub async fn add_group(
    pool: web::Data<PgPool>,
    notifiers: web::Data<Notifiers>,
    req: HttpRequest,
    body: web::Json<GroupRequest>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let group = group_service::add_group(pool.get_ref(), &notifiers, &caller, &body).await?;
    Ok(HttpResponse::Created().json(group))
}

/// PUT /groups/{id}
pub async fn edit_group(
    pool: web::Data<PgPool>,
    notifiers: web::Data<Notifiers>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<GroupRequest>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let group =
        group_service::edit_group(pool.get_ref(), &notifiers, &caller, path.into_inner(), &body)
            .await?;
    Ok(HttpResponse::Ok().json(group))
}

/// DELETE /groups/{id}
pub async fn delete_group(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    group_service::delete_group(pool.get_ref(), &caller, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/groups")
            .route("", web::get().to(list_groups))
            .route("", web::post().to(add_group))
            .route("/{id}", web::put().to(edit_group))
            .route("/{id}", web::delete().to(delete_group)),
    );
}
