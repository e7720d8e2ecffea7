// src/handlers/village.rs
// DOCUMENTATION: HTTP handlers for villages
// PURPOSE: Dashboard, student management, posts, invites and elder edits

use crate::config::Config;
use crate::errors::VillageError;
use crate::handlers::auth::current_profile;
use crate::models::{
    post_char_limit, BacklogResponse, CreatePostRequest, EditElderRequest, InviteEldersRequest,
    PostOptions, RenameStudentRequest, StudentRequest, VillageUpdateResponse,
};
use crate::services::invite_service::invite_elders;
use crate::services::post_service::{backlog, create_post};
use crate::services::village_service::{self, membership, staff_membership};
use crate::services::Notifiers;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// GET /dashboard
pub async fn dashboard(
    pool: web::Data<PgPool>,
    req: HttpRequest,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let dashboard = village_service::dashboard(pool.get_ref(), &caller).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}

/// POST /students
pub async fn add_student(
    pool: web::Data<PgPool>,
    notifiers: web::Data<Notifiers>,
    req: HttpRequest,
    body: web::Json<StudentRequest>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let student = village_service::add_student(pool.get_ref(), &notifiers, &caller, &body).await?;
    Ok(HttpResponse::Created().json(student))
}

/// GET /students/{id}
pub async fn get_village(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let membership = membership(pool.get_ref(), path.into_inner(), &caller).await?;
    let village = village_service::village_view(pool.get_ref(), &membership).await?;
    Ok(HttpResponse::Ok().json(village))
}

/// PUT /students/{id}
pub async fn edit_student(
    pool: web::Data<PgPool>,
    notifiers: web::Data<Notifiers>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<StudentRequest>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let membership = staff_membership(pool.get_ref(), path.into_inner(), &caller).await?;
    let student =
        village_service::edit_student(pool.get_ref(), &notifiers, &membership, &body).await?;
    Ok(HttpResponse::Ok().json(student))
}

/// POST /students/{id}/rename
pub async fn rename_student(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<RenameStudentRequest>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let membership = staff_membership(pool.get_ref(), path.into_inner(), &caller).await?;
    let name = village_service::rename_student(pool.get_ref(), &membership, &body).await?;

    Ok(HttpResponse::Ok().json(VillageUpdateResponse {
        success: true,
        name: Some(name),
    }))
}

/// POST /students/{id}/remove
pub async fn remove_student(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let membership = staff_membership(pool.get_ref(), path.into_inner(), &caller).await?;
    village_service::remove_student(pool.get_ref(), &membership).await?;

    Ok(HttpResponse::Ok().json(VillageUpdateResponse {
        success: true,
        name: None,
    }))
}

/// GET /students/{id}/posts
/// Up to 100 latest posts, oldest first
pub async fn get_posts(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let membership = membership(pool.get_ref(), path.into_inner(), &caller).await?;
    let posts = backlog(pool.get_ref(), membership.student.id).await?;
    Ok(HttpResponse::Ok().json(BacklogResponse { posts }))
}

/// POST /students/{id}/posts
pub async fn create_village_post(
    pool: web::Data<PgPool>,
    notifiers: web::Data<Notifiers>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<CreatePostRequest>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let membership = membership(pool.get_ref(), path.into_inner(), &caller).await?;

    let limit = post_char_limit(&membership.elder.display_name());
    if body.text.chars().count() > limit {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": format!("Posts are limited to {} characters.", limit),
            "success": false,
        })));
    }

    let post = create_post(
        pool.get_ref(),
        &notifiers,
        Some(&membership.elder),
        &membership.student,
        &body.text,
        PostOptions::default(),
        body.author_sequence_id.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "posts": [post],
    })))
}

/// POST /students/{id}/invite
pub async fn invite(
    pool: web::Data<PgPool>,
    notifiers: web::Data<Notifiers>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<InviteEldersRequest>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;
    let membership = staff_membership(pool.get_ref(), path.into_inner(), &caller).await?;

    let invited = invite_elders(
        pool.get_ref(),
        &notifiers,
        &config.site_url,
        &membership,
        &body.elders,
    )
    .await?;

    log::info!(
        "{} invited {} elders to village {}",
        caller.id,
        invited.len(),
        membership.student.id
    );

    let invited: Vec<_> = invited.iter().map(|p| p.to_response()).collect();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "elders": invited,
    })))
}

/// PUT /students/{id}/elders/{elder_id}
pub async fn edit_elder(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<EditElderRequest>,
) -> Result<impl Responder, VillageError> {
    let (student_id, elder_id) = path.into_inner();
    let caller = current_profile(&req, &pool).await?;
    let membership = staff_membership(pool.get_ref(), student_id, &caller).await?;

    let elder = village_service::edit_elder(pool.get_ref(), &membership, elder_id, &body).await?;
    Ok(HttpResponse::Ok().json(elder))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(dashboard)).service(
        web::scope("/students")
            .route("", web::post().to(add_student))
            .route("/{id}", web::get().to(get_village))
            .route("/{id}", web::put().to(edit_student))
            .route("/{id}/rename", web::post().to(rename_student))
            .route("/{id}/remove", web::post().to(remove_student))
            .route("/{id}/posts", web::get().to(get_posts))
            .route("/{id}/posts", web::post().to(create_village_post))
            .route("/{id}/invite", web::post().to(invite))
            .route("/{id}/elders/{elder_id}", web::put().to(edit_elder)),
    );
}
