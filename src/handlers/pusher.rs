// src/handlers/pusher.rs
// DOCUMENTATION: Pusher private channel authentication

use crate::errors::VillageError;
use crate::handlers::auth::current_profile;
use crate::services::events::channel_for;
use crate::services::Notifiers;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

/// Form posted by the Pusher JS client when subscribing
#[derive(Debug, Deserialize)]
pub struct ChannelAuthRequest {
    pub socket_id: String,
    pub channel_name: String,
}

/// POST /pusher/auth
/// Signs subscriptions to the caller's own channel only
pub async fn authenticate(
    pool: web::Data<PgPool>,
    notifiers: web::Data<Notifiers>,
    req: HttpRequest,
    form: web::Form<ChannelAuthRequest>,
) -> Result<impl Responder, VillageError> {
    let caller = current_profile(&req, &pool).await?;

    if form.channel_name != channel_for(caller.id) {
        log::warn!(
            "Profile {} tried to subscribe to {}",
            caller.id,
            form.channel_name
        );
        return Err(VillageError::Forbidden);
    }

    let client = notifiers
        .push
        .client()
        .ok_or_else(|| VillageError::NotFound("push notifications".to_string()))?;
    let auth = client.authenticate_channel(&form.socket_id, &form.channel_name)?;

    Ok(HttpResponse::Ok().json(json!({ "auth": auth })))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/pusher/auth", web::post().to(authenticate));
}
