// src/handlers/auth.rs
// DOCUMENTATION: Request identity
// PURPOSE: Resolve `Authorization: Bearer {api_token}` to the caller's profile

use crate::db::ProfileRepository;
use crate::errors::VillageError;
use crate::models::Profile;
use actix_web::HttpRequest;
use sqlx::PgPool;

/// Token from an `Authorization: Bearer ...` header value
fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Profile of the active user whose API token authorizes this request
pub async fn current_profile(req: &HttpRequest, pool: &PgPool) -> Result<Profile, VillageError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(parse_bearer)
        .ok_or_else(|| {
            log::warn!("Request to {} without bearer token", req.path());
            VillageError::Unauthorized
        })?;

    ProfileRepository::find_by_api_token(pool, token)
        .await?
        .ok_or_else(|| {
            log::warn!("Request to {} with unknown or inactive token", req.path());
            VillageError::Unauthorized
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(parse_bearer("bearer  abc123 "), Some("abc123"));
        assert_eq!(parse_bearer("Basic abc123"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("abc123"), None);
    }
}
