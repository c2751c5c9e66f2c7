use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct AuthError {
    pub error: String,
    pub message: String,
}

fn reject(error: &str, message: &str) -> (StatusCode, Json<AuthError>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(AuthError {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
}

pub async fn auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<AuthError>)> {
    let auth_value = headers
        .get("authorization")
        .ok_or_else(|| reject("missing_authorization", "Authorization header is required"))?;
    let auth_str = auth_value
        .to_str()
        .map_err(|_| reject("invalid_header", "Invalid authorization header format"))?;
    let token = auth_str.strip_prefix("Bearer ").ok_or_else(|| {
        reject(
            "invalid_authorization",
            "Authorization header must start with 'Bearer '",
        )
    })?;

    if token.len() <= 10 {
        return Err(reject("invalid_token", "Token is too short or invalid"));
    }

    log::debug!("authentication successful");
    Ok(next.run(request).await)
}
