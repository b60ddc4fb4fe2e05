use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::models::Role;

/// Authenticated identity attached to every request by the identity service
/// sitting in front of this one. This service only parses the forwarded
/// context; credential checks happen upstream.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub id: String,
    pub role: Role,
}

impl AuthContext {
    pub fn require(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::NotAuthorized(format!("requires {role} role")))
        }
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, "x-user-id")?;
        let raw_role = header_value(parts, "x-user-role")?;
        let role = raw_role
            .parse()
            .map_err(|_| AppError::NotAuthorized(format!("unknown role '{raw_role}'")))?;
        Ok(Self { id, role })
    }
}

fn header_value(parts: &Parts, name: &str) -> Result<String, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::NotAuthorized(format!("missing {name} header")))
}
