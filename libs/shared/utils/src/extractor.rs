use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

use shared_database::AppState;
use shared_models::auth::{User, UserType};
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Read the bearer token from the `Authorization` header.
pub fn bearer_token<B>(request: &Request<B>) -> Result<&str, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?;

    let mut user = validate_token(token, &state.config.jwt_secret).map_err(AppError::Auth)?;

    let stored = {
        let db = state.db.lock().await;
        stored_user_type(db.conn(), user.id).map_err(|e| AppError::Database(e.to_string()))?
    };
    match stored {
        Some(user_type) => user.user_type = user_type,
        None => {
            warn!("Rejected token of user {} that no longer exists", user.id);
            return Err(AppError::Auth("User no longer exists".to_string()));
        }
    }

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Current role of a user, `None` once the account is gone.
pub fn stored_user_type(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<UserType>> {
    conn.query_row("SELECT user_type FROM users WHERE id = ?1", [user_id], |row| row.get(0))
        .optional()
}

pub fn extract_user<B>(request: &Request<B>) -> Result<User, AppError> {
    request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_database::Database;

    use crate::test_utils::Fixtures;

    #[test]
    fn test_stored_user_type_tracks_the_users_table() {
        let db = Database::open_in_memory().unwrap();
        let id = Fixtures::user(db.conn(), "gone@bloodbank.test", UserType::Customer);
        assert_eq!(stored_user_type(db.conn(), id).unwrap(), Some(UserType::Customer));

        db.conn().execute("DELETE FROM users WHERE id = ?1", [id]).unwrap();
        assert_eq!(stored_user_type(db.conn(), id).unwrap(), None);
    }
}
