use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{errors::ApiError, AppState};

/// Role carried by the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Admin,
    Store,
    User,
}

/// JWT claims issued by the external session service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub account_type: AccountType,
    /// Present for store operator tokens
    pub store_id: Option<Uuid>,
    pub exp: usize,
}

/// Resolved request identity, passed explicitly into every service operation.
///
/// Token issuance and session management live in an external collaborator;
/// the core trusts validated claims as given.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub account_type: AccountType,
    pub store_id: Option<Uuid>,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.account_type == AccountType::Admin
    }

    /// Store id for store operator requests; forbidden otherwise.
    pub fn require_store(&self) -> Result<Uuid, ApiError> {
        match (self.account_type, self.store_id) {
            (AccountType::Store, Some(store_id)) => Ok(store_id),
            _ => Err(ApiError::Forbidden),
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or(ApiError::Unauthorized)?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| ApiError::Unauthorized)?;

        let claims = decoded.claims;
        Ok(AuthContext {
            user_id: claims.sub,
            account_type: claims.account_type,
            store_id: claims.store_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_ctx() -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            account_type: AccountType::User,
            store_id: None,
        }
    }

    #[test]
    fn plain_user_cannot_act_as_store() {
        assert!(user_ctx().require_store().is_err());
    }

    #[test]
    fn store_token_resolves_store_id() {
        let store_id = Uuid::new_v4();
        let ctx = AuthContext {
            user_id: Uuid::new_v4(),
            account_type: AccountType::Store,
            store_id: Some(store_id),
        };
        assert_eq!(ctx.require_store().unwrap(), store_id);
    }

    #[test]
    fn store_token_without_store_id_is_forbidden() {
        let ctx = AuthContext {
            user_id: Uuid::new_v4(),
            account_type: AccountType::Store,
            store_id: None,
        };
        assert!(ctx.require_store().is_err());
    }
}
