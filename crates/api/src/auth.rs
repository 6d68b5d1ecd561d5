//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs issued by the account service; this surface
//! only verifies them and reads the embedded role and tenant ids.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use common::{CustomerId, StoreId};

use crate::error::ApiError;

/// Role carried by a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// A store owner; acts on orders of their own store.
    Owner,
    /// A shopper; acts on their own cart and checkout.
    Customer,
}

/// Claims embedded in a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_type: UserType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<StoreId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    pub exp: i64,
}

/// Verification key shared through the router state.
#[derive(Clone)]
pub struct AuthKeys {
    decoding: DecodingKey,
}

impl AuthKeys {
    /// Builds the verification key from a shared HS256 secret.
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Verified claims of the calling user.
///
/// Using this as a handler argument makes the route require a valid
/// bearer token; a missing or bad token rejects with 401 before the
/// handler body runs.
#[derive(Debug, Clone)]
pub struct AuthClaims(pub Claims);

impl AuthClaims {
    /// The store an owner token acts for.
    pub fn owner_store(&self) -> Result<StoreId, ApiError> {
        match (self.0.user_type, self.0.store_id) {
            (UserType::Owner, Some(store_id)) => Ok(store_id),
            _ => Err(ApiError::Forbidden(
                "store owner token required".to_string(),
            )),
        }
    }

    /// The customer a shopper token acts for.
    pub fn customer(&self) -> Result<CustomerId, ApiError> {
        match (self.0.user_type, self.0.customer_id) {
            (UserType::Customer, Some(customer_id)) => Ok(customer_id),
            _ => Err(ApiError::Forbidden("customer token required".to_string())),
        }
    }
}

impl<S> FromRequestParts<S> for AuthClaims
where
    AuthKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = AuthKeys::from_ref(state);

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &keys.decoding, &validation).map_err(|e| {
            tracing::warn!(error = %e, uri = %parts.uri, "token verification failed");
            ApiError::Unauthorized
        })?;

        Ok(AuthClaims(data.claims))
    }
}
