//! User model, roles and token claims

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{config::AuthConfig, error::AppError};

/// Permission tier. A user holds exactly one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Admin => "Admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

// SQLx conversion for Role, stored as the role name
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_email_confirmed: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Public projection of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub username: String,
}

/// User row as listed by the admin search
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub is_email_confirmed: bool,
}

/// Admin view of one user
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserWithRoles {
    pub user: UserAccount,
    pub roles: Vec<Role>,
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 3, max = 64, message = "Username must be 3 to 64 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Login request, either the email or the username identifies the account
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_or_username: String,
    pub password: String,
}

/// Query for the admin email search
#[derive(Debug, Deserialize, IntoParams)]
pub struct EmailSearchQuery {
    pub email: Option<String>,
}

/// Query selecting one user
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// Role update request (admin only)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRole {
    pub user_id: Uuid,
    /// Role name, "User" or "Admin"
    pub role: String,
}

/// JWT claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Username
    pub sub: String,
    pub jti: String,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    /// Comma-joined role names
    pub role: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn new(user: &User, config: &AuthConfig, now: DateTime<Utc>) -> Result<Self, AppError> {
        let exp = expires_at(now, config.access_token_ttl()?)?;
        Ok(Self {
            sub: user.username.clone(),
            jti: Uuid::new_v4().to_string(),
            user_id: user.id,
            role: user.role.to_string(),
            iss: config.jwt_issuer.clone(),
            aud: config.jwt_audience.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        })
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and validate a JWT token (signature, expiry, issuer, audience)
    pub fn from_token(token: &str, config: &AuthConfig) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.jwt_issuer.as_str()]);
        validation.set_audience(&[config.jwt_audience.as_str()]);
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &validation,
        )?;
        Ok(token_data.claims)
    }

    pub fn roles(&self) -> Vec<Role> {
        self.role
            .split(',')
            .filter_map(|name| name.parse().ok())
            .collect()
    }

    pub fn is_admin(&self) -> bool {
        self.roles().contains(&Role::Admin)
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Allow a user to act on their own data, admins on anyone's
    pub fn require_self_or_admin(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.user_id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Cannot access another user's reservations".to_string(),
            ))
        }
    }
}

const CONFIRMATION_PURPOSE: &str = "email-confirmation";

/// Claims of the single-purpose email confirmation token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationClaims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub purpose: String,
    pub exp: i64,
    pub iat: i64,
}

impl ConfirmationClaims {
    pub fn new(user_id: Uuid, config: &AuthConfig, now: DateTime<Utc>) -> Result<Self, AppError> {
        let exp = expires_at(now, config.confirmation_token_ttl()?)?;
        Ok(Self {
            user_id,
            purpose: CONFIRMATION_PURPOSE.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        })
    }

    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    pub fn from_token(token: &str, secret: &str) -> Result<Self, AppError> {
        use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
        let claims = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AppError::Authentication("Invalid or expired token.".to_string()))?
        .claims;

        if claims.purpose != CONFIRMATION_PURPOSE {
            return Err(AppError::Authentication("Invalid or expired token.".to_string()));
        }
        Ok(claims)
    }
}

fn expires_at(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, AppError> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))
}
