use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id, or admin email
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        match self.role {
            Role::User => self.sub.parse().ok(),
            Role::Admin => None,
        }
    }

    pub fn admin_email(&self) -> Option<&str> {
        match self.role {
            Role::Admin => Some(self.sub.as_str()),
            Role::User => None,
        }
    }
}

fn sign(secret: &str, sub: String, role: Role, expiry_hours: u64) -> Result<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiry_hours as i64);

    let claims = Claims {
        sub,
        role,
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Token generation failed: {}", e)))
}

pub fn issue_user_token(secret: &str, user_id: i64, expiry_hours: u64) -> Result<String> {
    sign(secret, user_id.to_string(), Role::User, expiry_hours)
}

pub fn issue_admin_token(secret: &str, email: &str, expiry_hours: u64) -> Result<String> {
    sign(secret, email.to_string(), Role::Admin, expiry_hours)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))
}
