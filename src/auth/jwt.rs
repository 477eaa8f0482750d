use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, role: Role, ttl_hours: i64) -> Self {
        Self {
            sub: user_id,
            role,
            exp: (Utc::now() + Duration::hours(ttl_hours)).timestamp(),
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("JWT encode failed: {e}"))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("JWT decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn round_trips_subject_and_role() {
        let id = Uuid::now_v7();
        let token = encode_token(&Claims::new(id, Role::ProjectManager, 1), SECRET).unwrap();
        let claims = decode_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::ProjectManager);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let token = encode_token(&Claims::new(Uuid::now_v7(), Role::Admin, 1), SECRET).unwrap();
        assert!(decode_token(&token, "other-secret").is_err());

        let mut expired = Claims::new(Uuid::now_v7(), Role::Admin, 1);
        expired.exp = (Utc::now() - Duration::hours(2)).timestamp();
        let token = encode_token(&expired, SECRET).unwrap();
        assert!(decode_token(&token, SECRET).is_err());
    }
}
