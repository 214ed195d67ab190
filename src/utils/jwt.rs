use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Deserialize, Serialize};
use chrono::{Utc, Duration};
use std::env;

use crate::models::users::Role;

/// Durée de vie du token d'accès (courte : une fenêtre de requêtes)
const ACCESS_TOKEN_MINUTES: i64 = 15;
/// Durée de vie du refresh token (longue : une session)
const REFRESH_TOKEN_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,   // user_id
    pub email: String,
    pub role: Role,
    pub exp: i64,   // expiration timestamp
}

/// Récupère la clé secrète des tokens d'accès depuis les variables d'environnement
fn get_access_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        eprintln!("⚠️  WARNING: JWT_SECRET not found in .env, using default (INSECURE)");
        "default-insecure-key-change-this".to_string()
    })
}

/// Récupère la clé secrète des refresh tokens, distincte de celle des
/// tokens d'accès.
fn get_refresh_secret() -> String {
    env::var("JWT_REFRESH_SECRET").unwrap_or_else(|_| {
        eprintln!("⚠️  WARNING: JWT_REFRESH_SECRET not found in .env, using default (INSECURE)");
        "default-insecure-refresh-key-change-this".to_string()
    })
}

fn generate_token(
    user_id: i32,
    email: &str,
    role: Role,
    duree: Duration,
    secret: &str,
) -> Result<String, String> {
    let expiration = Utc::now()
        .checked_add_signed(duree)
        .ok_or("Failed to calculate expiration")?
        .timestamp();

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
        .map_err(|e| format!("Failed to generate token: {}", e))
}

fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid token: {}", e))
}

/// Génère un token d'accès (15 minutes)
pub fn generate_access_token(user_id: i32, email: &str, role: Role) -> Result<String, String> {
    generate_token(
        user_id,
        email,
        role,
        Duration::minutes(ACCESS_TOKEN_MINUTES),
        &get_access_secret(),
    )
}

/// Génère un refresh token (7 jours), signé avec la clé refresh
pub fn generate_refresh_token(user_id: i32, email: &str, role: Role) -> Result<String, String> {
    generate_token(
        user_id,
        email,
        role,
        Duration::days(REFRESH_TOKEN_DAYS),
        &get_refresh_secret(),
    )
}

/// Vérifie et décode un token d'accès
pub fn verify_access_token(token: &str) -> Result<Claims, String> {
    verify_token(token, &get_access_secret())
}

/// Vérifie et décode un refresh token
pub fn verify_refresh_token(token: &str) -> Result<Claims, String> {
    verify_token(token, &get_refresh_secret())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify_access_token() {
        let token = generate_access_token(123, "ama@example.com", Role::Passager).unwrap();
        let claims = verify_access_token(&token).unwrap();

        assert_eq!(claims.sub, 123);
        assert_eq!(claims.email, "ama@example.com");
        assert_eq!(claims.role, Role::Passager);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_generate_and_verify_refresh_token() {
        let token = generate_refresh_token(7, "kodjo@example.com", Role::Conducteur).unwrap();
        let claims = verify_refresh_token(&token).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, Role::Conducteur);
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        // Les deux familles de tokens sont signées avec des clés distinctes
        let access = generate_access_token(1, "a@b.com", Role::Passager).unwrap();
        assert!(verify_refresh_token(&access).is_err());

        let refresh = generate_refresh_token(1, "a@b.com", Role::Passager).unwrap();
        assert!(verify_access_token(&refresh).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = Claims {
            sub: 1,
            email: "a@b.com".to_string(),
            role: Role::Passager,
            exp: (Utc::now() - Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(get_access_secret().as_ref()),
        )
        .unwrap();

        assert!(verify_access_token(&token).is_err());
    }

    #[test]
    fn test_invalid_token() {
        assert!(verify_access_token("invalid.token.here").is_err());
    }
}
