use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;

/// Bearer token claims issued by the auth subsystem.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user_id
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub iat: usize,
    pub exp: usize,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
}

// Verify JWT token
pub fn verify_token(config: &JwtConfig, token: &str) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    match &config.audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }
    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer]);
    }

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Signs a token the way the auth subsystem does.
#[cfg(test)]
pub fn issue_token(config: &JwtConfig, user_id: &str, ttl_secs: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: Some(format!("{}@example.com", user_id)),
        iat: now as usize,
        exp: (now + ttl_secs) as usize,
        aud: config.audience.clone(),
        iss: config.issuer.clone(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(config.secret.as_ref()))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_verify_round_trip() {
        let config = AppConfig::for_tests().jwt;
        let token = issue_token(&config, "u1", 3600);
        let claims = verify_token(&config, &token).unwrap();
        assert_eq!(claims.sub, "u1");
    }

    #[test]
    fn test_rejects_wrong_audience_and_expired() {
        let config = AppConfig::for_tests().jwt;
        let other = JwtConfig {
            audience: Some("someone-else".into()),
            ..config.clone()
        };
        let token = issue_token(&other, "u1", 3600);
        assert!(verify_token(&config, &token).is_err());

        let expired = issue_token(&config, "u1", -3600);
        assert!(verify_token(&config, &expired).is_err());

        let forged = JwtConfig { secret: "nope".into(), ..config.clone() };
        assert!(verify_token(&config, &issue_token(&forged, "u1", 3600)).is_err());
    }
}
