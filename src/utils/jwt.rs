use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey,
                   Header, Validation};
use serde::{Deserialize, Serialize};

/// `sub` carries the user identity (the account email).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims { pub sub:String, pub exp:i64 }

pub fn sign(uid:&str, secret:&str) -> Result<String, jsonwebtoken::errors::Error> {
    let c = Claims { sub: uid.into(), exp: Utc::now().timestamp()+86_400 };
    encode(&Header::default(), &c, &EncodingKey::from_secret(secret.as_bytes()))
}

/// The caller's identity, if the token is valid and names someone.
pub fn verify(token:&str, secret:&str) -> Option<String> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()),
                     &Validation::new(Algorithm::HS256))
        .ok()
        .map(|d| d.claims.sub)
        .filter(|sub| !sub.trim().is_empty())
}
