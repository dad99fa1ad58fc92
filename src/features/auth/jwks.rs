use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    #[serde(rename = "use", default)]
    key_use: Option<String>,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

struct JwksCache {
    keys: HashMap<String, DecodingKey>,
    last_fetched: Instant,
}

/// Fetches and caches the identity provider's RSA signing keys
pub struct JwksClient {
    jwks_url: String,
    client: reqwest::Client,
    cache: Arc<RwLock<Option<JwksCache>>>,
    cache_ttl: Duration,
}

impl JwksClient {
    pub fn new(jwks_url: &str, cache_ttl: Duration) -> Self {
        Self {
            jwks_url: jwks_url.to_string(),
            client: reqwest::Client::new(),
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
        }
    }

    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, JwksError> {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.last_fetched.elapsed() < self.cache_ttl {
                    if let Some(key) = cached.keys.get(kid) {
                        return Ok(key.clone());
                    }
                }
            }
        }

        // Unknown kid usually means the provider rotated keys
        self.fetch_jwks().await?;

        let cache = self.cache.read().await;
        cache
            .as_ref()
            .and_then(|cached| cached.keys.get(kid).cloned())
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    async fn fetch_jwks(&self) -> Result<(), JwksError> {
        tracing::debug!("Refreshing JWKS from {}", self.jwks_url);

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksError::FetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::FetchError(format!(
                "Failed to fetch JWKS: HTTP {}",
                response.status()
            )));
        }

        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| JwksError::ParseError(e.to_string()))?;

        let keys = decode_signing_keys(jwks)?;
        tracing::info!("Loaded {} signing keys from JWKS", keys.len());

        let mut cache = self.cache.write().await;
        *cache = Some(JwksCache {
            keys,
            last_fetched: Instant::now(),
        });

        Ok(())
    }
}

/// Keep RSA keys meant for signatures; encryption keys are ignored
fn decode_signing_keys(jwks: JwksResponse) -> Result<HashMap<String, DecodingKey>, JwksError> {
    let mut keys = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
            continue;
        }
        let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| JwksError::KeyConversionError(e.to_string()))?;
        keys.insert(jwk.kid, decoding_key);
    }

    Ok(keys)
}

#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("Failed to fetch JWKS: {0}")]
    FetchError(String),

    #[error("Failed to parse JWKS: {0}")]
    ParseError(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to convert key: {0}")]
    KeyConversionError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_signing_keys_skips_non_signing_keys() {
        let jwks: JwksResponse = serde_json::from_value(serde_json::json!({
            "keys": [
                { "kid": "sig-1", "kty": "RSA", "use": "sig", "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw", "e": "AQAB" },
                { "kid": "enc-1", "kty": "RSA", "use": "enc", "n": "AQAB", "e": "AQAB" },
                { "kid": "ec-1", "kty": "EC" }
            ]
        }))
        .unwrap();

        let keys = decode_signing_keys(jwks).unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys.contains_key("sig-1"));
    }
}
