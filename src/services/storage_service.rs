use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::utils::AppError;

/// File bytes plus the content type they were stored with.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Blob storage for uploaded documents.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under `key` and returns the key.
    async fn store(&self, key: &str, bytes: Vec<u8>, mime_type: &str) -> Result<String, AppError>;
    /// Time-limited URL granting read access to `key`.
    async fn signed_url(&self, key: &str) -> Result<String, AppError>;
    async fn load(&self, key: &str) -> Result<StoredObject, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Keys are flat file names; anything that could escape the bucket is refused.
pub fn validate_key(key: &str) -> Result<(), AppError> {
    let ok = !key.is_empty()
        && key.len() <= 255
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(AppError::validation(format!("Invalid object key '{}'", key)))
    }
}

// ==================== SIGNED URLS ====================

#[derive(Debug, Serialize, Deserialize)]
struct FileClaims {
    sub: String, // object key
    exp: usize,
}

/// Issues and checks the `token` query parameter of `/api/v1/files/{key}`.
#[derive(Clone)]
pub struct UrlSigner {
    secret: String,
    ttl_secs: i64,
    base_url: String,
}

impl UrlSigner {
    pub fn new(secret: impl Into<String>, ttl_secs: i64, base_url: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
            base_url: base_url.into(),
        }
    }

    pub fn sign(&self, key: &str) -> Result<String, AppError> {
        validate_key(key)?;
        let claims = FileClaims {
            sub: key.to_string(),
            exp: (Utc::now().timestamp() + self.ttl_secs) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| AppError::ExternalService(format!("Failed to sign URL: {}", e)))?;

        Ok(format!(
            "{}/api/v1/files/{}?token={}",
            self.base_url,
            urlencoding::encode(key),
            token
        ))
    }

    pub fn verify(&self, key: &str, token: &str) -> Result<(), AppError> {
        let denied = || AppError::Forbidden("Invalid or expired file link".to_string());
        let data = decode::<FileClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| denied())?;

        if data.claims.sub != key {
            return Err(denied());
        }
        Ok(())
    }
}

// ==================== LOCAL DIRECTORY ====================

/// Objects as files under a local directory, with the content type in a
/// `<key>.mime` sidecar.
pub struct LocalStorage {
    root: PathBuf,
    signer: UrlSigner,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, signer: UrlSigner) -> Self {
        Self { root: root.into(), signer }
    }

    fn paths(&self, key: &str) -> Result<(PathBuf, PathBuf), AppError> {
        validate_key(key)?;
        Ok((self.root.join(key), self.root.join(format!("{}.mime", key))))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn store(&self, key: &str, bytes: Vec<u8>, mime_type: &str) -> Result<String, AppError> {
        let (path, mime_path) = self.paths(key)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to prepare storage dir: {}", e)))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to store {}: {}", key, e)))?;
        tokio::fs::write(&mime_path, mime_type)
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to store {}: {}", key, e)))?;
        Ok(key.to_string())
    }

    async fn signed_url(&self, key: &str) -> Result<String, AppError> {
        self.signer.sign(key)
    }

    async fn load(&self, key: &str) -> Result<StoredObject, AppError> {
        let (path, mime_path) = self.paths(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound("File not found".to_string()))
            }
            Err(e) => return Err(AppError::ExternalService(format!("Failed to read {}: {}", key, e))),
        };
        let mime_type = tokio::fs::read_to_string(&mime_path)
            .await
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        Ok(StoredObject { bytes, mime_type })
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let (path, mime_path) = self.paths(key)?;
        for p in [path, mime_path] {
            match tokio::fs::remove_file(&p).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(AppError::ExternalService(format!("Failed to delete {}: {}", key, e)))
                }
            }
        }
        Ok(())
    }
}

// ==================== REMOTE BUCKET ====================

/// Objects in an HTTP bucket addressed as `{base_url}/{key}`.
pub struct RemoteStorage {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    signer: UrlSigner,
}

impl RemoteStorage {
    pub fn new(base_url: impl Into<String>, token: Option<String>, signer: UrlSigner) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            signer,
        }
    }

    fn request(&self, method: reqwest::Method, key: &str) -> Result<reqwest::RequestBuilder, AppError> {
        validate_key(key)?;
        let url = format!("{}/{}", self.base_url, urlencoding::encode(key));
        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        })
    }
}

#[async_trait]
impl ObjectStorage for RemoteStorage {
    async fn store(&self, key: &str, bytes: Vec<u8>, mime_type: &str) -> Result<String, AppError> {
        let response = self
            .request(reqwest::Method::PUT, key)?
            .header("Content-Type", mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to upload {}: {}", key, e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Upload of {} rejected with status {}",
                key,
                response.status()
            )));
        }
        Ok(key.to_string())
    }

    async fn signed_url(&self, key: &str) -> Result<String, AppError> {
        self.signer.sign(key)
    }

    async fn load(&self, key: &str) -> Result<StoredObject, AppError> {
        let response = self
            .request(reqwest::Method::GET, key)?
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to fetch {}: {}", key, e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Fetch of {} failed with status {}",
                key,
                response.status()
            )));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to read {}: {}", key, e)))?;

        Ok(StoredObject { bytes: bytes.to_vec(), mime_type })
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let response = self
            .request(reqwest::Method::DELETE, key)?
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to delete {}: {}", key, e)))?;

        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::ExternalService(format!(
                "Delete of {} failed with status {}",
                key,
                response.status()
            )));
        }
        Ok(())
    }
}

/// Picks the remote bucket when configured, the local directory otherwise.
pub fn build_storage(config: &StorageConfig, signing_secret: &str) -> Arc<dyn ObjectStorage> {
    let signer = UrlSigner::new(signing_secret, config.signed_url_ttl_secs, &config.public_base_url);
    match &config.remote_url {
        Some(url) => {
            log::info!("🪣 Object storage: remote bucket at {}", url);
            Arc::new(RemoteStorage::new(url, config.remote_token.clone(), signer))
        }
        None => {
            log::info!("📁 Object storage: local directory {}", config.dir);
            Arc::new(LocalStorage::new(&config.dir, signer))
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use tokio::sync::RwLock;

    /// In-memory storage whose signing fails for chosen keys.
    #[derive(Default)]
    pub struct FakeStorage {
        pub objects: RwLock<HashMap<String, StoredObject>>,
        pub unsignable: RwLock<HashSet<String>>,
        pub fail_store: RwLock<bool>,
    }

    #[async_trait]
    impl ObjectStorage for FakeStorage {
        async fn store(&self, key: &str, bytes: Vec<u8>, mime_type: &str) -> Result<String, AppError> {
            if *self.fail_store.read().await {
                return Err(AppError::ExternalService("bucket unavailable".into()));
            }
            self.objects.write().await.insert(
                key.to_string(),
                StoredObject { bytes, mime_type: mime_type.to_string() },
            );
            Ok(key.to_string())
        }

        async fn signed_url(&self, key: &str) -> Result<String, AppError> {
            if self.unsignable.read().await.contains(key) {
                return Err(AppError::ExternalService(format!("cannot sign {}", key)));
            }
            Ok(format!("https://files.test/{}?token=t", key))
        }

        async fn load(&self, key: &str) -> Result<StoredObject, AppError> {
            self.objects
                .read()
                .await
                .get(key)
                .cloned()
                .ok_or_else(|| AppError::NotFound("File not found".into()))
        }

        async fn delete(&self, key: &str) -> Result<(), AppError> {
            self.objects.write().await.remove(key);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new("secret", 900, "http://localhost:3002")
    }

    #[test]
    fn test_signed_url_round_trip() {
        let s = signer();
        let url = s.sign("investor_abc_tax_return_1_x.pdf").unwrap();
        assert!(url.starts_with("http://localhost:3002/api/v1/files/investor_abc_tax_return_1_x.pdf?token="));

        let token = url.split("token=").nth(1).unwrap();
        assert!(s.verify("investor_abc_tax_return_1_x.pdf", token).is_ok());
        assert!(matches!(s.verify("other.pdf", token), Err(AppError::Forbidden(_))));
        assert!(matches!(s.verify("investor_abc_tax_return_1_x.pdf", "garbage"), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_expired_link_is_refused() {
        let s = UrlSigner::new("secret", -3600, "http://localhost:3002");
        let url = s.sign("a.pdf").unwrap();
        let token = url.split("token=").nth(1).unwrap();
        assert!(s.verify("a.pdf", token).is_err());
    }

    #[test]
    fn test_unsafe_keys_rejected() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a/b.pdf").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("investor_1_other_2_uuid.png").is_ok());
    }

    #[tokio::test]
    async fn test_local_storage_store_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), signer());

        storage.store("doc.pdf", b"%PDF".to_vec(), "application/pdf").await.unwrap();
        let loaded = storage.load("doc.pdf").await.unwrap();
        assert_eq!(loaded.bytes, b"%PDF");
        assert_eq!(loaded.mime_type, "application/pdf");

        storage.delete("doc.pdf").await.unwrap();
        assert!(matches!(storage.load("doc.pdf").await, Err(AppError::NotFound(_))));
        // deleting twice is fine
        storage.delete("doc.pdf").await.unwrap();
    }
}
