//! Filesystem object storage for uploaded documents.
//!
//! Objects live at `{root}/{bucket}/{key}`. Buckets are either public (any
//! holder of the URL may fetch) or private (fetching needs a signed URL that
//! expires). Uploads never overwrite an existing object.

pub mod error;

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  time::Duration,
};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use souk_core::storage_key::is_safe_key;
use tokio::{fs, io::AsyncWriteExt as _};
use tracing::{debug, info};

pub use error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Private bucket for KYC documents.
pub const KYC_BUCKET: &str = "kyc";
/// Public bucket for shipment evidence.
pub const EVIDENCE_BUCKET: &str = "evidence";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
  Public,
  Private,
}

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
  pub bucket: String,
  pub key:    String,
  pub size:   u64,
  /// Hex SHA-256 of the content.
  pub sha256: String,
}

/// Signature parameters carried on a signed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlSignature {
  pub expires: i64,
  pub sig:     String,
}

/// A bucketed object store rooted at a directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
  root:       PathBuf,
  url_prefix: String,
  secret:     Vec<u8>,
  buckets:    HashMap<String, Visibility>,
}

impl BlobStore {
  /// Create a store with the `kyc` (private) and `evidence` (public) buckets.
  ///
  /// `url_prefix` is the externally visible address of the blob route, for
  /// example `https://souk.example/api/blobs`.
  pub fn new(root: impl Into<PathBuf>, url_prefix: &str, secret: &[u8]) -> Self {
    Self {
      root:       root.into(),
      url_prefix: url_prefix.trim_end_matches('/').to_owned(),
      secret:     secret.to_vec(),
      buckets:    HashMap::new(),
    }
    .with_bucket(KYC_BUCKET, Visibility::Private)
    .with_bucket(EVIDENCE_BUCKET, Visibility::Public)
  }

  pub fn with_bucket(mut self, name: &str, visibility: Visibility) -> Self {
    self.buckets.insert(name.to_owned(), visibility);
    self
  }

  /// Create the bucket directories.
  pub async fn init(&self) -> Result<()> {
    for bucket in self.buckets.keys() {
      fs::create_dir_all(self.root.join(bucket)).await?;
    }
    info!("blob storage root: {}", self.root.display());
    Ok(())
  }

  pub fn visibility(&self, bucket: &str) -> Result<Visibility> {
    self
      .buckets
      .get(bucket)
      .copied()
      .ok_or_else(|| Error::UnknownBucket(bucket.to_owned()))
  }

  fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
    self.visibility(bucket)?;
    if !is_safe_key(key) {
      return Err(Error::InvalidKey(key.to_owned()));
    }
    Ok(self.root.join(bucket).join(Path::new(key)))
  }

  /// Write a new object. Fails with [`Error::AlreadyExists`] if the key is
  /// taken.
  pub async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<StoredObject> {
    let path = self.object_path(bucket, key)?;
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }

    let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
      Ok(f) => f,
      Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
        return Err(Error::AlreadyExists { bucket: bucket.to_owned(), key: key.to_owned() });
      }
      Err(e) => return Err(e.into()),
    };
    file.write_all(&data).await?;
    file.flush().await?;

    let sha256 = hex::encode(Sha256::digest(&data));
    debug!(bucket, key, size = data.len(), "object stored");
    Ok(StoredObject {
      bucket: bucket.to_owned(),
      key: key.to_owned(),
      size: data.len() as u64,
      sha256,
    })
  }

  pub async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
    let path = self.object_path(bucket, key)?;
    match fs::read(&path).await {
      Ok(data) => Ok(Bytes::from(data)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        Err(Error::NotFound { bucket: bucket.to_owned(), key: key.to_owned() })
      }
      Err(e) => Err(e.into()),
    }
  }

  /// The permanent URL of an object in a public bucket.
  pub fn public_url(&self, bucket: &str, key: &str) -> Result<String> {
    self.object_path(bucket, key)?;
    if self.visibility(bucket)? != Visibility::Public {
      return Err(Error::NotPublic(bucket.to_owned()));
    }
    Ok(format!("{}/{bucket}/{key}", self.url_prefix))
  }

  /// A URL granting read access to `bucket/key` until `now + ttl`.
  pub fn signed_url(
    &self,
    bucket: &str,
    key: &str,
    ttl: Duration,
    now: DateTime<Utc>,
  ) -> Result<String> {
    self.object_path(bucket, key)?;
    let expires = now.timestamp() + ttl.as_secs() as i64;
    let sig = hex::encode(self.mac(bucket, key, expires)?.finalize().into_bytes());
    Ok(format!("{}/{bucket}/{key}?expires={expires}&sig={sig}", self.url_prefix))
  }

  /// Check a signature produced by [`BlobStore::signed_url`].
  pub fn verify(
    &self,
    bucket: &str,
    key: &str,
    signature: &UrlSignature,
    now: DateTime<Utc>,
  ) -> Result<()> {
    if now.timestamp() >= signature.expires {
      return Err(Error::Expired);
    }
    let provided = hex::decode(&signature.sig).map_err(|_| Error::BadSignature)?;
    self
      .mac(bucket, key, signature.expires)?
      .verify_slice(&provided)
      .map_err(|_| Error::BadSignature)
  }

  /// Whether a read of `bucket/key` is allowed with the given signature.
  pub fn authorize_read(
    &self,
    bucket: &str,
    key: &str,
    signature: Option<&UrlSignature>,
    now: DateTime<Utc>,
  ) -> Result<()> {
    match self.visibility(bucket)? {
      Visibility::Public => Ok(()),
      Visibility::Private => {
        let signature = signature.ok_or(Error::BadSignature)?;
        self.verify(bucket, key, signature, now)
      }
    }
  }

  fn mac(&self, bucket: &str, key: &str, expires: i64) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| Error::BadSignature)?;
    mac.update(format!("{bucket}/{key}:{expires}").as_bytes());
    Ok(mac)
  }
}

/// A best-effort `Content-Type` for a stored key, by extension.
pub fn content_type_for(key: &str) -> &'static str {
  let ext = key.rsplit_once('.').map(|(_, e)| e).unwrap_or_default();
  match ext {
    "pdf" => "application/pdf",
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "webp" => "image/webp",
    "gif" => "image/gif",
    "txt" => "text/plain; charset=utf-8",
    "csv" => "text/csv",
    "json" => "application/json",
    _ => "application/octet-stream",
  }
}
