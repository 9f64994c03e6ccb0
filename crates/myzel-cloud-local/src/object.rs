//! Objects backed by files inside a bucket directory

use crate::bucket::validate_name;
use crate::error::{self, LocalError};
use crate::{retry_config, root_dir};
use async_trait::async_trait;
use myzel_cloud::{CloudError, Environment, Resource, ResourceKind, Result, downcast, wait_until};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

const ID_PREFIX: &str = "local:object:";

/// A file at `<root>/<bucket>/<key>` holding `content`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LocalObject {
    pub bucket: String,
    pub key: String,
    #[serde(default)]
    pub content: String,
}

impl LocalObject {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            content: content.into(),
        }
    }

    /// `local:object:<bucket>/<key>`
    pub fn technical_id(bucket: &str, key: &str) -> String {
        format!("{}{}/{}", ID_PREFIX, bucket, key)
    }

    /// `(bucket, key)` encoded in a technical id
    pub fn parse_technical_id(id: &str) -> error::Result<(&str, &str)> {
        let (bucket, key) = id
            .strip_prefix(ID_PREFIX)
            .and_then(|rest| rest.split_once('/'))
            .ok_or_else(|| LocalError::InvalidTechnicalId(id.to_string()))?;
        validate_name(bucket)?;
        validate_key(key)?;
        Ok((bucket, key))
    }

    pub fn path(&self, env: &Environment) -> error::Result<PathBuf> {
        object_path(env, &self.bucket, &self.key)
    }

    async fn write(&self, env: &Environment) -> Result<String> {
        let path = self.path(env)?;
        let bucket_dir = root_dir(env).join(&self.bucket);
        if !fs::try_exists(&bucket_dir).await? {
            return Err(LocalError::BucketNotFound(self.bucket.clone()).into());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &self.content).await?;

        let expected = self.content.clone();
        wait_until(&retry_config(), &format!("object {}", self.key), || {
            let path = path.clone();
            let expected = expected.clone();
            async move {
                match fs::read_to_string(&path).await {
                    Ok(content) => Ok(content == expected),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                    Err(e) => Err(CloudError::from(e)),
                }
            }
        })
        .await?;

        tracing::info!("Object written: {}", path.display());
        Ok(Self::technical_id(&self.bucket, &self.key))
    }
}

fn validate_key(key: &str) -> error::Result<()> {
    let path = Path::new(key);
    let plain = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if key.is_empty() || !plain {
        return Err(LocalError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn object_path(env: &Environment, bucket: &str, key: &str) -> error::Result<PathBuf> {
    validate_name(bucket)?;
    validate_key(key)?;
    Ok(root_dir(env).join(bucket).join(key))
}

#[async_trait]
impl Resource for LocalObject {
    async fn create(&self, env: &Environment) -> Result<String> {
        self.write(env).await
    }

    /// Rewrites the file; a changed bucket or key also removes the old file
    async fn update(
        &self,
        env: &Environment,
        deployed_technical_id: &str,
        desired: &dyn Resource,
    ) -> Result<String> {
        let desired = downcast::<LocalObject>(desired).ok_or_else(|| {
            CloudError::InvalidConfig(format!("expected a local object, got {}", desired.describe()))
        })?;
        let (bucket, key) = Self::parse_technical_id(deployed_technical_id)?;
        let old_path = object_path(env, bucket, key)?;

        let technical_id = desired.write(env).await?;
        if technical_id != deployed_technical_id && fs::try_exists(&old_path).await? {
            fs::remove_file(&old_path).await?;
            tracing::info!("Removed moved object: {}", old_path.display());
        }
        Ok(technical_id)
    }

    async fn delete(&self, env: &Environment, technical_id: &str) -> Result<()> {
        let (bucket, key) = Self::parse_technical_id(technical_id)?;
        let path = object_path(env, bucket, key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Object deleted: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Object {}/{} already gone", bucket, key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ResourceKind for LocalObject {
    async fn get(technical_id: &str, env: &Environment) -> Result<Self> {
        let (bucket, key) = Self::parse_technical_id(technical_id)?;
        let path = object_path(env, bucket, key)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Self::new(bucket, key, content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}
