//! Buckets backed by directories

use crate::error::{self, LocalError};
use crate::{retry_config, root_dir};
use async_trait::async_trait;
use myzel_cloud::{CloudError, Environment, Resource, ResourceKind, Result, downcast, wait_until};
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

const ID_PREFIX: &str = "local:bucket:";

/// A directory directly under the provider root
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LocalBucket {
    pub name: String,
}

impl LocalBucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// `local:bucket:<name>`
    pub fn technical_id(name: &str) -> String {
        format!("{}{}", ID_PREFIX, name)
    }

    /// Bucket name encoded in a technical id
    pub fn parse_technical_id(id: &str) -> error::Result<&str> {
        let name = id
            .strip_prefix(ID_PREFIX)
            .ok_or_else(|| LocalError::InvalidTechnicalId(id.to_string()))?;
        validate_name(name)?;
        Ok(name)
    }

    pub fn path(&self, env: &Environment) -> error::Result<PathBuf> {
        validate_name(&self.name)?;
        Ok(root_dir(env).join(&self.name))
    }
}

pub(crate) fn validate_name(name: &str) -> error::Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(LocalError::InvalidBucketName(name.to_string()));
    }
    Ok(())
}

pub(crate) async fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    let mut entries = fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}

/// Copy every file below `from` into `to`, returning the number of files
pub(crate) async fn copy_tree(from: &Path, to: &Path) -> io::Result<usize> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    let mut copied = 0;

    while let Some((src, dst)) = pending.pop() {
        fs::create_dir_all(&dst).await?;
        let mut entries = fs::read_dir(&src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = dst.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), target));
            } else {
                fs::copy(entry.path(), &target).await?;
                copied += 1;
            }
        }
    }

    Ok(copied)
}

#[async_trait]
impl Resource for LocalBucket {
    async fn create(&self, env: &Environment) -> Result<String> {
        let dir = self.path(env)?;
        fs::create_dir_all(&dir).await?;

        wait_until(&retry_config(), &format!("bucket {}", self.name), || {
            let dir = dir.clone();
            async move { fs::try_exists(&dir).await.map_err(CloudError::from) }
        })
        .await?;

        tracing::info!("Bucket ready: {}", dir.display());
        Ok(Self::technical_id(&self.name))
    }

    /// Renaming creates the new directory, moves the content over and removes
    /// the old one. The new directory must be empty.
    async fn update(
        &self,
        env: &Environment,
        deployed_technical_id: &str,
        desired: &dyn Resource,
    ) -> Result<String> {
        let desired = downcast::<LocalBucket>(desired).ok_or_else(|| {
            CloudError::InvalidConfig(format!("expected a local bucket, got {}", desired.describe()))
        })?;
        let old_name = Self::parse_technical_id(deployed_technical_id)?;
        if old_name == desired.name {
            return desired.create(env).await;
        }

        let old_dir = root_dir(env).join(old_name);
        if !fs::try_exists(&old_dir).await? {
            tracing::info!("Bucket {} no longer exists, creating {}", old_name, desired.name);
            return desired.create(env).await;
        }

        let technical_id = desired.create(env).await?;
        let new_dir = desired.path(env)?;
        if !is_empty_dir(&new_dir).await? {
            return Err(LocalError::BucketNotEmpty(desired.name.clone()).into());
        }

        let copied = copy_tree(&old_dir, &new_dir).await?;
        fs::remove_dir_all(&old_dir).await?;
        tracing::info!(
            "Migrated bucket {} to {} ({} files)",
            old_name,
            desired.name,
            copied
        );
        Ok(technical_id)
    }

    /// Removes the directory together with everything stored in it
    async fn delete(&self, env: &Environment, technical_id: &str) -> Result<()> {
        let name = Self::parse_technical_id(technical_id)?;
        let dir = root_dir(env).join(name);
        if !fs::try_exists(&dir).await? {
            tracing::debug!("Bucket {} already gone", name);
            return Ok(());
        }
        if !is_empty_dir(&dir).await? {
            tracing::info!("Emptying bucket {} before deletion", name);
        }

        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!("Bucket deleted: {}", dir.display());
        Ok(())
    }
}

#[async_trait]
impl ResourceKind for LocalBucket {
    async fn get(technical_id: &str, env: &Environment) -> Result<Self> {
        let name = Self::parse_technical_id(technical_id)?;
        if fs::try_exists(root_dir(env).join(name)).await? {
            Ok(Self::new(name))
        } else {
            Ok(Self::default())
        }
    }
}
