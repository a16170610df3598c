//! In-memory object client.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use crate::{ObjectClient, ObjectMeta, SmartError};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    last_modified: SystemTime,
}

type Buckets = BTreeMap<String, BTreeMap<String, StoredObject>>;

/// An [`ObjectClient`] that keeps every bucket in process memory.
///
/// Useful for tests and for embedding the smart layer without a network
/// service. Keys are kept sorted, matching what S3 listings return.
///
/// ```rust
/// use smartfs::{MemoryObjectClient, ObjectClient};
///
/// let client = MemoryObjectClient::new().with_bucket("bucket");
/// client.put_object("bucket", "a/b", b"data".to_vec()).unwrap();
/// assert_eq!(client.list_objects("bucket", "a/").unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryObjectClient {
    buckets: RwLock<Buckets>,
}

fn bucket_missing(bucket: &str) -> SmartError {
    SmartError::NotFound {
        path: format!("s3://{bucket}"),
    }
}

impl MemoryObjectClient {
    /// Client with no buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style bucket creation.
    pub fn with_bucket(self, bucket: &str) -> Self {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets.entry(bucket.to_string()).or_default();
        }
        self
    }

    /// Create a bucket if it doesn't exist yet.
    pub fn create_bucket(&self, bucket: &str) -> Result<(), SmartError> {
        self.write()?.entry(bucket.to_string()).or_default();
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Buckets>, SmartError> {
        self.buckets
            .read()
            .map_err(|_| SmartError::Backend("object store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Buckets>, SmartError> {
        self.buckets
            .write()
            .map_err(|_| SmartError::Backend("object store lock poisoned".into()))
    }
}

impl ObjectClient for MemoryObjectClient {
    fn has_bucket(&self, bucket: &str) -> Result<bool, SmartError> {
        Ok(self.read()?.contains_key(bucket))
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>, SmartError> {
        let buckets = self.read()?;
        let objects = buckets.get(bucket).ok_or_else(|| bucket_missing(bucket))?;
        Ok(objects.get(key).map(|o| ObjectMeta {
            key: key.to_string(),
            size: o.data.len() as u64,
            last_modified: o.last_modified,
        }))
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>, SmartError> {
        let buckets = self.read()?;
        let objects = buckets.get(bucket).ok_or_else(|| bucket_missing(bucket))?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, o)| ObjectMeta {
                key: key.clone(),
                size: o.data.len() as u64,
                last_modified: o.last_modified,
            })
            .collect())
    }

    fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<Range<u64>>,
    ) -> Result<Vec<u8>, SmartError> {
        let buckets = self.read()?;
        let objects = buckets.get(bucket).ok_or_else(|| bucket_missing(bucket))?;
        let object = objects.get(key).ok_or_else(|| SmartError::NotFound {
            path: format!("s3://{bucket}/{key}"),
        })?;
        let len = object.data.len() as u64;
        let range = range.unwrap_or(0..len);
        let start = range.start.min(len) as usize;
        let end = range.end.clamp(range.start.min(len), len) as usize;
        Ok(object.data[start..end].to_vec())
    }

    fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), SmartError> {
        let mut buckets = self.write()?;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| bucket_missing(bucket))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), SmartError> {
        let mut buckets = self.write()?;
        let data = buckets
            .get(src_bucket)
            .ok_or_else(|| bucket_missing(src_bucket))?
            .get(src_key)
            .ok_or_else(|| SmartError::NotFound {
                path: format!("s3://{src_bucket}/{src_key}"),
            })?
            .data
            .clone();
        buckets
            .get_mut(dst_bucket)
            .ok_or_else(|| bucket_missing(dst_bucket))?
            .insert(
                dst_key.to_string(),
                StoredObject {
                    data,
                    last_modified: SystemTime::now(),
                },
            );
        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), SmartError> {
        let mut buckets = self.write()?;
        if let Some(objects) = buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }
}
