use super::best_match;
use async_trait::async_trait;
use ensemble_application::{CacheError, CacheStore, SimilarEntry};
use ensemble_domain::CacheEntry;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const PLAIN_EXT: &str = "json";
const GZIP_EXT: &str = "json.gz";
const TMP_EXT: &str = "tmp";
const WRITE_LOCKS: usize = 64;

/// One file per entry under a directory.
///
/// Serialized entries of at least `compress_min_bytes` are gzip-compressed
/// when that makes them smaller. Each write goes through its own temporary
/// file and a rename so readers never see a partial entry; writers of the
/// same key are serialized.
pub struct FileCacheStore {
    dir: PathBuf,
    compress_min_bytes: usize,
    write_locks: [Mutex<()>; WRITE_LOCKS],
}

impl FileCacheStore {
    pub async fn open(dir: impl Into<PathBuf>, compress_min_bytes: usize) -> Result<Self, CacheError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            compress_min_bytes,
            write_locks: std::array::from_fn(|_| Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stem(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    fn write_lock(&self, key: &str) -> &Mutex<()> {
        let digest = Sha256::digest(key.as_bytes());
        &self.write_locks[digest[0] as usize % WRITE_LOCKS]
    }

    fn path_for(&self, key: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", Self::stem(key), ext))
    }

    fn encode(&self, entry: &CacheEntry) -> Result<(Vec<u8>, bool), CacheError> {
        let json = serde_json::to_vec(entry).map_err(|e| CacheError::Codec(e.to_string()))?;
        if json.len() < self.compress_min_bytes {
            return Ok((json, false));
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        let compressed = encoder.finish()?;
        if compressed.len() < json.len() {
            Ok((compressed, true))
        } else {
            Ok((json, false))
        }
    }

    fn decode(bytes: &[u8], gzip: bool) -> Result<CacheEntry, CacheError> {
        let json = if gzip {
            let mut out = Vec::new();
            GzDecoder::new(bytes).read_to_end(&mut out)?;
            out
        } else {
            bytes.to_vec()
        };
        serde_json::from_slice(&json).map_err(|e| CacheError::Codec(e.to_string()))
    }

    async fn read_path(path: &Path) -> Result<Option<CacheEntry>, CacheError> {
        let gzip = path.to_string_lossy().ends_with(GZIP_EXT);
        match tokio::fs::read(path).await {
            Ok(bytes) => Self::decode(&bytes, gzip).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Entry for a key together with the file that holds it
    async fn read_key(&self, key: &str) -> Result<Option<(CacheEntry, PathBuf)>, CacheError> {
        for ext in [GZIP_EXT, PLAIN_EXT] {
            let path = self.path_for(key, ext);
            if let Some(entry) = Self::read_path(&path).await? {
                return Ok(Some((entry, path)));
            }
        }
        Ok(None)
    }

    async fn remove_file(path: &Path) -> Result<bool, CacheError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let (bytes, gzip) = self.encode(entry)?;
        let (ext, stale_ext) = if gzip {
            (GZIP_EXT, PLAIN_EXT)
        } else {
            (PLAIN_EXT, GZIP_EXT)
        };
        let path = self.path_for(&entry.key, ext);
        let tmp = self.dir.join(format!(
            "{}.{}.{}",
            Self::stem(&entry.key),
            uuid::Uuid::new_v4().simple(),
            TMP_EXT
        ));

        let _guard = self.write_lock(&entry.key).lock().await;
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Self::remove_file(&self.path_for(&entry.key, stale_ext)).await?;
        debug!(key = %entry.key, bytes = bytes.len(), gzip, "Wrote cache entry");
        Ok(())
    }

    /// Every readable entry file. Unreadable files are skipped with a warning.
    async fn scan(&self) -> Result<Vec<(CacheEntry, PathBuf)>, CacheError> {
        let mut found = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            let name = path.to_string_lossy();
            if !(name.ends_with(GZIP_EXT) || name.ends_with(PLAIN_EXT)) {
                continue;
            }
            match Self::read_path(&path).await {
                Ok(Some(entry)) => found.push((entry, path)),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable cache file"),
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        match self.read_key(key).await? {
            Some((entry, _)) if !entry.is_expired() => Ok(Some(entry)),
            Some((_, path)) => {
                Self::remove_file(&path).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.write(&entry).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let _guard = self.write_lock(key).lock().await;
        let gz = Self::remove_file(&self.path_for(key, GZIP_EXT)).await?;
        let plain = Self::remove_file(&self.path_for(key, PLAIN_EXT)).await?;
        Ok(gz || plain)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let Some(entry) = self.get(key).await? else {
            return Ok(false);
        };
        let refreshed = entry
            .refreshed(ttl)
            .map_err(|e| CacheError::Codec(e.to_string()))?;
        self.write(&refreshed).await?;
        Ok(true)
    }

    async fn find_similar(
        &self,
        scope: &str,
        fingerprint: &[String],
        threshold: f64,
    ) -> Result<Option<SimilarEntry>, CacheError> {
        let now = SystemTime::now();
        Ok(self
            .scan()
            .await?
            .iter()
            .fold(None, |best, (entry, _)| {
                best_match(best, entry, scope, fingerprint, threshold, now)
            }))
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = SystemTime::now();
        let mut removed = 0;
        for (entry, path) in self.scan().await? {
            if entry.is_expired_at(now) && Self::remove_file(&path).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::cache::fingerprint;
    use std::sync::Arc;

    fn entry(key: &str, payload: &str, ttl_secs: u64) -> CacheEntry {
        CacheEntry::new(
            key,
            payload,
            "sig",
            fingerprint("explain rust ownership rules"),
            "tier:free",
            Duration::from_secs(ttl_secs),
        )
        .unwrap()
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_round_trip_plain() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), 1_000_000).await.unwrap();
        let e = entry("k1", r#"{"answer":"42"}"#, 60);
        store.set(e.clone()).await.unwrap();

        assert_eq!(store.get("k1").await.unwrap(), Some(e));
        let names = files_in(tmp.path());
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
    }

    #[tokio::test]
    async fn test_large_payload_is_compressed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), 2_000).await.unwrap();
        let payload = "ownership ".repeat(500);
        let e = entry("big", &payload, 60);
        store.set(e.clone()).await.unwrap();

        let names = files_in(tmp.path());
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json.gz"));
        assert_eq!(store.get("big").await.unwrap().unwrap().payload, payload);

        // shrinking below the threshold replaces the compressed file
        store.set(entry("big", "{}", 60)).await.unwrap();
        let names = files_in(tmp.path());
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed_on_read() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), 1_024).await.unwrap();
        let old = entry("old", "{}", 60).with_created_at(SystemTime::now() - Duration::from_secs(61));
        store.set(old).await.unwrap();

        assert!(store.get("old").await.unwrap().is_none());
        assert!(files_in(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_expire() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), 1_024).await.unwrap();
        store.set(entry("k", "{}", 5)).await.unwrap();

        assert!(store.expire("k", Duration::from_secs(300)).await.unwrap());
        assert_eq!(
            store.get("k").await.unwrap().unwrap().ttl(),
            Duration::from_secs(300)
        );
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(!store.expire("k", Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_similar_and_purge() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), 1_024).await.unwrap();
        store.set(entry("live", "{}", 60)).await.unwrap();
        store
            .set(entry("dead", "{}", 60).with_created_at(SystemTime::now() - Duration::from_secs(120)))
            .await
            .unwrap();
        std::fs::write(tmp.path().join("garbage.json"), "not json").unwrap();

        let query = fingerprint("Explain Rust ownership rules");
        let hit = store
            .find_similar("tier:free", &query, 0.85)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.entry.key, "live");
        assert!(
            store
                .find_similar("tier:premium", &query, 0.85)
                .await
                .unwrap()
                .is_none()
        );

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.get("live").await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_to_one_key() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(FileCacheStore::open(tmp.path(), 2_000).await.unwrap());

        for round in 0..20 {
            let payloads: Vec<String> = (0..8)
                .map(|i| {
                    if i % 2 == 0 {
                        format!("round {} writer {} ", round, i).repeat(200)
                    } else {
                        format!("round {} writer {}", round, i)
                    }
                })
                .collect();
            let writers: Vec<_> = payloads
                .iter()
                .map(|payload| {
                    let store = store.clone();
                    let e = entry("same", payload, 60);
                    tokio::spawn(async move { store.set(e).await })
                })
                .collect();
            for writer in writers {
                writer.await.unwrap().unwrap();
            }

            let stored = store.get("same").await.unwrap().unwrap();
            assert!(payloads.contains(&stored.payload));
            let names = files_in(tmp.path());
            assert_eq!(names.len(), 1, "leftover files: {:?}", names);
        }
    }

    #[tokio::test]
    async fn test_zero_ttl_file_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), 1_000_000).await.unwrap();
        let mut value = serde_json::to_value(entry("zero", "{}", 60)).unwrap();
        value["ttl"] = serde_json::json!({ "secs": 0, "nanos": 0 });
        std::fs::write(
            store.path_for("zero", PLAIN_EXT),
            serde_json::to_vec(&value).unwrap(),
        )
        .unwrap();

        assert!(matches!(store.get("zero").await, Err(CacheError::Codec(_))));
        let query = fingerprint("explain rust ownership rules");
        assert!(
            store
                .find_similar("tier:free", &query, 0.5)
                .await
                .unwrap()
                .is_none()
        );
    }
}
