// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Airport photo disk cache.
//!
//! Photos are stored under SHA256-based filenames so any URL maps to a safe
//! path. Concurrent requests for the same URL download it only once.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info};

/// At most this many photos are shown per airport
pub const MAX_PHOTOS: usize = 3;

const DEFAULT_EXTENSION: &str = "jpg";

type CacheResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Photo cache manager for airport images
#[derive(Debug, Clone)]
pub struct PhotoCache {
    cache_dir: PathBuf,
    client: reqwest::Client,
    pending_downloads: Arc<Mutex<HashSet<String>>>, // Track ongoing downloads
}

impl PhotoCache {
    /// Cache under the platform cache directory
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let cache_dir = dirs::cache_dir()
            .ok_or("Could not determine cache directory")?
            .join("airtraffic-map")
            .join("airport_photos");
        Self::with_dir(cache_dir)
    }

    pub fn with_dir(cache_dir: PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            client: reqwest::Client::new(),
            pending_downloads: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// Get cache file path for a given URL
    #[must_use]
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let hash = format!("{:x}", hasher.finalize());

        self.cache_dir.join(format!("{}.{}", hash, extension(url)))
    }

    #[must_use]
    pub fn is_cached(&self, url: &str) -> bool {
        self.cache_path(url).exists()
    }

    #[must_use]
    pub fn is_pending(&self, url: &str) -> bool {
        self.pending_downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(url)
    }

    /// Path of the cached photo, downloading it first when needed
    pub async fn fetch(&self, url: &str) -> CacheResult<PathBuf> {
        let path = self.cache_path(url);
        if path.exists() {
            debug!("Photo cache hit for {}", url);
            return Ok(path);
        }

        // Check if already downloading
        let Some(_pending) = PendingDownload::claim(&self.pending_downloads, url) else {
            return Err("Already downloading".into());
        };

        self.download(url, &path).await.map(|()| path)
    }

    async fn download(&self, url: &str, path: &Path) -> CacheResult<()> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(format!("HTTP error: {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        fs::write(path, &bytes)?;
        info!("Cached photo {} ({} bytes)", url, bytes.len());
        Ok(())
    }
}

/// Entry in the pending set, removed when the download finishes or is dropped
struct PendingDownload<'a> {
    pending: &'a Mutex<HashSet<String>>,
    url: &'a str,
}

impl<'a> PendingDownload<'a> {
    fn claim(pending: &'a Mutex<HashSet<String>>, url: &'a str) -> Option<Self> {
        let inserted = pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string());
        inserted.then_some(Self { pending, url })
    }
}

impl Drop for PendingDownload<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.url);
    }
}

/// File extension from the URL path, ignoring query and fragment
fn extension(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) => ext,
        _ => DEFAULT_EXTENSION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> PhotoCache {
        let dir = std::env::temp_dir().join(format!("airtraffic-map-photos-{}", std::process::id()));
        PhotoCache::with_dir(dir).unwrap()
    }

    /// Accepts connections and never answers.
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_concurrent_fetch_is_suppressed_and_released_on_drop() {
        let cache = cache();
        let url = format!("{}/photos/katl-{}.jpg", silent_server().await, std::process::id());

        let first = tokio::spawn({
            let cache = cache.clone();
            let url = url.clone();
            async move { cache.fetch(&url).await.map_err(|e| e.to_string()) }
        });
        for _ in 0..100 {
            if cache.is_pending(&url) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(cache.is_pending(&url));

        let second = cache.fetch(&url).await;
        assert_eq!(second.unwrap_err().to_string(), "Already downloading");

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());
        assert!(!cache.is_pending(&url));
        assert!(!cache.is_cached(&url));
    }

    #[test]
    fn test_extension_ignores_query_string() {
        assert_eq!(extension("https://img.example.com/a/katl.png?w=640&h=480"), "png");
        assert_eq!(extension("https://img.example.com/a/katl.jpeg#top"), "jpeg");
        assert_eq!(extension("https://img.example.com/photo?id=42"), "jpg");
        assert_eq!(extension("https://img.example.com/v1.2/photo"), "jpg");
    }

    #[test]
    fn test_cache_path_is_stable_hash() {
        let cache = cache();
        let a = cache.cache_path("https://img.example.com/katl.png");
        let b = cache.cache_path("https://img.example.com/katl.png");
        let c = cache.cache_path("https://img.example.com/kjfk.png");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name.len(), 64 + ".png".len());
        assert!(!cache.is_pending("https://img.example.com/katl.png"));
    }
}
