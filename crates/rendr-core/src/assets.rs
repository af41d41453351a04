//! In-memory cache of compiled client assets.
//!
//! Development mode serves client bundles straight from memory so a request
//! never races the bundler's disk writes.

use std::collections::HashMap;
use std::path::Path;

/// Largest file that will be cached (10MB).
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Maps URL paths (relative to the public path, e.g. `/client.js`) to
/// `(content, content-type)`.
#[derive(Debug, Clone, Default)]
pub struct AssetCache {
    files: HashMap<String, (Vec<u8>, String)>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file into the cache.
    ///
    /// # Arguments
    ///
    /// * `path` - URL path (e.g., "/client.js")
    /// * `content` - File content as bytes
    /// * `content_type` - MIME type (e.g., "application/javascript")
    pub fn insert(&mut self, path: String, content: Vec<u8>, content_type: String) {
        self.files.insert(path, (content, content_type));
    }

    pub fn get(&self, path: &str) -> Option<&(Vec<u8>, String)> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Combined size of every cached file.
    pub fn total_bytes(&self) -> u64 {
        self.files.values().map(|(content, _)| content.len() as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Read every file under `dir` into a new cache, keyed by its path
    /// relative to `dir`.
    ///
    /// A missing directory yields an empty cache; the bundler may not emit
    /// client files for every configuration.
    pub async fn load_dir(dir: &Path) -> std::io::Result<Self> {
        use tokio::fs;

        let mut cache = Self::new();
        let mut pending = vec![(dir.to_path_buf(), String::new())];

        while let Some((current, prefix)) = pending.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_name = entry.file_name().to_string_lossy().to_string();
                let key = format!("{}/{}", prefix, file_name);

                // Follows symlinks, so linked bundles are cached too
                let metadata = match fs::metadata(&path).await {
                    Ok(metadata) => metadata,
                    Err(_) => continue,
                };

                if metadata.is_dir() {
                    pending.push((path, key));
                    continue;
                }
                if !metadata.is_file() {
                    continue;
                }

                if metadata.len() > MAX_FILE_SIZE {
                    tracing::warn!(
                        "Skipping large client asset {}: {} bytes",
                        key,
                        metadata.len()
                    );
                    continue;
                }

                let content = fs::read(&path).await?;
                let content_type = content_type_from_extension(&file_name);
                cache.insert(key, content, content_type.to_string());
            }
        }

        Ok(cache)
    }
}

/// Determine MIME type from a file name.
pub fn content_type_from_extension(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "css" => "text/css",
        "html" => "text/html; charset=utf-8",
        "wasm" => "application/wasm",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "otf" => "font/otf",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}
