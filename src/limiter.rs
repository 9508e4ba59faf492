// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter for contact submissions.
//!
//! Each client address is hashed and mapped to the epoch timestamps of its
//! accepted submissions. Timestamps older than the window are pruned on
//! every check; a client at the limit is refused without touching its
//! record.
//!
//! Storage sits behind [`RateStore`]:
//! - [`FileStore`]: one file per client, exclusive advisory lock around
//!   read-prune-append-write. Safe across processes on one host.
//! - [`MemoryStore`]: process-local map with TTL cleanup.

use crate::config::{RateLimitConfig, StoreBackend};
use async_trait::async_trait;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining submissions in the current window
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Time until the oldest recorded submission leaves the window
        retry_after: Duration,
    },
}

/// Outcome of a single [`RateStore::increment_and_check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The hit was recorded
    Allowed { remaining: u32 },
    /// The key is at its limit; nothing was recorded
    Limited { retry_after_secs: u64 },
}

/// Rate-limit storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rate limit storage unavailable at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("rate limit worker failed: {0}")]
    Worker(String),
}

/// Counter store keyed by opaque strings.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Record a hit for `key` at `now` unless `limit` hits already fall
    /// within the last `window_secs` seconds.
    async fn increment_and_check(
        &self,
        key: &str,
        limit: u32,
        window_secs: u64,
        now: i64,
    ) -> Result<RateDecision, StoreError>;

    /// Drop keys with no hits inside the window.
    async fn cleanup(&self, _window_secs: u64, _now: i64) {}
}

/// Stable, non-reversible key for a client address.
pub fn client_key(ip: IpAddr) -> String {
    hex::encode(Sha256::digest(ip.to_string().as_bytes()))
}

/// Keep only timestamps inside the window ending at `now`.
fn prune(hits: &mut Vec<i64>, window_secs: u64, now: i64) {
    let window = window_len(window_secs);
    hits.retain(|&t| now.saturating_sub(t) < window);
}

fn window_len(window_secs: u64) -> i64 {
    i64::try_from(window_secs).unwrap_or(i64::MAX)
}

fn decide(hits: &mut Vec<i64>, limit: u32, window_secs: u64, now: i64) -> RateDecision {
    prune(hits, window_secs, now);

    if hits.len() >= limit as usize {
        let oldest = hits.iter().copied().min().unwrap_or(now);
        let retry_after_secs = oldest
            .saturating_add(window_len(window_secs))
            .saturating_sub(now)
            .max(1)
            .unsigned_abs();
        return RateDecision::Limited { retry_after_secs };
    }

    hits.push(now);
    RateDecision::Allowed {
        remaining: limit.saturating_sub(hits.len() as u32),
    }
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryStore {
    hits: RwLock<HashMap<String, Vec<i64>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys.
    pub async fn len(&self) -> usize {
        self.hits.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.hits.read().await.is_empty()
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn increment_and_check(
        &self,
        key: &str,
        limit: u32,
        window_secs: u64,
        now: i64,
    ) -> Result<RateDecision, StoreError> {
        let mut map = self.hits.write().await;
        let hits = map.entry(key.to_string()).or_default();
        Ok(decide(hits, limit, window_secs, now))
    }

    async fn cleanup(&self, window_secs: u64, now: i64) {
        let mut map = self.hits.write().await;
        map.retain(|_, hits| {
            prune(hits, window_secs, now);
            !hits.is_empty()
        });
    }
}

/// File-per-key store. Record files hold newline-separated epoch seconds.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the record file for `key`.
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("ip_{key}"))
    }

    fn check_blocking(
        dir: &Path,
        path: &Path,
        limit: u32,
        window_secs: u64,
        now: i64,
    ) -> Result<RateDecision, StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(io_err)?;

        // Released when `file` is dropped.
        file.lock_exclusive().map_err(io_err)?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(io_err)?;

        let mut hits: Vec<i64> = contents
            .lines()
            .filter_map(|line| line.trim().parse().ok())
            .collect();

        let decision = decide(&mut hits, limit, window_secs, now);
        if let RateDecision::Allowed { .. } = decision {
            let mut out = String::with_capacity(hits.len() * 11);
            for hit in &hits {
                out.push_str(&hit.to_string());
                out.push('\n');
            }

            file.set_len(0).map_err(io_err)?;
            file.seek(SeekFrom::Start(0)).map_err(io_err)?;
            file.write_all(out.as_bytes()).map_err(io_err)?;
        }

        Ok(decision)
    }
}

#[async_trait]
impl RateStore for FileStore {
    async fn increment_and_check(
        &self,
        key: &str,
        limit: u32,
        window_secs: u64,
        now: i64,
    ) -> Result<RateDecision, StoreError> {
        let dir = self.dir.clone();
        let path = self.record_path(key);

        tokio::task::spawn_blocking(move || {
            Self::check_blocking(&dir, &path, limit, window_secs, now)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }
}

/// Per-IP limiter over a [`RateStore`].
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn RateStore>,
}

impl RateLimiter {
    /// Create a limiter with the backend named in the configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        let store: Arc<dyn RateStore> = match config.backend {
            StoreBackend::File => Arc::new(FileStore::new(config.storage_dir.clone())),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Self::with_store(config, store)
    }

    pub fn with_store(config: RateLimitConfig, store: Arc<dyn RateStore>) -> Self {
        Self { config, store }
    }

    /// Check and record a submission from `ip`.
    pub async fn check_ip(&self, ip: IpAddr, now: i64) -> Result<RateLimitResult, StoreError> {
        let key = client_key(ip);
        let decision = self
            .store
            .increment_and_check(&key, self.config.max_submissions, self.config.window_secs, now)
            .await
            .map_err(|err| {
                warn!(error = %err, "Rate limit store failed");
                err
            })?;

        Ok(match decision {
            RateDecision::Allowed { remaining } => RateLimitResult::Allowed { remaining },
            RateDecision::Limited { retry_after_secs } => {
                debug!(client = %&key[..12], retry_after_secs, "Client rate limit exceeded");
                RateLimitResult::Limited {
                    retry_after: Duration::from_secs(retry_after_secs),
                }
            }
        })
    }

    /// Clean up expired entries (should be called periodically).
    pub async fn cleanup(&self, now: i64) {
        self.store.cleanup(self.config.window_secs, now).await;
    }
}
