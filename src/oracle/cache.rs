//! Oracle response cache
//!
//! Disk-backed memoization decorator around an [`Oracle`]. Responses
//! are stored as one JSON file per request fingerprint, so they
//! survive server restarts. A cache hit returns without touching the
//! inner oracle; a miss invokes it once and persists the result
//! before returning.

use crate::oracle::{FunctionCall, FunctionDecl, Oracle, OracleError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Caching decorator for an oracle
///
/// Keys are blake3 digests over the request kind, prompt and function
/// declarations, so identical requests map to the same entry and
/// distinct requests write distinct files. Single-writer usage per
/// key is assumed; concurrent writes for different keys are
/// independent.
pub struct CachedOracle<O> {
    inner: O,
    cache_dir: PathBuf,
}

impl<O> CachedOracle<O> {
    /// Wrap `inner` with a cache rooted at `cache_dir`
    pub fn new(inner: O, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            cache_dir: cache_dir.into(),
        }
    }

    /// Deterministic fingerprint of one request
    fn fingerprint(
        kind: &str,
        prompt: &str,
        functions: &[FunctionDecl],
    ) -> Result<String, OracleError> {
        let functions_json = serde_json::to_vec(functions)
            .map_err(|e| OracleError::Cache(format!("Failed to serialize functions: {}", e)))?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(kind.as_bytes());
        hasher.update(&[0]);
        hasher.update(prompt.as_bytes());
        hasher.update(&[0]);
        hasher.update(&functions_json);
        Ok(hasher.finalize().to_hex().to_string())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Read a cached entry; any read or parse failure is a miss
    async fn read_entry(&self, path: &Path) -> Option<serde_json::Value> {
        let bytes = fs::read(path).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Persist an entry under its key
    async fn write_entry(
        &self,
        path: &Path,
        value: &serde_json::Value,
    ) -> Result<(), OracleError> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| OracleError::Cache(format!("Failed to create cache dir: {}", e)))?;

        let json = serde_json::to_string(value)
            .map_err(|e| OracleError::Cache(format!("Failed to serialize entry: {}", e)))?;

        fs::write(path, json)
            .await
            .map_err(|e| OracleError::Cache(format!("Failed to write cache entry: {}", e)))
    }
}

#[async_trait]
impl<O: Oracle> Oracle for CachedOracle<O> {
    async fn ask(&self, prompt: &str) -> Result<String, OracleError> {
        let key = Self::fingerprint("ask", prompt, &[])?;
        let path = self.entry_path(&key);

        if let Some(value) = self.read_entry(&path).await {
            if let Some(text) = value.as_str() {
                tracing::debug!(key = %key, "Oracle cache hit");
                return Ok(text.to_string());
            }
        }

        let text = self.inner.ask(prompt).await?;
        self.write_entry(&path, &serde_json::Value::String(text.clone()))
            .await?;
        Ok(text)
    }

    async fn ask_function(
        &self,
        prompt: &str,
        functions: &[FunctionDecl],
    ) -> Result<FunctionCall, OracleError> {
        let key = Self::fingerprint("function", prompt, functions)?;
        let path = self.entry_path(&key);

        if let Some(value) = self.read_entry(&path).await {
            if let Ok(call) = serde_json::from_value::<FunctionCall>(value) {
                tracing::debug!(key = %key, "Oracle cache hit");
                return Ok(call);
            }
        }

        let call = self.inner.ask_function(prompt, functions).await?;
        let value = serde_json::to_value(&call)
            .map_err(|e| OracleError::Cache(format!("Failed to serialize entry: {}", e)))?;
        self.write_entry(&path, &value).await?;
        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stub oracle that counts invocations
    struct CountingOracle {
        calls: AtomicUsize,
    }

    impl CountingOracle {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Oracle for CountingOracle {
        async fn ask(&self, prompt: &str) -> Result<String, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("response to: {}", prompt))
        }

        async fn ask_function(
            &self,
            _prompt: &str,
            functions: &[FunctionDecl],
        ) -> Result<FunctionCall, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FunctionCall {
                name: functions[0].name.clone(),
                arguments: json!({"correct": true, "reason": "stubbed"}),
            })
        }
    }

    fn decl() -> FunctionDecl {
        FunctionDecl {
            name: "evaluate_correctness".to_string(),
            description: "test".to_string(),
            parameters: json!({"type": "object"}),
        }
    }

    #[tokio::test]
    async fn test_identical_ask_invokes_inner_once() {
        let dir = tempfile::tempdir().unwrap();
        let cached = CachedOracle::new(CountingOracle::new(), dir.path());

        let first = cached.ask("same prompt").await.unwrap();
        let second = cached.ask("same prompt").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.inner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_distinct_prompts_invoke_inner_separately() {
        let dir = tempfile::tempdir().unwrap();
        let cached = CachedOracle::new(CountingOracle::new(), dir.path());

        cached.ask("prompt a").await.unwrap();
        cached.ask("prompt b").await.unwrap();

        assert_eq!(cached.inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_function_calls_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cached = CachedOracle::new(CountingOracle::new(), dir.path());

        let first = cached.ask_function("judge", &[decl()]).await.unwrap();
        let second = cached.ask_function("judge", &[decl()]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.inner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();

        let cached = CachedOracle::new(CountingOracle::new(), dir.path());
        cached.ask("persistent prompt").await.unwrap();
        assert_eq!(cached.inner.call_count(), 1);

        // A fresh decorator over the same directory sees the entry
        let reopened = CachedOracle::new(CountingOracle::new(), dir.path());
        let text = reopened.ask("persistent prompt").await.unwrap();
        assert_eq!(text, "response to: persistent prompt");
        assert_eq!(reopened.inner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ask_and_function_keys_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let cached = CachedOracle::new(CountingOracle::new(), dir.path());

        cached.ask("same text").await.unwrap();
        cached.ask_function("same text", &[decl()]).await.unwrap();

        assert_eq!(cached.inner.call_count(), 2);
    }
}
