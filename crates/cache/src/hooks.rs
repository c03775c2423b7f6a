//! Source lifecycle notifications.
//!
//! The system that owns source records calls
//! [`SourceLifecycle::notify_before_delete`] before removing a source so that
//! registered hooks can clean up after it.

use crate::error::CacheResult;
use async_trait::async_trait;
use std::sync::Arc;
use vignette_core::SourceImage;

/// Observer invoked before a source record is deleted.
#[async_trait]
pub trait BeforeDeleteHook: Send + Sync {
    async fn before_delete(&self, source: &SourceImage) -> CacheResult<()>;
}

/// Ordered list of lifecycle hooks.
#[derive(Clone, Default)]
pub struct SourceLifecycle {
    hooks: Vec<Arc<dyn BeforeDeleteHook>>,
}

impl SourceLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn BeforeDeleteHook>) -> &mut Self {
        self.hooks.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook in registration order, stopping at the first failure.
    pub async fn notify_before_delete(&self, source: &SourceImage) -> CacheResult<()> {
        for hook in &self.hooks {
            hook.before_delete(source).await?;
        }
        Ok(())
    }
}
