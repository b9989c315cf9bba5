//! Host plugin surface.
//!
//! The host composes plugins through [`HostPlugin`]: `install` declares the
//! capability category, `check` decides whether the plugin takes part in the
//! current run, and `handle` performs it.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::PublishConfig;
use crate::error::PublishFailure;
use crate::progress::ProgressSink;
use crate::publish::{publish, PublishReport};
use crate::uploader::ArchiveUploader;

/// Host task this plugin responds to.
pub const PUBLISH_TASK: &str = "publish";

/// Capability categories recognised by the host's plugin registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PluginKind {
    Publisher,
}

/// Everything the host hands a plugin for one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub task: String,
    pub config: PublishConfig,
    pub storage: PathBuf,
}

impl RunContext {
    /// True when the host is running the publish task.
    pub fn is_publish(&self) -> bool {
        self.task == PUBLISH_TASK
    }
}

#[async_trait]
pub trait HostPlugin: Send + Sync {
    fn install(&self) -> PluginKind;

    fn check(&self, ctx: &RunContext) -> bool;

    async fn handle(
        &self,
        ctx: &RunContext,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<PublishReport, PublishFailure>;
}

/// Publishes the run's books to the doc cloud through `U`.
pub struct DocCloudPublisher<U> {
    uploader: U,
}

impl<U: ArchiveUploader> DocCloudPublisher<U> {
    pub fn new(uploader: U) -> Self {
        Self { uploader }
    }
}

#[async_trait]
impl<U: ArchiveUploader> HostPlugin for DocCloudPublisher<U> {
    fn install(&self) -> PluginKind {
        PluginKind::Publisher
    }

    fn check(&self, ctx: &RunContext) -> bool {
        ctx.is_publish()
    }

    async fn handle(
        &self,
        ctx: &RunContext,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<PublishReport, PublishFailure> {
        info!(task = %ctx.task, "Doc cloud publisher handling run");
        publish(&ctx.config, &ctx.storage, &self.uploader, progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uploader::MockArchiveUploader;

    fn context(task: &str) -> RunContext {
        RunContext {
            task: task.to_string(),
            config: PublishConfig {
                name: "pandora-cloud".into(),
                version: "1.0.0".into(),
                books: vec![],
            },
            storage: PathBuf::from("/tmp/unused"),
        }
    }

    #[test]
    fn installs_as_publisher() {
        let plugin = DocCloudPublisher::new(MockArchiveUploader::new());
        assert_eq!(plugin.install(), PluginKind::Publisher);
    }

    #[test]
    fn only_checks_in_for_the_publish_task() {
        let plugin = DocCloudPublisher::new(MockArchiveUploader::new());
        assert!(plugin.check(&context("publish")));
        assert!(!plugin.check(&context("build")));
        assert!(!plugin.check(&context("Publish")));
        assert!(!plugin.check(&context("")));
    }

    #[test]
    fn run_context_knows_its_task() {
        assert!(context("publish").is_publish());
        assert!(!context("build").is_publish());
    }
}
