//! Application state management
//!
//! Author: hephaex@gmail.com

use nerid_core::config::AppConfig;
use nerid_core::LabelRegistry;
use nerid_extractor::NerPipeline;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Application state shared across handlers
///
/// The pipeline (and the classifier inside it) is built once at startup
/// and only read afterwards.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// NER pipeline with the injected classifier
    pub pipeline: NerPipeline,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Requests answered without highlighting
    pub degraded_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
}

impl AppState {
    /// Create new application state
    pub fn new(config: AppConfig, pipeline: NerPipeline) -> Self {
        Self {
            config,
            pipeline,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            degraded_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        }
    }

    /// State with the offline rule-based classifier and default config
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing() -> Self {
        use nerid_core::ClassifierBackend;
        use nerid_extractor::RuleBasedClassifier;
        use std::sync::Arc;

        let mut config = AppConfig::default();
        config.classifier.backend = ClassifierBackend::Rules;

        let pipeline = NerPipeline::new(
            Arc::new(RuleBasedClassifier::new()),
            Arc::new(LabelRegistry::indonesian_pii()),
            config.merge.clone(),
        );

        Self::new(config, pipeline)
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Count a request that fell back to no highlighting
    pub fn record_degraded(&self) {
        self.degraded_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get_degraded_count(&self) -> u64 {
        self.degraded_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }

    /// Label registry shared with the pipeline
    pub fn registry(&self) -> &LabelRegistry {
        self.pipeline.registry()
    }
}
