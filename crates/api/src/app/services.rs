//! Infrastructure wiring (stores, clients, orchestrator, lifecycle) and
//! env-driven configuration.

use std::sync::Arc;
use std::time::Duration;

use photobooth_infra::blob_store::{BlobStore, InMemoryBlobStore, WorkerBlobStore};
use photobooth_infra::cleanup::{
    CleanupScheduler, CleanupWorker, CleanupWorkerHandle, InMemoryCleanupQueue, QstashScheduler,
};
use photobooth_infra::job_store::{InMemoryJobStore, JobStore};
use photobooth_infra::lifecycle::JobLifecycle;
use photobooth_infra::orchestrator::UploadOrchestrator;
use photobooth_infra::rate_limit::FixedWindowLimiter;
use photobooth_infra::transform::{RecordingTransform, ReplicateClient, TransformService};

/// Age-transform model version pinned by the original deployment.
const DEFAULT_MODEL_VERSION: &str =
    "42fed1c4974146d4d2414e2be2c5277c7fcf05fcc3a73abf41610695738c1d7b";

const DEFAULT_QSTASH_PUBLISH_URL: &str = "https://qstash.upstash.io/v1/publish";

/// Worker blob store endpoint + shared secret.
#[derive(Debug, Clone)]
pub struct WorkerBlobConfig {
    pub url: String,
    pub secret: String,
}

/// Replicate credentials and model pin.
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: String,
    pub model_version: String,
}

/// Durable delayed-queue credentials.
#[derive(Debug, Clone)]
pub struct QstashConfig {
    pub publish_url: String,
    pub token: String,
}

/// Application configuration, resolved once at startup.
///
/// Every external collaborator is optional: when unconfigured, wiring
/// degrades to an in-memory stand-in so the service still runs end to end
/// in dev.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Externally reachable base URL for webhook/delete callbacks.
    pub public_base_url: String,
    pub rate_limit_ceiling: u32,
    pub rate_limit_window: Duration,
    /// Retention window after which artifacts are purged.
    pub retention: Duration,
    /// Poll cadence of the in-process cleanup worker.
    pub cleanup_poll_interval: Duration,
    pub blob_store: Option<WorkerBlobConfig>,
    pub replicate: Option<ReplicateConfig>,
    pub qstash: Option<QstashConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8080".to_string(),
            rate_limit_ceiling: 30,
            rate_limit_window: Duration::from_secs(60),
            retention: Duration::from_secs(86_400),
            cleanup_poll_interval: Duration::from_millis(500),
            blob_store: None,
            replicate: None,
            qstash: None,
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment, warning about dev fallbacks.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let public_base_url = env_var("PUBLIC_BASE_URL").unwrap_or_else(|| {
            tracing::warn!("PUBLIC_BASE_URL not set; callbacks will target the dev default");
            defaults.public_base_url.clone()
        });

        let blob_store = match (env_var("BLOB_STORE_URL"), env_var("BLOB_STORE_SECRET")) {
            (Some(url), Some(secret)) => Some(WorkerBlobConfig { url, secret }),
            (None, None) => None,
            _ => {
                tracing::warn!(
                    "blob store config incomplete; set both BLOB_STORE_URL and BLOB_STORE_SECRET"
                );
                None
            }
        };

        let replicate = env_var("REPLICATE_API_TOKEN").map(|api_token| ReplicateConfig {
            api_token,
            model_version: env_var("REPLICATE_MODEL_VERSION")
                .unwrap_or_else(|| DEFAULT_MODEL_VERSION.to_string()),
        });

        let qstash = env_var("QSTASH_TOKEN").map(|token| QstashConfig {
            publish_url: env_var("QSTASH_URL")
                .unwrap_or_else(|| DEFAULT_QSTASH_PUBLISH_URL.to_string()),
            token,
        });

        Self {
            public_base_url,
            rate_limit_ceiling: env_parse("UPLOAD_RATE_LIMIT", defaults.rate_limit_ceiling),
            rate_limit_window: Duration::from_secs(env_parse("UPLOAD_RATE_WINDOW_SECS", 60)),
            retention: Duration::from_secs(env_parse("RETENTION_SECS", 86_400)),
            cleanup_poll_interval: defaults.cleanup_poll_interval,
            blob_store,
            replicate,
            qstash,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(name, %raw, %default, "unparsable value; using default");
            default
        }),
        Err(_) => default,
    }
}

/// Wired application services shared across request handlers.
pub struct AppServices {
    pub orchestrator: Arc<UploadOrchestrator>,
    pub lifecycle: Arc<JobLifecycle>,
    /// Keeps in-process purges running for the app's lifetime.
    _cleanup_worker: Option<CleanupWorkerHandle>,
}

/// Wire stores, clients, and services from `config`.
pub async fn build_services(config: AppConfig) -> AppServices {
    let jobs: Arc<dyn JobStore> = InMemoryJobStore::arc();
    let limiter = Arc::new(FixedWindowLimiter::new(
        config.rate_limit_ceiling,
        config.rate_limit_window,
    ));

    let blobs: Arc<dyn BlobStore> = match &config.blob_store {
        Some(cfg) => Arc::new(WorkerBlobStore::new(cfg.url.clone(), cfg.secret.clone())),
        None => {
            tracing::warn!("BLOB_STORE_URL not set; using in-memory blob store");
            InMemoryBlobStore::arc()
        }
    };

    let transform: Arc<dyn TransformService> = match &config.replicate {
        Some(cfg) => Arc::new(ReplicateClient::new(
            cfg.api_token.clone(),
            cfg.model_version.clone(),
        )),
        None => {
            tracing::warn!("REPLICATE_API_TOKEN not set; transform submissions are recorded only");
            RecordingTransform::arc()
        }
    };

    let lifecycle = Arc::new(JobLifecycle::new(jobs.clone(), blobs.clone()));

    let (cleanup, cleanup_worker): (Arc<dyn CleanupScheduler>, Option<CleanupWorkerHandle>) =
        match &config.qstash {
            Some(cfg) => (
                Arc::new(QstashScheduler::new(
                    cfg.publish_url.clone(),
                    cfg.token.clone(),
                    config.public_base_url.clone(),
                )),
                None,
            ),
            None => {
                tracing::warn!("QSTASH_TOKEN not set; delayed cleanup runs in-process (not crash-safe)");
                let queue = InMemoryCleanupQueue::arc();
                let handle = CleanupWorker::spawn(
                    queue.clone(),
                    lifecycle.clone(),
                    config.cleanup_poll_interval,
                );
                (queue, Some(handle))
            }
        };

    let orchestrator = Arc::new(UploadOrchestrator::new(
        jobs,
        limiter,
        blobs,
        transform,
        cleanup,
        config.public_base_url.clone(),
        config.retention,
    ));

    AppServices {
        orchestrator,
        lifecycle,
        _cleanup_worker: cleanup_worker,
    }
}
