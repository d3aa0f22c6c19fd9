use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global subscriber. `RUST_LOG` refines the configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "content_hub_cache_hit_total",
            Unit::Count,
            "Cache lookups answered from the backend."
        );
        describe_counter!(
            "content_hub_cache_miss_total",
            Unit::Count,
            "Cache lookups that fell through to storage."
        );
        describe_counter!(
            "content_hub_cache_error_total",
            Unit::Count,
            "Cache backend failures, labelled by operation."
        );
        describe_counter!(
            "content_hub_cache_lock_poisoned_total",
            Unit::Count,
            "Cache locks recovered after a panic while held."
        );
        describe_counter!(
            "content_hub_cache_fill_skipped_total",
            Unit::Count,
            "Read-through fills dropped because a write invalidated their inputs mid-read."
        );
        describe_histogram!(
            "content_hub_cache_invalidate_ms",
            Unit::Milliseconds,
            "Post-write invalidation latency in milliseconds."
        );
        describe_counter!(
            "content_hub_article_views_total",
            Unit::Count,
            "Article views recorded through the detail endpoint."
        );
        describe_counter!(
            "content_hub_comments_created_total",
            Unit::Count,
            "Comments created."
        );
        describe_counter!(
            "content_hub_http_rate_limited_total",
            Unit::Count,
            "Requests rejected by the API rate limiter."
        );
    });
}
