//! End-to-end matrix run.
//!
//! source -> adapt -> filter -> expand -> queue -> session runner ->
//! aggregator -> persist

use std::path::PathBuf;
use std::sync::Arc;

use crate::capability::{
    Capability, CapabilitySource, PlatformMatrix, adapt, filter_supported, platform_header,
};
use crate::config::{GridSettings, RunSettings};
use crate::driver::DriverFactory;
use crate::error::HarnessResult;
use crate::queue::{QueueSummary, WorkQueue};
use crate::report::{ResultAggregator, RunSummary};
use crate::session::{SessionRunner, WorkItem};
use crate::task::TaskRegistry;

/// Everything a matrix run needs
pub struct RunPlan {
    pub source: Arc<dyn CapabilitySource>,
    pub matrix: PlatformMatrix,
    pub registry: TaskRegistry,
    pub factory: Arc<dyn DriverFactory>,
    pub grid: GridSettings,
    pub settings: RunSettings,
    /// Also write the per-platform grouped view here
    pub grouped_report: Option<PathBuf>,
}

/// What a finished run reports back
#[derive(Debug, Clone)]
pub struct MatrixRun {
    pub summary: RunSummary,
    pub queue: QueueSummary,
    pub configurations: usize,
    pub report_path: PathBuf,
}

/// Fetch, adapt and filter the platforms to run on
pub async fn resolve_capabilities(
    source: &dyn CapabilitySource,
    matrix: &PlatformMatrix,
    grid: &GridSettings,
) -> HarnessResult<Vec<Capability>> {
    let descriptors = source.platforms().await?;
    tracing::debug!(source = %source.describe(), descriptors = descriptors.len(), "inventory fetched");
    let caps = filter_supported(adapt(&descriptors, grid), matrix);
    Ok(caps)
}

/// Expand capabilities into work items.
///
/// Order is per capability, then per task, then per variant; the queue
/// starts items in this order.
pub fn expand(caps: &[Capability], registry: &TaskRegistry, matrix: &PlatformMatrix) -> Vec<WorkItem> {
    let mut items = Vec::new();
    for cap in caps {
        let variants = matrix.variants(cap);
        for task in registry.tasks() {
            for variant in &variants {
                match cap.with_variant(variant) {
                    Ok(applied) => items.push(WorkItem::new(task.clone(), applied, Some(variant.clone()))),
                    Err(e) => tracing::warn!(
                        platform = %platform_header(cap),
                        variant = %variant,
                        error = %e,
                        "variant rejected"
                    ),
                }
            }
        }
    }
    items
}

/// Run every task against every supported platform and persist the report.
///
/// Only inventory and persistence failures are fatal; per-item failures
/// end up as records.
pub async fn run_matrix(plan: RunPlan) -> HarnessResult<MatrixRun> {
    let caps = resolve_capabilities(plan.source.as_ref(), &plan.matrix, &plan.grid).await?;
    tracing::info!("Configurations: {}", caps.len());
    tracing::info!("Tests loaded: {}", plan.registry.len());

    let items = expand(&caps, &plan.registry, &plan.matrix);
    tracing::info!(
        work_items = items.len(),
        concurrency = plan.settings.concurrency,
        interval_ms = plan.settings.interval.as_millis() as u64,
        "queue starting"
    );

    let runner = SessionRunner::new(plan.factory, plan.settings.target.clone(), plan.settings.task_timeout);
    let queue = WorkQueue::new(plan.settings.concurrency, plan.settings.interval);
    let total = items.len();
    let mut aggregator = ResultAggregator::new();

    let queue_summary = queue
        .run(
            items,
            |item| {
                let runner = &runner;
                async move { runner.run(&item).await }
            },
            |record| {
                let success = record.outcome.is_success();
                aggregator.record(record);
                tracing::debug!(settled = aggregator.len(), total, success, "work item settled");
            },
        )
        .await;

    aggregator.persist(&plan.settings.report_path)?;
    if let Some(path) = &plan.grouped_report {
        aggregator.persist_grouped(path)?;
    }

    let summary = aggregator.summary();
    tracing::info!("{}", summary);
    Ok(MatrixRun {
        summary,
        queue: queue_summary,
        configurations: caps.len(),
        report_path: plan.settings.report_path,
    })
}
