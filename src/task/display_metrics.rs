//! Reads the measurements the page publishes in its `#info` element.
//!
//! The page serializes its groups (`display`, `glyph`, `orientation`,
//! `text`, `size`) as JSON text; the task hands the parsed object through
//! untouched so the report flattener can prefix every group into columns.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::types::{Task, TaskContext};
use crate::driver::By;
use crate::error::{TaskError, TaskResult};

/// Element carrying the serialized measurements
pub const INFO_ELEMENT: &str = "info";

/// Pause after navigating and again after locating `#info`
const SETTLE: Duration = Duration::from_millis(10);

/// How long `#info` may take to appear
const INFO_WAIT: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Default)]
pub struct DisplayMetrics;

impl DisplayMetrics {
    pub const ID: &'static str = "display-metrics";
}

#[async_trait]
impl Task for DisplayMetrics {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "read the display, glyph, text and viewport measurements from #info"
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> TaskResult<Value> {
        let info = By::Id(INFO_ELEMENT.to_string());

        ctx.log.info("Navigating...");
        ctx.driver.get(ctx.target).await?;
        ctx.driver.sleep(SETTLE).await;

        ctx.log.info("Searching for element...");
        let element = ctx.driver.wait_for_element(&info, INFO_WAIT).await?;
        ctx.driver.sleep(SETTLE).await;

        ctx.log.info("Found element. Getting text content...");
        let text = ctx.driver.element_text(&element).await?;
        let result: Value = serde_json::from_str(&text)
            .map_err(|e| TaskError::Failed(format!("{} text is not JSON: {}", info.selector(), e)))?;
        if !result.is_object() {
            return Err(TaskError::Failed(format!(
                "{} text is not an object: {}",
                info.selector(),
                result
            )));
        }

        ctx.log.debug(format!("Content: {}", result));
        Ok(result)
    }
}
