//! Visits the main routes and checks that the page layout finished
//! rendering.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::types::{Task, TaskContext};
use crate::error::TaskResult;

/// Routes visited in order
pub const ROUTES: [&str; 3] = ["/", "/guide", "/methodology"];

/// Whether the page exposes its layout readiness hook
const HOOK_PRESENT_SCRIPT: &str = "return Boolean(window.nesta_isLayoutUndefined);";

/// Whether the layout has been computed
const LAYOUT_READY_SCRIPT: &str = "return !window.nesta_isLayoutUndefined();";

#[derive(Debug, Clone)]
pub struct RouteLanding {
    routes: Vec<String>,
}

impl RouteLanding {
    pub const ID: &'static str = "route-landing";

    pub fn new() -> Self {
        Self::with_routes(ROUTES)
    }

    pub fn with_routes<I, S>(routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            routes: routes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for RouteLanding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Task for RouteLanding {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "navigate the main routes and check the layout renders"
    }

    async fn run(&self, ctx: &TaskContext<'_>) -> TaskResult<Value> {
        let mut visited = Vec::with_capacity(self.routes.len());

        for route in &self.routes {
            ctx.log.info("Navigating...");
            ctx.driver.get(&ctx.url(route)).await?;
            ctx.log.info("Retrieving document title");
            let title = ctx.driver.title().await?;
            ctx.log.info(&title);

            let hook_present = ctx
                .driver
                .execute_script(HOOK_PRESENT_SCRIPT, vec![])
                .await?
                .as_bool()
                .unwrap_or(false);
            let loaded = if hook_present {
                let loaded = ctx
                    .driver
                    .execute_script(LAYOUT_READY_SCRIPT, vec![])
                    .await?
                    .as_bool()
                    .unwrap_or(false);
                ctx.log.info(format!("page loaded: {}", loaded));
                loaded
            } else {
                ctx.log.info("function NOT ready!");
                false
            };

            visited.push(json!({ "route": route, "title": title, "loaded": loaded }));
        }

        let failures: Vec<&str> = visited
            .iter()
            .filter(|v| v["loaded"] != Value::Bool(true))
            .filter_map(|v| v["route"].as_str())
            .collect();
        let result = json!({
            "passed": failures.is_empty(),
            "reasonsForFailure": failures,
            "routes": visited,
        });
        ctx.log.info(&result);
        Ok(result)
    }
}
