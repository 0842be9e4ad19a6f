//! Tool registry: name-based lookup and uniform result handling.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parley_core::config::ToolsConfig;
use parley_core::{ToolDescriptor, ToolParameters, ToolResult};

use crate::builtin::{CalculatorTool, TimeTool, TranslateTool, WeatherTool, WebSearchTool};
use crate::error::ToolError;
use crate::tool::Tool;

/// Registry of named tools, in registration order.
///
/// Built once, then shared read-only: the registry holds no state that
/// changes between calls.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in tools, in their canonical order.
    pub fn with_defaults(config: &ToolsConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CalculatorTool));
        registry.register(Arc::new(WeatherTool::from_config(config)));
        registry.register(Arc::new(TimeTool));
        registry.register(Arc::new(TranslateTool::from_config(config)));
        registry.register(Arc::new(WebSearchTool::from_config(config)));
        registry
    }

    /// Register a tool. A tool with an existing name replaces the old one in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.descriptor().name;
        match self.by_name.get(&name) {
            Some(&idx) => self.tools[idx] = tool,
            None => {
                self.by_name.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&idx| &self.tools[idx])
    }

    /// Descriptors of all registered tools, in registration order.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute the named tool.
    ///
    /// Never fails: unknown names, tool errors, and panics inside a tool all
    /// come back as a failed [`ToolResult`].
    pub async fn execute(&self, name: &str, params: &ToolParameters) -> ToolResult {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = %name, "Unknown tool requested");
            return ToolResult::failure(name, format!("unknown tool: {}", name));
        };

        let outcome = AssertUnwindSafe(tool.execute(params)).catch_unwind().await;
        match outcome {
            Ok(Ok(value)) => {
                tracing::debug!(tool = %name, "Tool succeeded");
                ToolResult::ok(name, value)
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %name, error = %e, "Tool failed");
                ToolResult::failure(name, e.to_string())
            }
            Err(panic) => {
                let err = ToolError::Panicked(panic_message(panic.as_ref()));
                tracing::error!(tool = %name, error = %err, "Tool panicked");
                ToolResult::failure(name, err.to_string())
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
