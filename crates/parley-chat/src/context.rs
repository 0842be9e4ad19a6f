//! Prompt assembly.
//!
//! Renders prior turns, the tool catalog, and tool results into the single
//! prompt string sent to the model. Assembly is a pure function of its
//! inputs.

use parley_core::{Role, ToolDescriptor, ToolInvocation, Turn};

/// Builds model prompts from conversation state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Assemble the prompt for one model call.
    ///
    /// `catalog` is `Some` only when tools are enabled for the request. Only
    /// successful invocations are rendered.
    pub fn assemble(
        &self,
        history: &[Turn],
        catalog: Option<&[ToolDescriptor]>,
        invocations: &[ToolInvocation],
        user_text: &str,
    ) -> String {
        let mut prompt = String::new();

        for turn in history {
            prompt.push_str(&format!("{}: {}\n", speaker(turn.role), turn.content));
        }

        if let Some(tools) = catalog {
            prompt.push_str("\nAvailable tools:\n");
            for tool in tools {
                prompt.push_str(&format!("- {}: {}\n", tool.name, tool.description));
            }
            prompt.push('\n');
        }

        let mut succeeded = invocations.iter().filter(|inv| inv.success).peekable();
        if succeeded.peek().is_some() {
            prompt.push_str("\nTool results:\n");
            for inv in succeeded {
                prompt.push_str(&format!("- {}: {}\n", inv.tool_name, inv.result_text()));
            }
            prompt.push('\n');
        }

        prompt.push_str(&format!("User: {}\nAssistant:", user_text));
        prompt
    }
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{ToolParameters, ToolResult};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn invocation(result: ToolResult) -> ToolInvocation {
        ToolInvocation::from_result(ToolParameters::new(), result)
    }

    #[test]
    fn test_bare_prompt() {
        let prompt = ContextAssembler::new().assemble(&[], None, &[], "hi");
        assert_eq!(prompt, "User: hi\nAssistant:");
    }

    #[test]
    fn test_full_prompt_layout() {
        let history = vec![Turn::user("hello"), Turn::assistant("hi there")];
        let catalog = vec![ToolDescriptor::new("calculator", "Evaluates arithmetic")];
        let invocations = vec![invocation(ToolResult::ok("calculator", json!(84)))];

        let prompt = ContextAssembler::new().assemble(
            &history,
            Some(&catalog),
            &invocations,
            "计算 12 * (3+4)",
        );

        assert_eq!(
            prompt,
            "User: hello\n\
             Assistant: hi there\n\
             \n\
             Available tools:\n\
             - calculator: Evaluates arithmetic\n\
             \n\
             \n\
             Tool results:\n\
             - calculator: 84\n\
             \n\
             User: 计算 12 * (3+4)\n\
             Assistant:"
        );
    }

    #[test]
    fn test_failed_invocations_not_rendered() {
        let invocations = vec![invocation(ToolResult::failure("weather", "boom"))];
        let prompt = ContextAssembler::new().assemble(&[], None, &invocations, "q");
        assert!(!prompt.contains("Tool results"));
        assert!(!prompt.contains("boom"));
    }

    #[test]
    fn test_string_results_rendered_raw() {
        let invocations = vec![invocation(ToolResult::ok("translate", json!("你好")))];
        let prompt = ContextAssembler::new().assemble(&[], None, &invocations, "q");
        assert!(prompt.contains("- translate: 你好\n"));
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let history = vec![Turn::user("a")];
        let catalog = vec![ToolDescriptor::new("time", "Current time")];
        let assembler = ContextAssembler::new();
        let first = assembler.assemble(&history, Some(&catalog), &[], "b");
        let second = assembler.assemble(&history, Some(&catalog), &[], "b");
        assert_eq!(first, second);
    }
}
