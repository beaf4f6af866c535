//! Built-in system agents and components.
//!
//! Registration happens through the explicit lists returned by
//! [`builtin_agents`] and [`builtin_components`]; there is no directory
//! scanning or import-time discovery.

use serde_json::json;
use std::sync::Arc;

use super::{Component, ComponentMetadata, SystemAgent, TemplateMetadata};
use crate::definition::{
    Edge, GraphDefinition, LlmConfig, NodeConfig, NodeSpec, StateFieldSchema, ToolConfig,
    TransformConfig, default_template,
};
use crate::types::{END, START};

/// The explicit list of built-in system agents.
#[must_use]
pub fn builtin_agents() -> Vec<Arc<dyn SystemAgent>> {
    vec![Arc::new(ReactAgent), Arc::new(ResearchPipelineAgent)]
}

/// The explicit list of built-in components.
#[must_use]
pub fn builtin_components() -> Vec<Arc<dyn Component>> {
    vec![
        Arc::new(SummarizeComponent),
        Arc::new(ExecuteToolsComponent),
        Arc::new(ExtractJsonComponent),
    ]
}

/// The reason/act loop: a model node deciding, a tool node acting, looping
/// until the model stops requesting tools.
///
/// Shares its definition with the migrator's default template so the
/// ergonomic fallback and the catalog entry never drift apart.
struct ReactAgent;

impl SystemAgent for ReactAgent {
    fn metadata(&self) -> TemplateMetadata {
        TemplateMetadata {
            key: "reason-act".to_string(),
            name: "Reason + Act".to_string(),
            description: "Model reasons, tools act, looping until the model stops requesting tool calls".to_string(),
            tags: vec!["reasoning".to_string(), "tools".to_string()],
        }
    }

    fn build(&self) -> GraphDefinition {
        default_template()
    }
}

/// A linear plan/gather/summarize pipeline.
struct ResearchPipelineAgent;

impl SystemAgent for ResearchPipelineAgent {
    fn metadata(&self) -> TemplateMetadata {
        TemplateMetadata {
            key: "research-pipeline".to_string(),
            name: "Research Pipeline".to_string(),
            description: "Plan a query, gather sources with tools, summarize findings".to_string(),
            tags: vec!["research".to_string(), "pipeline".to_string()],
        }
    }

    fn build(&self) -> GraphDefinition {
        let mut def = GraphDefinition::empty();
        def.entry_point = "plan".to_string();
        def.metadata = Some(json!({"name": "research-pipeline"}));
        def.nodes = vec![
            NodeSpec::llm(
                "plan",
                "Plan",
                "Break the question into search steps: {input}",
                "messages",
            ),
            NodeSpec::tool_all("gather", "Gather", "findings"),
            NodeSpec::llm(
                "summarize",
                "Summarize",
                "Summarize the findings for the user",
                "summary",
            ),
        ];
        def.edges = vec![
            Edge::new(START, "plan"),
            Edge::new("plan", "gather"),
            Edge::new("gather", "summarize"),
            Edge::new("summarize", END),
        ];
        def.state_schema
            .insert("messages".to_string(), StateFieldSchema::messages());
        def.state_schema
            .insert("findings".to_string(), StateFieldSchema::list());
        def.state_schema
            .insert("summary".to_string(), StateFieldSchema::value());
        def
    }
}

/// Model node that condenses the conversation into a summary field.
struct SummarizeComponent;

impl Component for SummarizeComponent {
    fn metadata(&self) -> ComponentMetadata {
        ComponentMetadata {
            key: "summarize-llm".to_string(),
            name: "Summarize".to_string(),
            description: "Condense the conversation history into a short summary".to_string(),
            node_type: "llm",
            tags: vec!["summarization".to_string()],
            input_schema: json!({"messages": {"type": "messages"}}),
            output_schema: json!({"summary": {"type": "value"}}),
        }
    }

    fn export_config(&self) -> NodeConfig {
        NodeConfig::Llm(LlmConfig {
            prompt_template: "Summarize the conversation so far in three sentences.".to_string(),
            output_key: "summary".to_string(),
            max_iterations: 1,
        })
    }
}

/// Tool node that executes every pending tool call.
struct ExecuteToolsComponent;

impl Component for ExecuteToolsComponent {
    fn metadata(&self) -> ComponentMetadata {
        ComponentMetadata {
            key: "execute-tools".to_string(),
            name: "Execute Tools".to_string(),
            description: "Run every tool call requested by the latest model response".to_string(),
            node_type: "tool",
            tags: vec!["tools".to_string()],
            input_schema: json!({"messages": {"type": "messages"}}),
            output_schema: json!({"messages": {"type": "messages"}}),
        }
    }

    fn export_config(&self) -> NodeConfig {
        NodeConfig::Tool(ToolConfig {
            tool_filter: Vec::new(),
            execute_all: true,
            output_key: "messages".to_string(),
        })
    }
}

/// Transform node that pulls structured JSON out of the latest response.
struct ExtractJsonComponent;

impl Component for ExtractJsonComponent {
    fn metadata(&self) -> ComponentMetadata {
        ComponentMetadata {
            key: "extract-json".to_string(),
            name: "Extract JSON".to_string(),
            description: "Parse the latest assistant message into structured JSON".to_string(),
            node_type: "transform",
            tags: vec!["parsing".to_string()],
            input_schema: json!({"messages": {"type": "messages"}}),
            output_schema: json!({"extracted": {"type": "value"}}),
        }
    }

    fn export_config(&self) -> NodeConfig {
        NodeConfig::Transform(TransformConfig {
            input_key: Some("messages".to_string()),
            output_key: "extracted".to_string(),
            params: json!({"mode": "last-assistant"}),
        })
    }
}
