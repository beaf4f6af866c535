//! Catalogs of prebuilt graph definitions and reusable node fragments.
//!
//! Two independent catalogs share the same discovery pattern: whole-graph
//! templates ("system agents") implementing [`SystemAgent`], and reusable
//! node fragments ("components") implementing [`Component`]. Registration
//! is keyed by a globally unique string; re-registering a key without the
//! override flag fails with a duplicate-key error. Lookup supports exact
//! key, by-type, by-tag, and free-text search over name/description/key.
//!
//! The registry is an explicitly constructed, dependency-injected instance
//! with an internal lock - created at startup and passed to the parts that
//! need it. Built-ins come from an explicit registration list
//! ([`TemplateRegistry::with_builtins`]), keeping registration order
//! deterministic.
//!
//! # Examples
//!
//! ```
//! use weftrun::registry::TemplateRegistry;
//!
//! let registry = TemplateRegistry::with_builtins();
//!
//! let react = registry.agent("reason-act").expect("built-in template");
//! let def = react.build();
//! assert!(weftrun::definition::validate(&def).is_empty());
//!
//! let llm_components = registry.components_by_type("llm");
//! assert!(!llm_components.is_empty());
//! ```

mod builtin;

pub use builtin::{builtin_agents, builtin_components};

use miette::Diagnostic;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::definition::{GraphDefinition, NodeConfig};

/// Discovery metadata for a whole-graph template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateMetadata {
    /// Globally unique registration key.
    pub key: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Discovery metadata for a reusable node fragment.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentMetadata {
    /// Globally unique registration key.
    pub key: String,
    pub name: String,
    pub description: String,
    /// Node type this fragment configures (`llm`, `tool`, `transform`).
    pub node_type: &'static str,
    pub tags: Vec<String>,
    /// JSON-schema-shaped description of expected state inputs.
    pub input_schema: Value,
    /// JSON-schema-shaped description of produced state outputs.
    pub output_schema: Value,
}

/// A prebuilt, catalog-registered graph definition.
pub trait SystemAgent: Send + Sync {
    fn metadata(&self) -> TemplateMetadata;

    /// The canonical definition of this template.
    fn build(&self) -> GraphDefinition;

    /// A forkable copy for users, annotated with its origin.
    fn export(&self) -> GraphDefinition {
        let mut def = self.build();
        let mut metadata = def
            .metadata
            .take()
            .and_then(|m| m.as_object().cloned())
            .unwrap_or_default();
        metadata.insert(
            "forked_from".to_string(),
            Value::String(self.metadata().key),
        );
        def.metadata = Some(Value::Object(metadata));
        def
    }
}

/// A reusable node fragment exposing a ready-to-insert config.
pub trait Component: Send + Sync {
    fn metadata(&self) -> ComponentMetadata;

    /// The node config a graph author inserts when using this component.
    fn export_config(&self) -> NodeConfig;
}

/// Errors raised by registry mutations.
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("duplicate registration for key '{key}'")]
    #[diagnostic(
        code(weftrun::registry::duplicate_key),
        help("Pass override_existing = true to replace a registered entry.")
    )]
    DuplicateKey { key: String },
}

/// Process-wide, read-mostly catalog of system agents and components.
///
/// Safe for concurrent registration and lookup; registration order is
/// preserved, so listings are deterministic.
#[derive(Default)]
pub struct TemplateRegistry {
    agents: RwLock<Vec<Arc<dyn SystemAgent>>>,
    components: RwLock<Vec<Arc<dyn Component>>>,
}

impl TemplateRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated from the explicit built-in lists.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for agent in builtin_agents() {
            // Built-in keys are unique by construction.
            let _ = registry.register_agent(agent, false);
        }
        for component in builtin_components() {
            let _ = registry.register_component(component, false);
        }
        registry
    }

    /// Register a system agent under its metadata key.
    pub fn register_agent(
        &self,
        agent: Arc<dyn SystemAgent>,
        override_existing: bool,
    ) -> Result<(), RegistryError> {
        let key = agent.metadata().key;
        let mut agents = self.agents.write();
        if let Some(position) = agents.iter().position(|a| a.metadata().key == key) {
            if !override_existing {
                return Err(RegistryError::DuplicateKey { key });
            }
            agents[position] = agent;
        } else {
            agents.push(agent);
        }
        Ok(())
    }

    /// Register a component under its metadata key.
    pub fn register_component(
        &self,
        component: Arc<dyn Component>,
        override_existing: bool,
    ) -> Result<(), RegistryError> {
        let key = component.metadata().key;
        let mut components = self.components.write();
        if let Some(position) = components.iter().position(|c| c.metadata().key == key) {
            if !override_existing {
                return Err(RegistryError::DuplicateKey { key });
            }
            components[position] = component;
        } else {
            components.push(component);
        }
        Ok(())
    }

    /// Exact-key lookup of a system agent.
    #[must_use]
    pub fn agent(&self, key: &str) -> Option<Arc<dyn SystemAgent>> {
        self.agents
            .read()
            .iter()
            .find(|a| a.metadata().key == key)
            .cloned()
    }

    /// Exact-key lookup of a component.
    #[must_use]
    pub fn component(&self, key: &str) -> Option<Arc<dyn Component>> {
        self.components
            .read()
            .iter()
            .find(|c| c.metadata().key == key)
            .cloned()
    }

    /// Metadata listing of all registered agents, in registration order.
    #[must_use]
    pub fn agents(&self) -> Vec<TemplateMetadata> {
        self.agents.read().iter().map(|a| a.metadata()).collect()
    }

    /// Metadata listing of all registered components, in registration order.
    #[must_use]
    pub fn components(&self) -> Vec<ComponentMetadata> {
        self.components
            .read()
            .iter()
            .map(|c| c.metadata())
            .collect()
    }

    /// Components configuring the given node type.
    #[must_use]
    pub fn components_by_type(&self, node_type: &str) -> Vec<Arc<dyn Component>> {
        self.components
            .read()
            .iter()
            .filter(|c| c.metadata().node_type == node_type)
            .cloned()
            .collect()
    }

    /// Agents carrying the given tag.
    #[must_use]
    pub fn agents_by_tag(&self, tag: &str) -> Vec<Arc<dyn SystemAgent>> {
        self.agents
            .read()
            .iter()
            .filter(|a| a.metadata().tags.iter().any(|t| t == tag))
            .cloned()
            .collect()
    }

    /// Components carrying the given tag.
    #[must_use]
    pub fn components_by_tag(&self, tag: &str) -> Vec<Arc<dyn Component>> {
        self.components
            .read()
            .iter()
            .filter(|c| c.metadata().tags.iter().any(|t| t == tag))
            .cloned()
            .collect()
    }

    /// Case-insensitive free-text search over agent name/description/key.
    #[must_use]
    pub fn search_agents(&self, query: &str) -> Vec<TemplateMetadata> {
        let needle = query.to_lowercase();
        self.agents()
            .into_iter()
            .filter(|m| {
                m.key.to_lowercase().contains(&needle)
                    || m.name.to_lowercase().contains(&needle)
                    || m.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Case-insensitive free-text search over component
    /// name/description/key.
    #[must_use]
    pub fn search_components(&self, query: &str) -> Vec<ComponentMetadata> {
        let needle = query.to_lowercase();
        self.components()
            .into_iter()
            .filter(|m| {
                m.key.to_lowercase().contains(&needle)
                    || m.name.to_lowercase().contains(&needle)
                    || m.description.to_lowercase().contains(&needle)
            })
            .collect()
    }
}
