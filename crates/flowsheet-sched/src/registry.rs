//! Component registry: component-type string -> factory.
//!
//! A registry is a plain value handed to the engine, not global state, so
//! engines with different component sets can coexist in one process.

use indexmap::IndexMap;

use flowsheet_core::{ConfigError, FlowsheetGraph, NodeSpec};

use crate::adapters::{Combiner, Effluent, Gain, InfluentStatic, Splitter, Sum};
use crate::node::ProcessNode;

/// Builds a component instance from its node record.
pub type Factory = Box<dyn Fn(&NodeSpec) -> Result<Box<dyn ProcessNode>, ConfigError> + Send + Sync>;

/// Map from component-type tag to factory.
#[derive(Default)]
pub struct NodeRegistry {
    factories: IndexMap<String, Factory>,
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in components:
    /// `influent_static`, `combiner`, `splitter`, `gain`, `sum`, `effluent`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("influent_static", |spec| {
            Ok(Box::new(InfluentStatic::from_spec(spec)?) as Box<dyn ProcessNode>)
        });
        registry.register("combiner", |spec| Ok(Box::new(Combiner::from_spec(spec)?) as Box<dyn ProcessNode>));
        registry.register("splitter", |spec| Ok(Box::new(Splitter::from_spec(spec)?) as Box<dyn ProcessNode>));
        registry.register("gain", |spec| Ok(Box::new(Gain::from_spec(spec)?) as Box<dyn ProcessNode>));
        registry.register("sum", |spec| Ok(Box::new(Sum::from_spec(spec)?) as Box<dyn ProcessNode>));
        registry.register("effluent", |_| Ok(Box::new(Effluent::default()) as Box<dyn ProcessNode>));
        registry
    }

    /// Registers `factory` for `component_type`, replacing any previous one.
    pub fn register<F>(&mut self, component_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&NodeSpec) -> Result<Box<dyn ProcessNode>, ConfigError> + Send + Sync + 'static,
    {
        self.factories.insert(component_type.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, component_type: &str) -> bool {
        self.factories.contains_key(component_type)
    }

    /// Registered tags in registration order.
    pub fn component_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Builds one instance for `spec`.
    pub fn instantiate(&self, spec: &NodeSpec) -> Result<Box<dyn ProcessNode>, ConfigError> {
        let factory = self
            .factories
            .get(&spec.component_type)
            .ok_or_else(|| ConfigError::UnknownComponentType {
                node: spec.id.clone(),
                component_type: spec.component_type.clone(),
            })?;
        factory(spec)
    }

    /// Builds one instance per node of `graph`, indexed by `NodeId`.
    pub fn instantiate_all(&self, graph: &FlowsheetGraph) -> Result<Vec<Box<dyn ProcessNode>>, ConfigError> {
        graph
            .node_ids()
            .map(|id| self.instantiate(&graph.node(id).spec))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ports, NodeError, Ports};
    use flowsheet_core::{FlowsheetSpec, Stream};
    use serde_json::json;

    #[test]
    fn builtins_are_registered_in_order() {
        let registry = NodeRegistry::with_builtins();
        let types: Vec<&str> = registry.component_types().collect();
        assert_eq!(
            types,
            vec!["influent_static", "combiner", "splitter", "gain", "sum", "effluent"]
        );
        assert!(registry.contains("splitter"));
        assert!(!registry.contains("reactor"));
    }

    #[test]
    fn unknown_type_is_a_config_error() {
        let spec = FlowsheetSpec::default().node("r1", "reactor", json!({}));
        let graph = FlowsheetGraph::build(&spec).unwrap();
        match NodeRegistry::with_builtins().instantiate_all(&graph) {
            Err(ConfigError::UnknownComponentType { node, component_type }) => {
                assert_eq!(node, "r1");
                assert_eq!(component_type, "reactor");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn custom_factories_extend_the_registry() {
        let mut registry = NodeRegistry::new();
        registry.register("doubler", |_| {
            let node = |_dt: f64, inputs: &Ports| -> Result<Ports, NodeError> {
                Ok(ports([("out", inputs["in"].scaled(2.0))]))
            };
            Ok(Box::new(node) as Box<dyn ProcessNode>)
        });

        let spec = FlowsheetSpec::default().node("d", "doubler", json!({}));
        let mut node = registry.instantiate(&spec.nodes[0]).unwrap();
        let out = node.step(1.0, &ports([("in", Stream::from(vec![2.0]))])).unwrap();
        assert_eq!(out["out"].as_slice(), &[4.0]);
    }

    #[test]
    fn factory_errors_surface_unchanged() {
        let spec = FlowsheetSpec::default().node("inf", "influent_static", json!({}));
        let err = NodeRegistry::with_builtins()
            .instantiate(&spec.nodes[0])
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::InvalidParameter { .. }));
    }
}
