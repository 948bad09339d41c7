//! The step contract every process component implements.
//!
//! The executor only ever talks to components through [`ProcessNode`]. What a
//! component does inside `step` (integrate an ODE, mix streams, record a
//! result) and what state it keeps between calls is its own business; the
//! scheduler never inspects or resets it.

use indexmap::IndexMap;

use flowsheet_core::Stream;

/// Port name -> stream, in the order the ports were filled.
pub type Ports = IndexMap<String, Stream>;

/// A stateful process component driven once per execution slot.
pub trait ProcessNode {
    /// Advances the component by `dt` given the current value on each
    /// connected input port, returning the values for its output ports.
    ///
    /// Ports without an incoming edge are absent from `inputs`; connected
    /// ports that have not been produced yet arrive as zeros. Output ports
    /// that no edge consumes are ignored, and edges whose source port is
    /// missing from the returned map keep their previous value.
    fn step(&mut self, dt: f64, inputs: &Ports) -> Result<Ports, NodeError>;
}

/// Failure reported by a component's step function.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct NodeError {
    pub message: String,
}

impl NodeError {
    pub fn new(message: impl Into<String>) -> Self {
        NodeError {
            message: message.into(),
        }
    }
}

impl<F> ProcessNode for F
where
    F: FnMut(f64, &Ports) -> Result<Ports, NodeError>,
{
    fn step(&mut self, dt: f64, inputs: &Ports) -> Result<Ports, NodeError> {
        self(dt, inputs)
    }
}

/// Builds a [`Ports`] map from `(name, stream)` pairs.
pub fn ports<I, S>(entries: I) -> Ports
where
    I: IntoIterator<Item = (S, Stream)>,
    S: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
