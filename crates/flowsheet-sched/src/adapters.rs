//! Built-in process components.
//!
//! These cover the plumbing of an activated-sludge flowsheet (constant
//! influent, flow-weighted mixing, flow splitting, sinks) plus two generic
//! arithmetic blocks used for synthetic loops. Streams follow the ASM1
//! layout: entry [`FLOW_INDEX`] is the volumetric flow, every other entry is
//! a concentration or an intensive property.

use flowsheet_core::{ConfigError, NodeSpec, Stream, ASM1_WIDTH};

use crate::node::{ports, NodeError, Ports, ProcessNode};

/// Position of the flow rate in an ASM1 stream.
pub const FLOW_INDEX: usize = 14;

/// Default absolute internal recycle flow of the BSM1 plant, m3/d.
pub const DEFAULT_QINTR: f64 = 55338.0;

fn param_usize(spec: &NodeSpec, name: &str, default: usize) -> Result<usize, ConfigError> {
    match spec.param_f64(name)? {
        None => Ok(default),
        Some(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as usize),
        Some(v) => Err(ConfigError::InvalidParameter {
            node: spec.id.clone(),
            parameter: name.to_string(),
            reason: format!("expected a non-negative integer, got {}", v),
        }),
    }
}

fn flow_of(stream: &Stream, flow_index: usize) -> Result<f64, NodeError> {
    stream.get(flow_index).copied().ok_or_else(|| {
        NodeError::new(format!(
            "stream of width {} has no flow entry at index {}",
            stream.width(),
            flow_index
        ))
    })
}

/// Emits the same stream on `out_main` every step.
#[derive(Debug, Clone)]
pub struct InfluentStatic {
    value: Stream,
}

impl InfluentStatic {
    pub fn from_spec(spec: &NodeSpec) -> Result<Self, ConfigError> {
        let value = spec
            .param_stream("y_in_constant")?
            .ok_or_else(|| ConfigError::InvalidParameter {
                node: spec.id.clone(),
                parameter: "y_in_constant".to_string(),
                reason: "required".to_string(),
            })?;
        Ok(InfluentStatic { value })
    }
}

impl ProcessNode for InfluentStatic {
    fn step(&mut self, _dt: f64, _inputs: &Ports) -> Result<Ports, NodeError> {
        Ok(ports([("out_main", self.value.clone())]))
    }
}

/// Flow-weighted mix of every connected input, emitted on `out_combined`.
///
/// Intensive entries become the flow-weighted average, the flow entry the
/// sum. Inputs without flow contribute nothing. Without any flow the output
/// is all zeros.
#[derive(Debug, Clone)]
pub struct Combiner {
    flow_index: usize,
    width: usize,
}

impl Combiner {
    pub fn from_spec(spec: &NodeSpec) -> Result<Self, ConfigError> {
        Ok(Combiner {
            flow_index: param_usize(spec, "flow_index", FLOW_INDEX)?,
            width: param_usize(spec, "width", ASM1_WIDTH)?,
        })
    }

    pub fn mix<'a>(&self, streams: impl IntoIterator<Item = &'a Stream>) -> Result<Stream, NodeError> {
        let mut out: Option<Vec<f64>> = None;
        for stream in streams {
            let q = flow_of(stream, self.flow_index)?;
            let acc = out.get_or_insert_with(|| vec![0.0; stream.width()]);
            if acc.len() != stream.width() {
                return Err(NodeError::new(format!(
                    "cannot mix streams of width {} and {}",
                    acc.len(),
                    stream.width()
                )));
            }
            if q == 0.0 {
                continue;
            }
            let total = acc[self.flow_index] + q;
            for (i, (a, x)) in acc.iter_mut().zip(stream.iter()).enumerate() {
                if i != self.flow_index {
                    *a = (*a * (total - q) + x * q) / total;
                }
            }
            acc[self.flow_index] = total;
        }
        Ok(out.map(Stream::from).unwrap_or_else(|| Stream::zeros(self.width)))
    }
}

impl ProcessNode for Combiner {
    fn step(&mut self, _dt: f64, inputs: &Ports) -> Result<Ports, NodeError> {
        Ok(ports([("out_combined", self.mix(inputs.values())?)]))
    }
}

/// Splits `in_main` into `out_to_settler` and `out_recycle_to_combiner`.
///
/// The recycle branch takes an absolute flow of `qintr`, the settler branch
/// the remainder (never negative). Both branches carry the inlet's
/// concentrations; a branch without flow is all zeros.
#[derive(Debug, Clone)]
pub struct Splitter {
    qintr: f64,
    flow_index: usize,
    width: usize,
}

impl Splitter {
    pub fn from_spec(spec: &NodeSpec) -> Result<Self, ConfigError> {
        let qintr = spec.param_f64("qintr")?.unwrap_or(DEFAULT_QINTR);
        if !(qintr.is_finite() && qintr >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                node: spec.id.clone(),
                parameter: "qintr".to_string(),
                reason: format!("must be a non-negative flow, got {}", qintr),
            });
        }
        Ok(Splitter {
            qintr,
            flow_index: param_usize(spec, "flow_index", FLOW_INDEX)?,
            width: param_usize(spec, "width", ASM1_WIDTH)?,
        })
    }

    pub fn split(&self, inlet: &Stream) -> Result<(Stream, Stream), NodeError> {
        let q = flow_of(inlet, self.flow_index)?;
        let with_flow = |flow: f64| -> Stream {
            let mut values = inlet.to_vec();
            if flow > 0.0 {
                values[self.flow_index] = flow;
            } else {
                values.iter_mut().for_each(|v| *v = 0.0);
            }
            Stream::from(values)
        };

        if q == 0.0 {
            let mut idle = inlet.to_vec();
            idle[self.flow_index] = 0.0;
            return Ok((Stream::from(idle.clone()), Stream::from(idle)));
        }

        let to_settler = (q - self.qintr).max(0.0);
        let ratio_total = to_settler + self.qintr;
        if ratio_total <= 0.0 {
            return Err(NodeError::new(format!("cannot split inlet flow {}", q)));
        }
        Ok((
            with_flow(q * to_settler / ratio_total),
            with_flow(q * self.qintr / ratio_total),
        ))
    }
}

impl ProcessNode for Splitter {
    fn step(&mut self, _dt: f64, inputs: &Ports) -> Result<Ports, NodeError> {
        let inlet = inputs
            .get("in_main")
            .cloned()
            .unwrap_or_else(|| Stream::zeros(self.width));
        let (to_settler, recycle) = self.split(&inlet)?;
        Ok(ports([
            ("out_to_settler", to_settler),
            ("out_recycle_to_combiner", recycle),
        ]))
    }
}

/// `out_main = factor * in_main`.
#[derive(Debug, Clone)]
pub struct Gain {
    factor: f64,
}

impl Gain {
    pub fn from_spec(spec: &NodeSpec) -> Result<Self, ConfigError> {
        Ok(Gain {
            factor: spec.param_f64("factor")?.unwrap_or(1.0),
        })
    }
}

impl ProcessNode for Gain {
    fn step(&mut self, _dt: f64, inputs: &Ports) -> Result<Ports, NodeError> {
        let input = inputs
            .get("in_main")
            .ok_or_else(|| NodeError::new("missing input port 'in_main'"))?;
        Ok(ports([("out_main", input.scaled(self.factor))]))
    }
}

/// Elementwise sum of every connected input plus a constant `bias` on each
/// entry, emitted on `out_main`.
#[derive(Debug, Clone)]
pub struct Sum {
    bias: f64,
    width: usize,
}

impl Sum {
    pub fn from_spec(spec: &NodeSpec) -> Result<Self, ConfigError> {
        Ok(Sum {
            bias: spec.param_f64("bias")?.unwrap_or(0.0),
            width: param_usize(spec, "width", ASM1_WIDTH)?,
        })
    }
}

impl ProcessNode for Sum {
    fn step(&mut self, _dt: f64, inputs: &Ports) -> Result<Ports, NodeError> {
        let mut streams = inputs.values();
        let mut total = match streams.next() {
            Some(first) => first.clone(),
            None => Stream::zeros(self.width),
        };
        for stream in streams {
            total = total.checked_add(stream).ok_or_else(|| {
                NodeError::new(format!(
                    "cannot add streams of width {} and {}",
                    total.width(),
                    stream.width()
                ))
            })?;
        }
        let bias = self.bias;
        Ok(ports([("out_main", total.iter().map(|v| v + bias).collect())]))
    }
}

/// Sink that records the last `in_main` and echoes it on `out_final`.
#[derive(Debug, Clone, Default)]
pub struct Effluent {
    last: Option<Stream>,
}

impl Effluent {
    pub fn last(&self) -> Option<&Stream> {
        self.last.as_ref()
    }
}

impl ProcessNode for Effluent {
    fn step(&mut self, _dt: f64, inputs: &Ports) -> Result<Ports, NodeError> {
        self.last = inputs.get("in_main").cloned();
        Ok(match &self.last {
            Some(value) => ports([("out_final", value.clone())]),
            None => Ports::new(),
        })
    }
}
