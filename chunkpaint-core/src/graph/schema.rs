//! # Node-kind schemas
//!
//! Node behavior (rasterization, value computation) lives outside this crate.
//! All the core needs from a node kind is its socket schema - which named,
//! typed inputs and outputs a node of that kind carries - plus an opaque
//! evaluate entry point the renderer can call. Kinds are registered explicitly
//! at startup into a [`SchemaRegistry`]; there is no runtime type scanning, so
//! the full kind surface is auditable in one place.

use crate::math::{IVec2, IntRect};

/// The value type a socket carries. Connections are only legal between equal types.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum SocketType {
    /// Tiled raster content. Raster inputs never hold an inline value - they are
    /// connection-only.
    Raster,
    Scalar,
    Bool,
    Int,
    Color,
    Text,
}

/// An inline value held by an unconnected (or value-style) input.
#[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub enum SocketValue {
    /// Raster sockets and not-yet-set inputs.
    None,
    Scalar(f32),
    Bool(bool),
    Int(i32),
    /// RGBA, 8 bits per channel.
    Color([u8; 4]),
    Text(String),
}
impl SocketValue {
    /// The socket type this value is assignable to, or None for [`SocketValue::None`]
    /// which assigns to nothing.
    #[must_use]
    pub fn ty(&self) -> Option<SocketType> {
        match self {
            Self::None => None,
            Self::Scalar(_) => Some(SocketType::Scalar),
            Self::Bool(_) => Some(SocketType::Bool),
            Self::Int(_) => Some(SocketType::Int),
            Self::Color(_) => Some(SocketType::Color),
            Self::Text(_) => Some(SocketType::Text),
        }
    }
    #[must_use]
    pub fn scalar(&self) -> Option<f32> {
        match self {
            Self::Scalar(v) => Some(*v),
            _ => None,
        }
    }
    #[must_use]
    pub fn bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// Whether a kind participates in the document's layer structure, and how.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum StructureRole {
    /// A leaf member with raster content of its own.
    Layer,
    /// A member containing an internally chained sub-graph behind its
    /// [`CONTENT`] input.
    Folder,
}

#[derive(Clone, Debug)]
pub struct InputSpec {
    pub name: &'static str,
    pub ty: SocketType,
    pub default: SocketValue,
}
#[derive(Clone, Debug)]
pub struct OutputSpec {
    pub name: &'static str,
    pub ty: SocketType,
}

/// Context handed to a kind's evaluate entry point. The core never calls this
/// itself - it exists so external renderers have a uniform signature to hang
/// their rasterization off of.
pub struct EvalContext<'a> {
    pub node: crate::graph::NodeId,
    pub canvas: IntRect,
    pub chunk: IVec2,
    pub document: &'a crate::state::Document,
}
pub type EvaluateFn = fn(&EvalContext<'_>);

/// Schema of one node kind.
#[derive(Clone)]
pub struct NodeSpec {
    pub kind: &'static str,
    pub inputs: Vec<InputSpec>,
    pub outputs: Vec<OutputSpec>,
    pub role: Option<StructureRole>,
    pub evaluate: Option<EvaluateFn>,
}
impl NodeSpec {
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|input| input.name == name)
    }
}
impl std::fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSpec")
            .field("kind", &self.kind)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("role", &self.role)
            .field("evaluate", &self.evaluate.map(|_| "fn"))
            .finish()
    }
}

// Socket names the structure machinery relies on. Every structure-role kind
// must carry these.
/// Chains a member to the sibling below it.
pub const BACKGROUND: &str = "background";
/// A folder's internally chained content; also the output node's single input.
pub const CONTENT: &str = "content";
pub const OPACITY: &str = "opacity";
pub const VISIBLE: &str = "visible";
/// The single raster output every renderable node exposes.
pub const OUTPUT: &str = "output";

/// Built-in kind names.
pub const KIND_OUTPUT: &str = "output";
pub const KIND_IMAGE_LAYER: &str = "image_layer";
pub const KIND_FOLDER: &str = "folder";
pub const KIND_FILTER: &str = "filter";

/// Registry of node kinds, keyed by kind name.
pub struct SchemaRegistry {
    specs: hashbrown::HashMap<&'static str, NodeSpec>,
}
impl SchemaRegistry {
    /// An empty registry. Hosts that supply all their own kinds start here.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            specs: hashbrown::HashMap::new(),
        }
    }
    /// Register a kind. Returns the previous spec if the name was taken.
    pub fn register(&mut self, spec: NodeSpec) -> Option<NodeSpec> {
        self.specs.insert(spec.kind, spec)
    }
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&NodeSpec> {
        self.specs.get(kind)
    }
    /// The kinds the document machinery itself needs: the output sink, image
    /// layers, folders, and a generic one-in-one-out filter.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(NodeSpec {
            kind: KIND_OUTPUT,
            inputs: vec![InputSpec {
                name: CONTENT,
                ty: SocketType::Raster,
                default: SocketValue::None,
            }],
            outputs: vec![],
            role: None,
            evaluate: None,
        });
        registry.register(NodeSpec {
            kind: KIND_IMAGE_LAYER,
            inputs: vec![
                InputSpec {
                    name: BACKGROUND,
                    ty: SocketType::Raster,
                    default: SocketValue::None,
                },
                InputSpec {
                    name: OPACITY,
                    ty: SocketType::Scalar,
                    default: SocketValue::Scalar(1.0),
                },
                InputSpec {
                    name: VISIBLE,
                    ty: SocketType::Bool,
                    default: SocketValue::Bool(true),
                },
            ],
            outputs: vec![OutputSpec {
                name: OUTPUT,
                ty: SocketType::Raster,
            }],
            role: Some(StructureRole::Layer),
            evaluate: None,
        });
        registry.register(NodeSpec {
            kind: KIND_FOLDER,
            inputs: vec![
                InputSpec {
                    name: BACKGROUND,
                    ty: SocketType::Raster,
                    default: SocketValue::None,
                },
                InputSpec {
                    name: CONTENT,
                    ty: SocketType::Raster,
                    default: SocketValue::None,
                },
                InputSpec {
                    name: OPACITY,
                    ty: SocketType::Scalar,
                    default: SocketValue::Scalar(1.0),
                },
                InputSpec {
                    name: VISIBLE,
                    ty: SocketType::Bool,
                    default: SocketValue::Bool(true),
                },
            ],
            outputs: vec![OutputSpec {
                name: OUTPUT,
                ty: SocketType::Raster,
            }],
            role: Some(StructureRole::Folder),
            evaluate: None,
        });
        registry.register(NodeSpec {
            kind: KIND_FILTER,
            inputs: vec![
                InputSpec {
                    name: "input",
                    ty: SocketType::Raster,
                    default: SocketValue::None,
                },
                InputSpec {
                    name: "strength",
                    ty: SocketType::Scalar,
                    default: SocketValue::Scalar(1.0),
                },
            ],
            outputs: vec![OutputSpec {
                name: OUTPUT,
                ty: SocketType::Raster,
            }],
            role: None,
            evaluate: None,
        });
        registry
    }
}
impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
