pub mod builder;
pub mod element;

pub use builder::{Builder, IdGenerator};
pub use element::{
    Edge, Entry, EventKind, EventScope, Hover, Id, ItemProperty, MarkedString, MonikerKind,
    Payload, Position, Repository, ToolInfo, UniquenessLevel, Vertex,
};
