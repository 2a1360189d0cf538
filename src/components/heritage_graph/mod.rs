mod component;
mod dataset;
mod error;
mod graph;
mod layout;
mod render;
mod state;

pub use component::HeritageGraphCanvas;
pub use dataset::{
	EventDate, HeritageDataset, PersonEvent, PersonKind, PersonRecord, Sex, UnionRecord,
};
pub use error::{GraphError, GraphResult};
pub use graph::{Graph, GraphOptions, NodeRef, Person, Union};
pub use layout::{Connector, LayoutConfig, LayoutResult, MemberCard, PositionedNode, layout};
pub use state::{CanvasState, ViewTransform};
