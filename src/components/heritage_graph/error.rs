//! Error taxonomy for graph construction, layout and anchor resolution.
//!
//! Every variant is fatal at the point of detection: malformed genealogical
//! data cannot be silently repaired without corrupting the tree, so the
//! builder and layout never produce partial output.

/// Convenience alias used by all fallible graph/layout functions.
pub type GraphResult<T> = Result<T, GraphError>;

/// Fatal failures raised while compiling or laying out a heritage graph.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GraphError {
	/// The dataset references an id that does not exist.
	#[error("malformed dataset: {0}")]
	MalformedDataset(String),

	/// The dataset describes a structure the tree model cannot express,
	/// e.g. a union with more than two members.
	#[error("unsupported structure: {0}")]
	UnsupportedStructure(String),

	/// A required id lookup missed.
	#[error("not found: {0}")]
	NotFound(String),

	/// A side-map edge endpoint is absent from the flattened node list.
	#[error("dangling edge: {0}")]
	DanglingEdge(String),

	/// A connector could not be matched to a member of a two-person node.
	#[error("anchor resolution failed: {0}")]
	AnchorResolution(String),
}

impl GraphError {
	pub fn malformed(msg: impl Into<String>) -> Self {
		Self::MalformedDataset(msg.into())
	}

	pub fn unsupported(msg: impl Into<String>) -> Self {
		Self::UnsupportedStructure(msg.into())
	}

	pub fn not_found(msg: impl Into<String>) -> Self {
		Self::NotFound(msg.into())
	}

	pub fn dangling(msg: impl Into<String>) -> Self {
		Self::DanglingEdge(msg.into())
	}

	pub fn anchor(msg: impl Into<String>) -> Self {
		Self::AnchorResolution(msg.into())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_prefixes_are_stable() {
		assert!(
			GraphError::malformed("x")
				.to_string()
				.contains("malformed dataset:")
		);
		assert!(
			GraphError::unsupported("x")
				.to_string()
				.contains("unsupported structure:")
		);
		assert!(GraphError::not_found("x").to_string().contains("not found:"));
		assert!(
			GraphError::dangling("x")
				.to_string()
				.contains("dangling edge:")
		);
		assert!(
			GraphError::anchor("x")
				.to_string()
				.contains("anchor resolution failed:")
		);
	}
}
