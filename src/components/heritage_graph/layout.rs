//! Flattens the compiled graph into a strict tree and assigns screen-space
//! positions, resolving the side-map edges into drawable connectors.

use std::collections::HashMap;

use super::dataset::{display_name, is_placeholder, year_range};
use super::error::{GraphError, GraphResult};
use super::graph::{Graph, NodeRef, Person};

/// Spacing constants for the tree layout. The defaults match the reference
/// rendering; sibling separation is a constant factor of the node slot, with
/// no dynamic sibling-width awareness.
#[derive(Clone, Copy, Debug)]
pub struct LayoutConfig {
	pub node_width: f64,
	pub node_height: f64,
	pub horizontal_gap: f64,
	pub vertical_gap: f64,
	pub sibling_separation: f64,
	pub node_base_width: f64,
	pub node_size_factor: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			node_width: 80.0,
			node_height: 80.0,
			horizontal_gap: 30.0,
			vertical_gap: 70.0,
			sibling_separation: 0.48,
			node_base_width: 25.0,
			node_size_factor: 10.0,
		}
	}
}

impl LayoutConfig {
	/// Vertical distance between a node's top edge and its children's.
	pub fn row_step(&self) -> f64 {
		self.node_height + self.vertical_gap
	}
}

/// Display data for one member rectangle inside a node.
#[derive(Clone, Debug)]
pub struct MemberCard {
	pub id: String,
	pub name_line: String,
	pub surname_line: String,
	pub years_line: String,
	pub color: String,
	pub placeholder: bool,
	/// The union this member is a child of, used to match connectors to the
	/// correct half of a two-person node.
	pub parent_union: Option<String>,
	pub width: f64,
}

/// A node with final coordinates. `x` is the horizontal center, `y` the top
/// edge. Immutable once computed; owned by a single render pass.
#[derive(Clone, Debug)]
pub struct PositionedNode {
	pub id: String,
	pub parent: Option<usize>,
	pub members: Vec<MemberCard>,
	pub empty: bool,
	pub treated_as_remarriage: bool,
	pub x: f64,
	pub y: f64,
	pub width: f64,
}

impl PositionedNode {
	/// Left edge of the node body.
	pub fn left(&self) -> f64 {
		self.x - self.width / 2.0
	}

	/// Member rectangles left to right as `(left edge, card)` pairs.
	pub fn member_rects(&self) -> impl Iterator<Item = (f64, &MemberCard)> {
		let mut cursor = self.left();
		self.members.iter().map(move |member| {
			let left = cursor;
			cursor += member.width;
			(left, member)
		})
	}
}

/// A position-resolved connector between two nodes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Connector {
	pub from_x: f64,
	pub from_y: f64,
	pub to_x: f64,
	pub to_y: f64,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug)]
pub struct LayoutResult {
	pub positioned: Vec<PositionedNode>,
	pub primary_connectors: Vec<Connector>,
	pub extra_parent_connectors: Vec<Connector>,
	pub remarriage_connectors: Vec<Connector>,
}

/// Flatten the graph, position every node and resolve all connectors.
pub fn layout(graph: &Graph, config: &LayoutConfig) -> GraphResult<LayoutResult> {
	let mut positioned = flatten(graph, config)?;
	position(&mut positioned, config);

	let index: HashMap<String, usize> = positioned
		.iter()
		.enumerate()
		.map(|(i, node)| (node.id.clone(), i))
		.collect();

	let mut primary_connectors = Vec::new();
	for i in 0..positioned.len() {
		let Some(parent_idx) = positioned[i].parent else {
			continue;
		};
		let parent = &positioned[parent_idx];
		// no connector roots at a placeholder node, and a remarriage union
		// is connected by its dashed side link instead
		if parent.empty || positioned[i].treated_as_remarriage {
			continue;
		}
		primary_connectors.push(connect(parent, &positioned[i])?);
	}

	let mut extra_parent_connectors = Vec::new();
	for (child_id, demoted_parent_id) in graph.extra_parent_map() {
		let (child_idx, parent_idx) =
			resolve_pair(&index, child_id, demoted_parent_id, "extra parent")?;
		extra_parent_connectors.push(connect(&positioned[parent_idx], &positioned[child_idx])?);
	}

	let mut remarriage_connectors = Vec::new();
	for (primary_id, secondary_id) in graph.remarriage_map() {
		let (from_idx, to_idx) = resolve_pair(&index, primary_id, secondary_id, "remarriage")?;
		let (from, to) = (&positioned[from_idx], &positioned[to_idx]);
		remarriage_connectors.push(Connector {
			from_x: from.x,
			from_y: from.y,
			to_x: to.x,
			to_y: to.y,
		});
	}

	Ok(LayoutResult {
		positioned,
		primary_connectors,
		extra_parent_connectors,
		remarriage_connectors,
	})
}

/// Walk the graph into a flat node list with explicit parent references.
/// The builder guarantees at most one parent per node, so the list is a
/// strict tree by construction. A union discovered through its demoted side
/// can precede its tree parent in walk order, hence the two-pass indexing.
fn flatten(graph: &Graph, config: &LayoutConfig) -> GraphResult<Vec<PositionedNode>> {
	let walked = graph.walk();
	let index: HashMap<&str, usize> = walked
		.iter()
		.enumerate()
		.map(|(i, node_ref)| (node_ref.id(), i))
		.collect();

	let mut nodes = Vec::with_capacity(walked.len());
	for (i, node_ref) in walked.iter().enumerate() {
		let (parent_id, members, empty, treated_as_remarriage) = match node_ref {
			NodeRef::Union(union_id) => {
				let union = graph.union(union_id)?;
				let members = ordered_members(graph, &union.members, config)?;
				let empty = members.iter().all(|member| member.placeholder);
				(
					union.parents.first().cloned(),
					members,
					empty,
					union.is_remarriage_link,
				)
			}
			NodeRef::Person(person_id) => {
				let person = graph.person(person_id)?;
				let card = member_card(person, config);
				let empty = card.placeholder;
				(person.parent_union.clone(), vec![card], empty, false)
			}
		};

		let parent = match (i, &parent_id) {
			(0, _) => None,
			(_, Some(parent_id)) => {
				Some(*index.get(parent_id.as_str()).ok_or_else(|| {
					GraphError::dangling(format!(
						"node {} references parent {parent_id} outside the flattened list",
						node_ref.id()
					))
				})?)
			}
			(_, None) => {
				return Err(GraphError::dangling(format!(
					"node {} has no parent but is not the root",
					node_ref.id()
				)));
			}
		};

		let width = if members.is_empty() {
			config.node_width
		} else {
			members.iter().map(|member| member.width).sum()
		};
		nodes.push(PositionedNode {
			id: node_ref.id().to_string(),
			parent,
			members,
			empty,
			treated_as_remarriage,
			x: 0.0,
			y: 0.0,
			width,
		});
	}
	Ok(nodes)
}

/// Members drawn female-left, male-right; document order breaks ties.
fn ordered_members(
	graph: &Graph,
	member_ids: &[String],
	config: &LayoutConfig,
) -> GraphResult<Vec<MemberCard>> {
	let mut cards = Vec::with_capacity(member_ids.len());
	for member_id in member_ids {
		cards.push(member_card(graph.person(member_id)?, config));
	}
	cards.sort_by_key(|card: &MemberCard| i32::from(!is_female(graph, &card.id)));
	Ok(cards)
}

fn is_female(graph: &Graph, person_id: &str) -> bool {
	graph
		.person(person_id)
		.ok()
		.and_then(|person| person.record.sex)
		.map(|sex| sex == super::dataset::Sex::Female)
		.unwrap_or(false)
}

fn member_card(person: &Person, config: &LayoutConfig) -> MemberCard {
	let record = &person.record;
	let placeholder = is_placeholder(record);
	let name_line = display_name(record);
	let years_line = year_range(record.birth.as_ref(), record.death.as_ref());

	// font shaping is delegated to the surface; character count approximates
	// the rendered width well enough for spacing
	let width = if placeholder {
		config.node_width
	} else {
		let longest = name_line
			.chars()
			.count()
			.max(record.last_name.chars().count())
			.max(years_line.chars().count());
		config.node_base_width + config.node_size_factor * longest as f64
	};

	MemberCard {
		id: record.id.clone(),
		name_line,
		surname_line: record.last_name.clone(),
		years_line,
		color: record.color.clone(),
		placeholder,
		parent_union: person.parent_union.clone(),
		width,
	}
}

/// Assign coordinates without recursion: an explicit post-order pass
/// accumulates subtree spans, then a pre-order pass centers each node over
/// its children. Each node occupies a constant horizontal slot, siblings sit
/// side by side, parents at the midpoint of their children's extent.
fn position(nodes: &mut [PositionedNode], config: &LayoutConfig) {
	let n = nodes.len();
	if n == 0 {
		return;
	}
	let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
	for (i, node) in nodes.iter().enumerate() {
		if let Some(parent) = node.parent {
			children[parent].push(i);
		}
	}

	let slot = (config.node_width * 2.0 + config.horizontal_gap) * config.sibling_separation;
	let mut span = vec![0.0f64; n];
	// post-order: children's spans before the parent's
	let mut stack = vec![(0usize, false)];
	while let Some((i, expanded)) = stack.pop() {
		if expanded {
			let kids: f64 = children[i].iter().map(|&child| span[child]).sum();
			span[i] = if children[i].is_empty() { slot } else { kids.max(slot) };
		} else {
			stack.push((i, true));
			for &child in &children[i] {
				stack.push((child, false));
			}
		}
	}

	// pre-order: the parent's position before the children's
	let mut stack = vec![0usize];
	while let Some(i) = stack.pop() {
		let total: f64 = children[i].iter().map(|&child| span[child]).sum();
		let mut cursor = nodes[i].x - total / 2.0;
		let child_y = nodes[i].y + config.row_step();
		for &child in &children[i] {
			nodes[child].x = cursor + span[child] / 2.0;
			nodes[child].y = child_y;
			cursor += span[child];
			stack.push(child);
		}
	}
}

fn connect(parent: &PositionedNode, child: &PositionedNode) -> GraphResult<Connector> {
	Ok(Connector {
		from_x: parent.x + parent_anchor(parent)?,
		from_y: parent.y,
		to_x: child.x + child_anchor(child, &parent.id)?,
		to_y: child.y,
	})
}

/// Where a line leaving a node downward starts: the horizontal center for a
/// single member, the seam between the two members otherwise.
fn parent_anchor(node: &PositionedNode) -> GraphResult<f64> {
	match node.members.len() {
		0 | 1 => Ok(0.0),
		2 => Ok(node.members[0].width - node.width / 2.0),
		n => Err(GraphError::unsupported(format!(
			"node {} has {n} members",
			node.id
		))),
	}
}

/// Where a line entering a node terminates: over the half belonging to the
/// member whose ancestry the line serves.
fn child_anchor(node: &PositionedNode, parent_id: &str) -> GraphResult<f64> {
	match node.members.len() {
		0 | 1 => Ok(0.0),
		2 => {
			let first = &node.members[0];
			let second = &node.members[1];
			if first.parent_union.as_deref() == Some(parent_id) {
				Ok(first.width / 2.0 - node.width / 2.0)
			} else if second.parent_union.as_deref() == Some(parent_id) {
				Ok(first.width + second.width / 2.0 - node.width / 2.0)
			} else {
				Err(GraphError::anchor(format!(
					"no member of node {} is a child of union {parent_id}",
					node.id
				)))
			}
		}
		n => Err(GraphError::unsupported(format!(
			"node {} has {n} members",
			node.id
		))),
	}
}

fn resolve_pair(
	index: &HashMap<String, usize>,
	from_id: &str,
	to_id: &str,
	kind: &str,
) -> GraphResult<(usize, usize)> {
	let from = *index.get(from_id).ok_or_else(|| {
		GraphError::dangling(format!("{kind} edge endpoint {from_id} is not positioned"))
	})?;
	let to = *index.get(to_id).ok_or_else(|| {
		GraphError::dangling(format!("{kind} edge endpoint {to_id} is not positioned"))
	})?;
	Ok((from, to))
}

#[cfg(test)]
mod tests {
	use super::super::dataset::{HeritageDataset, PersonKind, PersonRecord, Sex, UnionRecord};
	use super::super::graph::GraphOptions;
	use super::*;

	fn person(id: &str, sex: Sex) -> PersonRecord {
		PersonRecord {
			id: id.into(),
			kind: PersonKind::Real,
			sex: Some(sex),
			first_name: id.to_uppercase(),
			last_name: "Test".into(),
			nick_name: String::new(),
			birth: None,
			death: None,
			color: "#FFF".into(),
		}
	}

	fn union(id: &str, a: Option<&str>, b: Option<&str>, children: &[&str]) -> UnionRecord {
		UnionRecord {
			id: id.into(),
			parent_a: a.map(Into::into),
			parent_b: b.map(Into::into),
			children: children.iter().map(|c| (*c).into()).collect(),
		}
	}

	fn layout_of(dataset: &HeritageDataset) -> LayoutResult {
		let graph = Graph::build(dataset, &GraphOptions::default()).unwrap();
		layout(&graph, &LayoutConfig::default()).unwrap()
	}

	fn simple_family() -> HeritageDataset {
		HeritageDataset {
			people: vec![
				person("p1", Sex::Male),
				person("p2", Sex::Female),
				person("p3", Sex::Male),
			],
			unions: vec![union("u1", Some("p1"), Some("p2"), &["p3"])],
		}
	}

	#[test]
	fn simple_family_positions_union_and_child() {
		let result = layout_of(&simple_family());

		assert_eq!(result.positioned.len(), 2);
		let root = &result.positioned[0];
		assert_eq!(root.id, "u1");
		assert_eq!(root.members.len(), 2);
		// female drawn on the left half
		assert_eq!(root.members[0].id, "p2");
		assert_eq!((root.x, root.y), (0.0, 0.0));

		let child = &result.positioned[1];
		assert_eq!(child.id, "p3");
		assert_eq!(child.parent, Some(0));
		assert_eq!(child.x, 0.0);
		assert_eq!(child.y, LayoutConfig::default().row_step());

		assert_eq!(result.primary_connectors.len(), 1);
		assert!(result.extra_parent_connectors.is_empty());
		assert!(result.remarriage_connectors.is_empty());
	}

	fn two_house_dataset() -> HeritageDataset {
		HeritageDataset {
			people: vec![
				person("r1", Sex::Male),
				person("r2", Sex::Female),
				person("a", Sex::Male),
				person("b", Sex::Female),
				person("x", Sex::Female),
				person("y", Sex::Male),
				person("s", Sex::Male),
				person("d", Sex::Female),
				person("c", Sex::Male),
			],
			unions: vec![
				union("u_r", Some("r1"), Some("r2"), &["a", "b"]),
				union("u_a", Some("a"), Some("x"), &["s"]),
				union("u_b", Some("y"), Some("b"), &["d"]),
				union("u_sd", Some("s"), Some("d"), &["c"]),
			],
		}
	}

	#[test]
	fn extra_parent_connector_targets_male_half() {
		let result = layout_of(&two_house_dataset());
		assert_eq!(result.extra_parent_connectors.len(), 1);

		let node = result
			.positioned
			.iter()
			.find(|node| node.id == "u_sd")
			.unwrap();
		// members are [d (female, left), s (male, right)]; the demoted
		// male-side line terminates over the right half
		let connector = &result.extra_parent_connectors[0];
		assert!(connector.to_x > node.x);
		// while the primary line into u_sd serves the female half
		let primary = result
			.primary_connectors
			.iter()
			.find(|connector| connector.to_y == node.y && connector.to_x < node.x)
			.expect("primary connector into u_sd");
		assert!(primary.to_x < node.x);
	}

	#[test]
	fn remarriage_union_gets_side_connector_instead_of_primary() {
		let dataset = HeritageDataset {
			people: vec![
				person("g1", Sex::Male),
				person("g2", Sex::Female),
				person("p1", Sex::Male),
				person("p2", Sex::Female),
				person("p4", Sex::Female),
			],
			unions: vec![
				union("u0", Some("g1"), Some("g2"), &["p1"]),
				union("u1", Some("p1"), Some("p2"), &[]),
				union("u2", Some("p1"), Some("p4"), &[]),
			],
		};
		let result = layout_of(&dataset);

		assert_eq!(result.remarriage_connectors.len(), 1);
		// u0 -> u1 is the only primary connector; u2 is reached by the
		// dashed remarriage line only
		assert_eq!(result.primary_connectors.len(), 1);
		let u2 = result
			.positioned
			.iter()
			.find(|node| node.id == "u2")
			.unwrap();
		assert!(u2.treated_as_remarriage);
	}

	#[test]
	fn placeholder_parent_roots_no_connector() {
		let dataset = HeritageDataset {
			people: vec![
				PersonRecord::placeholder("e1"),
				PersonRecord::placeholder("e2"),
				person("p3", Sex::Male),
			],
			unions: vec![union("u1", Some("e1"), Some("e2"), &["p3"])],
		};
		let result = layout_of(&dataset);
		assert!(result.positioned[0].empty);
		assert!(result.primary_connectors.is_empty());
		// the placeholder union still occupies layout width
		assert!(result.positioned[0].width > 0.0);
	}

	#[test]
	fn siblings_are_spaced_by_the_constant_slot() {
		let result = layout_of(&two_house_dataset());
		let config = LayoutConfig::default();
		let slot = (config.node_width * 2.0 + config.horizontal_gap) * config.sibling_separation;

		let node = |id: &str| {
			result
				.positioned
				.iter()
				.find(|node| node.id == id)
				.unwrap()
		};
		let (u_a, u_b, u_r) = (node("u_a"), node("u_b"), node("u_r"));
		assert_eq!(u_a.y, u_b.y);
		assert!((u_a.x - u_b.x).abs() >= slot - 1e-9);
		// parent centered over its children
		assert!((u_r.x - (u_a.x + u_b.x) / 2.0).abs() < 1e-9);
	}

	#[test]
	fn child_anchor_mismatch_is_anchor_resolution_error() {
		let node = PositionedNode {
			id: "u1".into(),
			parent: None,
			members: vec![
				MemberCard {
					id: "a".into(),
					name_line: "A".into(),
					surname_line: String::new(),
					years_line: String::new(),
					color: "#FFF".into(),
					placeholder: false,
					parent_union: Some("u_left".into()),
					width: 100.0,
				},
				MemberCard {
					id: "b".into(),
					name_line: "B".into(),
					surname_line: String::new(),
					years_line: String::new(),
					color: "#FFF".into(),
					placeholder: false,
					parent_union: None,
					width: 100.0,
				},
			],
			empty: false,
			treated_as_remarriage: false,
			x: 0.0,
			y: 0.0,
			width: 200.0,
		};

		assert_eq!(child_anchor(&node, "u_left").unwrap(), -50.0);
		assert!(matches!(
			child_anchor(&node, "u_other"),
			Err(GraphError::AnchorResolution(_))
		));
	}

	#[test]
	fn two_member_parent_anchor_sits_on_the_seam() {
		let result = layout_of(&simple_family());
		let root = &result.positioned[0];
		let seam = root.members[0].width - root.width / 2.0;
		assert_eq!(parent_anchor(root).unwrap(), seam);
		// equal member widths put the seam at the node center
		assert!((seam - 0.0).abs() < 1e-9);
	}

	#[test]
	fn missing_edge_endpoint_is_dangling() {
		let mut index = HashMap::new();
		index.insert("u1".to_string(), 0usize);
		assert!(resolve_pair(&index, "u1", "u_gone", "extra parent").is_err());
		assert!(matches!(
			resolve_pair(&index, "u_gone", "u1", "extra parent"),
			Err(GraphError::DanglingEdge(_))
		));
	}
}
