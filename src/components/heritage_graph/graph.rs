//! Compiles the flat person/union dataset into a strict-tree-compatible graph.
//!
//! Genealogical data is a general graph: a union can have two parent unions
//! (one per spouse's ancestry) and a person can belong to several unions
//! (remarriage). The layout downstream needs a strict single-parent tree, so
//! construction collapses the graph deterministically and records every
//! dropped edge in a side map (`extra_parent_map`, `remarriage_map`) for the
//! renderer to draw as a dashed secondary connector.

use std::collections::{HashMap, HashSet};

use super::dataset::{HeritageDataset, PersonRecord, Sex};
use super::error::{GraphError, GraphResult};

/// A person node in the arena. All cross-references are ids into the owning
/// maps, so detaching an edge is a list removal, never a dangling pointer.
#[derive(Clone, Debug)]
pub struct Person {
	pub record: PersonRecord,
	/// The union this person is a child of. Zero or one at any time.
	pub parent_union: Option<String>,
	/// Unions this person belongs to as a member, in document order.
	pub unions: Vec<String>,
	/// Directly reached children. Used only during graph surgery.
	pub children: Vec<String>,
}

impl Person {
	pub fn id(&self) -> &str {
		&self.record.id
	}

	fn effective_sex(&self) -> Sex {
		self.record.sex.unwrap_or(Sex::Male)
	}
}

/// A union ("family") node in the arena.
#[derive(Clone, Debug)]
pub struct Union {
	pub id: String,
	/// Member person ids, 0-2. More than two is a construction error.
	pub members: Vec<String>,
	/// Parent union ids. May be 2 before deduplication, at most 1 after.
	pub parents: Vec<String>,
	/// Child person ids in document order.
	pub children: Vec<String>,
	/// Set when this union was demoted to a secondary remarriage connector.
	pub is_remarriage_link: bool,
}

/// A graph node is either a standalone person or a union.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeRef {
	Person(String),
	Union(String),
}

impl NodeRef {
	pub fn id(&self) -> &str {
		match self {
			NodeRef::Person(id) | NodeRef::Union(id) => id,
		}
	}
}

/// Build parameters: optional re-rooting and branch exclusion.
#[derive(Clone, Debug, Default)]
pub struct GraphOptions {
	pub root_person: Option<String>,
	pub excluded_people: Vec<String>,
}

/// The compiled graph. Rebuilt from scratch on every change to the dataset,
/// the chosen root or the exclusion list.
#[derive(Clone, Debug)]
pub struct Graph {
	people: HashMap<String, Person>,
	unions: HashMap<String, Union>,
	root: NodeRef,
	/// Child union id paired with the parent union demoted during
	/// deduplication. Drawn as a dashed extra-parent connector.
	extra_parent_map: Vec<(String, String)>,
	/// Primary union id paired with a secondary (remarriage) union id. One
	/// entry per additional union of a remarried person.
	remarriage_map: Vec<(String, String)>,
}

impl Graph {
	/// Compile the dataset into a rooted, deduplicated graph.
	///
	/// Fails fatally on malformed data; there is no partial output.
	pub fn build(dataset: &HeritageDataset, options: &GraphOptions) -> GraphResult<Self> {
		let mut people = make_people(dataset);
		let mut unions = make_unions(dataset, &mut people)?;
		link_ancestry(dataset, &people, &mut unions)?;
		let root = select_root(
			dataset,
			&mut people,
			&mut unions,
			options.root_person.as_deref(),
		)?;

		let mut graph = Self {
			people,
			unions,
			root,
			extra_parent_map: Vec::new(),
			remarriage_map: Vec::new(),
		};
		graph.prune_out_of_scope_parents();
		graph.apply_exclusions(&options.excluded_people)?;
		graph.dedup_extra_parents()?;
		graph.detect_remarriages();
		Ok(graph)
	}

	pub fn root(&self) -> &NodeRef {
		&self.root
	}

	pub fn extra_parent_map(&self) -> &[(String, String)] {
		&self.extra_parent_map
	}

	pub fn remarriage_map(&self) -> &[(String, String)] {
		&self.remarriage_map
	}

	pub fn person(&self, person_id: &str) -> GraphResult<&Person> {
		self.people
			.get(person_id)
			.ok_or_else(|| GraphError::not_found(format!("person {person_id}")))
	}

	pub fn union(&self, union_id: &str) -> GraphResult<&Union> {
		self.unions
			.get(union_id)
			.ok_or_else(|| GraphError::not_found(format!("union {union_id}")))
	}

	fn union_mut(&mut self, union_id: &str) -> GraphResult<&mut Union> {
		self.unions
			.get_mut(union_id)
			.ok_or_else(|| GraphError::not_found(format!("union {union_id}")))
	}

	/// Depth-first walk from the root, stack-based to bound stack depth on
	/// deep trees. Unions reachable through two children are visited once.
	/// Children are pushed in document order; a child with unions of their
	/// own appears inside those union nodes, never standalone.
	pub fn walk(&self) -> Vec<NodeRef> {
		let mut visited: HashSet<String> = HashSet::new();
		if let NodeRef::Union(id) = &self.root {
			visited.insert(id.clone());
		}
		let mut stack = vec![self.root.clone()];
		let mut out = Vec::new();

		while let Some(node) = stack.pop() {
			let child_ids: &[String] = match &node {
				NodeRef::Person(id) => self
					.people
					.get(id)
					.map(|person| person.children.as_slice())
					.unwrap_or(&[]),
				NodeRef::Union(id) => self
					.unions
					.get(id)
					.map(|union| union.children.as_slice())
					.unwrap_or(&[]),
			};
			for child_id in child_ids {
				let Some(child) = self.people.get(child_id) else {
					continue;
				};
				if child.unions.is_empty() {
					stack.push(NodeRef::Person(child_id.clone()));
				} else {
					for family_id in &child.unions {
						if visited.insert(family_id.clone()) {
							stack.push(NodeRef::Union(family_id.clone()));
						}
					}
				}
			}
			out.push(node);
		}
		out
	}

	/// After re-rooting, a reachable union may still carry a parent reference
	/// pointing above the chosen root. Drop those so ancestry out of scope
	/// never leaks into the tree.
	fn prune_out_of_scope_parents(&mut self) {
		let reachable: HashSet<String> = self
			.walk()
			.into_iter()
			.filter_map(|node| match node {
				NodeRef::Union(id) => Some(id),
				NodeRef::Person(_) => None,
			})
			.collect();
		let union_ids: Vec<String> = reachable.iter().cloned().collect();
		for union_id in union_ids {
			if let Some(union) = self.unions.get_mut(&union_id) {
				if union.parents.len() > 1 {
					union.parents.retain(|parent| reachable.contains(parent));
				}
			}
		}
	}

	fn apply_exclusions(&mut self, excluded: &[String]) -> GraphResult<()> {
		for person_id in excluded {
			let memberships = self.person(person_id)?.unions.clone();
			match memberships.len() {
				0 => self.detach_person_from_parent(person_id)?,
				1 => self.exclude_union_branch(person_id, &memberships[0])?,
				_ => {
					return Err(GraphError::unsupported(format!(
						"excluded person {person_id} belongs to multiple unions"
					)));
				}
			}
		}
		Ok(())
	}

	fn detach_person_from_parent(&mut self, person_id: &str) -> GraphResult<()> {
		let parent_id = self
			.person(person_id)?
			.parent_union
			.clone()
			.ok_or_else(|| {
				GraphError::unsupported(format!(
					"cannot exclude {person_id}: person has no parent union"
				))
			})?;
		if let Some(parent) = self.unions.get_mut(&parent_id) {
			parent.children.retain(|child| child != person_id);
		}
		if let Some(person) = self.people.get_mut(person_id) {
			person.parent_union = None;
		}
		Ok(())
	}

	/// Sever the excluded person's union from its parents, then walk downward
	/// dropping only the edges that lead back into the excluded branch. A
	/// descendant union still reachable through a non-excluded parent keeps
	/// that other edge; one whose last parent was the excluded branch is
	/// descended into instead.
	fn exclude_union_branch(&mut self, excluded_id: &str, union_id: &str) -> GraphResult<()> {
		let parent_ids = self.union(union_id)?.parents.clone();
		for parent_id in &parent_ids {
			self.detach_union_from_parent(union_id, excluded_id, parent_id)?;
		}

		let mut stack = vec![union_id.to_string()];
		while let Some(element_id) = stack.pop() {
			let child_ids = self.union(&element_id)?.children.clone();
			for child_id in child_ids {
				let family_ids = self.person(&child_id)?.unions.clone();
				for family_id in family_ids {
					if self.union(&family_id)?.parents.len() > 1 {
						self.detach_union_from_parent(&family_id, &child_id, &element_id)?;
					} else {
						stack.push(family_id);
					}
				}
			}
		}
		Ok(())
	}

	fn detach_union_from_parent(
		&mut self,
		union_id: &str,
		removed_member: &str,
		parent_id: &str,
	) -> GraphResult<()> {
		detach_union_parent_edge(
			&mut self.people,
			&mut self.unions,
			union_id,
			removed_member,
			parent_id,
		)
	}

	/// Collapse every reachable union with two parent unions down to one.
	///
	/// When the members' sexes differ the female member's ancestry stays
	/// primary and the male-side parent union is demoted; when they match the
	/// first-attached parent is demoted. The demoted edge is recorded, keyed
	/// by the child union, so it can be drawn as a dashed connector. This is
	/// a tie-break, not data loss.
	fn dedup_extra_parents(&mut self) -> GraphResult<()> {
		let union_ids: Vec<String> = self
			.walk()
			.into_iter()
			.filter_map(|node| match node {
				NodeRef::Union(id) => Some(id),
				NodeRef::Person(_) => None,
			})
			.collect();

		for union_id in union_ids {
			let (parents, members) = {
				let union = self.union(&union_id)?;
				(union.parents.clone(), union.members.clone())
			};
			if parents.len() <= 1 {
				continue;
			}
			if members.len() != 2 {
				return Err(GraphError::unsupported(format!(
					"union {union_id} has two parent unions but {} members",
					members.len()
				)));
			}

			let first = self.person(&members[0])?;
			let second = self.person(&members[1])?;
			let demoted = if first.effective_sex() == second.effective_sex() {
				parents[0].clone()
			} else {
				let male = if first.effective_sex() == Sex::Male {
					first
				} else {
					second
				};
				male.parent_union.clone().ok_or_else(|| {
					GraphError::not_found(format!(
						"male member of union {union_id} has no parent union"
					))
				})?
			};
			if !parents.contains(&demoted) {
				return Err(GraphError::not_found(format!(
					"union {union_id} has no parent union {demoted}"
				)));
			}

			self.extra_parent_map.push((union_id.clone(), demoted.clone()));
			// soft detach: the member's own child-of edge stays intact
			self.union_mut(&union_id)?
				.parents
				.retain(|parent| *parent != demoted);
		}
		Ok(())
	}

	/// A person who is a member of more than one union keeps their
	/// first-declared union as primary; every additional union is demoted to
	/// a remarriage link. Walk order decides which people are considered,
	/// document order decides which union is first. Unions that fell out of
	/// scope (re-rooting, exclusion) are ignored so every recorded pair is
	/// drawable.
	fn detect_remarriages(&mut self) {
		let mut reachable: HashSet<String> = HashSet::new();
		let mut remarried: Vec<String> = Vec::new();
		let mut seen: HashSet<String> = HashSet::new();
		for node in self.walk() {
			let NodeRef::Union(union_id) = node else {
				continue;
			};
			let Some(union) = self.unions.get(&union_id) else {
				continue;
			};
			reachable.insert(union_id.clone());
			for member_id in &union.members {
				let Some(member) = self.people.get(member_id) else {
					continue;
				};
				if member.unions.len() > 1 && seen.insert(member_id.clone()) {
					remarried.push(member_id.clone());
				}
			}
		}

		for person_id in remarried {
			let Some(person) = self.people.get(&person_id) else {
				continue;
			};
			let memberships: Vec<String> = person
				.unions
				.iter()
				.filter(|union_id| reachable.contains(*union_id))
				.cloned()
				.collect();
			let Some((primary_id, rest)) = memberships.split_first() else {
				continue;
			};
			for secondary_id in rest {
				if let Some(secondary) = self.unions.get_mut(secondary_id) {
					secondary.is_remarriage_link = true;
				}
				self.remarriage_map
					.push((primary_id.clone(), secondary_id.clone()));
			}
		}
	}
}

fn make_people(dataset: &HeritageDataset) -> HashMap<String, Person> {
	dataset
		.people
		.iter()
		.map(|record| {
			(
				record.id.clone(),
				Person {
					record: record.clone(),
					parent_union: None,
					unions: Vec::new(),
					children: Vec::new(),
				},
			)
		})
		.collect()
}

fn make_unions(
	dataset: &HeritageDataset,
	people: &mut HashMap<String, Person>,
) -> GraphResult<HashMap<String, Union>> {
	let mut unions = HashMap::new();
	for record in &dataset.unions {
		let mut union = Union {
			id: record.id.clone(),
			members: Vec::new(),
			parents: Vec::new(),
			children: Vec::new(),
			is_remarriage_link: false,
		};

		for member_id in [&record.parent_a, &record.parent_b].into_iter().flatten() {
			let member = people.get_mut(member_id).ok_or_else(|| {
				GraphError::malformed(format!(
					"union {} references unknown person {member_id}",
					record.id
				))
			})?;
			member.unions.push(record.id.clone());
			union.members.push(member_id.clone());
		}

		for child_id in &record.children {
			if !people.contains_key(child_id) {
				return Err(GraphError::malformed(format!(
					"union {} references unknown child {child_id}",
					record.id
				)));
			}
			for member_id in &union.members {
				if let Some(member) = people.get_mut(member_id) {
					member.children.push(child_id.clone());
				}
			}
			if let Some(child) = people.get_mut(child_id) {
				child.parent_union = Some(record.id.clone());
			}
			union.children.push(child_id.clone());
		}

		unions.insert(record.id.clone(), union);
	}
	Ok(unions)
}

/// Second pass: once every child-of edge is wired, connect each union to the
/// parent unions of its members. A union may legitimately end this step with
/// two parent unions; deduplication resolves that later.
fn link_ancestry(
	dataset: &HeritageDataset,
	people: &HashMap<String, Person>,
	unions: &mut HashMap<String, Union>,
) -> GraphResult<()> {
	for record in &dataset.unions {
		let member_ids = match unions.get(&record.id) {
			Some(union) => union.members.clone(),
			None => continue,
		};
		match member_ids.len() {
			// a memberless union has no ancestry to link
			0 => {}
			1 | 2 => {
				for member_id in &member_ids {
					let parent_id = people
						.get(member_id)
						.and_then(|member| member.parent_union.clone());
					let Some(parent_id) = parent_id else {
						continue;
					};
					if let Some(union) = unions.get_mut(&record.id) {
						if !union.parents.contains(&parent_id) {
							union.parents.push(parent_id);
						}
					}
				}
			}
			_ => {
				return Err(GraphError::unsupported(format!(
					"union {} has more than two members",
					record.id
				)));
			}
		}
	}
	Ok(())
}

/// Pick the root node and scope the view below it. With no explicit root the
/// first dataset person without a parent union is assumed to be the single
/// natural root; both paths behave identically so that re-rooting on the
/// natural root is a no-op structurally.
fn select_root(
	dataset: &HeritageDataset,
	people: &mut HashMap<String, Person>,
	unions: &mut HashMap<String, Union>,
	root_person: Option<&str>,
) -> GraphResult<NodeRef> {
	let root_id = match root_person {
		Some(person_id) => {
			if !people.contains_key(person_id) {
				return Err(GraphError::not_found(format!("root person {person_id}")));
			}
			person_id.to_string()
		}
		None => dataset
			.people
			.iter()
			.map(|record| &record.id)
			.find(|id| {
				people
					.get(*id)
					.is_some_and(|person| person.parent_union.is_none())
			})
			.cloned()
			.ok_or_else(|| {
				GraphError::malformed("dataset has no person without a parent union")
			})?,
	};

	let memberships = people
		.get(&root_id)
		.map(|person| person.unions.clone())
		.unwrap_or_default();
	match memberships.len() {
		0 => {
			// scope the view at the person: drop their child-of edge
			let parent_id = people.get(&root_id).and_then(|p| p.parent_union.clone());
			if let Some(parent_id) = parent_id {
				if let Some(parent) = unions.get_mut(&parent_id) {
					parent.children.retain(|child| *child != root_id);
				}
				if let Some(person) = people.get_mut(&root_id) {
					person.parent_union = None;
				}
			}
			Ok(NodeRef::Person(root_id))
		}
		1 => {
			let union_id = memberships[0].clone();
			let parent_ids = unions
				.get(&union_id)
				.map(|union| union.parents.clone())
				.unwrap_or_default();
			for parent_id in &parent_ids {
				detach_union_parent_edge(people, unions, &union_id, &root_id, parent_id)?;
			}
			Ok(NodeRef::Union(union_id))
		}
		_ => Err(GraphError::unsupported(format!(
			"root person {root_id} belongs to multiple unions"
		))),
	}
}

/// Hard detach: removes the parent edge and the child back-references on both
/// the union level and the person level.
fn detach_union_parent_edge(
	people: &mut HashMap<String, Person>,
	unions: &mut HashMap<String, Union>,
	union_id: &str,
	removed_member: &str,
	parent_id: &str,
) -> GraphResult<()> {
	let has_parent = unions
		.get(union_id)
		.is_some_and(|union| union.parents.iter().any(|p| p == parent_id));
	if !has_parent {
		return Err(GraphError::not_found(format!(
			"union {union_id} has no parent union {parent_id}"
		)));
	}

	let parent_member_ids = match unions.get_mut(parent_id) {
		Some(parent) => {
			parent.children.retain(|child| child != removed_member);
			parent.members.clone()
		}
		None => {
			return Err(GraphError::not_found(format!("parent union {parent_id}")));
		}
	};
	for member_id in &parent_member_ids {
		if let Some(member) = people.get_mut(member_id) {
			member.children.retain(|child| child != removed_member);
		}
	}

	if let Some(union) = unions.get_mut(union_id) {
		union.parents.retain(|parent| parent != parent_id);
	}
	let removed = people.get_mut(removed_member).ok_or_else(|| {
		GraphError::not_found(format!("union member {removed_member}"))
	})?;
	removed.parent_union = None;
	Ok(())
}
