//! Pan/zoom transform, pointer hit-testing and initial centering.
//!
//! Kept free of `web_sys` so the transform math is unit-testable; drawing
//! lives in `render`.

use super::error::{GraphError, GraphResult};
use super::layout::{LayoutConfig, LayoutResult};

/// Zoom scale clamp range.
pub const SCALE_MIN: f64 = 0.05;
pub const SCALE_MAX: f64 = 2.0;

/// How far the pointer may travel during a press before the release stops
/// counting as a click.
pub const CLICK_SLOP: f64 = 3.0;

/// Translation plus uniform scale. Explicit state passed into draw calls, so
/// independent canvas instances never share it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

impl ViewTransform {
	/// Invert the transform: screen coordinates to graph space.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// Scale by `factor` keeping the graph point under the cursor fixed.
	/// The resulting scale is clamped to `[SCALE_MIN, SCALE_MAX]`.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let new_k = (self.k * factor).clamp(SCALE_MIN, SCALE_MAX);
		let ratio = new_k / self.k;
		self.x = sx - (sx - self.x) * ratio;
		self.y = sy - (sy - self.y) * ratio;
		self.k = new_k;
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// One clickable member rectangle in graph space, rebuilt every frame.
#[derive(Clone, Debug)]
pub struct ClickableArea {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
	pub person_id: String,
}

/// Everything one canvas instance owns for a render cycle: the positioned
/// layout, the view transform and the current frame's hit-test index.
/// Discarded wholesale when the graph is rebuilt.
pub struct CanvasState {
	pub layout: LayoutResult,
	pub config: LayoutConfig,
	pub transform: ViewTransform,
	pub pan: PanState,
	pub width: f64,
	pub height: f64,
	pub dpr: f64,
	pub clickable_areas: Vec<ClickableArea>,
}

impl CanvasState {
	/// Build state for a freshly laid-out graph, centering the view either on
	/// the bounding box of all visible nodes or on `highlighted` if given.
	pub fn new(
		layout: LayoutResult,
		config: LayoutConfig,
		width: f64,
		height: f64,
		dpr: f64,
		highlighted: Option<&str>,
	) -> GraphResult<Self> {
		let transform = initial_transform(&layout, &config, width, height, highlighted)?;
		Ok(Self {
			layout,
			config,
			transform,
			pan: PanState::default(),
			width,
			height,
			dpr,
			clickable_areas: Vec::new(),
		})
	}

	pub fn resize(&mut self, width: f64, height: f64, dpr: f64) {
		self.width = width;
		self.height = height;
		self.dpr = dpr;
	}

	/// Recompute the hit-test index from the current layout. Placeholder
	/// members are never clickable.
	pub fn rebuild_hit_index(&mut self) {
		self.clickable_areas.clear();
		for node in &self.layout.positioned {
			if node.empty {
				continue;
			}
			for (left, member) in node.member_rects() {
				if member.placeholder {
					continue;
				}
				self.clickable_areas.push(ClickableArea {
					x: left,
					y: node.y,
					width: member.width,
					height: self.config.node_height,
					person_id: member.id.clone(),
				});
			}
		}
	}

	/// Hit-test a screen-space point against the current frame's clickable
	/// areas. A miss is an expected no-op, not an error.
	pub fn person_at(&self, sx: f64, sy: f64) -> Option<&str> {
		let (gx, gy) = self.transform.screen_to_graph(sx, sy);
		self.clickable_areas
			.iter()
			.find(|area| {
				gx >= area.x
					&& gx <= area.x + area.width
					&& gy >= area.y
					&& gy <= area.y + area.height
			})
			.map(|area| area.person_id.as_str())
	}

	pub fn begin_pan(&mut self, sx: f64, sy: f64) {
		self.pan.active = true;
		self.pan.moved = false;
		self.pan.start_x = sx;
		self.pan.start_y = sy;
		self.pan.transform_start_x = self.transform.x;
		self.pan.transform_start_y = self.transform.y;
	}

	/// Returns true when the transform changed and a redraw is due.
	pub fn pan_to(&mut self, sx: f64, sy: f64) -> bool {
		if !self.pan.active {
			return false;
		}
		let (dx, dy) = (sx - self.pan.start_x, sy - self.pan.start_y);
		if dx.abs() > CLICK_SLOP || dy.abs() > CLICK_SLOP {
			self.pan.moved = true;
		}
		self.transform.x = self.pan.transform_start_x + dx;
		self.transform.y = self.pan.transform_start_y + dy;
		true
	}

	/// Ends the gesture; returns true when it stayed within the click slop,
	/// i.e. the release should be treated as a click.
	pub fn end_pan(&mut self) -> bool {
		let was_click = self.pan.active && !self.pan.moved;
		self.pan.active = false;
		was_click
	}
}

/// Initial translation: the visible (non-placeholder) nodes' bounding-box
/// midpoint, or the highlighted person's node, moved to the canvas center.
fn initial_transform(
	layout: &LayoutResult,
	config: &LayoutConfig,
	width: f64,
	height: f64,
	highlighted: Option<&str>,
) -> GraphResult<ViewTransform> {
	let (cx, cy) = match highlighted {
		Some(person_id) => {
			let node = layout
				.positioned
				.iter()
				.find(|node| node.members.iter().any(|member| member.id == person_id))
				.ok_or_else(|| {
					GraphError::not_found(format!("highlighted person {person_id}"))
				})?;
			(node.x, node.y)
		}
		None => {
			let mut visible = layout
				.positioned
				.iter()
				.filter(|node| !node.empty)
				.peekable();
			if visible.peek().is_none() {
				(0.0, 0.0)
			} else {
				let mut left = f64::INFINITY;
				let mut right = f64::NEG_INFINITY;
				let mut top = f64::INFINITY;
				let mut bottom = f64::NEG_INFINITY;
				for node in visible {
					left = left.min(node.x);
					right = right.max(node.x);
					top = top.min(node.y);
					bottom = bottom.max(node.y);
				}
				((left + right) / 2.0, (top + bottom) / 2.0)
			}
		}
	};

	Ok(ViewTransform {
		x: -cx + width / 2.0,
		y: -cy + height / 2.0 - config.node_height,
		k: 1.0,
	})
}

#[cfg(test)]
mod tests {
	use super::super::dataset::{HeritageDataset, PersonKind, PersonRecord, Sex, UnionRecord};
	use super::super::graph::{Graph, GraphOptions};
	use super::super::layout::layout;
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

	fn simple_state(highlighted: Option<&str>) -> GraphResult<CanvasState> {
		let dataset = HeritageDataset {
			people: vec![
				person("p1", Sex::Male),
				person("p2", Sex::Female),
				person("p3", Sex::Male),
			],
			unions: vec![UnionRecord {
				id: "u1".into(),
				parent_a: Some("p1".into()),
				parent_b: Some("p2".into()),
				children: vec!["p3".into()],
			}],
		};
		let graph = Graph::build(&dataset, &GraphOptions::default()).unwrap();
		let config = LayoutConfig::default();
		let result = layout(&graph, &config).unwrap();
		CanvasState::new(result, config, 800.0, 600.0, 1.0, highlighted)
	}

	#[test]
	fn zoom_keeps_cursor_point_fixed() {
		let mut transform = ViewTransform { x: 40.0, y: -20.0, k: 0.8 };
		let before = transform.screen_to_graph(300.0, 200.0);
		transform.zoom_at(300.0, 200.0, 1.1);
		let after = transform.screen_to_graph(300.0, 200.0);
		assert!((before.0 - after.0).abs() < 1e-9);
		assert!((before.1 - after.1).abs() < 1e-9);
	}

	#[test]
	fn zoom_is_clamped() {
		let mut transform = ViewTransform::default();
		for _ in 0..200 {
			transform.zoom_at(0.0, 0.0, 1.5);
		}
		assert_eq!(transform.k, SCALE_MAX);
		for _ in 0..200 {
			transform.zoom_at(0.0, 0.0, 0.5);
		}
		assert_eq!(transform.k, SCALE_MIN);
	}

	#[test]
	fn screen_to_graph_inverts_translation_and_scale() {
		let transform = ViewTransform { x: 100.0, y: 50.0, k: 2.0 };
		assert_eq!(transform.screen_to_graph(100.0, 50.0), (0.0, 0.0));
		assert_eq!(transform.screen_to_graph(300.0, 250.0), (100.0, 100.0));
	}

	#[test]
	fn initial_transform_centers_visible_bounding_box() {
		let state = simple_state(None).unwrap();
		// nodes sit at x = 0, y in [0, 150]; midpoint (0, 75)
		assert_eq!(state.transform.x, 400.0);
		assert_eq!(state.transform.y, -75.0 + 300.0 - 80.0);
		assert_eq!(state.transform.k, 1.0);
	}

	#[test]
	fn initial_transform_centers_highlighted_person() {
		let state = simple_state(Some("p3")).unwrap();
		let node = state
			.layout
			.positioned
			.iter()
			.find(|node| node.id == "p3")
			.unwrap();
		assert_eq!(state.transform.x, -node.x + 400.0);
		assert_eq!(state.transform.y, -node.y + 300.0 - 80.0);
	}

	#[test]
	fn unknown_highlighted_person_is_not_found() {
		assert!(matches!(
			simple_state(Some("ghost")),
			Err(GraphError::NotFound(_))
		));
	}

	#[test]
	fn hit_test_finds_member_and_misses_background() {
		let mut state = simple_state(None).unwrap();
		state.rebuild_hit_index();
		assert!(!state.clickable_areas.is_empty());

		// aim at the center of the first member rectangle, in screen space
		let area = state.clickable_areas[0].clone();
		let sx = (area.x + area.width / 2.0) * state.transform.k + state.transform.x;
		let sy = (area.y + area.height / 2.0) * state.transform.k + state.transform.y;
		assert_eq!(state.person_at(sx, sy), Some(area.person_id.as_str()));

		// far away from any node
		assert_eq!(state.person_at(-10_000.0, -10_000.0), None);
	}

	#[test]
	fn placeholder_members_are_not_clickable() {
		let dataset = HeritageDataset {
			people: vec![
				person("p1", Sex::Male),
				PersonRecord::placeholder("e1"),
				person("p3", Sex::Male),
			],
			unions: vec![UnionRecord {
				id: "u1".into(),
				parent_a: Some("p1".into()),
				parent_b: Some("e1".into()),
				children: vec!["p3".into()],
			}],
		};
		let graph = Graph::build(&dataset, &GraphOptions::default()).unwrap();
		let config = LayoutConfig::default();
		let result = layout(&graph, &config).unwrap();
		let mut state = CanvasState::new(result, config, 800.0, 600.0, 1.0, None).unwrap();
		state.rebuild_hit_index();
		assert!(
			state
				.clickable_areas
				.iter()
				.all(|area| area.person_id != "e1")
		);
	}

	#[test]
	fn pan_moves_transform_and_release_reports_click_within_slop() {
		let mut state = simple_state(None).unwrap();
		let (x0, y0) = (state.transform.x, state.transform.y);

		state.begin_pan(10.0, 10.0);
		assert!(state.pan_to(60.0, 40.0));
		assert_eq!(state.transform.x, x0 + 50.0);
		assert_eq!(state.transform.y, y0 + 30.0);
		assert!(!state.end_pan());

		state.begin_pan(10.0, 10.0);
		assert!(state.pan_to(11.0, 10.0));
		assert!(state.end_pan());
	}

	#[test]
	fn pan_to_is_inert_without_active_gesture() {
		let mut state = simple_state(None).unwrap();
		let before = state.transform;
		assert!(!state.pan_to(500.0, 500.0));
		assert_eq!(state.transform, before);
	}
}
