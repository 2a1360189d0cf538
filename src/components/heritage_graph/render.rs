//! Draws one frame of the heritage tree onto a 2D canvas context.
//!
//! Draw order per frame: primary connectors, dashed extra-parent connectors,
//! dashed remarriage connectors, then node rectangles and labels. The
//! hit-test index is rebuilt at the start of every pass.

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::layout::Connector;
use super::state::CanvasState;

const STROKE_COLOR: &str = "#797979";
const TEXT_COLOR: &str = "#000";
const MAIN_FONT: &str = "400 17px sans-serif";
const SIDE_FONT: &str = "400 13px sans-serif";

/// The extra-parent elbow runs slightly above the primary one so both stay
/// visible when they share a corridor.
const EXTRA_PARENT_OFFSET: f64 = 10.0;

pub fn render(state: &mut CanvasState, ctx: &CanvasRenderingContext2d) {
	state.rebuild_hit_index();

	let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
	ctx.clear_rect(0.0, 0.0, state.width * state.dpr, state.height * state.dpr);
	ctx.save();
	let _ = ctx.scale(state.dpr, state.dpr);
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);

	let half_gap = state.config.vertical_gap / 2.0;
	for connector in &state.layout.primary_connectors {
		draw_elbow(ctx, connector, half_gap, 0.0, false);
	}
	for connector in &state.layout.extra_parent_connectors {
		draw_elbow(ctx, connector, half_gap, EXTRA_PARENT_OFFSET, true);
	}
	for connector in &state.layout.remarriage_connectors {
		draw_remarriage_line(ctx, connector, state.config.node_height);
	}
	draw_nodes(state, ctx);

	ctx.restore();
}

/// Three-segment elbow: down from the parent anchor, across the corridor
/// between the rows, down into the child anchor.
fn draw_elbow(
	ctx: &CanvasRenderingContext2d,
	connector: &Connector,
	half_gap: f64,
	corridor_offset: f64,
	dashed: bool,
) {
	let corridor_y = connector.to_y - half_gap + corridor_offset;

	ctx.begin_path();
	ctx.move_to(connector.from_x, connector.from_y);
	ctx.line_to(connector.from_x, corridor_y);
	ctx.line_to(connector.to_x, corridor_y);
	ctx.line_to(connector.to_x, connector.to_y);
	ctx.set_stroke_style_str(STROKE_COLOR);
	ctx.set_line_width(1.0);
	if dashed {
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(4.0),
			&JsValue::from_f64(4.0),
		));
	}
	ctx.stroke();
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

/// Dashed horizontal link between a primary union and a remarriage union,
/// drawn at mid-node height.
fn draw_remarriage_line(ctx: &CanvasRenderingContext2d, connector: &Connector, node_height: f64) {
	ctx.begin_path();
	ctx.move_to(connector.from_x, connector.from_y + node_height / 2.0);
	ctx.line_to(connector.to_x, connector.to_y + node_height / 2.0);
	ctx.set_stroke_style_str(STROKE_COLOR);
	ctx.set_line_width(1.0);
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(4.0),
		&JsValue::from_f64(4.0),
	));
	ctx.stroke();
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_nodes(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let node_height = state.config.node_height;
	for node in &state.layout.positioned {
		if node.empty {
			continue;
		}
		for (left, member) in node.member_rects() {
			ctx.set_fill_style_str(&member.color);
			ctx.set_stroke_style_str(STROKE_COLOR);
			ctx.set_line_width(1.0);
			ctx.fill_rect(left, node.y, member.width, node_height);
			ctx.stroke_rect(left, node.y, member.width, node_height);

			if member.placeholder {
				continue;
			}
			let center = left + member.width / 2.0;
			let text_y = node.y + node_height / 4.0;
			ctx.set_fill_style_str(TEXT_COLOR);
			ctx.set_font(MAIN_FONT);
			ctx.set_text_align("center");
			let _ = ctx.fill_text(&member.name_line, center, text_y);
			let _ = ctx.fill_text(&member.surname_line, center, text_y + 25.0);
			ctx.set_font(SIDE_FONT);
			let _ = ctx.fill_text(&member.years_line, center, text_y + 50.0);
		}
	}
}
