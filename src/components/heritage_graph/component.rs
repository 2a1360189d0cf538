use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::dataset::HeritageDataset;
use super::error::GraphResult;
use super::graph::{Graph, GraphOptions};
use super::layout::{self, LayoutConfig};
use super::render;
use super::state::CanvasState;

fn canvas_context(canvas: &HtmlCanvasElement) -> CanvasRenderingContext2d {
	canvas
		.get_context("2d")
		.unwrap()
		.unwrap()
		.dyn_into()
		.unwrap()
}

fn container_size(canvas: &HtmlCanvasElement, width: Option<f64>, height: Option<f64>) -> (f64, f64) {
	(
		width.unwrap_or_else(|| {
			canvas
				.parent_element()
				.map(|p| p.client_width() as f64)
				.unwrap_or(800.0)
		}),
		height.unwrap_or_else(|| {
			canvas
				.parent_element()
				.map(|p| p.client_height() as f64)
				.unwrap_or(600.0)
		}),
	)
}

/// The backing store is sized in device pixels while CSS keeps the element at
/// its logical size, so strokes stay crisp on high-dpi displays.
fn size_canvas(canvas: &HtmlCanvasElement, w: f64, h: f64, dpr: f64) {
	canvas.set_width((w * dpr) as u32);
	canvas.set_height((h * dpr) as u32);
	let style = web_sys::HtmlElement::style(canvas);
	let _ = style.set_property("width", &format!("{w}px"));
	let _ = style.set_property("height", &format!("{h}px"));
}

fn build_state(
	dataset: &HeritageDataset,
	options: &GraphOptions,
	width: f64,
	height: f64,
	dpr: f64,
	highlighted: Option<&str>,
) -> GraphResult<CanvasState> {
	let graph = Graph::build(dataset, options)?;
	let config = LayoutConfig::default();
	let laid_out = layout::layout(&graph, &config)?;
	CanvasState::new(laid_out, config, width, height, dpr, highlighted)
}

#[component]
pub fn HeritageGraphCanvas(
	#[prop(into)] dataset: Signal<HeritageDataset>,
	#[prop(into, optional)] root_person: Signal<Option<String>>,
	#[prop(into, optional)] excluded_people: Signal<Vec<String>>,
	#[prop(into, optional)] highlighted_person: Signal<Option<String>>,
	#[prop(optional, into)] on_person_click: Option<Callback<String>>,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<CanvasState>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (error, set_error) = signal(None::<String>);

	// Rebuilds the whole pipeline whenever any input signal changes.
	let (state_init, resize_cb_init) = (state.clone(), resize_cb.clone());
	Effect::new(move |_| {
		let data = dataset.get();
		let options = GraphOptions {
			root_person: root_person.get(),
			excluded_people: excluded_people.get(),
		};
		let highlighted = highlighted_person.get();

		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let window: Window = web_sys::window().unwrap();
		let dpr = window.device_pixel_ratio();

		let (w, h) = container_size(&canvas, width, height);
		size_canvas(&canvas, w, h, dpr);

		match build_state(&data, &options, w, h, dpr, highlighted.as_deref()) {
			Ok(mut fresh) => {
				render::render(&mut fresh, &canvas_context(&canvas));
				*state_init.borrow_mut() = Some(fresh);
				set_error.set(None);
			}
			Err(err) => {
				log::error!("heritage graph rebuild failed: {err}");
				*state_init.borrow_mut() = None;
				set_error.set(Some(err.to_string()));
			}
		}

		if resize_cb_init.borrow().is_none() {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let win: Window = web_sys::window().unwrap();
				let ndpr = win.device_pixel_ratio();
				let (nw, nh) = container_size(&canvas_resize, width, height);
				size_canvas(&canvas_resize, nw, nh, ndpr);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh, ndpr);
					render::render(s, &canvas_context(&canvas_resize));
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
	});

	let resize_cb_drop = leptos::__reexports::send_wrapper::SendWrapper::new(resize_cb.clone());
	on_cleanup(move || {
		if let Some(cb) = resize_cb_drop.borrow_mut().take() {
			if let Some(win) = web_sys::window() {
				let _ = win
					.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);

		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.begin_pan(x, y);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);

		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if s.pan_to(x, y) {
				render::render(s, &canvas_context(&canvas));
			}
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);

		let clicked = {
			let mut borrow = state_mu.borrow_mut();
			let Some(ref mut s) = *borrow else { return };
			if s.end_pan() {
				s.person_at(x, y).map(str::to_owned)
			} else {
				None
			}
		};
		if let (Some(id), Some(cb)) = (clicked, on_person_click) {
			cb.run(id);
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.end_pan();
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);

		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			s.transform.zoom_at(x, y, factor);
			render::render(s, &canvas_context(&canvas));
		}
	};

	view! {
		<div class="heritage-graph" style="position: relative; width: 100%; height: 100%;">
			{move || {
				error
					.get()
					.map(|message| {
						view! {
							<div class="heritage-graph-error">
								<p>"Unable to display this family tree."</p>
								<p class="heritage-graph-error-detail">{message}</p>
							</div>
						}
					})
			}}
			<canvas
				node_ref=canvas_ref
				class="heritage-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
		</div>
	}
}
