use leptos::prelude::*;

use crate::components::heritage_graph::{
	EventDate, HeritageDataset, HeritageGraphCanvas, PersonEvent, PersonKind, PersonRecord, Sex,
	UnionRecord,
};

fn person(
	id: &str,
	sex: Sex,
	first: &str,
	last: &str,
	birth: Option<i32>,
	death: Option<i32>,
	color: &str,
) -> PersonRecord {
	let event = |year: Option<i32>| {
		year.map(|year| PersonEvent {
			date: EventDate { year, month: 1, day: 1 },
		})
	};
	PersonRecord {
		id: id.into(),
		kind: PersonKind::Real,
		sex: Some(sex),
		first_name: first.into(),
		last_name: last.into(),
		nick_name: String::new(),
		birth: event(birth),
		death: event(death),
		color: color.into(),
	}
}

fn union(id: &str, a: Option<&str>, b: Option<&str>, children: &[&str]) -> UnionRecord {
	UnionRecord {
		id: id.into(),
		parent_a: a.map(Into::into),
		parent_b: b.map(Into::into),
		children: children.iter().map(|&c| c.into()).collect(),
	}
}

/// Four generations descending from one root couple. The two middle houses
/// are joined by a marriage, so their union starts with two parent unions and
/// exercises the dashed extra-parent connector; Piotr's second marriage shows
/// the dashed remarriage link, and Jan is a hidden-person placeholder.
fn sample_dataset() -> HeritageDataset {
	let mut people = vec![
		person("aleksander", Sex::Male, "Aleksander", "Nowak", Some(1895), Some(1962), "#CDE7F0"),
		person("zofia", Sex::Female, "Zofia", "Nowak", Some(1899), Some(1975), "#F3D1DC"),
		person("stefan", Sex::Male, "Stefan", "Nowak", Some(1918), Some(1985), "#CDE7F0"),
		person("maria", Sex::Female, "Maria", "Nowak", Some(1921), Some(1998), "#F3D1DC"),
		person("helena", Sex::Female, "Helena", "Wisniewska", Some(1925), None, "#F3D1DC"),
		person("anna", Sex::Female, "Anna", "Nowak", Some(1949), None, "#F3D1DC"),
		person("piotr", Sex::Male, "Piotr", "Wisniewski", Some(1947), Some(2019), "#CDE7F0"),
		person("irena", Sex::Female, "Irena", "Kowalska", Some(1952), None, "#F3D1DC"),
		person("tomasz", Sex::Male, "Tomasz", "Wisniewski", Some(1978), None, "#CDE7F0"),
		PersonRecord::placeholder("jan"),
	];
	let mut ewa = person("ewa", Sex::Female, "Ewa", "Wisniewska", Some(1975), None, "#F3D1DC");
	ewa.nick_name = "Ewka".into();
	people.push(ewa);

	HeritageDataset {
		people,
		unions: vec![
			union("korzen", Some("aleksander"), Some("zofia"), &["stefan", "helena"]),
			union("nowak", Some("stefan"), Some("maria"), &["anna"]),
			union("wisniewski", Some("jan"), Some("helena"), &["piotr"]),
			union("anna_piotr", Some("anna"), Some("piotr"), &["ewa", "tomasz"]),
			// Piotr's second marriage; rendered as a dashed side link.
			union("piotr_irena", Some("piotr"), Some("irena"), &[]),
		],
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let dataset = Signal::derive(sample_dataset);
	let (root_person, set_root_person) = signal(None::<String>);
	let (highlighted, set_highlighted) = signal(None::<String>);

	// Clicking a person re-roots and re-centers the tree on them.
	let on_person_click = Callback::new(move |id: String| {
		set_root_person.set(Some(id.clone()));
		set_highlighted.set(Some(id));
	});

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<HeritageGraphCanvas
					dataset=dataset
					root_person=root_person
					highlighted_person=highlighted
					on_person_click=on_person_click
				/>
				<div class="graph-overlay">
					<h1>"Family Tree"</h1>
					<p class="subtitle">
						"Click a person to re-root the tree on them. Scroll to zoom. Drag to pan."
					</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}
