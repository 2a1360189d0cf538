//! Typed views over the raw person/union records.
//!
//! The dataset is an immutable snapshot per render cycle; this module only
//! provides lookup helpers and small display formatters, no behavior.

use super::error::{GraphError, GraphResult};

/// Declared sex of a person record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sex {
	Female,
	Male,
}

/// Whether a record is a real person or a layout-preserving placeholder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersonKind {
	/// Rendered normally.
	Real,
	/// Stands in for a deliberately hidden individual; keeps tree shape but
	/// is never drawn and never receives connectors.
	Placeholder,
}

/// A dated life event (birth, death).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventDate {
	pub year: i32,
	pub month: u8,
	pub day: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PersonEvent {
	pub date: EventDate,
}

/// One person as declared by the dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonRecord {
	pub id: String,
	pub kind: PersonKind,
	pub sex: Option<Sex>,
	pub first_name: String,
	pub last_name: String,
	pub nick_name: String,
	pub birth: Option<PersonEvent>,
	pub death: Option<PersonEvent>,
	pub color: String,
}

impl PersonRecord {
	/// A placeholder with nothing to display.
	pub fn placeholder(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			kind: PersonKind::Placeholder,
			sex: None,
			first_name: String::new(),
			last_name: String::new(),
			nick_name: String::new(),
			birth: None,
			death: None,
			color: "#FFF".into(),
		}
	}
}

/// One union ("family") as declared by the dataset. Child order is
/// authoritative document order and is preserved through construction.
#[derive(Clone, Debug)]
pub struct UnionRecord {
	pub id: String,
	pub parent_a: Option<String>,
	pub parent_b: Option<String>,
	pub children: Vec<String>,
}

/// The flat relational dataset: people plus the unions connecting them.
#[derive(Clone, Debug, Default)]
pub struct HeritageDataset {
	pub people: Vec<PersonRecord>,
	pub unions: Vec<UnionRecord>,
}

impl HeritageDataset {
	/// Look up a person record by id.
	pub fn find_person(&self, person_id: &str) -> GraphResult<&PersonRecord> {
		self.people
			.iter()
			.find(|person| person.id == person_id)
			.ok_or_else(|| GraphError::not_found(format!("person {person_id}")))
	}

	/// Look up a union record by id.
	pub fn find_union(&self, union_id: &str) -> GraphResult<&UnionRecord> {
		self.unions
			.iter()
			.find(|union| union.id == union_id)
			.ok_or_else(|| GraphError::not_found(format!("union {union_id}")))
	}
}

/// Whether a record is a layout-preserving placeholder.
pub fn is_placeholder(person: &PersonRecord) -> bool {
	person.kind == PersonKind::Placeholder
}

/// First name plus quoted nickname, as shown on the first text line of a node.
pub fn display_name(person: &PersonRecord) -> String {
	if person.nick_name.is_empty() {
		person.first_name.clone()
	} else {
		format!("{} \"{}\"", person.first_name, person.nick_name)
	}
}

/// "birth - death" year range, or an empty string when neither is known.
pub fn year_range(birth: Option<&PersonEvent>, death: Option<&PersonEvent>) -> String {
	if birth.is_none() && death.is_none() {
		return String::new();
	}
	let year = |event: Option<&PersonEvent>| {
		event
			.map(|e| e.date.year.to_string())
			.unwrap_or_default()
	};
	format!("{} - {}", year(birth), year(death))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn person(id: &str) -> PersonRecord {
		PersonRecord {
			id: id.into(),
			kind: PersonKind::Real,
			sex: Some(Sex::Male),
			first_name: "Jan".into(),
			last_name: "Kowalski".into(),
			nick_name: String::new(),
			birth: None,
			death: None,
			color: "#FFF".into(),
		}
	}

	fn event(year: i32) -> PersonEvent {
		PersonEvent {
			date: EventDate { year, month: 1, day: 1 },
		}
	}

	#[test]
	fn find_person_misses_with_not_found() {
		let dataset = HeritageDataset {
			people: vec![person("p1")],
			unions: vec![],
		};
		assert!(dataset.find_person("p1").is_ok());
		assert_eq!(
			dataset.find_person("p2"),
			Err(GraphError::not_found("person p2"))
		);
	}

	#[test]
	fn find_union_misses_with_not_found() {
		let dataset = HeritageDataset {
			people: vec![],
			unions: vec![UnionRecord {
				id: "u1".into(),
				parent_a: None,
				parent_b: None,
				children: vec![],
			}],
		};
		assert!(dataset.find_union("u1").is_ok());
		assert!(matches!(
			dataset.find_union("u2"),
			Err(GraphError::NotFound(_))
		));
	}

	#[test]
	fn placeholder_detection() {
		assert!(is_placeholder(&PersonRecord::placeholder("x")));
		assert!(!is_placeholder(&person("p1")));
	}

	#[test]
	fn display_name_includes_nickname() {
		let mut p = person("p1");
		assert_eq!(display_name(&p), "Jan");
		p.nick_name = "Janek".into();
		assert_eq!(display_name(&p), "Jan \"Janek\"");
	}

	#[test]
	fn year_range_formats() {
		assert_eq!(year_range(None, None), "");
		assert_eq!(year_range(Some(&event(1920)), None), "1920 - ");
		assert_eq!(
			year_range(Some(&event(1920)), Some(&event(1990))),
			"1920 - 1990"
		);
	}
}
