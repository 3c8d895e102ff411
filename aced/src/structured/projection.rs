use serde_json::{Map, Value as Json};

use crate::raw::array::ArrayNode;
use crate::raw::custom::{ListPayload, MapPayload};
use crate::raw::object::{ClassData, ObjectNode};
use crate::raw::{
	Value, SID_BOOLEAN, SID_BYTE, SID_CHARACTER, SID_DOUBLE, SID_FLOAT, SID_INTEGER, SID_LONG,
	SID_SHORT,
};

/// Flattens a decoded value to a JSON-shaped tree of native containers and
/// scalars. Objects and arrays return the projection computed when the node
/// was completed.
pub fn project(value: &Value) -> Json {
	match value {
		Value::Null => Json::Null,
		Value::Bool(b) => Json::from(*b),
		Value::Byte(b) => Json::from(*b),
		Value::Short(s) => Json::from(*s),
		Value::Char(c) => Json::String(char_text(*c)),
		Value::Int(i) => Json::from(*i),
		Value::Long(l) => Json::from(*l),
		Value::Float(f) => Json::from(*f),
		Value::Double(d) => Json::from(*d),
		Value::String(s) => Json::String(s.clone()),
		Value::Object(node) => node.borrow().json().clone(),
		Value::Array(node) => node.borrow().json().clone(),
		Value::Map(map) => map_json(map),
		Value::List(list) => list_json(list),
	}
}

fn char_text(c: u16) -> String {
	char::from_u32(c as u32).unwrap_or(char::REPLACEMENT_CHARACTER).to_string()
}

/// Map keys are coerced through their own projection's textual form.
fn key_text(projection: &Json) -> String {
	match projection {
		Json::String(s) => s.clone(),
		other => other.to_string(),
	}
}

pub(crate) fn map_json(map: &MapPayload) -> Json {
	let mut object = Map::new();
	for (key, value) in &map.entries {
		object.insert(key_text(&project(key)), project(value));
	}
	Json::Object(object)
}

pub(crate) fn list_json(list: &ListPayload) -> Json {
	Json::Array(list.elements.iter().map(project).collect())
}

pub(crate) fn array_json(node: &ArrayNode) -> Json {
	Json::Array(node.values().iter().map(project).collect())
}

pub(crate) fn object_json(node: &ObjectNode) -> Json {
	if let Some(unboxed) = boxed_primitive(node) {
		return unboxed;
	}

	// Objects recognized as built-in maps project as bare mappings, with
	// superclass entries first so derived layers win on key collisions.
	let map_layers: Vec<&MapPayload> = node
		.class_data()
		.iter()
		.filter_map(|data| match data {
			ClassData::Custom(Value::Map(map)) => Some(map),
			_ => None,
		})
		.collect();
	if !map_layers.is_empty() {
		let mut object = Map::new();
		for map in map_layers.into_iter().rev() {
			if let Json::Object(entries) = map_json(map) {
				object.extend(entries);
			}
		}
		return Json::Object(object);
	}

	// A lone list layer likewise projects as its element sequence.
	if let [ClassData::Custom(Value::List(list))] = node.class_data() {
		return list_json(list);
	}

	let layer_count = node.classes().len();
	let mut object = Map::new();
	for (index, desc) in node.classes().iter().enumerate() {
		object.insert(
			format!("__class__{}", layer_count - index - 1),
			Json::String(desc.class_name().to_owned()),
		);
		match node.class_data().get(index) {
			Some(ClassData::Fields(values)) => {
				for (field, value) in desc.fields().iter().zip(values) {
					object.insert(field.name().to_owned(), project(value));
				}
			},
			Some(ClassData::Custom(payload)) => {
				tracing::debug!(
					class = desc.class_name(),
					kind = payload.kind_name(),
					"custom layer does not contribute to the object projection"
				);
			},
			None => {},
		}
	}
	Json::Object(object)
}

/// A one-layer object whose class is a primitive wrapper projects to its
/// unboxed `value` field.
fn boxed_primitive(node: &ObjectNode) -> Option<Json> {
	let [desc] = node.classes() else { return None };
	let boxed = matches!(
		desc.serial_version_uid(),
		SID_BYTE | SID_SHORT | SID_INTEGER | SID_LONG | SID_FLOAT | SID_DOUBLE | SID_BOOLEAN
			| SID_CHARACTER
	);
	if !boxed {
		return None;
	}
	let Some(ClassData::Fields(values)) = node.class_data().first() else { return None };
	match desc.fields().iter().position(|field| field.name() == "value") {
		Some(index) => values.get(index).map(project),
		None => {
			tracing::warn!(
				class = desc.class_name(),
				"boxed primitive wrapper without a value field"
			);
			None
		},
	}
}
