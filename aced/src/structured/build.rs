//! Constructors for the write path: ready-made value trees for the standard
//! arrays and collection classes, plus field helpers for hand-built
//! objects.

use crate::raw::array::ArrayNode;
use crate::raw::class_desc::{ClassDescriptor, FieldDescriptor};
use crate::raw::custom::{MapPayload, HASH_MAP_CLASS, LINKED_HASH_MAP_CLASS};
use crate::raw::object::{ClassData, ObjectNode};
use crate::raw::{
	SerialFlags, TypeCode, Value, SID_BYTE_ARRAY, SID_HASH_MAP, SID_INT_ARRAY,
	SID_LINKED_HASH_MAP, SID_LONG_ARRAY, SID_SHORT_ARRAY, SID_STRING_ARRAY,
};

pub fn new_byte_array(items: &[u8]) -> Value {
	let desc = ClassDescriptor::new("[B", SID_BYTE_ARRAY, SerialFlags::SERIALIZABLE);
	let values = items.iter().map(|&b| Value::Byte(b)).collect();
	Value::Array(ArrayNode::build(desc, values))
}

pub fn new_short_array(items: &[u16]) -> Value {
	let desc = ClassDescriptor::new("[S", SID_SHORT_ARRAY, SerialFlags::SERIALIZABLE);
	let values = items.iter().map(|&s| Value::Short(s)).collect();
	Value::Array(ArrayNode::build(desc, values))
}

pub fn new_int_array(items: &[u32]) -> Value {
	let desc = ClassDescriptor::new("[I", SID_INT_ARRAY, SerialFlags::SERIALIZABLE);
	let values = items.iter().map(|&i| Value::Int(i)).collect();
	Value::Array(ArrayNode::build(desc, values))
}

pub fn new_long_array(items: &[u64]) -> Value {
	let desc = ClassDescriptor::new("[J", SID_LONG_ARRAY, SerialFlags::SERIALIZABLE);
	let values = items.iter().map(|&l| Value::Long(l)).collect();
	Value::Array(ArrayNode::build(desc, values))
}

pub fn new_string_array(items: &[&str]) -> Value {
	let desc =
		ClassDescriptor::new("[Ljava.lang.String;", SID_STRING_ARRAY, SerialFlags::SERIALIZABLE);
	let values = items.iter().map(|&s| Value::String(s.to_owned())).collect();
	Value::Array(ArrayNode::build(desc, values))
}

/// A `java.util.HashMap` with the given entries, in iteration order.
pub fn new_hash_map(entries: Vec<(Value, Value)>) -> Value {
	let mut object = ObjectNode::new(SID_HASH_MAP);
	object.add_class(
		hash_map_class_desc(),
		ClassData::Custom(Value::Map(MapPayload::with_entries(entries))),
	);
	Value::Object(object.finish())
}

/// A `java.util.LinkedHashMap`: the two-descriptor chain of the subclass
/// layer (an `accessOrder` boolean) over the map payload layer.
pub fn new_linked_hash_map(entries: Vec<(Value, Value)>) -> Value {
	let mut subclass = ClassDescriptor::new(
		LINKED_HASH_MAP_CLASS,
		SID_LINKED_HASH_MAP,
		SerialFlags::SERIALIZABLE,
	);
	subclass.add_field(FieldDescriptor::new(TypeCode::Boolean, "accessOrder"));

	let mut object = ObjectNode::new(SID_LINKED_HASH_MAP);
	object.add_class(subclass, ClassData::Fields(vec![Value::Bool(false)]));
	object.add_class(
		hash_map_class_desc(),
		ClassData::Custom(Value::Map(MapPayload::with_entries(entries))),
	);
	Value::Object(object.finish())
}

fn hash_map_class_desc() -> ClassDescriptor {
	let mut desc = ClassDescriptor::new(
		HASH_MAP_CLASS,
		SID_HASH_MAP,
		SerialFlags::SERIALIZABLE | SerialFlags::WRITE_METHOD,
	);
	desc.add_field(FieldDescriptor::new(TypeCode::Float, "loadFactor"));
	desc.add_field(FieldDescriptor::new(TypeCode::Int, "threshold"));
	desc
}

/// A field holding a `java.lang.String` value.
pub fn string_field(name: impl Into<String>) -> FieldDescriptor {
	FieldDescriptor::with_class_name(TypeCode::Object, name, "java.lang.String")
}

/// A field holding a value of the named object class.
pub fn object_field(name: impl Into<String>, class_name: impl Into<String>) -> FieldDescriptor {
	FieldDescriptor::with_class_name(TypeCode::Object, name, class_name)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::structured::projection::project;

	#[test]
	fn built_arrays_project_to_their_elements() {
		assert_eq!(project(&new_byte_array(&[1, 2, 3, 4])), json!([1, 2, 3, 4]));
		assert_eq!(project(&new_string_array(&["a", "b"])), json!(["a", "b"]));
	}

	#[test]
	fn built_maps_project_to_their_entries() {
		let map = new_hash_map(vec![
			(Value::String("a".into()), Value::String("b".into())),
			(Value::String("c".into()), Value::String("d".into())),
		]);
		assert_eq!(project(&map), json!({ "a": "b", "c": "d" }));
	}

	#[test]
	fn linked_maps_keep_their_subclass_layer_out_of_the_projection() {
		let map = new_linked_hash_map(vec![(
			Value::String("k".into()),
			Value::String("v".into()),
		)]);
		let Value::Object(node) = &map else { panic!("expected an object") };
		assert_eq!(node.borrow().classes().len(), 2);
		assert_eq!(project(&map), json!({ "k": "v" }));
	}
}
