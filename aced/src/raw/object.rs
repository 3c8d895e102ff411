use std::cell::RefCell;
use std::io::{Read, Write};
use std::rc::Rc;

use serde_json::Value as Json;

use crate::errors::{Error, Result};
use crate::handle::{Handle, RefEntry};
use crate::raw::array::ArrayNode;
use crate::raw::class_desc::{ClassDescriptor, FieldDescriptor};
use crate::raw::{string, Session, Tag, TypeCode, Value};
use crate::structured::projection;
use crate::utilities::{FromByteStream, ToByteStream};

pub type ObjectRef = Rc<RefCell<ObjectNode>>;

/// The serialized data of one class layer: either one value per descriptor
/// field, or the payload produced by the class' custom write method.
#[derive(Debug, Clone)]
pub enum ClassData {
	Fields(Vec<Value>),
	Custom(Value),
}

/// A decoded `TC_OBJECT`: its class-descriptor chain in wire order
/// (most-derived class first), the data for each layer, and the JSON
/// projection computed once the node is complete.
#[derive(Debug, Clone)]
pub struct ObjectNode {
	classes: Vec<ClassDescriptor>,
	serial_version_uid: u64,
	class_data: Vec<ClassData>,
	json: Json,
}

impl ObjectNode {
	pub fn new(serial_version_uid: u64) -> Self {
		Self { classes: Vec::new(), serial_version_uid, class_data: Vec::new(), json: Json::Null }
	}

	pub fn add_class(&mut self, desc: ClassDescriptor, data: ClassData) {
		self.classes.push(desc);
		self.class_data.push(data);
	}

	/// Computes the projection and wraps the node for sharing. Builders
	/// call this once the chain is complete.
	pub fn finish(mut self) -> ObjectRef {
		self.json = projection::object_json(&self);
		Rc::new(RefCell::new(self))
	}

	pub fn classes(&self) -> &[ClassDescriptor] {
		&self.classes
	}

	pub fn serial_version_uid(&self) -> u64 {
		self.serial_version_uid
	}

	pub fn class_data(&self) -> &[ClassData] {
		&self.class_data
	}

	pub fn json(&self) -> &Json {
		&self.json
	}

	/// Reads an object whose leading tag has not been consumed. `TC_NULL`
	/// is a null object; `TC_REFERENCE` aliases a registered node.
	pub(crate) fn read(stream: &mut dyn Read, session: &mut Session) -> Result<Value> {
		match Tag::read(stream)? {
			Tag::Object => Self::read_body(stream, session),
			Tag::Reference => {
				let handle = Handle::read(stream)?;
				Ok(Value::Object(session.table.resolve_object(handle)?.clone()))
			},
			Tag::Null => Ok(Value::Null),
			tag if tag.is_unsupported() => Err(Error::UnsupportedTag(tag as u8)),
			tag => Err(Error::UnexpectedTag {
				expected: "TC_OBJECT, TC_REFERENCE or TC_NULL",
				found: tag as u8 as u32,
			}),
		}
	}

	/// Reads the body of a fresh `TC_OBJECT` record: the descriptor chain
	/// terminated by `TC_NULL` (the registration point), then the data of
	/// every layer, superclass first.
	#[tracing::instrument(skip_all)]
	pub(crate) fn read_body(stream: &mut dyn Read, session: &mut Session) -> Result<Value> {
		let mut classes = Vec::new();
		let node = loop {
			match Tag::read(stream)? {
				Tag::ClassDesc => {
					classes.push(ClassDescriptor::read_body(stream, &mut session.table)?);
				},
				Tag::Reference => {
					let handle = Handle::read(stream)?;
					classes.push(session.table.resolve_class_desc(handle)?.clone());
				},
				Tag::Null => {
					let Some(first) = classes.first() else {
						return Err(Error::UnexpectedTag {
							expected: "at least one class descriptor",
							found: Tag::Null as u8 as u32,
						});
					};
					let node = Rc::new(RefCell::new(ObjectNode {
						serial_version_uid: first.serial_version_uid(),
						class_data: vec![ClassData::Fields(Vec::new()); classes.len()],
						classes,
						json: Json::Null,
					}));
					session.table.register(RefEntry::Object(node.clone()));
					break node;
				},
				tag if tag.is_unsupported() => return Err(Error::UnsupportedTag(tag as u8)),
				tag => {
					return Err(Error::UnexpectedTag {
						expected: "TC_CLASSDESC, TC_REFERENCE or TC_NULL",
						found: tag as u8 as u32,
					})
				},
			}
		};

		// Superclass data comes first on the wire, so the chain is walked
		// from its last descriptor back to the most-derived one.
		let layer_count = node.borrow().classes.len();
		for index in (0..layer_count).rev() {
			let desc = node.borrow().classes[index].clone();
			tracing::debug!(class = desc.class_name(), layer = index, "reading class data");
			let data = match desc.flags().has_custom_writer() {
				true => {
					let read_payload = session.registry.reader(desc.class_name())?;
					ClassData::Custom(read_payload(stream, session)?)
				},
				false => {
					let mut values = Vec::with_capacity(desc.fields().len());
					for field in desc.fields() {
						values.push(read_field_value(stream, session, field)?);
					}
					ClassData::Fields(values)
				},
			};
			node.borrow_mut().class_data[index] = data;
		}

		let json = projection::object_json(&node.borrow());
		node.borrow_mut().json = json;
		Ok(Value::Object(node))
	}

	/// Emits an object, de-duplicating against the handle table by UID and
	/// projection. The node registers after its chain's terminating
	/// `TC_NULL`, mirroring the read side.
	#[tracing::instrument(skip_all)]
	pub(crate) fn write(stream: &mut dyn Write, session: &mut Session, node: &ObjectRef) -> Result<()> {
		let this = node.borrow();
		if let Some(handle) = session.table.find_object(this.serial_version_uid, &this.json) {
			tracing::debug!(position = handle.position(), "object collapses to a back-reference");
			Tag::Reference.write(stream)?;
			return handle.write(stream);
		}

		Tag::Object.write(stream)?;
		for desc in &this.classes {
			desc.write(stream, &mut session.table)?;
		}
		Tag::Null.write(stream)?;
		session.table.register(RefEntry::Object(node.clone()));

		for index in (0..this.classes.len()).rev() {
			let desc = &this.classes[index];
			let data = this.class_data.get(index).ok_or(Error::TypeMismatch {
				expected: "data for every class layer",
				found: "a missing layer",
			})?;
			match (data, desc.flags().has_custom_writer()) {
				(ClassData::Custom(payload), true) => {
					let write_payload = session.registry.writer(desc.class_name())?;
					write_payload(stream, session, payload)?;
				},
				(ClassData::Fields(values), false) => {
					for field_index in desc.sorted_field_order() {
						let field = &desc.fields()[field_index];
						let value = values.get(field_index).ok_or(Error::TypeMismatch {
							expected: "a value for every descriptor field",
							found: "missing field data",
						})?;
						write_field_value(stream, session, field, value)?;
					}
				},
				(data, _) => {
					return Err(Error::TypeMismatch {
						expected: "layer data matching the layer's serialization flag",
						found: match data {
							ClassData::Fields(_) => "field values",
							ClassData::Custom(_) => "a custom payload",
						},
					})
				},
			}
		}
		Ok(())
	}
}

/// Reads one field value as selected by the field's type code.
pub(crate) fn read_field_value(
	stream: &mut dyn Read,
	session: &mut Session,
	field: &FieldDescriptor,
) -> Result<Value> {
	match field.type_code() {
		TypeCode::Array => ArrayNode::read(stream, session),
		TypeCode::Object => match field.is_string_field() {
			true => Ok(string::read_string(stream, &mut session.table)?
				.map_or(Value::Null, Value::String)),
			false => ObjectNode::read(stream, session),
		},
		code => read_primitive(stream, code),
	}
}

pub(crate) fn write_field_value(
	stream: &mut dyn Write,
	session: &mut Session,
	field: &FieldDescriptor,
	value: &Value,
) -> Result<()> {
	match (field.type_code(), value) {
		(TypeCode::Array, Value::Array(node)) => ArrayNode::write(stream, session, node),
		(TypeCode::Array | TypeCode::Object, Value::Null) => Tag::Null.write(stream),
		(TypeCode::Object, Value::String(s)) => string::write_string(stream, &mut session.table, s),
		(TypeCode::Object, Value::Object(node)) => ObjectNode::write(stream, session, node),
		(code, value) => write_primitive(stream, code, value),
	}
}

pub(crate) fn read_primitive(stream: &mut dyn Read, code: TypeCode) -> Result<Value> {
	match code {
		TypeCode::Byte => Ok(Value::Byte(u8::read(stream)?)),
		TypeCode::Boolean => Ok(Value::Bool(u8::read(stream)? == 0x01)),
		TypeCode::Char => Ok(Value::Char(u16::read(stream)?)),
		TypeCode::Short => Ok(Value::Short(u16::read(stream)?)),
		TypeCode::Int => Ok(Value::Int(u32::read(stream)?)),
		TypeCode::Long => Ok(Value::Long(u64::read(stream)?)),
		TypeCode::Float => Ok(Value::Float(f32::from_bits(u32::read(stream)?))),
		TypeCode::Double => Ok(Value::Double(f64::from_bits(u64::read(stream)?))),
		TypeCode::Array | TypeCode::Object => Err(Error::TypeMismatch {
			expected: "a primitive type code",
			found: code.name(),
		}),
	}
}

pub(crate) fn write_primitive(stream: &mut dyn Write, code: TypeCode, value: &Value) -> Result<()> {
	match (code, value) {
		(TypeCode::Byte, Value::Byte(b)) => b.write(stream),
		(TypeCode::Boolean, Value::Bool(b)) => (*b as u8).write(stream),
		(TypeCode::Char, Value::Char(c)) => c.write(stream),
		(TypeCode::Short, Value::Short(s)) => s.write(stream),
		(TypeCode::Int, Value::Int(i)) => i.write(stream),
		(TypeCode::Long, Value::Long(l)) => l.write(stream),
		(TypeCode::Float, Value::Float(f)) => f.to_bits().write(stream),
		(TypeCode::Double, Value::Double(d)) => d.to_bits().write(stream),
		(code, value) => Err(Error::TypeMismatch { expected: code.name(), found: value.kind_name() }),
	}
}
