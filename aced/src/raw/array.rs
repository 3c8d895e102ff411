use std::cell::RefCell;
use std::io::{Read, Write};
use std::rc::Rc;

use serde_json::Value as Json;

use crate::errors::{Error, Result};
use crate::handle::{Handle, RefEntry};
use crate::raw::class_desc::ClassDescriptor;
use crate::raw::object::{read_primitive, write_primitive, ObjectNode};
use crate::raw::{string, Session, Tag, TypeCode, Value};
use crate::structured::projection;
use crate::utilities::{FromByteStream, ToByteStream};

pub type ArrayRef = Rc<RefCell<ArrayNode>>;

/// A decoded `TC_ARRAY`: exactly one class descriptor, the element values
/// typed by the descriptor's signature, and the JSON projection computed
/// once the node is complete.
#[derive(Debug, Clone)]
pub struct ArrayNode {
	class_desc: ClassDescriptor,
	serial_version_uid: u64,
	values: Vec<Value>,
	json: Json,
}

/// Element type derived from the second byte of an array class name.
enum ElementType {
	Primitive(TypeCode),
	String,
	Object,
	Array,
}

impl ArrayNode {
	pub fn build(class_desc: ClassDescriptor, values: Vec<Value>) -> ArrayRef {
		let serial_version_uid = class_desc.serial_version_uid();
		let mut node = Self { class_desc, serial_version_uid, values, json: Json::Null };
		node.json = projection::array_json(&node);
		Rc::new(RefCell::new(node))
	}

	pub fn class_desc(&self) -> &ClassDescriptor {
		&self.class_desc
	}

	pub fn serial_version_uid(&self) -> u64 {
		self.serial_version_uid
	}

	pub fn values(&self) -> &[Value] {
		&self.values
	}

	pub fn json(&self) -> &Json {
		&self.json
	}

	/// Reads an array whose leading tag has not been consumed.
	pub(crate) fn read(stream: &mut dyn Read, session: &mut Session) -> Result<Value> {
		match Tag::read(stream)? {
			Tag::Array => Self::read_body(stream, session),
			Tag::Reference => {
				let handle = Handle::read(stream)?;
				Ok(Value::Array(session.table.resolve_array(handle)?.clone()))
			},
			Tag::Null => Ok(Value::Null),
			tag if tag.is_unsupported() => Err(Error::UnsupportedTag(tag as u8)),
			tag => Err(Error::UnexpectedTag {
				expected: "TC_ARRAY, TC_REFERENCE or TC_NULL",
				found: tag as u8 as u32,
			}),
		}
	}

	/// Reads the body of a fresh `TC_ARRAY` record: one class descriptor,
	/// the registration point, `TC_NULL`, the element count, then the
	/// typed element payload.
	#[tracing::instrument(skip_all)]
	pub(crate) fn read_body(stream: &mut dyn Read, session: &mut Session) -> Result<Value> {
		let class_desc = ClassDescriptor::read(stream, &mut session.table)?;
		let serial_version_uid = class_desc.serial_version_uid();
		let element = element_type(&class_desc)?;
		let node = Rc::new(RefCell::new(ArrayNode {
			class_desc,
			serial_version_uid,
			values: Vec::new(),
			json: Json::Null,
		}));
		session.table.register(RefEntry::Array(node.clone()));

		Tag::expect(stream, Tag::Null)?;
		let count = u32::read(stream)? as usize;
		tracing::debug!(class = node.borrow().class_desc.class_name(), count, "reading array");

		// The count is attacker-controlled; cap the pre-allocation.
		let mut values = Vec::with_capacity(count.min(1 << 16));
		for _ in 0..count {
			values.push(read_element(stream, session, &element)?);
		}
		node.borrow_mut().values = values;

		let json = projection::array_json(&node.borrow());
		node.borrow_mut().json = json;
		Ok(Value::Array(node))
	}

	/// Emits an array, de-duplicating against the handle table by UID and
	/// projection.
	#[tracing::instrument(skip_all)]
	pub(crate) fn write(stream: &mut dyn Write, session: &mut Session, node: &ArrayRef) -> Result<()> {
		let this = node.borrow();
		if let Some(handle) = session.table.find_array(this.serial_version_uid, &this.json) {
			tracing::debug!(position = handle.position(), "array collapses to a back-reference");
			Tag::Reference.write(stream)?;
			return handle.write(stream);
		}

		Tag::Array.write(stream)?;
		this.class_desc.write(stream, &mut session.table)?;
		Tag::Null.write(stream)?;
		session.table.register(RefEntry::Array(node.clone()));

		(this.values.len() as u32).write(stream)?;
		let element = element_type(&this.class_desc)?;
		for value in &this.values {
			write_element(stream, session, &element, value)?;
		}
		Ok(())
	}
}

fn element_type(desc: &ClassDescriptor) -> Result<ElementType> {
	let name = desc.class_name();
	if !name.starts_with('[') {
		return Err(Error::TypeMismatch {
			expected: "an array class name",
			found: "a class name without the [ prefix",
		});
	}
	match name.as_bytes().get(1) {
		Some(b'[') => Ok(ElementType::Array),
		Some(b'L') => {
			let inner = &name[2..];
			let inner = inner.strip_suffix(';').unwrap_or(inner);
			// The element class may be spelled dotted or slashed.
			match inner.replace('/', ".") == "java.lang.String" {
				true => Ok(ElementType::String),
				false => Ok(ElementType::Object),
			}
		},
		Some(&code) => {
			let code = TypeCode::try_from(code)?;
			match code.is_primitive() {
				true => Ok(ElementType::Primitive(code)),
				false => Err(Error::TypeMismatch {
					expected: "a primitive element signature",
					found: code.name(),
				}),
			}
		},
		None => Err(Error::TypeMismatch {
			expected: "an array class name with an element signature",
			found: "a bare [",
		}),
	}
}

fn read_element(stream: &mut dyn Read, session: &mut Session, element: &ElementType) -> Result<Value> {
	match element {
		ElementType::Primitive(code) => read_primitive(stream, *code),
		ElementType::String => Ok(string::read_string(stream, &mut session.table)?
			.map_or(Value::Null, Value::String)),
		ElementType::Object => ObjectNode::read(stream, session),
		ElementType::Array => ArrayNode::read(stream, session),
	}
}

fn write_element(
	stream: &mut dyn Write,
	session: &mut Session,
	element: &ElementType,
	value: &Value,
) -> Result<()> {
	match (element, value) {
		(ElementType::Primitive(code), value) => write_primitive(stream, *code, value),
		(_, Value::Null) => Tag::Null.write(stream),
		(ElementType::String, Value::String(s)) => {
			string::write_string(stream, &mut session.table, s)
		},
		(ElementType::Object, Value::Object(node)) => ObjectNode::write(stream, session, node),
		(ElementType::Array, Value::Array(node)) => ArrayNode::write(stream, session, node),
		(_, value) => Err(Error::TypeMismatch {
			expected: "an element matching the array signature",
			found: value.kind_name(),
		}),
	}
}
