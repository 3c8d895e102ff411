use std::io::{Read, Write};

use bitflags::bitflags;

use crate::errors::{Error, Result};
use crate::handle::HandleTable;
use crate::raw::array::{ArrayNode, ArrayRef};
use crate::raw::custom::{CustomRegistry, ListPayload, MapPayload};
use crate::raw::object::{ObjectNode, ObjectRef};

pub use crate::utilities::{FromByteStream, ToByteStream};

pub mod array;
pub mod class_desc;
pub mod custom;
pub mod object;
pub mod string;

pub const STREAM_MAGIC: u16 = 0xACED;
pub const STREAM_VERSION: u16 = 0x0005;

macro_rules! define_stream_tag {
    ($($id: ident = $discriminant: literal),*) => {
		#[repr(u8)]
		#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
		pub enum Tag {
			$($id = $discriminant),*
		}

		impl TryFrom<u8> for Tag {
			type Error = Error;
			#[inline]
			fn try_from(value: u8) -> Result<Self> {
				match value {
					$($discriminant => Ok(Tag::$id),)*
					_ => Err(Error::UnexpectedTag { expected: "a stream tag", found: value as u32 }),
				}
			}
		}
	};
}

define_stream_tag! {
	Null = 0x70,
	Reference = 0x71,
	ClassDesc = 0x72,
	Object = 0x73,
	String = 0x74,
	Array = 0x75,
	Class = 0x76,
	BlockData = 0x77,
	EndBlockData = 0x78,
	Reset = 0x79,
	BlockDataLong = 0x7A,
	Exception = 0x7B
}

impl Tag {
	pub fn read(stream: &mut dyn Read) -> Result<Self> {
		Tag::try_from(u8::read(stream)?)
	}

	pub fn write(&self, stream: &mut dyn Write) -> Result<()> {
		(*self as u8).write(stream)
	}

	/// Recognized by the grammar but not handled by this codec.
	pub fn is_unsupported(self) -> bool {
		matches!(self, Tag::Class | Tag::Reset | Tag::BlockDataLong | Tag::Exception)
	}

	pub(crate) fn expect(stream: &mut dyn Read, expected: Tag) -> Result<()> {
		let found = u8::read(stream)?;
		match found == expected as u8 {
			true => Ok(()),
			false => Err(Error::UnexpectedTag { expected: expected.name(), found: found as u32 }),
		}
	}

	pub(crate) fn name(self) -> &'static str {
		match self {
			Tag::Null => "TC_NULL",
			Tag::Reference => "TC_REFERENCE",
			Tag::ClassDesc => "TC_CLASSDESC",
			Tag::Object => "TC_OBJECT",
			Tag::String => "TC_STRING",
			Tag::Array => "TC_ARRAY",
			Tag::Class => "TC_CLASS",
			Tag::BlockData => "TC_BLOCKDATA",
			Tag::EndBlockData => "TC_ENDBLOCKDATA",
			Tag::Reset => "TC_RESET",
			Tag::BlockDataLong => "TC_BLOCKDATALONG",
			Tag::Exception => "TC_EXCEPTION",
		}
	}
}

bitflags! {
	/// Class-descriptor serialization flags. Only field-by-field
	/// serialization (`SERIALIZABLE`) and the custom write/read method
	/// encoding (`SERIALIZABLE | WRITE_METHOD`) are accepted.
	#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
	pub struct SerialFlags: u8 {
		const WRITE_METHOD = 0x01;
		const SERIALIZABLE = 0x02;
		const EXTERNALIZABLE = 0x04;
		const BLOCK_DATA = 0x08;
	}
}

impl SerialFlags {
	pub fn validate(value: u8) -> Result<Self> {
		match value {
			0x02 | 0x03 => Ok(Self::from_bits_truncate(value)),
			_ => Err(Error::UnsupportedFlag(value)),
		}
	}

	pub fn has_custom_writer(&self) -> bool {
		self.contains(Self::WRITE_METHOD)
	}
}

/// Field type codes as they appear inside class descriptors.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TypeCode {
	Byte = b'B',
	Char = b'C',
	Double = b'D',
	Float = b'F',
	Int = b'I',
	Long = b'J',
	Short = b'S',
	Boolean = b'Z',
	Array = b'[',
	Object = b'L',
}

impl TryFrom<u8> for TypeCode {
	type Error = Error;
	fn try_from(value: u8) -> Result<Self> {
		match value {
			b'B' => Ok(TypeCode::Byte),
			b'C' => Ok(TypeCode::Char),
			b'D' => Ok(TypeCode::Double),
			b'F' => Ok(TypeCode::Float),
			b'I' => Ok(TypeCode::Int),
			b'J' => Ok(TypeCode::Long),
			b'S' => Ok(TypeCode::Short),
			b'Z' => Ok(TypeCode::Boolean),
			b'[' => Ok(TypeCode::Array),
			b'L' => Ok(TypeCode::Object),
			_ => Err(Error::UnexpectedTag { expected: "a field type code", found: value as u32 }),
		}
	}
}

impl TypeCode {
	pub fn is_primitive(&self) -> bool {
		!matches!(self, TypeCode::Array | TypeCode::Object)
	}

	pub(crate) fn name(self) -> &'static str {
		match self {
			TypeCode::Byte => "a byte",
			TypeCode::Char => "a char",
			TypeCode::Double => "a double",
			TypeCode::Float => "a float",
			TypeCode::Int => "an int",
			TypeCode::Long => "a long",
			TypeCode::Short => "a short",
			TypeCode::Boolean => "a boolean",
			TypeCode::Array => "an array",
			TypeCode::Object => "an object",
		}
	}
}

// Well-known serialVersionUIDs, used to synthesize standard array
// descriptors and to unbox the primitive wrapper classes on projection.
pub const SID_BYTE_ARRAY: u64 = 0xACF3_17F8_0608_54E0;
pub const SID_SHORT_ARRAY: u64 = 0xEF83_2E06_E55D_B0FA;
pub const SID_INT_ARRAY: u64 = 0x4DBA_6026_76EA_B2A5;
pub const SID_LONG_ARRAY: u64 = 0x7820_04B5_12B1_7593;
pub const SID_STRING_ARRAY: u64 = 0xADD2_56E7_E91D_7B47;
pub const SID_BYTE: u64 = 0x9C4E_6084_EE50_F51C;
pub const SID_SHORT: u64 = 7515723908773894738;
pub const SID_INTEGER: u64 = 1360826667806852920;
pub const SID_LONG: u64 = 4290774380558885855;
pub const SID_FLOAT: u64 = 0xDAED_C9A2_DB3C_F0EC;
pub const SID_DOUBLE: u64 = 0x80B3_C24A_296B_FB04;
pub const SID_BOOLEAN: u64 = 0xCD20_7280_D59C_FAEE;
pub const SID_CHARACTER: u64 = 3786198910865385080;
pub const SID_HASH_MAP: u64 = 362498820763181265;
pub const SID_LINKED_HASH_MAP: u64 = 3801124242820219131;

/// One decoded (or to-be-encoded) value. Field values, array elements and
/// custom payloads are all drawn from this closed set.
#[derive(Debug, Clone)]
pub enum Value {
	Null,
	Bool(bool),
	Byte(u8),
	Short(u16),
	Char(u16),
	Int(u32),
	Long(u64),
	Float(f32),
	Double(f64),
	String(String),
	Object(ObjectRef),
	Array(ArrayRef),
	Map(MapPayload),
	List(ListPayload),
}

impl Value {
	pub(crate) fn kind_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "a boolean",
			Value::Byte(_) => "a byte",
			Value::Short(_) => "a short",
			Value::Char(_) => "a char",
			Value::Int(_) => "an int",
			Value::Long(_) => "a long",
			Value::Float(_) => "a float",
			Value::Double(_) => "a double",
			Value::String(_) => "a string",
			Value::Object(_) => "an object",
			Value::Array(_) => "an array",
			Value::Map(_) => "a map payload",
			Value::List(_) => "a list payload",
		}
	}
}

/// State of one top-level deserialize or serialize call: the handle table,
/// created empty and discarded at the end, plus the custom-writer registry
/// the session was constructed with.
pub struct Session<'l> {
	pub(crate) table: HandleTable,
	pub(crate) registry: &'l CustomRegistry,
}

impl<'l> Session<'l> {
	pub fn new(registry: &'l CustomRegistry) -> Self {
		Self { table: HandleTable::new(), registry }
	}

	pub fn table(&self) -> &HandleTable {
		&self.table
	}

	pub fn table_mut(&mut self) -> &mut HandleTable {
		&mut self.table
	}
}

/// Reads one serialized entity from `stream` using the built-in
/// custom-writer strategies.
pub fn deserialize_stream(stream: &mut impl Read) -> Result<Value> {
	let registry = CustomRegistry::with_builtins();
	deserialize_stream_with(stream, &registry)
}

pub fn deserialize_stream_with(stream: &mut impl Read, registry: &CustomRegistry) -> Result<Value> {
	let stream: &mut dyn Read = stream;
	let mut session = Session::new(registry);
	read_stream(stream, &mut session)
}

/// Writes one entity to `stream` using the built-in custom-writer
/// strategies. On error the stream contents are undefined and the caller
/// must not reuse it.
pub fn serialize_entity(stream: &mut impl Write, value: &Value) -> Result<()> {
	let registry = CustomRegistry::with_builtins();
	serialize_entity_with(stream, value, &registry)
}

pub fn serialize_entity_with(
	stream: &mut impl Write,
	value: &Value,
	registry: &CustomRegistry,
) -> Result<()> {
	let stream: &mut dyn Write = stream;
	let mut session = Session::new(registry);
	write_stream(stream, &mut session, value)
}

#[tracing::instrument(skip_all)]
pub(crate) fn read_stream(stream: &mut dyn Read, session: &mut Session) -> Result<Value> {
	let magic = u16::read(stream)?;
	if magic != STREAM_MAGIC {
		return Err(Error::UnexpectedTag { expected: "STREAM_MAGIC", found: magic as u32 });
	}
	let version = u16::read(stream)?;
	if version != STREAM_VERSION {
		return Err(Error::UnexpectedTag { expected: "STREAM_VERSION", found: version as u32 });
	}

	match Tag::read(stream)? {
		Tag::String => Ok(Value::String(string::read_string_body(stream, &mut session.table)?)),
		Tag::Object => ObjectNode::read_body(stream, session),
		Tag::Array => ArrayNode::read_body(stream, session),
		Tag::Null => {
			tracing::warn!("stream body begins with TC_NULL");
			Ok(Value::Null)
		},
		tag if tag.is_unsupported() => Err(Error::UnsupportedTag(tag as u8)),
		tag => Err(Error::UnexpectedTag {
			expected: "TC_OBJECT, TC_ARRAY or TC_STRING",
			found: tag as u8 as u32,
		}),
	}
}

#[tracing::instrument(skip_all)]
pub(crate) fn write_stream(stream: &mut dyn Write, session: &mut Session, value: &Value) -> Result<()> {
	STREAM_MAGIC.write(stream)?;
	STREAM_VERSION.write(stream)?;

	match value {
		Value::String(s) => string::write_string(stream, &mut session.table, s),
		Value::Object(node) => ObjectNode::write(stream, session, node),
		Value::Array(node) => ArrayNode::write(stream, session, node),
		Value::Null => Tag::Null.write(stream),
		other => Err(Error::TypeMismatch {
			expected: "a top-level object, array or string",
			found: other.kind_name(),
		}),
	}
}
