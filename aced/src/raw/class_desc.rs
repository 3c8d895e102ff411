use std::io::{Read, Write};

use crate::errors::{Error, Result};
use crate::handle::{Handle, HandleTable, RefEntry};
use crate::raw::{string, SerialFlags, Tag, TypeCode};
use crate::utilities::{read_utf, write_utf, FromByteStream, ToByteStream};

/// One field of a class descriptor: a type code, a name, and, for object
/// and array types, the class-name signature of the referenced type.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
	type_code: TypeCode,
	name: String,
	object_class_name: Option<String>,
	owner_flags: SerialFlags,
}

impl FieldDescriptor {
	pub fn new(type_code: TypeCode, name: impl Into<String>) -> Self {
		Self {
			type_code,
			name: name.into(),
			object_class_name: None,
			owner_flags: SerialFlags::SERIALIZABLE,
		}
	}

	pub fn with_class_name(
		type_code: TypeCode,
		name: impl Into<String>,
		object_class_name: impl Into<String>,
	) -> Self {
		Self {
			type_code,
			name: name.into(),
			object_class_name: Some(object_class_name.into()),
			owner_flags: SerialFlags::SERIALIZABLE,
		}
	}

	pub fn type_code(&self) -> TypeCode {
		self.type_code
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn object_class_name(&self) -> Option<&str> {
		self.object_class_name.as_deref()
	}

	/// Field values of `Ljava/lang/String;` type decode through the string
	/// codec rather than the object codec.
	pub(crate) fn is_string_field(&self) -> bool {
		self.object_class_name.as_deref() == Some("Ljava/lang/String;")
	}

	pub(crate) fn read(
		stream: &mut dyn Read,
		table: &mut HandleTable,
		owner_flags: SerialFlags,
	) -> Result<Self> {
		let type_code = TypeCode::try_from(u8::read(stream)?)?;
		let length = u16::read(stream)? as usize;
		let name = read_utf(stream, length)?;
		let object_class_name = match type_code {
			TypeCode::Object | TypeCode::Array => {
				Some(string::read_string(stream, table)?.unwrap_or_default())
			},
			_ => None,
		};
		Ok(Self { type_code, name, object_class_name, owner_flags })
	}

	pub(crate) fn write(&self, stream: &mut dyn Write, table: &mut HandleTable) -> Result<()> {
		(self.type_code as u8).write(stream)?;
		write_utf(stream, &self.name)?;
		match self.type_code {
			TypeCode::Array => {
				let name = self.object_class_name.as_deref().unwrap_or_default();
				string::write_string(stream, table, &array_signature(name))?;
			},
			TypeCode::Object => {
				let name = self.object_class_name.as_deref().unwrap_or_default();
				string::write_string(stream, table, &object_signature(name))?;
			},
			_ => {},
		}
		Ok(())
	}
}

/// `java.lang.String` becomes `Ljava/lang/String;`; already-prefixed
/// signatures pass through untouched.
fn object_signature(name: &str) -> String {
	match name.as_bytes().first() {
		Some(b'L') => name.to_owned(),
		_ => format!("L{};", name.replace('.', "/")),
	}
}

/// Single-character element types become `[B`-style signatures; dotted
/// class names become `[L<slashed>;`.
fn array_signature(name: &str) -> String {
	match name.as_bytes().first() {
		Some(b'[') => name.to_owned(),
		_ if name.len() == 1 => format!("[{}", name),
		_ => format!("[L{};", name.replace('.', "/")),
	}
}

/// The on-wire description of one class: name, serialVersionUID,
/// serialization flag and field layout. A descriptor registers its handle
/// immediately after its UID, before the flag and field list.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
	class_name: String,
	serial_version_uid: u64,
	flags: SerialFlags,
	fields: Vec<FieldDescriptor>,
}

impl ClassDescriptor {
	pub fn new(class_name: impl Into<String>, serial_version_uid: u64, flags: SerialFlags) -> Self {
		Self { class_name: class_name.into(), serial_version_uid, flags, fields: Vec::new() }
	}

	pub fn add_field(&mut self, field: FieldDescriptor) {
		self.fields.push(field);
	}

	pub fn class_name(&self) -> &str {
		&self.class_name
	}

	pub fn serial_version_uid(&self) -> u64 {
		self.serial_version_uid
	}

	pub fn flags(&self) -> SerialFlags {
		self.flags
	}

	pub fn fields(&self) -> &[FieldDescriptor] {
		&self.fields
	}

	/// Parses a descriptor whose leading tag has not been consumed yet.
	/// A `TC_REFERENCE` resolves to a copy of the registered descriptor and
	/// registers nothing itself.
	pub(crate) fn read(stream: &mut dyn Read, table: &mut HandleTable) -> Result<Self> {
		match Tag::read(stream)? {
			Tag::ClassDesc => Self::read_body(stream, table),
			Tag::Reference => {
				let handle = Handle::read(stream)?;
				Ok(table.resolve_class_desc(handle)?.clone())
			},
			tag if tag.is_unsupported() => Err(Error::UnsupportedTag(tag as u8)),
			tag => Err(Error::UnexpectedTag {
				expected: "TC_CLASSDESC or TC_REFERENCE",
				found: tag as u8 as u32,
			}),
		}
	}

	#[tracing::instrument(skip_all)]
	pub(crate) fn read_body(stream: &mut dyn Read, table: &mut HandleTable) -> Result<Self> {
		let length = u16::read(stream)? as usize;
		let class_name = read_utf(stream, length)?;
		let serial_version_uid = u64::read(stream)?;
		tracing::debug!(class = %class_name, uid = serial_version_uid, "reading class descriptor");

		// The handle is assigned here, between the UID and the flag; field
		// strings parsed below must number after it.
		let handle = table.register(RefEntry::ClassDesc(Self {
			class_name: class_name.clone(),
			serial_version_uid,
			flags: SerialFlags::SERIALIZABLE,
			fields: Vec::new(),
		}));

		let flags = SerialFlags::validate(u8::read(stream)?)?;
		let field_count = u16::read(stream)? as usize;
		let mut fields = Vec::with_capacity(field_count);
		for _ in 0..field_count {
			fields.push(FieldDescriptor::read(stream, table, flags)?);
		}
		Tag::expect(stream, Tag::EndBlockData)?;

		if fields.windows(2).any(|pair| pair[0].name > pair[1].name) {
			tracing::warn!(class = %class_name, "descriptor fields are not sorted by name");
		}

		let desc = Self { class_name, serial_version_uid, flags, fields };
		table.attach_class_desc(handle, desc.clone());
		Ok(desc)
	}

	/// Emits the descriptor, de-duplicating by serialVersionUID: a second
	/// descriptor with a registered UID becomes a `TC_REFERENCE`.
	pub(crate) fn write(&self, stream: &mut dyn Write, table: &mut HandleTable) -> Result<()> {
		if let Some(handle) = table.find_class_desc(self.serial_version_uid) {
			Tag::Reference.write(stream)?;
			return handle.write(stream);
		}

		Tag::ClassDesc.write(stream)?;
		// Array class names are type signatures and use the slashed form on
		// the wire; plain class names stay dotted.
		let wire_name = match self.class_name.starts_with('[') {
			true => self.class_name.replace('.', "/"),
			false => self.class_name.clone(),
		};
		write_utf(stream, &wire_name)?;
		self.serial_version_uid.write(stream)?;
		table.register(RefEntry::ClassDesc(self.clone()));
		self.flags.bits().write(stream)?;
		(self.fields.len() as u16).write(stream)?;
		for index in self.sorted_field_order() {
			self.fields[index].write(stream, table)?;
		}
		Tag::EndBlockData.write(stream)
	}

	/// Indices of `fields` in on-wire order. Descriptors are emitted with
	/// their fields sorted by name; class data follows the same order.
	pub(crate) fn sorted_field_order(&self) -> Vec<usize> {
		let mut order: Vec<usize> = (0..self.fields.len()).collect();
		order.sort_by(|&a, &b| self.fields[a].name.cmp(&self.fields[b].name));
		order
	}
}
