use std::fmt::{Debug, Formatter};
use std::io::{Read, Write};

use serde_json::Value as Json;

use crate::errors::{Error, Result};
use crate::raw::array::ArrayRef;
use crate::raw::class_desc::ClassDescriptor;
use crate::raw::object::ObjectRef;
use crate::utilities::{FromByteStream, ToByteStream};

/// Base value added to a table position to form the on-wire handle.
pub const BASE_WIRE_HANDLE: u32 = 0x007E_0000;

/// A 32-bit back-reference to a previously registered stream record.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Handle(u32);

impl Handle {
	pub fn from_position(position: usize) -> Self {
		Self(BASE_WIRE_HANDLE + position as u32)
	}

	pub fn position(&self) -> usize {
		(self.0 - BASE_WIRE_HANDLE) as usize
	}

	pub fn wire_value(&self) -> u32 {
		self.0
	}
}

impl TryFrom<u32> for Handle {
	type Error = Error;
	#[inline]
	fn try_from(value: u32) -> Result<Self> {
		match value >= BASE_WIRE_HANDLE {
			true => Ok(Self(value)),
			false => Err(Error::BadHandle { handle: value, expected: "a value at or above the handle base" }),
		}
	}
}

impl FromByteStream for Handle {
	#[inline]
	fn read(stream: &mut dyn Read) -> Result<Self> {
		Handle::try_from(u32::read(stream)?)
	}
}

impl ToByteStream for Handle {
	#[inline]
	fn write(&self, stream: &mut dyn Write) -> Result<()> {
		self.0.write(stream)
	}
}

impl Debug for Handle {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "Handle({})", self.position())
	}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HandleKind {
	String,
	ClassDesc,
	Object,
	Array,
}

/// One registered back-reference target. Objects and arrays are shared
/// nodes; class descriptors and strings are held by value and resolved by
/// copy.
#[derive(Debug, Clone)]
pub enum RefEntry {
	String(String),
	ClassDesc(ClassDescriptor),
	Object(ObjectRef),
	Array(ArrayRef),
}

impl RefEntry {
	pub fn kind(&self) -> HandleKind {
		match self {
			RefEntry::String(_) => HandleKind::String,
			RefEntry::ClassDesc(_) => HandleKind::ClassDesc,
			RefEntry::Object(_) => HandleKind::Object,
			RefEntry::Array(_) => HandleKind::Array,
		}
	}
}

/// Append-only table of back-reference targets, one per codec session.
/// Positions are assigned in registration order and never reused.
#[derive(Debug, Default)]
pub struct HandleTable {
	entries: Vec<RefEntry>,
}

impl HandleTable {
	pub fn new() -> Self {
		Self { entries: Vec::new() }
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn register(&mut self, entry: RefEntry) -> Handle {
		let handle = Handle::from_position(self.entries.len());
		tracing::debug!(position = handle.position(), kind = ?entry.kind(), "registered handle");
		self.entries.push(entry);
		handle
	}

	pub fn resolve(&self, handle: Handle) -> Result<&RefEntry> {
		self.entries.get(handle.position()).ok_or(Error::BadHandle {
			handle: handle.wire_value(),
			expected: "a registered entry",
		})
	}

	pub fn resolve_string(&self, handle: Handle) -> Result<&str> {
		match self.resolve(handle)? {
			RefEntry::String(value) => Ok(value),
			_ => Err(Error::BadHandle { handle: handle.wire_value(), expected: "a string" }),
		}
	}

	pub fn resolve_class_desc(&self, handle: Handle) -> Result<&ClassDescriptor> {
		match self.resolve(handle)? {
			RefEntry::ClassDesc(desc) => Ok(desc),
			_ => Err(Error::BadHandle { handle: handle.wire_value(), expected: "a class descriptor" }),
		}
	}

	pub fn resolve_object(&self, handle: Handle) -> Result<&ObjectRef> {
		match self.resolve(handle)? {
			RefEntry::Object(node) => Ok(node),
			_ => Err(Error::BadHandle { handle: handle.wire_value(), expected: "an object" }),
		}
	}

	pub fn resolve_array(&self, handle: Handle) -> Result<&ArrayRef> {
		match self.resolve(handle)? {
			RefEntry::Array(node) => Ok(node),
			_ => Err(Error::BadHandle { handle: handle.wire_value(), expected: "an array" }),
		}
	}

	/// A class descriptor claims its position before its fields are parsed,
	/// so the strings read inside the field list number after it. The entry
	/// is completed here once the field list is known.
	pub(crate) fn attach_class_desc(&mut self, handle: Handle, desc: ClassDescriptor) {
		debug_assert!(matches!(self.entries[handle.position()], RefEntry::ClassDesc(_)));
		self.entries[handle.position()] = RefEntry::ClassDesc(desc);
	}

	pub fn find_string(&self, value: &str) -> Option<Handle> {
		self.find(|entry| matches!(entry, RefEntry::String(s) if s == value))
	}

	pub fn find_class_desc(&self, serial_version_uid: u64) -> Option<Handle> {
		self.find(|entry| {
			matches!(entry, RefEntry::ClassDesc(d) if d.serial_version_uid() == serial_version_uid)
		})
	}

	pub fn find_object(&self, serial_version_uid: u64, json: &Json) -> Option<Handle> {
		self.find(|entry| match entry {
			RefEntry::Object(node) => {
				let node = node.borrow();
				node.serial_version_uid() == serial_version_uid && node.json() == json
			},
			_ => false,
		})
	}

	pub fn find_array(&self, serial_version_uid: u64, json: &Json) -> Option<Handle> {
		self.find(|entry| match entry {
			RefEntry::Array(node) => {
				let node = node.borrow();
				node.serial_version_uid() == serial_version_uid && node.json() == json
			},
			_ => false,
		})
	}

	fn find(&self, predicate: impl Fn(&RefEntry) -> bool) -> Option<Handle> {
		self.entries.iter().position(predicate).map(Handle::from_position)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn positions_are_assigned_in_registration_order() {
		let mut table = HandleTable::new();
		let first = table.register(RefEntry::String("a".into()));
		let second = table.register(RefEntry::String("b".into()));
		assert_eq!(first.wire_value(), BASE_WIRE_HANDLE);
		assert_eq!(second.wire_value(), BASE_WIRE_HANDLE + 1);
		assert_eq!(table.len(), 2);
	}

	#[test]
	fn resolution_checks_bounds_and_kind() {
		let mut table = HandleTable::new();
		let handle = table.register(RefEntry::String("x".into()));
		assert_eq!(table.resolve_string(handle).unwrap(), "x");
		assert!(matches!(
			table.resolve_class_desc(handle),
			Err(Error::BadHandle { .. })
		));
		assert!(matches!(
			table.resolve(Handle::from_position(7)),
			Err(Error::BadHandle { .. })
		));
	}

	#[test]
	fn wire_values_below_the_base_are_rejected() {
		assert!(Handle::try_from(0x0000_0001).is_err());
		assert_eq!(Handle::try_from(0x007E_0002).unwrap().position(), 2);
	}

	#[test]
	fn strings_are_found_by_payload() {
		let mut table = HandleTable::new();
		table.register(RefEntry::String("first".into()));
		let second = table.register(RefEntry::String("second".into()));
		assert_eq!(table.find_string("second"), Some(second));
		assert_eq!(table.find_string("missing"), None);
	}
}
