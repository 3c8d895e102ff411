use std::io::{ErrorKind, Read, Write};
use std::mem::size_of;

use crate::errors::{Error, Result};

/// Reads `buffer.len()` bytes or fails; the format has no partial records.
#[inline]
pub(crate) fn fill(stream: &mut dyn Read, buffer: &mut [u8]) -> Result<()> {
	stream.read_exact(buffer).map_err(|e| match e.kind() {
		ErrorKind::UnexpectedEof => Error::ShortRead { expected: buffer.len() },
		_ => Error::Io(e),
	})
}

#[inline]
pub(crate) fn read_exact_bytes(stream: &mut dyn Read, count: usize) -> Result<Vec<u8>> {
	let mut bytes = vec![0; count];
	fill(stream, &mut bytes)?;
	Ok(bytes)
}

/// Length-prefixed strings carry their length out of band; the caller
/// supplies it. The payload must be valid UTF-8.
pub(crate) fn read_utf(stream: &mut dyn Read, length: usize) -> Result<String> {
	let bytes = read_exact_bytes(stream, length)?;
	String::from_utf8(bytes).map_err(|_| Error::Io(ErrorKind::InvalidData.into()))
}

pub(crate) fn write_utf(stream: &mut dyn Write, value: &str) -> Result<()> {
	if value.len() > u16::MAX as usize {
		return Err(Error::Io(ErrorKind::InvalidData.into()));
	}
	(value.len() as u16).write(stream)?;
	stream.write_all(value.as_bytes())?;
	Ok(())
}

pub trait FromByteStream where Self: Sized {
	fn read(stream: &mut dyn Read) -> Result<Self>;
}

pub trait ToByteStream {
	fn write(&self, stream: &mut dyn Write) -> Result<()>;
}

impl FromByteStream for u8 {
	#[inline]
	fn read(stream: &mut dyn Read) -> Result<Self> {
		let mut byte = 0u8;
		fill(stream, std::slice::from_mut(&mut byte))?;
		Ok(byte)
	}
}

impl ToByteStream for u8 {
	#[inline]
	fn write(&self, stream: &mut dyn Write) -> Result<()> {
		stream.write_all(std::slice::from_ref(self))?;
		Ok(())
	}
}

// The wire format is big-endian throughout (network byte order).
macro_rules! impl_be_byte_stream {
    ($($ty: ty),*) => {$(
		impl FromByteStream for $ty {
			#[inline]
			fn read(stream: &mut dyn Read) -> Result<Self> {
				let mut bytes = [0u8; size_of::<Self>()];
				fill(stream, &mut bytes)?;
				Ok(Self::from_be_bytes(bytes))
			}
		}

		impl ToByteStream for $ty {
			#[inline]
			fn write(&self, stream: &mut dyn Write) -> Result<()> {
				stream.write_all(&self.to_be_bytes())?;
				Ok(())
			}
		}
	)*};
}

impl_be_byte_stream!(u16, u32, u64);
