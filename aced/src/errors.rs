use std::fmt::{Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	Io(std::io::Error),
	ShortRead { expected: usize },
	UnexpectedTag { expected: &'static str, found: u32 },
	UnsupportedTag(u8),
	UnsupportedFlag(u8),
	BadHandle { handle: u32, expected: &'static str },
	TypeMismatch { expected: &'static str, found: &'static str },
	UnsupportedCustomClass(String),
}

impl From<std::io::Error> for Error {
	fn from(value: std::io::Error) -> Self {
		Self::Io(value)
	}
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::Io(err) => write!(f, "io error: {}", err),
			Error::ShortRead { expected } => {
				write!(f, "stream ended before {} expected bytes", expected)
			},
			Error::UnexpectedTag { expected, found } => {
				write!(f, "expected {}, but got 0x{:02X}", expected, found)
			},
			Error::UnsupportedTag(tag) => {
				write!(f, "tag 0x{:02X} is recognized but not supported", tag)
			},
			Error::UnsupportedFlag(flag) => {
				write!(f, "cannot handle serialization flag 0x{:02X}", flag)
			},
			Error::BadHandle { handle, expected } => {
				write!(f, "reference 0x{:08X} does not resolve to {}", handle, expected)
			},
			Error::TypeMismatch { expected, found } => {
				write!(f, "expected {}, but got {}", expected, found)
			},
			Error::UnsupportedCustomClass(name) => {
				write!(f, "no custom-writer strategy for class [{}]", name)
			},
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Io(err) => Some(err),
			_ => None,
		}
	}
}
