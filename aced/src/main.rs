use std::io::Cursor;

use aced::raw::deserialize_stream;
use aced::structured::projection::project;

fn main() {
	let path = std::env::args().nth(1).expect("usage: aced <serialized stream file>");
	let bytes = std::fs::read(&path).unwrap();
	let mut cursor = Cursor::new(bytes.as_slice());
	let value = deserialize_stream(&mut cursor).unwrap();
	println!("{}", serde_json::to_string_pretty(&project(&value)).unwrap());
}
