//! Parse a small CSV document and a chunked binary file, printing what was read.
//!
//! Run with `RUST_LOG=debug` to watch frames open and close.

use frame_reader::bound::{Bound, EscapedDelimited, Token};
use frame_reader::types::{FixedLabel, RawBytes};
use frame_reader::{Configuration, Element, Notification, Reader};

#[derive(Debug, Default, Element)]
struct Row {
    #[frame(delimited(terminator = b"\n", divider = b',', escape = b'"'))]
    cells: Vec<String>,
}

#[derive(Debug, Default, Element)]
struct Document {
    #[frame(repeat)]
    rows: Vec<Row>,
}

#[derive(Debug, Default, Element)]
struct Chunk {
    magic: FixedLabel<4>,
    #[frame(transient)]
    size: u32,
    #[frame(size_by = Self::SIZE)]
    body: RawBytes,
}

#[derive(Debug, Default, Element)]
#[frame(size = 6)]
struct Version {
    number: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Cells keep doubled quotes as written; only the wrapping quotes go
    let csv = b"name,comment\nstar,\"bright, far\"\nend,\"said \"\"bye\"\"\"\n";
    let config = Configuration::default();
    let document: Document = frame_reader::parse(csv, &config, None)?;
    for row in &document.rows {
        println!("{:?}", row.cells);
    }

    // A token factory can collapse them instead
    let unescaping: EscapedDelimited<String> = EscapedDelimited::with_factory(
        *b"\n",
        b',',
        b'"',
        Box::new(|_reader: &mut Reader<'_>, _symbol: &'static str, token: Token<'_>| {
            Ok(token.text())
        }),
    );
    let mut reader = Reader::new(b"end,\"said \"\"bye\"\"\"\n", &config);
    println!("{:?}", unescaping.read(&mut reader, "row")?);

    let mut data = Vec::new();
    data.extend_from_slice(b"MVER");
    data.extend_from_slice(&4u32.to_le_bytes());
    data.extend_from_slice(&18u32.to_le_bytes());
    let chunk: Chunk = frame_reader::parse(&data, &config, None)?;
    println!("{} carries {:?}", chunk.magic, chunk.body);

    // A six byte frame holding a four byte value closes short
    let lenient = Configuration::default().ignore_recoverable_errors(true);
    let mut report = |notification: &Notification| println!("warning: {notification}");
    let version: Version =
        frame_reader::parse(&[18, 0, 0, 0, 0, 0], &lenient, Some(&mut report))?;
    println!("version {}", version.number);

    Ok(())
}
