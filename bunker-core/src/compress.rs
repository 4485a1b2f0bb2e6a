use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::{fs::File, io, path::Path};

/// Streams `source` through a gzip encoder into `dest`.
pub fn compress_file(source: &Path, dest: &Path) -> io::Result<()> {
    let mut input = File::open(source)?;
    let output = File::create(dest)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}

/// Streams `source` through a gzip decoder into `dest`. The output is byte
/// identical to the file that was originally compressed.
pub fn decompress_file(source: &Path, dest: &Path) -> io::Result<()> {
    let input = File::open(source)?;
    let mut decoder = GzDecoder::new(input);
    let mut output = File::create(dest)?;
    io::copy(&mut decoder, &mut output)?;
    Ok(())
}
