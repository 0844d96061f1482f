use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, Chain, Cursor, Read};
use std::path::Path;

use crate::config::InputSource;
use crate::error::AggError;

/// Compression detected from the leading bytes of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zstd,
    Plain,
}

impl Compression {
    /// Gzip starts with 1F 8B 08, zstd with 28 B5 2F FD
    fn sniff(head: &[u8]) -> Self {
        if head.len() >= 3 && head[..3] == [0x1F, 0x8B, 0x08] {
            Compression::Gzip
        } else if head.len() >= 4 && head[..4] == [0x28, 0xB5, 0x2F, 0xFD] {
            Compression::Zstd
        } else {
            Compression::Plain
        }
    }
}

/// Wrap `reader` in a gzip or zstd decoder when its magic bytes say so.
pub fn maybe_decompress<R: Read + Send + 'static>(
    mut reader: R,
) -> io::Result<(Compression, Box<dyn Read + Send>)> {
    let mut head = [0u8; 4];
    let n = read_prefix(&mut reader, &mut head)?;

    // Put the read bytes back in front using a cursor chain
    let prefix = Cursor::new(head[..n].to_vec());
    let chained: Chain<Cursor<Vec<u8>>, R> = prefix.chain(reader);

    let compression = Compression::sniff(&head[..n]);
    let stream: Box<dyn Read + Send> = match compression {
        Compression::Gzip => Box::new(MultiGzDecoder::new(chained)),
        Compression::Zstd => Box::new(zstd::Decoder::new(chained)?),
        Compression::Plain => Box::new(chained),
    };
    Ok((compression, stream))
}

/// A short read of the first bytes is not end of stream, so keep filling
fn read_prefix<R: Read>(reader: &mut R, head: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < head.len() {
        match reader.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Open the configured input as a decompressed byte stream
pub fn open_input(source: &InputSource) -> Result<Box<dyn Read + Send>, AggError> {
    let origin = source.display_name();
    let (compression, stream) = match source {
        InputSource::Stdin => maybe_decompress(io::stdin()),
        InputSource::Path(path) => {
            reject_unsupported_archive(path)?;
            let file = File::open(path).map_err(|e| AggError::io(&origin, e))?;
            maybe_decompress(file)
        }
    }
    .map_err(|e| AggError::io(&origin, e))?;

    tracing::debug!(input = %origin, ?compression, "opened input");
    Ok(stream)
}

fn reject_unsupported_archive(path: &Path) -> Result<(), AggError> {
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        if extension.eq_ignore_ascii_case("zip") {
            return Err(AggError::config(format!(
                "ZIP archives are not supported; only gzip and zstd streams are. Extract it first: unzip {}",
                path.display()
            )));
        }
    }
    Ok(())
}
