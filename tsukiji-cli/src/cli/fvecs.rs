//! Reader for `.fvecs` vector files.
//!
//! Each record is a little-endian `i32` dimension followed by that many
//! little-endian `f32` components. Every record must share the first
//! record's dimension.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

/// Errors raised while decoding an `.fvecs` stream.
#[derive(Debug, Error)]
pub enum FvecsError {
    /// The file could not be opened or read.
    #[error("failed to read `{path}`: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// Reading from the stream failed.
    #[error("failed to read vector {vector}: {source}")]
    Read {
        /// Zero-based record index.
        vector: usize,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The stream ended inside a record.
    #[error("vector {vector} is truncated")]
    Truncated {
        /// Zero-based record index.
        vector: usize,
    },
    /// A record declared a non-positive dimension.
    #[error("vector {vector} declares invalid dimension {dimension}")]
    InvalidDimension {
        /// Zero-based record index.
        vector: usize,
        /// Declared dimension.
        dimension: i32,
    },
    /// A record's dimension differed from the first record's.
    #[error("vector {vector} has dimension {actual}, expected {expected}")]
    InconsistentDimension {
        /// Zero-based record index.
        vector: usize,
        /// Dimension of the first record.
        expected: usize,
        /// Dimension of this record.
        actual: usize,
    },
    /// The stream held no vectors.
    #[error("no vectors found")]
    Empty,
}

/// Reads at most `limit` vectors from `reader`.
///
/// # Errors
/// Returns [`FvecsError`] when the stream is malformed, empty or unreadable.
///
/// # Examples
/// ```
/// use tsukiji_cli::cli::read_fvecs;
///
/// let mut bytes = Vec::new();
/// for vector in [[1.0_f32, 2.0], [3.0, 4.0]] {
///     bytes.extend_from_slice(&2_i32.to_le_bytes());
///     for value in vector {
///         bytes.extend_from_slice(&value.to_le_bytes());
///     }
/// }
/// let vectors = read_fvecs(bytes.as_slice(), 10)?;
/// assert_eq!(vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
/// # Ok::<(), tsukiji_cli::cli::FvecsError>(())
/// ```
pub fn read_fvecs(mut reader: impl Read, limit: usize) -> Result<Vec<Vec<f32>>, FvecsError> {
    let mut vectors: Vec<Vec<f32>> = Vec::new();
    while vectors.len() < limit {
        let index = vectors.len();
        let Some(header) = read_record_header(&mut reader, index)? else {
            break;
        };
        let declared = i32::from_le_bytes(header);
        let dimension = usize::try_from(declared)
            .ok()
            .filter(|&dimension| dimension > 0)
            .ok_or(FvecsError::InvalidDimension {
                vector: index,
                dimension: declared,
            })?;
        if let Some(expected) = vectors.first().map(Vec::len)
            && expected != dimension
        {
            return Err(FvecsError::InconsistentDimension {
                vector: index,
                expected,
                actual: dimension,
            });
        }
        let mut payload = vec![0_u8; dimension * 4];
        reader
            .read_exact(&mut payload)
            .map_err(|source| match source.kind() {
                ErrorKind::UnexpectedEof => FvecsError::Truncated { vector: index },
                _ => FvecsError::Read {
                    vector: index,
                    source,
                },
            })?;
        vectors.push(
            payload
                .chunks_exact(4)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect(),
        );
    }
    if vectors.is_empty() {
        return Err(FvecsError::Empty);
    }
    Ok(vectors)
}

/// Opens `path` and reads at most `limit` vectors from it.
///
/// # Errors
/// Returns [`FvecsError::Io`] when the file cannot be opened, otherwise as
/// for [`read_fvecs`].
#[instrument(level = "debug", err)]
pub fn read_fvecs_path(path: &Path, limit: usize) -> Result<Vec<Vec<f32>>, FvecsError> {
    let file = File::open(path).map_err(|source| FvecsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let vectors = read_fvecs(BufReader::new(file), limit)?;
    debug!(
        count = vectors.len(),
        dimension = vectors.first().map_or(0, Vec::len),
        "fvecs loaded"
    );
    Ok(vectors)
}

/// Reads the four-byte dimension header, or `None` at a clean end of stream.
fn read_record_header(
    reader: &mut impl Read,
    vector: usize,
) -> Result<Option<[u8; 4]>, FvecsError> {
    let mut header = [0_u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(source) => return Err(FvecsError::Read { vector, source }),
        }
    }
    match filled {
        0 => Ok(None),
        4 => Ok(Some(header)),
        _ => Err(FvecsError::Truncated { vector }),
    }
}
