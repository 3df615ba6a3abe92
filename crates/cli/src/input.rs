use flate2::read::MultiGzDecoder;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("log file {} is empty", path.display())]
    Empty { path: PathBuf },
    #[error("{} looks like gzip but could not be decompressed: {source}", path.display())]
    CorruptGzip { path: PathBuf, source: io::Error },
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decoded log text.
#[derive(Debug)]
pub struct LogText {
    pub text: String,
    pub gzipped: bool,
}

/// Read a log file, gzip or plain. Decompression is tried first; when the
/// bytes are not gzip the file is taken as text. A file with the gzip magic
/// that fails to decompress is an error, not text.
pub fn read_log(path: &Path) -> Result<LogText, InputError> {
    let bytes = std::fs::read(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (raw, gzipped) = match gunzip(&bytes) {
        Ok(decoded) => (decoded, true),
        Err(source) if bytes.starts_with(&GZIP_MAGIC) => {
            return Err(InputError::CorruptGzip {
                path: path.to_path_buf(),
                source,
            });
        }
        Err(e) => {
            debug!("{} is not gzip ({e}), assuming text", path.display());
            (bytes, false)
        }
    };

    let text = match String::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "{} contains invalid UTF-8, replacing bad sequences",
                path.display()
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    if text.is_empty() {
        return Err(InputError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(LogText { text, gzipped })
}

fn gunzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const LOG: &str = "2024-03-09 14:02:07 UTC [1] a,b,c,d LOG:  plan:\n{}\n";

    #[test]
    fn test_plain_text_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postgresql.log");
        std::fs::write(&path, LOG).unwrap();
        let log = read_log(&path).unwrap();
        assert!(!log.gzipped);
        assert_eq!(log.text, LOG);
    }

    #[test]
    fn test_gzip_is_decoded_regardless_of_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postgresql.log");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(LOG.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();
        let log = read_log(&path).unwrap();
        assert!(log.gzipped);
        assert_eq!(log.text, LOG);
    }

    #[test]
    fn test_empty_file_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.log");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(read_log(&path), Err(InputError::Empty { .. })));
    }

    #[test]
    fn test_empty_gzip_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.log.gz");
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();
        assert!(matches!(read_log(&path), Err(InputError::Empty { .. })));
    }

    #[test]
    fn test_truncated_gzip_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postgresql.log.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(LOG.as_bytes()).unwrap();
        let mut bytes = encoder.finish().unwrap();
        bytes.truncate(bytes.len() / 2);
        std::fs::write(&path, &bytes).unwrap();
        let err = read_log(&path).unwrap_err();
        assert!(matches!(err, InputError::CorruptGzip { .. }));
        assert!(err.to_string().contains("could not be decompressed"));
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_log(&dir.path().join("nope.log")).unwrap_err();
        assert!(matches!(err, InputError::Read { .. }));
        assert!(err.to_string().contains("nope.log"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.log");
        std::fs::write(&path, b"caf\xe9 plan:\n").unwrap();
        let log = read_log(&path).unwrap();
        assert!(log.text.starts_with("caf\u{fffd}"));
    }
}
