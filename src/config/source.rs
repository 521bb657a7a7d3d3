//! Locating, fetching and format detection for description documents.

use crate::error::{Result, SeedError};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serialization format of a description document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    /// Detects the format from the extension of a path or URL.
    pub fn detect(name: &str) -> Result<Self> {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or_default();
        Self::from_extension(ext)
    }

    /// Parses an extension or format name (`yml`, `yaml`, `toml`, `json`).
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "yml" | "yaml" => Ok(Format::Yaml),
            "toml" => Ok(Format::Toml),
            "json" => Ok(Format::Json),
            other => Err(SeedError::UnsupportedFormat(other.to_string())),
        }
    }

    /// The file extension written for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Yaml => "yml",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Yaml => "yaml",
            Format::Toml => "toml",
            Format::Json => "json",
        };
        f.write_str(name)
    }
}

/// Where a description document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionSource {
    File(PathBuf),
    Url(String),
}

impl DescriptionSource {
    /// Interprets a command-line location: `http://` and `https://` are URLs,
    /// anything else is a local path.
    pub fn from_arg(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            DescriptionSource::Url(location.to_string())
        } else {
            DescriptionSource::File(PathBuf::from(location))
        }
    }

    /// Detects the document format from the location's extension.
    pub fn format(&self) -> Result<Format> {
        match self {
            DescriptionSource::File(path) => Format::detect(&path.to_string_lossy()),
            DescriptionSource::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                Format::detect(path)
            }
        }
    }

    /// Absolute path of a local description, used to keep it out of the walk.
    pub fn local_path(&self) -> Option<PathBuf> {
        match self {
            DescriptionSource::File(path) => Some(absolute(path)),
            DescriptionSource::Url(_) => None,
        }
    }

    /// Reads the raw document bytes.
    pub fn read(&self) -> Result<Vec<u8>> {
        match self {
            DescriptionSource::File(path) => {
                debug!(path = %path.display(), "reading description file");
                std::fs::read(path).map_err(|e| SeedError::io(path, e))
            }
            DescriptionSource::Url(url) => fetch(url),
        }
    }
}

impl fmt::Display for DescriptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptionSource::File(path) => write!(f, "{}", path.display()),
            DescriptionSource::Url(url) => f.write_str(url),
        }
    }
}

fn fetch(url: &str) -> Result<Vec<u8>> {
    let fetch_err = |message: String| SeedError::Fetch {
        url: url.to_string(),
        message,
    };

    debug!(url, "fetching description");
    let mut response = reqwest::blocking::get(url).map_err(|e| fetch_err(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(fetch_err(format!("HTTP {status}")));
    }

    let mut body = Vec::new();
    response
        .read_to_end(&mut body)
        .map_err(|e| fetch_err(e.to_string()))?;
    Ok(body)
}

/// Makes a path absolute without touching the file system beyond the
/// current directory lookup; canonicalizes when the path exists.
pub fn absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_format() {
        assert_eq!(Format::detect("tdf.yml").unwrap(), Format::Yaml);
        assert_eq!(Format::detect("dir/TDF.YAML").unwrap(), Format::Yaml);
        assert_eq!(Format::detect("tdf.toml").unwrap(), Format::Toml);
        assert_eq!(Format::detect("tdf.json").unwrap(), Format::Json);
        assert!(matches!(
            Format::detect("tdf.ini"),
            Err(SeedError::UnsupportedFormat(ext)) if ext == "ini"
        ));
        assert!(Format::detect("tdf").is_err());
    }

    #[test]
    fn test_source_from_arg() {
        assert_eq!(
            DescriptionSource::from_arg("https://example.com/tdf.yml"),
            DescriptionSource::Url("https://example.com/tdf.yml".into())
        );
        assert_eq!(
            DescriptionSource::from_arg("./tdf.yml"),
            DescriptionSource::File(PathBuf::from("./tdf.yml"))
        );
    }

    #[test]
    fn test_url_format_ignores_query() {
        let source = DescriptionSource::from_arg("https://example.com/tdf.toml?raw=true");
        assert_eq!(source.format().unwrap(), Format::Toml);
    }

    #[test]
    fn test_local_path_is_absolute() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("tdf.yml");
        std::fs::write(&file, "[]").unwrap();

        let source = DescriptionSource::File(file.clone());
        let local = source.local_path().unwrap();

        assert!(local.is_absolute());
        assert_eq!(local, file.canonicalize().unwrap());
        assert_eq!(source.read().unwrap(), b"[]");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let source = DescriptionSource::File(PathBuf::from("/nonexistent/tdf.yml"));
        let err = source.read().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tdf.yml"));
    }
}
