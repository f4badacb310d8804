use std::{fmt::Display, path::PathBuf, str::FromStr};

use crate::error::SourceError;

/// URL scheme of an object-store location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    S3,
    Gcs,
}

impl Scheme {
    pub fn prefix(&self) -> &'static str {
        match self {
            Scheme::S3 => "s3://",
            Scheme::Gcs => "gs://",
        }
    }
}

/// `scheme://bucket/key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub scheme: Scheme,
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    /// Same bucket and scheme, different key.
    pub fn with_key(&self, key: impl Into<String>) -> Self {
        Self {
            scheme: self.scheme,
            bucket: self.bucket.clone(),
            key: key.into(),
        }
    }
}

impl Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}/{}", self.scheme.prefix(), self.bucket, self.key)
    }
}

/// Where a file lives: on the local filesystem or in an object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Object(ObjectLocation),
}

impl Location {
    pub fn is_object(&self) -> bool {
        matches!(self, Location::Object(_))
    }
}

impl FromStr for Location {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for scheme in [Scheme::S3, Scheme::Gcs] {
            let Some(rest) = s.strip_prefix(scheme.prefix()) else {
                continue;
            };
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(SourceError::InvalidLocation(s.to_string()));
            }
            return Ok(Location::Object(ObjectLocation {
                scheme,
                bucket: bucket.to_string(),
                key: key.to_string(),
            }));
        }

        if s.is_empty() {
            return Err(SourceError::InvalidLocation(s.to_string()));
        }
        Ok(Location::Local(PathBuf::from(s)))
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Object(obj) => write!(f, "{obj}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_and_key() {
        let loc: Location = "gs://bucket-name/path/to/file".parse().unwrap();
        let Location::Object(obj) = loc else {
            panic!("expected object location");
        };
        assert_eq!(obj.scheme, Scheme::Gcs);
        assert_eq!(obj.bucket, "bucket-name");
        assert_eq!(obj.key, "path/to/file");
        assert_eq!(obj.to_string(), "gs://bucket-name/path/to/file");
    }

    #[test]
    fn test_parse_bucket_only() {
        let loc: Location = "s3://bucket".parse().unwrap();
        assert_eq!(
            loc,
            Location::Object(ObjectLocation {
                scheme: Scheme::S3,
                bucket: "bucket".into(),
                key: String::new(),
            })
        );
    }

    #[test]
    fn test_unknown_scheme_is_local() {
        let loc: Location = "gcss://bucket-name/path/to/file".parse().unwrap();
        assert!(!loc.is_object());
        let loc: Location = "tests/example_data.jsonl".parse().unwrap();
        assert_eq!(loc, Location::Local(PathBuf::from("tests/example_data.jsonl")));
    }

    #[test]
    fn test_invalid_locations() {
        assert!("s3:///key".parse::<Location>().is_err());
        assert!("".parse::<Location>().is_err());
    }
}
