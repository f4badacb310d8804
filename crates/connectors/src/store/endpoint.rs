use crate::{error::StoreError, location::Scheme};

pub const S3_ENDPOINT_URL_ENV: &str = "BATCHELOR_S3_ENDPOINT_URL";
pub const S3_FORCE_PATH_STYLE_ENV: &str = "BATCHELOR_S3_FORCE_PATH_STYLE";
pub const GCS_ENDPOINT_URL_ENV: &str = "BATCHELOR_GCS_ENDPOINT_URL";

/// GCS XML API, which speaks the S3 protocol with HMAC credentials.
pub const GCS_DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Where the S3-compatible client for one scheme sends its requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// `None` means the AWS regional endpoint.
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl EndpointConfig {
    pub fn from_env(scheme: Scheme) -> Result<Self, StoreError> {
        Self::resolve(scheme, |name| std::env::var(name).ok())
    }

    /// `s3://` honours `BATCHELOR_S3_ENDPOINT_URL` and
    /// `BATCHELOR_S3_FORCE_PATH_STYLE`; path-style is on by default only when
    /// the endpoint is overridden.
    ///
    /// `gs://` never falls back to AWS: it uses `BATCHELOR_GCS_ENDPOINT_URL`
    /// or the public GCS endpoint, always path-style.
    pub fn resolve(
        scheme: Scheme,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StoreError> {
        match scheme {
            Scheme::S3 => {
                let endpoint_url = lookup(S3_ENDPOINT_URL_ENV);
                let force_path_style = match lookup(S3_FORCE_PATH_STYLE_ENV) {
                    Some(v) => parse_bool(&v).ok_or_else(|| {
                        StoreError::Request(format!(
                            "invalid boolean {S3_FORCE_PATH_STYLE_ENV}={v:?} (expected true/false/1/0)"
                        ))
                    })?,
                    None => endpoint_url.is_some(),
                };
                Ok(Self {
                    endpoint_url,
                    force_path_style,
                })
            }
            Scheme::Gcs => Ok(Self {
                endpoint_url: Some(
                    lookup(GCS_ENDPOINT_URL_ENV)
                        .unwrap_or_else(|| GCS_DEFAULT_ENDPOINT.to_string()),
                ),
                force_path_style: true,
            }),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_gcs_defaults_to_google_endpoint() {
        let cfg = EndpointConfig::resolve(Scheme::Gcs, env(&[])).unwrap();
        assert_eq!(cfg.endpoint_url.as_deref(), Some(GCS_DEFAULT_ENDPOINT));
        assert!(cfg.force_path_style);
    }

    #[test]
    fn test_gcs_ignores_s3_override() {
        let cfg = EndpointConfig::resolve(
            Scheme::Gcs,
            env(&[(S3_ENDPOINT_URL_ENV, "http://minio:9000")]),
        )
        .unwrap();
        assert_eq!(cfg.endpoint_url.as_deref(), Some(GCS_DEFAULT_ENDPOINT));
    }

    #[test]
    fn test_gcs_endpoint_override() {
        let cfg = EndpointConfig::resolve(
            Scheme::Gcs,
            env(&[(GCS_ENDPOINT_URL_ENV, "http://fake-gcs:4443")]),
        )
        .unwrap();
        assert_eq!(cfg.endpoint_url.as_deref(), Some("http://fake-gcs:4443"));
    }

    #[test]
    fn test_s3_defaults_to_aws() {
        let cfg = EndpointConfig::resolve(Scheme::S3, env(&[])).unwrap();
        assert_eq!(
            cfg,
            EndpointConfig {
                endpoint_url: None,
                force_path_style: false,
            }
        );
    }

    #[test]
    fn test_s3_override_forces_path_style_unless_disabled() {
        let cfg = EndpointConfig::resolve(
            Scheme::S3,
            env(&[(S3_ENDPOINT_URL_ENV, "http://minio:9000")]),
        )
        .unwrap();
        assert!(cfg.force_path_style);

        let cfg = EndpointConfig::resolve(
            Scheme::S3,
            env(&[
                (S3_ENDPOINT_URL_ENV, "http://minio:9000"),
                (S3_FORCE_PATH_STYLE_ENV, "off"),
            ]),
        )
        .unwrap();
        assert!(!cfg.force_path_style);
    }

    #[test]
    fn test_s3_rejects_bad_boolean() {
        let err =
            EndpointConfig::resolve(Scheme::S3, env(&[(S3_FORCE_PATH_STYLE_ENV, "maybe")]))
                .unwrap_err();
        assert!(matches!(err, StoreError::Request(_)));
    }
}
