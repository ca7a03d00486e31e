//! AWS credential resolution.
//!
//! Credentials are looked up in the same order the AWS SDKs use; the first
//! source that yields a key pair wins:
//!
//! 1. `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`.
//! 2. Static keys for `AWS_PROFILE` (default `default`) in the shared
//!    credentials file, then the shared config file.
//! 3. The container credentials endpoint (ECS task roles), when
//!    `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` or `..._FULL_URI` is set.
//! 4. EC2 instance metadata (IMDSv2), unless `AWS_EC2_METADATA_DISABLED=true`.
//!
//! Temporary credentials are cached and refreshed five minutes before they
//! expire.

use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::sigv4::Credentials;
use crate::InferenceError;

const CONTAINER_HOST: &str = "http://169.254.170.2";
const IMDS_ENDPOINT: &str = "http://169.254.169.254";
const IMDS_TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
const IMDS_TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const IMDS_TOKEN_TTL_SECS: &str = "21600";
const METADATA_TIMEOUT: Duration = Duration::from_secs(2);
const REFRESH_MARGIN_SECS: i64 = 300;

/// A place credentials can come from
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Fixed keys supplied by the caller
    Static(Credentials),
    /// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`
    Environment,
    /// Static keys of a named profile in the shared files
    Profile {
        name: String,
        credentials_file: Option<PathBuf>,
        config_file: Option<PathBuf>,
    },
    /// Container credentials endpoint
    Container {
        url: String,
        authorization: Option<String>,
    },
    /// EC2 instance metadata service
    InstanceMetadata { endpoint: String },
}

#[derive(Debug, Clone)]
struct Resolved {
    credentials: Credentials,
    expires_at: Option<DateTime<Utc>>,
    source: &'static str,
}

impl Resolved {
    fn permanent(credentials: Credentials, source: &'static str) -> Self {
        Self {
            credentials,
            expires_at: None,
            source,
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map_or(true, |at| at - chrono::Duration::seconds(REFRESH_MARGIN_SECS) > now)
    }
}

/// Response shape shared by the container endpoint and instance metadata
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetadataCredentials {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expiration: Option<DateTime<Utc>>,
}

impl MetadataCredentials {
    fn into_resolved(self, source: &'static str) -> Resolved {
        Resolved {
            credentials: Credentials::new(self.access_key_id, self.secret_access_key, self.token),
            expires_at: self.expiration,
            source,
        }
    }
}

/// Resolves and caches credentials from an ordered list of sources
pub struct CredentialsProvider {
    sources: Vec<CredentialSource>,
    http: reqwest::Client,
    cached: Mutex<Option<Resolved>>,
}

impl CredentialsProvider {
    pub fn new(sources: Vec<CredentialSource>) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(METADATA_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            sources,
            http,
            cached: Mutex::new(None),
        })
    }

    /// Always hand out the same keys
    pub fn fixed(credentials: Credentials) -> Result<Self, InferenceError> {
        Self::new(vec![CredentialSource::Static(credentials)])
    }

    /// The standard chain, configured from the process environment
    pub fn default_chain() -> Result<Self, InferenceError> {
        Self::new(default_sources(env_var))
    }

    /// Current credentials, resolving the chain again when the cached
    /// ones are missing or about to expire
    pub async fn credentials(&self) -> Result<Credentials, InferenceError> {
        let mut cached = self.cached.lock().await;
        if let Some(resolved) = cached.as_ref() {
            if resolved.is_fresh(Utc::now()) {
                return Ok(resolved.credentials.clone());
            }
            debug!(source = resolved.source, "AWS credentials expiring, refreshing");
        }

        let resolved = self.resolve().await?;
        let credentials = resolved.credentials.clone();
        *cached = Some(resolved);
        Ok(credentials)
    }

    async fn resolve(&self) -> Result<Resolved, InferenceError> {
        for source in &self.sources {
            if let Some(resolved) = self.load(source).await? {
                info!(
                    source = resolved.source,
                    access_key_id = %resolved.credentials.access_key_id,
                    expires_at = ?resolved.expires_at,
                    "Resolved AWS credentials"
                );
                return Ok(resolved);
            }
        }

        Err(InferenceError::Credentials(
            "no AWS credentials found in the environment, shared profile, container endpoint or instance metadata"
                .to_string(),
        ))
    }

    async fn load(&self, source: &CredentialSource) -> Result<Option<Resolved>, InferenceError> {
        match source {
            CredentialSource::Static(credentials) => {
                Ok(Some(Resolved::permanent(credentials.clone(), "static")))
            }
            CredentialSource::Environment => {
                Ok(from_environment(env_var).map(|c| Resolved::permanent(c, "environment")))
            }
            CredentialSource::Profile {
                name,
                credentials_file,
                config_file,
            } => Ok(
                load_profile(name, credentials_file.as_deref(), config_file.as_deref())?
                    .map(|c| Resolved::permanent(c, "profile")),
            ),
            CredentialSource::Container { url, authorization } => self
                .load_container(url, authorization.as_deref())
                .await
                .map(Some),
            CredentialSource::InstanceMetadata { endpoint } => {
                match self.load_instance_metadata(endpoint).await {
                    Ok(resolved) => Ok(resolved),
                    Err(e) => {
                        debug!(error = %e, "Instance metadata credentials unavailable");
                        Ok(None)
                    }
                }
            }
        }
    }

    async fn load_container(
        &self,
        url: &str,
        authorization: Option<&str>,
    ) -> Result<Resolved, InferenceError> {
        let mut request = self.http.get(url);
        if let Some(token) = authorization {
            request = request.header(AUTHORIZATION, token);
        }

        let response = request.send().await.map_err(|e| {
            InferenceError::Credentials(format!("container endpoint {url} unreachable: {e}"))
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Credentials(format!(
                "container endpoint {url} returned {status}"
            )));
        }

        let body: MetadataCredentials = response.json().await.map_err(|e| {
            InferenceError::Credentials(format!("container endpoint {url} sent invalid credentials: {e}"))
        })?;
        Ok(body.into_resolved("container"))
    }

    async fn load_instance_metadata(
        &self,
        endpoint: &str,
    ) -> Result<Option<Resolved>, reqwest::Error> {
        let endpoint = endpoint.trim_end_matches('/');

        let token = self
            .http
            .put(format!("{endpoint}/latest/api/token"))
            .header(IMDS_TOKEN_TTL_HEADER, IMDS_TOKEN_TTL_SECS)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let roles_url = format!("{endpoint}/latest/meta-data/iam/security-credentials/");
        let roles = self
            .http
            .get(&roles_url)
            .header(IMDS_TOKEN_HEADER, token.as_str())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let Some(role) = roles.lines().map(str::trim).find(|l| !l.is_empty()) else {
            debug!("Instance has no IAM role attached");
            return Ok(None);
        };

        let body: MetadataCredentials = self
            .http
            .get(format!("{roles_url}{role}"))
            .header(IMDS_TOKEN_HEADER, token.as_str())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(Some(body.into_resolved("instance-metadata")))
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Build the standard source list from an environment lookup
fn default_sources(var: impl Fn(&str) -> Option<String>) -> Vec<CredentialSource> {
    let aws_dir = var("HOME")
        .or_else(|| var("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".aws"));

    let mut sources = vec![
        CredentialSource::Environment,
        CredentialSource::Profile {
            name: var("AWS_PROFILE").unwrap_or_else(|| "default".to_string()),
            credentials_file: var("AWS_SHARED_CREDENTIALS_FILE")
                .map(PathBuf::from)
                .or_else(|| aws_dir.as_ref().map(|dir| dir.join("credentials"))),
            config_file: var("AWS_CONFIG_FILE")
                .map(PathBuf::from)
                .or_else(|| aws_dir.as_ref().map(|dir| dir.join("config"))),
        },
    ];

    let container_url = var("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI")
        .map(|uri| format!("{CONTAINER_HOST}{uri}"))
        .or_else(|| var("AWS_CONTAINER_CREDENTIALS_FULL_URI"));
    if let Some(url) = container_url {
        sources.push(CredentialSource::Container {
            url,
            authorization: var("AWS_CONTAINER_AUTHORIZATION_TOKEN"),
        });
    }

    let imds_disabled = var("AWS_EC2_METADATA_DISABLED")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    if !imds_disabled {
        sources.push(CredentialSource::InstanceMetadata {
            endpoint: var("AWS_EC2_METADATA_SERVICE_ENDPOINT")
                .unwrap_or_else(|| IMDS_ENDPOINT.to_string()),
        });
    }

    sources
}

fn from_environment(var: impl Fn(&str) -> Option<String>) -> Option<Credentials> {
    Some(Credentials::new(
        var("AWS_ACCESS_KEY_ID")?,
        var("AWS_SECRET_ACCESS_KEY")?,
        var("AWS_SESSION_TOKEN"),
    ))
}

/// Static keys for `name`, from the credentials file first
///
/// The credentials file uses bare profile names as sections; the config
/// file prefixes every profile except `default` with `profile `.
fn load_profile(
    name: &str,
    credentials_file: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<Option<Credentials>, InferenceError> {
    let config_section = if name == "default" {
        name.to_string()
    } else {
        format!("profile {name}")
    };

    for (path, section) in [(credentials_file, name.to_string()), (config_file, config_section)] {
        let Some(path) = path else { continue };
        let sections = read_ini(path)?;
        let Some(keys) = sections
            .get(&section)
            .or_else(|| sections.get(&section.to_lowercase()))
        else {
            continue;
        };

        let key = |k: &str| {
            keys.get(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        match (key("aws_access_key_id"), key("aws_secret_access_key")) {
            (Some(access_key_id), Some(secret_access_key)) => {
                debug!(profile = name, path = %path.display(), "Found profile credentials");
                return Ok(Some(Credentials::new(
                    access_key_id,
                    secret_access_key,
                    key("aws_session_token"),
                )));
            }
            _ => debug!(profile = name, path = %path.display(), "Profile has no static keys"),
        }
    }

    Ok(None)
}

/// Sections of an INI file; a missing file has none
fn read_ini(path: &Path) -> Result<HashMap<String, HashMap<String, String>>, InferenceError> {
    if !path.is_file() {
        return Ok(HashMap::new());
    }

    let parsed: HashMap<String, ::config::Value> = ::config::Config::builder()
        .add_source(::config::File::from(path).format(::config::FileFormat::Ini))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| InferenceError::Credentials(format!("failed to read {}: {e}", path.display())))?;

    let sections = parsed
        .into_iter()
        .filter_map(|(section, value)| {
            let table = value.into_table().ok()?;
            let keys = table
                .into_iter()
                .filter_map(|(key, value)| Some((key, value.into_string().ok()?)))
                .collect();
            Some((section, keys))
        })
        .collect();
    Ok(sections)
}
