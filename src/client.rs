//! # Admin API Client
//!
//! Talks to the RadosGW admin ops API. The `Gateway`/`GatewayConnection`
//! traits are the seam between the collectors and the network: production
//! code uses the reqwest-backed [`AdminGateway`], tests substitute a fake.
//!
//! A connection is bound to exactly one endpoint and owned by the task that
//! created it; connections are never pooled or shared. Reachability is
//! discovered at connect time and never cached across attempts.

use crate::metrics::BucketRecord;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{
    header::{AUTHORIZATION, DATE},
    StatusCode,
};
use serde::Deserialize;
use std::{fmt, time::Duration};
use tracing::debug;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Access/secret key pair for the admin ops API.
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("unable to construct HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("endpoint {0} is not reachable")]
    Unreachable(Url),
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("gateway at {endpoint} answered {status}: {body}")]
    Api {
        endpoint: Url,
        status: StatusCode,
        body: String,
    },
    #[error("could not decode gateway response from {endpoint}: {source}")]
    Decode {
        endpoint: Url,
        #[source]
        source: serde_json::Error,
    },
}

/// Capability to open admin sessions against gateway endpoints.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn connect(
        &self,
        endpoint: &Url,
        credentials: &Credentials,
    ) -> Result<Box<dyn GatewayConnection>, ClientError>;
}

/// One bound admin session against a single gateway endpoint.
#[async_trait]
pub trait GatewayConnection: Send + Sync {
    fn endpoint(&self) -> &Url;

    /// The full set of known user ids.
    async fn list_users(&self) -> Result<Vec<String>, ClientError>;

    /// All buckets owned by `uid`, with usage statistics.
    async fn list_user_buckets_with_stats(
        &self,
        uid: &str,
    ) -> Result<Vec<BucketRecord>, ClientError>;
}

/// Production gateway backed by a shared reqwest client.
///
/// The HTTP client carries the only timeouts in the system; a stalled
/// collection worker is bounded by [`REQUEST_TIMEOUT`], nothing else.
pub struct AdminGateway {
    http: reqwest::Client,
}

impl AdminGateway {
    pub fn new() -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Gateway for AdminGateway {
    async fn connect(
        &self,
        endpoint: &Url,
        credentials: &Credentials,
    ) -> Result<Box<dyn GatewayConnection>, ClientError> {
        // Any HTTP response proves the gateway answers; authentication
        // problems surface on the first admin call instead.
        self.http
            .get(endpoint.clone())
            .send()
            .await
            .map_err(|error| {
                debug!(%endpoint, %error, "connection probe failed");
                ClientError::Unreachable(endpoint.clone())
            })?;

        Ok(Box::new(AdminConnection {
            http: self.http.clone(),
            endpoint: endpoint.clone(),
            credentials: credentials.clone(),
        }))
    }
}

struct AdminConnection {
    http: reqwest::Client,
    endpoint: Url,
    credentials: Credentials,
}

impl AdminConnection {
    async fn admin_get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ClientError> {
        let mut url = self.endpoint.clone();
        url.set_path(path);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("format", "json");
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let authorization = sign::authorization(&self.credentials, "GET", &date, url.path());

        let response = self
            .http
            .get(url)
            .header(DATE, date)
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                endpoint: self.endpoint.clone(),
                status,
                body,
            });
        }

        response
            .text()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })
    }

    fn decode<'a, T: Deserialize<'a>>(&self, body: &'a str) -> Result<T, ClientError> {
        serde_json::from_str(body).map_err(|source| ClientError::Decode {
            endpoint: self.endpoint.clone(),
            source,
        })
    }
}

#[async_trait]
impl GatewayConnection for AdminConnection {
    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn list_users(&self) -> Result<Vec<String>, ClientError> {
        let body = self.admin_get("/admin/metadata/user", &[]).await?;
        self.decode(&body)
    }

    async fn list_user_buckets_with_stats(
        &self,
        uid: &str,
    ) -> Result<Vec<BucketRecord>, ClientError> {
        let body = self
            .admin_get("/admin/bucket", &[("stats", "true"), ("uid", uid)])
            .await?;
        let raw: Vec<RawBucket> = self.decode(&body)?;
        Ok(raw.into_iter().map(RawBucket::into_record).collect())
    }
}

/// Bucket stats entry as the admin API reports it. Usage numbers live under
/// the `rgw.main` category; every numeric field may be absent.
#[derive(Debug, Deserialize)]
struct RawBucket {
    bucket: String,
    owner: String,
    num_shards: Option<u64>,
    #[serde(default)]
    usage: RawUsage,
}

#[derive(Debug, Default, Deserialize)]
struct RawUsage {
    #[serde(rename = "rgw.main")]
    main: Option<RawUsageEntry>,
}

#[derive(Debug, Deserialize)]
struct RawUsageEntry {
    size: Option<u64>,
    num_objects: Option<u64>,
}

impl RawBucket {
    fn into_record(self) -> BucketRecord {
        let usage = self.usage.main;
        BucketRecord {
            owner: self.owner,
            bucket: self.bucket,
            size_bytes: usage.as_ref().and_then(|u| u.size),
            object_count: usage.as_ref().and_then(|u| u.num_objects),
            shard_count: self.num_shards,
        }
    }
}

/// AWS signature v2, the scheme the admin ops API accepts.
mod sign {
    use super::Credentials;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use hmac::{Hmac, Mac};
    use sha1::Sha1;

    type HmacSha1 = Hmac<Sha1>;

    /// Canonical form: method, content-md5, content-type, date, resource.
    /// We only send GETs without a body, so md5 and content-type stay empty.
    pub(super) fn string_to_sign(method: &str, date: &str, resource: &str) -> String {
        format!("{method}\n\n\n{date}\n{resource}")
    }

    pub(super) fn authorization(
        credentials: &Credentials,
        method: &str,
        date: &str,
        resource: &str,
    ) -> String {
        let mut mac = HmacSha1::new_from_slice(credentials.secret_key.as_bytes())
            .expect("hmac accepts keys of any length");
        mac.update(string_to_sign(method, date, resource).as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());
        format!("AWS {}:{}", credentials.access_key, signature)
    }
}
