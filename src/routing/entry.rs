//! Dispatch table entries.
//!
//! # Responsibilities
//! - Turn store records into compiled entries
//! - Map configured redirect kinds to status codes
//! - Parse upstream hosts into forwarding targets
//!
//! # Design Decisions
//! - Redirect destinations are kept verbatim, never validated
//! - Unknown redirect kinds fall back to temporary redirects
//! - Upstreams are parsed once per reload, not per request

use axum::http::{
    header::{HeaderValue, InvalidHeaderValue},
    uri::{Authority, InvalidUri, Scheme},
    StatusCode, Uri,
};
use thiserror::Error;
use url::Url;

use crate::routing::{matcher::PathPattern, RouterError};
use crate::store::{RedirectRecord, RouteRecord};

/// Configured redirect flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    Permanent,
    Temporary,
}

impl RedirectKind {
    /// Map a configured kind. Only `"perm"` is permanent.
    pub fn from_config(kind: &str) -> Self {
        match kind {
            "perm" => Self::Permanent,
            _ => Self::Temporary,
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            Self::Permanent => StatusCode::PERMANENT_REDIRECT,
            Self::Temporary => StatusCode::TEMPORARY_REDIRECT,
        }
    }
}

/// Reasons an upstream host cannot be used as a forwarding target.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("unparsable URL: {0}")]
    Parse(#[from] url::ParseError),

    #[error("unsupported scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),

    #[error("missing host")]
    MissingHost,

    #[error("invalid authority: {0}")]
    Authority(#[from] InvalidUri),

    #[error("invalid host header: {0}")]
    HostHeader(#[from] InvalidHeaderValue),
}

/// A parsed forwarding target.
#[derive(Debug, Clone)]
pub struct Upstream {
    target: String,
    scheme: Scheme,
    authority: Authority,
    host_header: HeaderValue,
    base_path: String,
    base_query: Option<String>,
}

impl Upstream {
    /// Parse a configured upstream such as `http://localhost:30001` or
    /// `http://backend/base?key=value`.
    pub fn parse(target: &str) -> Result<Self, UpstreamError> {
        let url = Url::parse(target)?;
        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => return Err(UpstreamError::UnsupportedScheme(other.to_string())),
        };

        let host = url.host_str().ok_or(UpstreamError::MissingHost)?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority: Authority = authority.parse()?;
        let host_header = HeaderValue::from_str(authority.as_str())?;

        Ok(Self {
            target: target.to_string(),
            scheme,
            authority,
            host_header,
            base_path: url.path().to_string(),
            base_query: url.query().map(str::to_string),
        })
    }

    /// The upstream as configured.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Value for the `Host` header of forwarded requests.
    pub fn host_header(&self) -> &HeaderValue {
        &self.host_header
    }

    /// Build the upstream URI for an incoming request URI.
    ///
    /// The request path is appended to the upstream's base path and the two
    /// query strings are concatenated.
    pub fn target_uri(&self, original: &Uri) -> Result<Uri, axum::http::Error> {
        let path = join_paths(&self.base_path, original.path());
        let query = match (self.base_query.as_deref(), original.query()) {
            (Some(base), Some(q)) if !base.is_empty() && !q.is_empty() => {
                Some(format!("{}&{}", base, q))
            }
            (Some(base), _) if !base.is_empty() => Some(base.to_string()),
            (_, Some(q)) if !q.is_empty() => Some(q.to_string()),
            _ => None,
        };

        let path_and_query = match query {
            Some(q) => format!("{}?{}", path, q),
            None => path,
        };

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

/// Join two paths with exactly one `/` between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// What to do with a request whose path matched an entry.
#[derive(Debug, Clone)]
pub enum Action {
    /// Answer with `Location: destination` and the given status.
    Redirect {
        destination: String,
        status: StatusCode,
    },
    /// Forward to the upstream.
    Route { upstream: Upstream },
}

/// One compiled path rule.
#[derive(Debug, Clone)]
pub struct Entry {
    pub pattern: PathPattern,
    pub action: Action,
}

impl Entry {
    pub fn redirect(record: &RedirectRecord) -> Result<Self, RouterError> {
        let kind = RedirectKind::from_config(&record.kind);
        Ok(Self {
            pattern: PathPattern::parse(&record.path)?,
            action: Action::Redirect {
                destination: record.destination.clone(),
                status: kind.status(),
            },
        })
    }

    pub fn route(record: &RouteRecord) -> Result<Self, RouterError> {
        let pattern = PathPattern::parse(&record.path)?;
        let upstream = Upstream::parse(&record.upstream).map_err(|source| {
            RouterError::InvalidRouteConfiguration {
                path: record.path.clone(),
                host: record.upstream.clone(),
                source,
            }
        })?;

        Ok(Self {
            pattern,
            action: Action::Route { upstream },
        })
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.action, Action::Redirect { .. })
    }
}
