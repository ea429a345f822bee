use core::{
    fmt::{self, Display, Formatter},
    num::NonZero,
    time::Duration,
};

use bytes::Bytes;
use http::{
    header::{self, HeaderName, HeaderValue},
    uri::InvalidUri,
    HeaderMap, Method, Uri,
};

use crate::{cipher::CipherSuite, cmd::Cmd};

/// Configuration errors.
///
/// All of them are detected before any worker starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL '{0}': {1}")]
    InvalidUrl(String, InvalidUri),
    #[error("URL '{0}' has no scheme")]
    MissingScheme(String),
    #[error("unsupported scheme '{0}', only http and https are supported")]
    UnsupportedScheme(String),
    #[error("URL '{0}' has no host")]
    MissingHost(String),
    #[error("URL '{0}' has no port")]
    MissingPort(String),
    #[error("URL '{0}' has no path")]
    MissingPath(String),
    #[error("could not parse header '{0}', expected 'Name: value'")]
    MalformedHeader(String),
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),
    #[error("unknown cipher suite '{0}'")]
    UnknownCipherSuite(String),
    #[error("at least one cipher suite besides TLS_FALLBACK_SCSV is required")]
    NoCipherSuites,
    #[error("either requests or duration limit must be set")]
    NoLimit,
    #[error("duration limit of {0:?} exceeds the maximum of {max:?}", max = Limit::MAX_DURATION)]
    DurationTooLong(Duration),
}

/// Target scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Display for Scheme {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), fmt::Error> {
        match self {
            Self::Http => fmt.write_str("http"),
            Self::Https => fmt.write_str("https"),
        }
    }
}

/// Target endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: Scheme,
    /// Host name or IP address, without brackets.
    pub host: String,
    pub port: u16,
    /// Request target, including the query string if any.
    pub path: String,
}

impl Target {
    /// Returns "host:port", bracketing IPv6 addresses.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl TryFrom<&str> for Target {
    type Error = ConfigError;

    fn try_from(url: &str) -> Result<Self, Self::Error> {
        let uri: Uri = url.parse().map_err(|err| ConfigError::InvalidUrl(url.to_string(), err))?;

        let scheme = match uri.scheme_str() {
            Some("http") => Scheme::Http,
            Some("https") => Scheme::Https,
            Some(scheme) => return Err(ConfigError::UnsupportedScheme(scheme.to_string())),
            None => return Err(ConfigError::MissingScheme(url.to_string())),
        };

        let host = uri
            .host()
            .map(|v| v.trim_start_matches('[').trim_end_matches(']'))
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingHost(url.to_string()))?;
        let port = uri.port_u16().ok_or_else(|| ConfigError::MissingPort(url.to_string()))?;
        let path = uri
            .path_and_query()
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingPath(url.to_string()))?;

        let m = Self {
            scheme,
            host: host.to_string(),
            port,
            path: path.to_string(),
        };

        Ok(m)
    }
}

/// Per-worker termination policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Run exactly this number of iterations.
    Requests(NonZero<u64>),
    /// Do not start new iterations after this time elapsed.
    Duration(Duration),
}

impl Limit {
    /// Longest allowed duration limit.
    pub const MAX_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    /// Duration wins over the number of requests when both are given.
    pub fn new(requests: u64, duration: Duration) -> Result<Self, ConfigError> {
        if duration > Self::MAX_DURATION {
            return Err(ConfigError::DurationTooLong(duration));
        }
        if !duration.is_zero() {
            return Ok(Self::Duration(duration));
        }

        NonZero::new(requests).map(Self::Requests).ok_or(ConfigError::NoLimit)
    }
}

/// Run configuration.
///
/// Built once before the run and shared read-only by all workers.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target: Target,
    pub method: Method,
    /// Request headers, multiple values per name allowed.
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Number of workers.
    pub concurrency: NonZero<usize>,
    /// Number of threads hosting workers.
    pub threads: NonZero<usize>,
    pub limit: Limit,
    /// Reuse a worker's connection across iterations.
    pub keep_alive: bool,
    /// Issue a request on each iteration, otherwise only connect.
    pub send_request: bool,
    /// Print response bodies to stdout.
    pub print_body: bool,
    pub cipher_suites: Vec<CipherSuite>,
    /// Enable SOCK_NODELAY socket option.
    pub tcp_no_delay: bool,
}

impl RunConfig {
    /// Returns the value of the request "Host" header.
    ///
    /// An explicitly configured "Host" header overrides the URL authority,
    /// which is used for the transport only. When "Host" is given multiple
    /// times, the last one wins.
    pub fn effective_host(&self) -> String {
        let host = self.headers.get_all(header::HOST).iter().last();
        match host.and_then(|v| v.to_str().ok()) {
            Some(host) => host.to_string(),
            None => self.target.authority(),
        }
    }
}

impl TryFrom<Cmd> for RunConfig {
    type Error = ConfigError;

    fn try_from(cmd: Cmd) -> Result<Self, Self::Error> {
        let Cmd {
            url,
            concurrency,
            requests,
            duration,
            keep_alive,
            send_request,
            cipher_suites,
            method,
            headers,
            body,
            print_body,
            threads,
            tcp_no_delay,
            ..
        } = cmd;

        let target = Target::try_from(url.as_str())?;
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| ConfigError::InvalidMethod(method))?;
        let headers = parse_headers(&headers)?;
        let cipher_suites = parse_cipher_suites(&cipher_suites)?;
        let limit = Limit::new(requests, Duration::from_millis(duration))?;
        let threads = threads.unwrap_or_else(|| default_threads(concurrency));

        let m = Self {
            target,
            method,
            headers,
            body: Bytes::from(body),
            concurrency,
            threads: threads.min(concurrency),
            limit,
            keep_alive,
            send_request,
            print_body,
            cipher_suites,
            tcp_no_delay,
        };

        Ok(m)
    }
}

fn default_threads(concurrency: NonZero<usize>) -> NonZero<usize> {
    std::thread::available_parallelism()
        .unwrap_or(NonZero::<usize>::MIN)
        .min(concurrency)
}

/// Parses headers in form of "Name1: value1;Name2: value2".
///
/// Names consist of word characters and hyphens, values of visible ASCII
/// characters, spaces and tabs. Repeated names accumulate their values.
pub fn parse_headers(v: &str) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();

    for entry in v.split(';').map(str::trim).filter(|v| !v.is_empty()) {
        let malformed = || ConfigError::MalformedHeader(entry.to_string());

        let (name, value) = entry.split_once(':').ok_or_else(malformed)?;
        let value = value.trim_start();
        if name.is_empty() || value.is_empty() {
            return Err(malformed());
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(malformed());
        }
        if !value.bytes().all(|b| b == b'\t' || (b' '..=b'~').contains(&b)) {
            return Err(malformed());
        }

        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| malformed())?;
        let value = HeaderValue::from_str(value).map_err(|_| malformed())?;
        headers.append(name, value);
    }

    Ok(headers)
}

/// Parses comma-separated cipher suite names.
pub fn parse_cipher_suites(v: &str) -> Result<Vec<CipherSuite>, ConfigError> {
    let mut suites = Vec::new();
    for name in v.split(',').map(str::trim) {
        let suite = CipherSuite::from_name(name).ok_or_else(|| ConfigError::UnknownCipherSuite(name.to_string()))?;
        if !suites.contains(&suite) {
            suites.push(suite);
        }
    }

    if suites.iter().all(CipherSuite::is_signalling) {
        return Err(ConfigError::NoCipherSuites);
    }

    Ok(suites)
}
