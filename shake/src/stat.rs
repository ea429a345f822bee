use core::time::Duration;
use std::collections::BTreeSet;

use http::StatusCode;

use crate::histogram::LogHistogram;

/// Response details captured by a single iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    /// Value of the "Content-Length" header, if any.
    pub content_length: Option<u64>,
    /// Values of the "Server" header.
    pub servers: Vec<String>,
    /// Number of body bytes received.
    pub bytes_rx: u64,
}

/// Per-iteration result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The connection is established, no request was sent.
    Connected,
    /// A response was received.
    Response(Response),
    /// Either connection establishment or request/response exchange failed.
    Failed,
}

/// Per-worker statistics.
///
/// Each worker owns its own aggregate and mutates it without any
/// synchronization. The aggregates are merged into the run-wide one after all
/// workers are joined.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    /// Number of iterations attempted.
    num_requests: u64,
    /// Number of failed iterations.
    num_failed: u64,
    num_non_2xx: u64,
    num_2xx: u64,
    num_3xx: u64,
    num_4xx: u64,
    num_5xx: u64,
    /// Number of connections established.
    num_connects: u64,
    /// Number of failed connection attempts.
    num_connect_errors: u64,
    /// Number of response body bytes received.
    bytes_rx: u64,
    /// Last observed content length.
    content_length: Option<u64>,
    /// Distinct "Server" header values.
    servers: BTreeSet<String>,
    /// Sum of all iterations' time.
    elapsed: Duration,
    /// Iteration time histogram.
    hist: LogHistogram,
}

impl Aggregate {
    /// Accounts a completed iteration.
    pub fn record(&mut self, outcome: &Outcome, elapsed: Duration) {
        self.num_requests += 1;
        self.elapsed += elapsed;
        self.hist.record(elapsed.as_micros() as u64);

        match outcome {
            Outcome::Connected => {}
            Outcome::Response(resp) => {
                match resp.status.as_u16() {
                    200..=299 => self.num_2xx += 1,
                    300..=399 => self.num_3xx += 1,
                    400..=499 => self.num_4xx += 1,
                    500..=599 => self.num_5xx += 1,
                    code => log::warn!("unexpected code: {code}"),
                }
                if !resp.status.is_success() {
                    self.num_non_2xx += 1;
                }
                if resp.content_length.is_some() {
                    self.content_length = resp.content_length;
                }
                self.servers.extend(resp.servers.iter().cloned());
                self.bytes_rx += resp.bytes_rx;
            }
            Outcome::Failed => {
                self.num_failed += 1;
            }
        }
    }

    /// Increases the number of connections established.
    #[inline]
    pub fn on_connect(&mut self) {
        self.num_connects += 1;
    }

    /// Increases the number of failed connection attempts.
    #[inline]
    pub fn on_connect_err(&mut self) {
        self.num_connect_errors += 1;
    }

    #[inline]
    pub fn num_requests(&self) -> u64 {
        self.num_requests
    }

    /// Merges the other worker's statistics into this one.
    ///
    /// The content length observed by `other`, if any, replaces ours.
    pub fn merge(&mut self, other: Aggregate) {
        self.num_requests += other.num_requests;
        self.num_failed += other.num_failed;
        self.num_non_2xx += other.num_non_2xx;
        self.num_2xx += other.num_2xx;
        self.num_3xx += other.num_3xx;
        self.num_4xx += other.num_4xx;
        self.num_5xx += other.num_5xx;
        self.num_connects += other.num_connects;
        self.num_connect_errors += other.num_connect_errors;
        self.bytes_rx += other.bytes_rx;
        if other.content_length.is_some() {
            self.content_length = other.content_length;
        }
        self.servers.extend(other.servers);
        self.elapsed += other.elapsed;
        self.hist.merge(&other.hist);
    }

    /// Computes derived values after all workers are joined.
    ///
    /// With keep-alive enabled the handshake cost is amortized, so the request
    /// rate is reported. Otherwise every iteration pays for a fresh
    /// connection, and the connection rate is reported instead.
    pub fn finalize(self, wall_clock: Duration, keep_alive: bool) -> Summary {
        let avg_time_per_request = match self.num_requests {
            0 => None,
            n => Some(Duration::from_nanos((self.elapsed.as_nanos() / n as u128) as u64)),
        };

        let rate = if wall_clock.is_zero() {
            0.0
        } else {
            self.num_requests as f64 / wall_clock.as_secs_f64()
        };
        let (requests_per_sec, connections_per_sec) = if keep_alive { (rate, 0.0) } else { (0.0, rate) };

        let quantiles = [0.5, 0.9, 0.99].map(|q| self.hist.quantile(q).map(Duration::from_micros));

        Summary {
            wall_clock,
            num_requests: self.num_requests,
            num_failed: self.num_failed,
            num_non_2xx: self.num_non_2xx,
            num_2xx: self.num_2xx,
            num_3xx: self.num_3xx,
            num_4xx: self.num_4xx,
            num_5xx: self.num_5xx,
            num_connects: self.num_connects,
            num_connect_errors: self.num_connect_errors,
            bytes_rx: self.bytes_rx,
            content_length: self.content_length,
            servers: self.servers.into_iter().collect(),
            avg_time_per_request,
            requests_per_sec,
            connections_per_sec,
            p50: quantiles[0],
            p90: quantiles[1],
            p99: quantiles[2],
        }
    }
}

/// Run-wide statistics, read once by the report.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Time between workers start and the last worker join.
    pub wall_clock: Duration,
    pub num_requests: u64,
    pub num_failed: u64,
    pub num_non_2xx: u64,
    pub num_2xx: u64,
    pub num_3xx: u64,
    pub num_4xx: u64,
    pub num_5xx: u64,
    pub num_connects: u64,
    pub num_connect_errors: u64,
    pub bytes_rx: u64,
    pub content_length: Option<u64>,
    /// Distinct "Server" header values, sorted.
    pub servers: Vec<String>,
    /// Undefined when no requests were made.
    pub avg_time_per_request: Option<Duration>,
    pub requests_per_sec: f64,
    pub connections_per_sec: f64,
    pub p50: Option<Duration>,
    pub p90: Option<Duration>,
    pub p99: Option<Duration>,
}
