use core::{
    fmt::{self, Display, Formatter},
    time::Duration,
};

use serde::Serialize;

use crate::{cfg::RunConfig, stat::Summary};

/// Final run report.
///
/// Rendered either as human-readable text via [`Display`], or as JSON via
/// [`Report::to_json`].
#[derive(Debug)]
pub struct Report<'a> {
    cfg: &'a RunConfig,
    summary: &'a Summary,
}

impl<'a> Report<'a> {
    pub fn new(cfg: &'a RunConfig, summary: &'a Summary) -> Self {
        Self { cfg, summary }
    }

    /// Renders this report as a pretty-printed JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&JsonReport::from(self))
    }

    fn request_headers(&self) -> String {
        self.cfg
            .headers
            .iter()
            .map(|(name, value)| format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes())))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        let s = self.summary;
        let target = &self.cfg.target;

        writeln!(f, "Server Software:        {}", s.servers.join(", "))?;
        writeln!(f, "Server Hostname:        {}", target.host)?;
        writeln!(f, "Server Port:            {}", target.port)?;
        writeln!(f, "Request Headers:        {}", self.request_headers())?;
        writeln!(f)?;
        writeln!(f, "Document Path:          {}", target.path)?;
        match s.content_length {
            Some(v) => writeln!(f, "Document Length:        {v} bytes")?,
            None => writeln!(f, "Document Length:        n/a")?,
        }
        writeln!(f)?;
        writeln!(f, "Concurrency Level:      {}", self.cfg.concurrency)?;
        writeln!(f, "Time Duration:          {:.3} ms", as_ms(s.wall_clock))?;
        match s.avg_time_per_request {
            Some(v) => writeln!(f, "Time Per Request:       {:.3} ms (mean)", as_ms(v))?,
            None => writeln!(f, "Time Per Request:       n/a")?,
        }
        writeln!(f, "Complete Requests:      {}", s.num_requests)?;
        writeln!(f, "Failed Requests:        {}", s.num_failed)?;
        writeln!(f, "Non-2xx Responses:      {}", s.num_non_2xx)?;
        writeln!(
            f,
            "Response Classes:       2xx={} 3xx={} 4xx={} 5xx={}",
            s.num_2xx, s.num_3xx, s.num_4xx, s.num_5xx
        )?;
        writeln!(f, "Connections:            {} ({} failed)", s.num_connects, s.num_connect_errors)?;
        writeln!(f, "Bytes Received:         {}", s.bytes_rx)?;
        writeln!(f, "Requests Per Second:    {:.2} [#/sec]", s.requests_per_sec)?;
        writeln!(f, "Connections Per Second: {:.2} [#/sec]", s.connections_per_sec)?;
        writeln!(f)?;
        for (name, v) in [("50%", s.p50), ("90%", s.p90), ("99%", s.p99)] {
            match v {
                Some(v) => writeln!(f, "  {name:>4}  {:.3} ms", as_ms(v))?,
                None => writeln!(f, "  {name:>4}  n/a")?,
            }
        }

        Ok(())
    }
}

#[inline]
fn as_ms(v: Duration) -> f64 {
    v.as_nanos() as f64 / 1e6
}

#[derive(Debug, Serialize)]
struct JsonReport {
    servers: Vec<String>,
    hostname: String,
    port: u16,
    path: String,
    request_headers: String,
    content_length: Option<u64>,
    concurrency: usize,
    duration_ms: f64,
    avg_time_per_request_ms: Option<f64>,
    num_requests: u64,
    num_failed: u64,
    num_non_2xx: u64,
    num_2xx: u64,
    num_3xx: u64,
    num_4xx: u64,
    num_5xx: u64,
    num_connects: u64,
    num_connect_errors: u64,
    bytes_rx: u64,
    requests_per_sec: f64,
    connections_per_sec: f64,
    p50_ms: Option<f64>,
    p90_ms: Option<f64>,
    p99_ms: Option<f64>,
}

impl From<&Report<'_>> for JsonReport {
    fn from(report: &Report) -> Self {
        let s = report.summary;
        let target = &report.cfg.target;

        Self {
            servers: s.servers.clone(),
            hostname: target.host.clone(),
            port: target.port,
            path: target.path.clone(),
            request_headers: report.request_headers(),
            content_length: s.content_length,
            concurrency: report.cfg.concurrency.get(),
            duration_ms: as_ms(s.wall_clock),
            avg_time_per_request_ms: s.avg_time_per_request.map(as_ms),
            num_requests: s.num_requests,
            num_failed: s.num_failed,
            num_non_2xx: s.num_non_2xx,
            num_2xx: s.num_2xx,
            num_3xx: s.num_3xx,
            num_4xx: s.num_4xx,
            num_5xx: s.num_5xx,
            num_connects: s.num_connects,
            num_connect_errors: s.num_connect_errors,
            bytes_rx: s.bytes_rx,
            requests_per_sec: s.requests_per_sec,
            connections_per_sec: s.connections_per_sec,
            p50_ms: s.p50.map(as_ms),
            p90_ms: s.p90.map(as_ms),
            p99_ms: s.p99.map(as_ms),
        }
    }
}
