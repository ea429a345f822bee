use core::num::NonZero;

use clap::{ArgAction, Parser};

/// Drives concurrent HTTP(S) load against a single endpoint and measures
/// handshake and request throughput.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Cmd {
    /// Target URL in form of "scheme://host:port/path".
    #[clap(short = 'u', default_value = "https://0.0.0.0:28080/")]
    pub url: String,
    /// Number of workers running in parallel.
    #[clap(short = 'c', default_value = "1")]
    pub concurrency: NonZero<usize>,
    /// Number of iterations made by each worker.
    ///
    /// Ignored when the duration limit is set.
    #[clap(short = 'r', default_value_t = 0)]
    pub requests: u64,
    /// Duration limit in milliseconds.
    ///
    /// Takes precedence over the requests limit.
    #[clap(short = 't', default_value_t = 0)]
    pub duration: u64,
    /// Keep the connection each worker established alive.
    #[clap(short = 'k')]
    pub keep_alive: bool,
    /// Send a request after the connection is established.
    ///
    /// Without this flag only connections are established, which measures
    /// the handshake cost alone.
    #[clap(short = 'w')]
    pub send_request: bool,
    /// Comma-separated list of TLS cipher suites.
    #[clap(short = 's', default_value = "TLS_RSA_WITH_RC4_128_SHA")]
    pub cipher_suites: String,
    /// HTTP method.
    #[clap(short = 'm', default_value = "GET")]
    pub method: String,
    /// Request headers in form of "Name1: value1;Name2: value2".
    #[clap(short = 'H', default_value = "")]
    pub headers: String,
    /// Request body.
    #[clap(short = 'B', default_value = "")]
    pub body: String,
    /// Print response bodies.
    #[clap(short = 'o')]
    pub print_body: bool,
    /// Number of threads hosting workers.
    ///
    /// Defaults to the number of available CPUs, but never more than the
    /// concurrency.
    #[clap(long)]
    pub threads: Option<NonZero<usize>>,
    /// Print the report in JSON format.
    #[clap(long)]
    pub json: bool,
    /// Enable TCP_NODELAY socket option.
    #[clap(long)]
    pub tcp_no_delay: bool,
    /// Be verbose in terms of logging.
    #[clap(short, action = ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let cmd = Cmd::try_parse_from(["shake"]).unwrap();

        assert_eq!("https://0.0.0.0:28080/", cmd.url);
        assert_eq!(1, cmd.concurrency.get());
        assert_eq!(0, cmd.requests);
        assert_eq!(0, cmd.duration);
        assert!(!cmd.keep_alive);
        assert!(!cmd.send_request);
        assert_eq!("TLS_RSA_WITH_RC4_128_SHA", cmd.cipher_suites);
        assert_eq!("GET", cmd.method);
        assert_eq!("", cmd.headers);
        assert_eq!("", cmd.body);
        assert!(!cmd.print_body);
        assert_eq!(None, cmd.threads);
        assert!(!cmd.json);
        assert_eq!(0, cmd.verbose);
    }

    #[test]
    fn test_short_flags() {
        let cmd = Cmd::try_parse_from([
            "shake",
            "-u",
            "http://127.0.0.1:8080/index.html",
            "-c",
            "8",
            "-r",
            "100",
            "-t",
            "500",
            "-k",
            "-w",
            "-m",
            "POST",
            "-H",
            "Host: example.com;X-Trace: 1",
            "-B",
            "payload",
            "-o",
            "-vv",
        ])
        .unwrap();

        assert_eq!("http://127.0.0.1:8080/index.html", cmd.url);
        assert_eq!(8, cmd.concurrency.get());
        assert_eq!(100, cmd.requests);
        assert_eq!(500, cmd.duration);
        assert!(cmd.keep_alive);
        assert!(cmd.send_request);
        assert_eq!("POST", cmd.method);
        assert_eq!("Host: example.com;X-Trace: 1", cmd.headers);
        assert_eq!("payload", cmd.body);
        assert!(cmd.print_body);
        assert_eq!(2, cmd.verbose);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Cmd::try_parse_from(["shake", "-c", "0"]).is_err());
    }
}
