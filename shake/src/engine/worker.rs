use core::{future::Future, time::Duration};
use std::{sync::Arc, time::Instant};

use anyhow::{anyhow, Error};

use crate::{
    cfg::RunConfig,
    engine::{
        conn::{Connection, Connector, Link, Session},
        request, Task,
    },
    stat::{Aggregate, Outcome},
};

/// Per-task HTTP worker.
///
/// Each iteration obtains a connection according to the keep-alive policy,
/// optionally issues one request over it and accounts the outcome in the
/// worker-local statistics.
pub struct HttpWorker {
    cfg: Arc<RunConfig>,
    connector: Arc<Connector>,
    /// Current connection.
    conn: Connection,
    /// Worker-local statistics.
    stat: Aggregate,
}

impl HttpWorker {
    pub fn new(cfg: Arc<RunConfig>, connector: Arc<Connector>) -> Self {
        Self {
            cfg,
            connector,
            conn: Connection::default(),
            stat: Aggregate::default(),
        }
    }

    /// Closes the connection, if any, and returns the collected statistics.
    pub async fn finish(mut self) -> Aggregate {
        self.conn.close().await;
        self.stat
    }

    /// Runs a single iteration.
    ///
    /// Only the connection acquisition and the exchange are timed. Closing
    /// the connection afterwards is not.
    #[inline]
    pub async fn execute(&mut self) {
        let (result, elapsed) = timed(self.do_execute()).await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("{err:#}");
                self.conn.invalidate().await;
                Outcome::Failed
            }
        };

        if !self.cfg.keep_alive {
            self.conn.close().await;
        }

        self.stat.record(&outcome, elapsed);
    }

    #[inline]
    async fn do_execute(&mut self) -> Result<Outcome, Error> {
        let print_body = self.cfg.print_body;
        let request = if self.cfg.send_request {
            Some(request::build_request(&self.cfg)?)
        } else {
            None
        };

        let outcome = match (self.acquire().await?, request) {
            (Link::Bare(..), _) => Outcome::Connected,
            (Link::Http(session), Some(request)) => {
                let resp = request::issue(session, request, print_body).await?;
                Outcome::Response(resp)
            }
            (Link::Http(..), None) => Outcome::Connected,
        };

        Ok(outcome)
    }

    /// Returns the connection to use for the current iteration.
    ///
    /// With keep-alive enabled an established connection is reused as is.
    /// Otherwise, or if there is no usable connection, a new one is dialed.
    async fn acquire(&mut self) -> Result<&mut Link, Error> {
        if !(self.cfg.keep_alive && self.conn.is_established()) {
            self.conn.close().await;
            self.conn = Connection::Established(self.connect().await?);
        }

        match &mut self.conn {
            Connection::Established(link) => Ok(link),
            _ => Err(anyhow!("connection is not established")),
        }
    }

    async fn connect(&mut self) -> Result<Link, Error> {
        let transport = match self.connector.dial().await {
            Ok(transport) => transport,
            Err(err) => {
                self.stat.on_connect_err();
                return Err(err.context("failed to connect"));
            }
        };
        self.stat.on_connect();

        let link = if self.cfg.send_request {
            Link::Http(Session::handshake(transport).await?)
        } else {
            Link::Bare(transport)
        };

        Ok(link)
    }
}

impl Task for HttpWorker {
    #[inline]
    async fn execute(&mut self) {
        Self::execute(self).await
    }
}

/// Awaits the given future, returning its output along with the time it took.
#[inline]
async fn timed<F: Future>(f: F) -> (F::Output, Duration) {
    let now = Instant::now();
    let v = f.await;

    (v, now.elapsed())
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::*;
    use crate::cmd::Cmd;

    fn block_on<F: Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn test_timed_stops_before_following_work() {
        let (v, elapsed) = block_on(async {
            let (v, elapsed) = timed(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                42
            })
            .await;
            // Slow cleanup after the timed part.
            tokio::time::sleep(Duration::from_millis(300)).await;

            (v, elapsed)
        });

        assert_eq!(42, v);
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_millis(300), "{elapsed:?}");
    }

    #[test]
    fn test_execute_records_each_iteration() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let url = format!("http://{addr}/");
        let cmd = Cmd::try_parse_from(["shake", "-u", url.as_str(), "-r", "3"]).unwrap();
        let cfg = Arc::new(RunConfig::try_from(cmd).unwrap());
        let connector = Arc::new(Connector::new(&cfg).unwrap());

        let stat = block_on(async {
            let mut worker = HttpWorker::new(cfg, connector);
            for _ in 0..3 {
                worker.execute().await;
                // Connections are closed at the end of each iteration.
                assert!(!worker.conn.is_established());
            }
            worker.finish().await
        });

        let s = stat.finalize(Duration::from_secs(1), false);
        assert_eq!(3, s.num_requests);
        assert_eq!(3, s.num_connects);
        assert_eq!(0, s.num_failed);
        drop(listener);
    }
}
