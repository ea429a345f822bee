use core::{
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
};
use std::{
    io::{self, IoSlice},
    net::ToSocketAddrs,
};

use anyhow::{anyhow, Context as _, Error};
use bytes::Bytes;
use http_body_util::Full;
use hyper::client::conn::http1::{self, SendRequest};
use openssl::ssl::{
    SslConnector, SslMethod, SslMode, SslOptions, SslSessionCacheMode, SslVerifyMode, SslVersion,
};
use pin_project_lite::pin_project;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf},
    net::TcpStream,
    task::JoinHandle,
};
use tokio_openssl::SslStream;

use crate::{
    cfg::{RunConfig, Scheme},
    cipher::{self, CipherSuite},
    engine::io::TokioIo,
};

/// Establishes transport connections to the target.
///
/// Built once per run and shared by all workers.
pub struct Connector {
    /// Resolved target endpoint.
    addr: SocketAddr,
    /// Server name used for SNI.
    host: String,
    /// TLS client, if the target is HTTPS.
    tls: Option<SslConnector>,
    /// Enable SOCK_NODELAY socket option.
    tcp_no_delay: bool,
}

impl Connector {
    /// Resolves the target and prepares the TLS client if required.
    pub fn new(cfg: &RunConfig) -> Result<Self, Error> {
        let target = &cfg.target;
        let addr = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .with_context(|| format!("failed to resolve '{}'", target.authority()))?
            .next()
            .ok_or_else(|| anyhow!("no addresses resolved for '{}'", target.authority()))?;
        log::debug!("resolved {} to {addr}", target.authority());

        let tls = match target.scheme {
            Scheme::Http => None,
            Scheme::Https => Some(tls_connector(&cfg.cipher_suites)?),
        };

        let m = Self {
            addr,
            host: target.host.clone(),
            tls,
            tcp_no_delay: cfg.tcp_no_delay,
        };

        Ok(m)
    }

    /// Opens a new connection, performing the TLS handshake if required.
    pub async fn dial(&self) -> Result<Transport, Error> {
        let stream = TcpStream::connect(self.addr).await?;
        if self.tcp_no_delay {
            stream.set_nodelay(true)?;
        }

        let transport = match &self.tls {
            Some(tls) => {
                let ssl = tls.configure()?.verify_hostname(false).into_ssl(&self.host)?;
                let mut stream = SslStream::new(ssl, stream)?;
                Pin::new(&mut stream).connect().await?;

                Transport::Tls { stream }
            }
            None => Transport::Plain { stream },
        };

        Ok(transport)
    }
}

/// Builds a TLS client restricted to the given cipher suites.
///
/// Certificate verification, session tickets and session caching are off:
/// every handshake must be a full one, negotiated with one of the configured
/// suites only. TLS 1.3 is disabled, since its suites are configured
/// separately and would bypass the restriction.
fn tls_connector(suites: &[CipherSuite]) -> Result<SslConnector, Error> {
    let list = cipher::openssl_cipher_list(suites);

    let mut builder = SslConnector::builder(SslMethod::tls_client())?;
    builder.set_verify(SslVerifyMode::NONE);
    builder.set_options(SslOptions::NO_TICKET);
    builder.set_session_cache_mode(SslSessionCacheMode::OFF);
    builder.set_max_proto_version(Some(SslVersion::TLS1_2))?;
    builder
        .set_cipher_list(&list)
        .with_context(|| format!("none of the cipher suites '{list}' is supported by OpenSSL"))?;
    if suites.contains(&CipherSuite::TLS_FALLBACK_SCSV) {
        builder.set_mode(SslMode::SEND_FALLBACK_SCSV);
    }

    Ok(builder.build())
}

pin_project! {
    #[project = TransportProj]
    /// Plain or TLS stream.
    pub enum Transport {
        Plain {
            #[pin]
            stream: TcpStream,
        },
        Tls {
            #[pin]
            stream: SslStream<TcpStream>,
        },
    }
}

impl AsyncRead for Transport {
    #[inline]
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            TransportProj::Plain { stream } => stream.poll_read(cx, buf),
            TransportProj::Tls { stream } => stream.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    #[inline]
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.project() {
            TransportProj::Plain { stream } => stream.poll_write(cx, buf),
            TransportProj::Tls { stream } => stream.poll_write(cx, buf),
        }
    }

    #[inline]
    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            TransportProj::Plain { stream } => stream.poll_flush(cx),
            TransportProj::Tls { stream } => stream.poll_flush(cx),
        }
    }

    #[inline]
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            TransportProj::Plain { stream } => stream.poll_shutdown(cx),
            TransportProj::Tls { stream } => stream.poll_shutdown(cx),
        }
    }

    #[inline]
    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        match self.project() {
            TransportProj::Plain { stream } => stream.poll_write_vectored(cx, bufs),
            TransportProj::Tls { stream } => stream.poll_write_vectored(cx, bufs),
        }
    }

    #[inline]
    fn is_write_vectored(&self) -> bool {
        match self {
            Self::Plain { stream } => stream.is_write_vectored(),
            Self::Tls { stream } => stream.is_write_vectored(),
        }
    }
}

/// HTTP/1 session over an established transport.
pub struct Session {
    /// Request sender.
    pub sender: SendRequest<Full<Bytes>>,
    /// Task driving the connection I/O.
    driver: JoinHandle<()>,
}

impl Session {
    /// Binds an HTTP/1 client to the given transport.
    ///
    /// No I/O is performed here.
    pub async fn handshake(transport: Transport) -> Result<Self, Error> {
        let (sender, conn) = http1::handshake(TokioIo::new(transport)).await?;
        let driver = tokio::spawn(async move {
            if let Err(err) = conn.await {
                log::debug!("connection closed: {err}");
            }
        });

        Ok(Self { sender, driver })
    }
}

/// An established connection.
pub enum Link {
    /// Bare transport, used when no requests are issued.
    Bare(Transport),
    /// HTTP session.
    Http(Session),
}

impl Link {
    async fn close(self) {
        match self {
            Self::Bare(mut transport) => {
                if let Err(err) = transport.shutdown().await {
                    log::trace!("failed to shutdown connection: {err}");
                }
            }
            Self::Http(Session { sender, driver }) => {
                drop(sender);
                // Dropping the driver task drops the transport, closing it.
                driver.abort();
            }
        }
    }
}

/// Connection state owned by a single worker.
#[derive(Default)]
pub enum Connection {
    /// Never dialed, or explicitly closed.
    #[default]
    Unestablished,
    /// Ready to be used.
    Established(Link),
    /// The last use failed, must be re-established before the next use.
    Invalid,
}

impl Connection {
    #[inline]
    pub fn is_established(&self) -> bool {
        matches!(self, Self::Established(..))
    }

    /// Closes the connection if it is open, marking it as invalid.
    pub async fn invalidate(&mut self) {
        if let Self::Established(link) = core::mem::replace(self, Self::Invalid) {
            link.close().await;
        }
    }

    /// Closes the connection if it is open.
    pub async fn close(&mut self) {
        if !self.is_established() {
            return;
        }

        if let Self::Established(link) = core::mem::take(self) {
            link.close().await;
        }
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::*;
    use crate::cmd::Cmd;

    fn config(url: &str, suites: &str) -> RunConfig {
        let cmd = Cmd::try_parse_from(["shake", "-u", url, "-r", "1", "-s", suites]).unwrap();
        RunConfig::try_from(cmd).unwrap()
    }

    #[test]
    fn test_plain_connector() {
        let connector = Connector::new(&config("http://127.0.0.1:8080/", "TLS_RSA_WITH_AES_128_CBC_SHA")).unwrap();

        assert_eq!("127.0.0.1:8080".parse::<SocketAddr>().unwrap(), connector.addr);
        assert!(connector.tls.is_none());
    }

    #[test]
    fn test_tls_connector() {
        let connector = Connector::new(&config(
            "https://127.0.0.1:8443/",
            "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,TLS_FALLBACK_SCSV",
        ))
        .unwrap();

        assert!(connector.tls.is_some());
    }

    #[test]
    fn test_dial_refused() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let connector = Connector::new(&config(
            &format!("http://{addr}/"),
            "TLS_RSA_WITH_AES_128_CBC_SHA",
        ))
        .unwrap();

        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        assert!(rt.block_on(connector.dial()).is_err());
    }

    #[test]
    fn test_connection_states() {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();

            let mut conn = Connection::default();
            assert!(!conn.is_established());

            let stream = TcpStream::connect(addr).await.unwrap();
            conn = Connection::Established(Link::Bare(Transport::Plain { stream }));
            assert!(conn.is_established());

            conn.invalidate().await;
            assert!(matches!(conn, Connection::Invalid));

            conn.close().await;
            assert!(matches!(conn, Connection::Invalid));

            let stream = TcpStream::connect(addr).await.unwrap();
            conn = Connection::Established(Link::Bare(Transport::Plain { stream }));
            conn.close().await;
            assert!(matches!(conn, Connection::Unestablished));
        });
    }
}
