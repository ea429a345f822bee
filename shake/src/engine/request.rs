use std::io::Write;

use anyhow::Error;
use bytes::Bytes;
use http::{header, HeaderValue, Request};
use http_body_util::{BodyExt, Full};

use crate::{cfg::RunConfig, engine::conn::Session, stat::Response};

/// Builds the request sent on each iteration.
///
/// Configured headers are sent as is, except "Host", which is always set to
/// the effective host, replacing every configured value.
pub fn build_request(cfg: &RunConfig) -> Result<Request<Full<Bytes>>, Error> {
    let mut request = Request::builder()
        .method(cfg.method.clone())
        .uri(cfg.target.path.as_str())
        .body(Full::new(cfg.body.clone()))?;

    let headers = request.headers_mut();
    for (name, value) in &cfg.headers {
        headers.append(name, value.clone());
    }
    headers.insert(header::HOST, HeaderValue::from_str(&cfg.effective_host())?);

    Ok(request)
}

/// Sends the request over the given session and consumes the response.
///
/// The body is either printed to stdout or drained frame by frame, so the
/// connection stays usable for the next request.
pub async fn issue(session: &mut Session, request: Request<Full<Bytes>>, print_body: bool) -> Result<Response, Error> {
    session.sender.ready().await?;
    let mut resp = session.sender.send_request(request).await?;

    let status = resp.status();
    let content_length = resp
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    let servers = resp
        .headers()
        .get_all(header::SERVER)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();

    let bytes_rx = if print_body {
        let body = resp.into_body().collect().await?.to_bytes();
        if !body.is_empty() {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body)?;
            stdout.write_all(b"\n")?;
        }
        body.len() as u64
    } else {
        let mut bytes_rx = 0;
        while let Some(frame) = resp.frame().await {
            if let Some(data) = frame?.data_ref() {
                bytes_rx += data.len() as u64;
            }
        }
        bytes_rx
    };

    let m = Response {
        status,
        content_length,
        servers,
        bytes_rx,
    };

    Ok(m)
}
