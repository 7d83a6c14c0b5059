//! libcurl-backed transport: one blocking Easy handle per call.

use std::cell::Cell;
use std::time::Duration;

use super::{parse, status_acceptable, BodySink, FetchRange, ProbeResult, Transport, TransportError};

/// Per-handle curl tuning. Low-speed abort keeps large transfers on slow links
/// from being killed by a hard wall-clock timeout while still detecting stalls.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort if throughput drops below this many bytes/sec...
    pub low_speed_limit: u32,
    /// ...for this long.
    pub low_speed_time: Duration,
    /// Hard ceiling so a completely stuck transfer eventually fails.
    pub transfer_timeout: Duration,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            transfer_timeout: Duration::from_secs(3600),
        }
    }
}

/// Blocking HTTP transport over libcurl.
pub struct CurlTransport {
    opts: CurlOptions,
}

impl CurlTransport {
    pub fn new(opts: CurlOptions) -> Self {
        Self { opts }
    }

    fn configure(&self, easy: &mut curl::easy::Easy, url: &str) -> Result<(), TransportError> {
        easy.url(url).map_err(conn)?;
        easy.follow_location(true).map_err(conn)?;
        easy.max_redirections(10).map_err(conn)?;
        easy.connect_timeout(self.opts.connect_timeout).map_err(conn)?;
        easy.low_speed_limit(self.opts.low_speed_limit).map_err(conn)?;
        easy.low_speed_time(self.opts.low_speed_time).map_err(conn)?;
        easy.timeout(self.opts.transfer_timeout).map_err(conn)?;
        Ok(())
    }
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new(CurlOptions::default())
    }
}

fn conn(e: curl::Error) -> TransportError {
    TransportError::Connection(e.to_string())
}

impl Transport for CurlTransport {
    fn probe(&self, url: &str) -> Result<ProbeResult, TransportError> {
        let mut easy = curl::easy::Easy::new();
        self.configure(&mut easy, url)?;
        easy.nobody(true).map_err(conn)?; // HEAD request

        let mut lines: Vec<String> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(s) = std::str::from_utf8(data) {
                        lines.push(s.trim_end().to_string());
                    }
                    true
                })
                .map_err(conn)?;
            transfer.perform().map_err(conn)?;
        }

        let code = easy.response_code().map_err(conn)? as u32;
        if !status_acceptable(code, false) {
            return Err(TransportError::Status(code));
        }
        Ok(parse::parse_probe_headers(&lines))
    }

    fn fetch(
        &self,
        url: &str,
        range: Option<FetchRange>,
        sink: &mut BodySink<'_>,
    ) -> Result<(), TransportError> {
        let mut easy = curl::easy::Easy::new();
        self.configure(&mut easy, url)?;
        let ranged = range.is_some();
        if let Some(r) = range {
            easy.range(&r.curl_value()).map_err(conn)?;
        }

        // Status of the response currently being delivered; body callbacks for
        // an unacceptable status must abort before any byte reaches the sink.
        let status = Cell::new(0u32);
        let sink_stopped = Cell::new(false);
        let bad_status = Cell::new(false);
        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Some(code) = std::str::from_utf8(data)
                        .ok()
                        .and_then(parse::parse_status_line)
                    {
                        status.set(code);
                    }
                    true
                })
                .map_err(conn)?;
            transfer
                .write_function(|data| {
                    if !status_acceptable(status.get(), ranged) {
                        bad_status.set(true);
                        return Ok(0);
                    }
                    if sink(data) {
                        Ok(data.len())
                    } else {
                        sink_stopped.set(true);
                        Ok(0)
                    }
                })
                .map_err(conn)?;

            if let Err(e) = transfer.perform() {
                if e.is_write_error() {
                    if sink_stopped.get() {
                        return Err(TransportError::Aborted);
                    }
                    if bad_status.get() {
                        return Err(TransportError::Status(status.get()));
                    }
                }
                return Err(conn(e));
            }
        }

        let code = easy.response_code().map_err(conn)? as u32;
        if !status_acceptable(code, ranged) {
            return Err(TransportError::Status(code));
        }
        Ok(())
    }
}
