//! In-memory transport for engine tests: serves a fixed body, honors ranges,
//! and injects failures and latency on demand.

use std::time::Duration;

use crate::transport::{BodySink, FetchRange, ProbeResult, Transport, TransportError};

pub(crate) struct FakeTransport {
    body: Vec<u8>,
    accepts_ranges: bool,
    advertise_length: bool,
    chunk: usize,
    delay: Option<Duration>,
    /// Fail a fetch with a connection error after delivering this many bytes.
    fail_after: Option<u64>,
    /// Fail the probe with this HTTP status.
    probe_error: Option<u32>,
}

impl FakeTransport {
    pub(crate) fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            accepts_ranges: true,
            advertise_length: true,
            chunk: 8192,
            delay: None,
            fail_after: None,
            probe_error: None,
        }
    }

    /// Server without `Accept-Ranges: bytes`.
    pub(crate) fn without_ranges(mut self) -> Self {
        self.accepts_ranges = false;
        self
    }

    /// Server that omits `Content-Length`.
    pub(crate) fn without_length(mut self) -> Self {
        self.advertise_length = false;
        self
    }

    /// Deliver the body in increments of `n` bytes.
    pub(crate) fn chunked(mut self, n: usize) -> Self {
        self.chunk = n.max(1);
        self
    }

    /// Sleep between increments; makes transfers slow enough to pause.
    pub(crate) fn delayed(mut self, per_chunk: Duration) -> Self {
        self.delay = Some(per_chunk);
        self
    }

    /// Break the connection after `n` delivered bytes (per fetch).
    pub(crate) fn failing_after(mut self, n: u64) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Answer the probe with an error status.
    pub(crate) fn probe_failure(mut self, code: u32) -> Self {
        self.probe_error = Some(code);
        self
    }
}

impl Transport for FakeTransport {
    fn probe(&self, _url: &str) -> Result<ProbeResult, TransportError> {
        if let Some(code) = self.probe_error {
            return Err(TransportError::Status(code));
        }
        Ok(ProbeResult {
            total_bytes: self.advertise_length.then(|| self.body.len() as u64),
            accepts_ranges: self.accepts_ranges,
        })
    }

    fn fetch(
        &self,
        _url: &str,
        range: Option<FetchRange>,
        sink: &mut BodySink<'_>,
    ) -> Result<(), TransportError> {
        let len = self.body.len() as u64;
        let (start, end_excl) = match range {
            None => (0, len),
            Some(FetchRange::Bounded { start, end }) => {
                if !self.accepts_ranges {
                    // A server without range support ignores the header and
                    // replies 200; the client treats that as a status error.
                    return Err(TransportError::Status(200));
                }
                if start > end || end >= len {
                    return Err(TransportError::Status(416));
                }
                (start, end + 1)
            }
            Some(FetchRange::From { start }) => {
                if !self.accepts_ranges {
                    return Err(TransportError::Status(200));
                }
                if start >= len {
                    return Err(TransportError::Status(416));
                }
                (start, len)
            }
        };

        let mut delivered = 0u64;
        for chunk in self.body[start as usize..end_excl as usize].chunks(self.chunk) {
            if let Some(limit) = self.fail_after {
                if delivered >= limit {
                    return Err(TransportError::Connection(
                        "injected connection failure".into(),
                    ));
                }
            }
            if let Some(d) = self.delay {
                std::thread::sleep(d);
            }
            if !sink(chunk) {
                return Err(TransportError::Aborted);
            }
            delivered += chunk.len() as u64;
        }
        Ok(())
    }
}
