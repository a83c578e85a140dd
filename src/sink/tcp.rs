//! TCP Cursor-on-Target sink

use crate::core::ServerEndpoint;
use crate::sink::cot::encode_event;
use crate::sink::{PositionReport, ReportSink, SinkError, SinkResult};
use chrono::Utc;
use log::debug;
use std::io::{BufWriter, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Sink streaming CoT events to a TAK server over TCP
pub struct TcpCotSink {
    stream: Option<BufWriter<TcpStream>>,
    connect_timeout: Duration,
    write_timeout: Duration,
    reports_sent: u64,
}

impl TcpCotSink {
    pub fn new() -> Self {
        Self {
            stream: None,
            connect_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            reports_sent: 0,
        }
    }

    pub fn with_timeouts(mut self, connect_timeout: Duration, write_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.write_timeout = write_timeout;
        self
    }

    pub fn reports_sent(&self) -> u64 {
        self.reports_sent
    }

    fn connect(&self, endpoint: &ServerEndpoint) -> SinkResult<TcpStream> {
        let connection_failed = |reason: String| SinkError::ConnectionFailed {
            endpoint: endpoint.to_string(),
            reason,
        };

        let addrs = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|e| connection_failed(e.to_string()))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_write_timeout(Some(self.write_timeout))
                        .map_err(|e| connection_failed(e.to_string()))?;
                    stream
                        .set_nodelay(true)
                        .map_err(|e| connection_failed(e.to_string()))?;
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(connection_failed(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "host resolved to no addresses".to_string()),
        ))
    }
}

impl Default for TcpCotSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSink for TcpCotSink {
    fn open(&mut self, endpoint: &ServerEndpoint) -> SinkResult<()> {
        let stream = self.connect(endpoint)?;
        debug!("Connected to tracking server at {}", endpoint);
        self.stream = Some(BufWriter::new(stream));
        Ok(())
    }

    fn send(&mut self, report: &PositionReport) -> SinkResult<()> {
        let stream = self.stream.as_mut().ok_or(SinkError::NotConnected)?;
        let event = encode_event(report, Utc::now())?;
        stream
            .write_all(event.as_bytes())
            .map_err(|e| SinkError::SendFailed {
                reason: e.to_string(),
            })?;
        self.reports_sent += 1;
        Ok(())
    }

    fn flush(&mut self) -> SinkResult<()> {
        let stream = self.stream.as_mut().ok_or(SinkError::NotConnected)?;
        stream.flush().map_err(|e| SinkError::FlushFailed {
            reason: e.to_string(),
        })
    }

    fn close(&mut self) -> SinkResult<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        stream.flush().map_err(|e| SinkError::CloseFailed {
            reason: e.to_string(),
        })?;
        stream
            .get_ref()
            .shutdown(Shutdown::Both)
            .map_err(|e| SinkError::CloseFailed {
                reason: e.to_string(),
            })
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}
