//! Scan events and the sinks that receive them.
//!
//! Workers call [`ProgressReporter::report`] inline, so implementations must
//! return quickly. The usual sink is a `tokio::sync::mpsc::UnboundedSender`
//! drained by whatever transport the caller owns.

use super::traits::PortResult;
use serde::Serialize;
use tokio::sync::mpsc;

/// Something that happened during a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    /// Free-form status line.
    Log { message: String },
    /// A port accepted a connection.
    PortFound {
        port: u16,
        service: String,
        banner: String,
    },
    /// Emitted each time the completed-job count reaches a multiple of ten.
    Progress {
        current: usize,
        total: usize,
        port: u16,
    },
    /// All jobs drained; results sorted by port.
    Complete {
        total_open: usize,
        results: Vec<PortResult>,
    },
}

impl ScanEvent {
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
        }
    }

    pub fn port_found(result: &PortResult) -> Self {
        Self::PortFound {
            port: result.port.as_u16(),
            service: result.service.clone(),
            banner: result.banner.clone(),
        }
    }

    pub fn complete(results: Vec<PortResult>) -> Self {
        Self::Complete {
            total_open: results.len(),
            results,
        }
    }
}

/// One-way sink for scan events.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ScanEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _event: ScanEvent) {}
}

impl ProgressReporter for mpsc::UnboundedSender<ScanEvent> {
    fn report(&self, event: ScanEvent) {
        // A dropped receiver means nobody is listening any more.
        let _ = self.send(event);
    }
}

/// Adapts a closure into a reporter.
pub struct FnReporter<F>(pub F);

impl<F> ProgressReporter for FnReporter<F>
where
    F: Fn(ScanEvent) + Send + Sync,
{
    fn report(&self, event: ScanEvent) {
        (self.0)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Port;
    use std::sync::Mutex;

    #[test]
    fn test_event_wire_format() {
        let event = ScanEvent::Progress {
            current: 10,
            total: 23,
            port: 443,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"progress","current":10,"total":23,"port":443}"#);

        let json = serde_json::to_value(ScanEvent::log("Resolving target")).unwrap();
        assert_eq!(json["event"], "log");
        assert_eq!(json["message"], "Resolving target");
    }

    #[test]
    fn test_complete_counts_results() {
        let results = vec![
            PortResult::new(Port::new(22).unwrap(), "SSH-2.0"),
            PortResult::new(Port::new(80).unwrap(), "HTTP/1.1 200 OK"),
        ];
        match ScanEvent::complete(results) {
            ScanEvent::Complete { total_open, results } => {
                assert_eq!(total_open, 2);
                assert_eq!(results[1].port.as_u16(), 80);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_channel_reporter_survives_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.report(ScanEvent::log("first"));
        drop(rx);
        tx.report(ScanEvent::log("second"));
    }

    #[test]
    fn test_fn_reporter() {
        let seen = Mutex::new(Vec::new());
        let reporter = FnReporter(|event: ScanEvent| seen.lock().unwrap().push(event));
        reporter.report(ScanEvent::log("hello"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
