use crossbeam_channel::Sender;
use globe_surface::{DisplacementMap, SurfaceError};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::file::FileTransport;
use crate::procedural::ProceduralTransport;

/// Opaque identifier of an elevation source, passed through to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetSource(pub String);

impl AssetSource {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the first `:`, when it looks like a URI scheme.
    pub fn scheme(&self) -> Option<&str> {
        let (scheme, _) = self.0.split_once(':')?;
        // a single letter is a Windows drive, not a scheme
        (scheme.len() > 1 && scheme.chars().all(|c| c.is_ascii_alphanumeric())).then_some(scheme)
    }

    /// Everything after the scheme, or the whole string without one.
    pub fn location(&self) -> &str {
        match self.scheme() {
            Some(scheme) => &self.0[scheme.len() + 1..],
            None => &self.0,
        }
    }
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a transport reports back about one fetch.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// `total` is `None` (or zero) when the size is unknown.
    Progress { loaded: u64, total: Option<u64> },
    Complete(DisplacementMap),
    Failed(String),
}

/// Errors a transport can hit while producing elevation data.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("invalid elevation data: {0}")]
    Surface(#[from] SurfaceError),
    #[error("malformed source {0}")]
    MalformedSource(String),
}

/// Write end of one fetch. `complete` and `fail` consume the sink, so a
/// transport can finish a fetch only once and cannot report progress after.
#[derive(Debug)]
pub struct FetchSink {
    sender: Sender<TransportEvent>,
}

impl FetchSink {
    pub fn new(sender: Sender<TransportEvent>) -> Self {
        Self { sender }
    }

    pub fn progress(&self, loaded: u64, total: Option<u64>) {
        self.send(TransportEvent::Progress { loaded, total });
    }

    pub fn complete(self, data: DisplacementMap) {
        self.send(TransportEvent::Complete(data));
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.send(TransportEvent::Failed(reason.into()));
    }

    fn send(&self, event: TransportEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("elevation pipeline dropped; transport event discarded");
        }
    }
}

/// Asset transport collaborator. `fetch` must return without blocking on the
/// download; results go through the sink.
pub trait Transport {
    fn fetch(&mut self, source: &AssetSource, sink: FetchSink);
}

/// Transport that parks every request until the caller finishes it by hand.
/// Stands in for the network in tests and headless runs.
#[derive(Debug, Default)]
pub struct ManualTransport {
    pending: Vec<(AssetSource, FetchSink)>,
}

impl ManualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Take the oldest parked request.
    pub fn take(&mut self) -> Option<(AssetSource, FetchSink)> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }
}

impl Transport for ManualTransport {
    fn fetch(&mut self, source: &AssetSource, sink: FetchSink) {
        tracing::debug!(%source, "fetch parked");
        self.pending.push((source.clone(), sink));
    }
}

/// Routes `procedural:` sources to [`ProceduralTransport`] and everything
/// else (plain paths or `file:`) to [`FileTransport`].
#[derive(Debug, Default)]
pub struct SchemeTransport {
    pub file: FileTransport,
    pub procedural: ProceduralTransport,
}

impl Transport for SchemeTransport {
    fn fetch(&mut self, source: &AssetSource, sink: FetchSink) {
        match source.scheme() {
            Some("procedural") => self.procedural.fetch(source, sink),
            Some("file") | None => self.file.fetch(source, sink),
            Some(other) => {
                tracing::warn!(%source, scheme = other, "no transport for scheme");
                sink.fail(format!("unsupported scheme {other}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_and_location() {
        let s = AssetSource::new("procedural:42");
        assert_eq!(s.scheme(), Some("procedural"));
        assert_eq!(s.location(), "42");

        let p = AssetSource::new("assets/earth_height.png");
        assert_eq!(p.scheme(), None);
        assert_eq!(p.location(), "assets/earth_height.png");

        let w = AssetSource::new("C:/maps/height.png");
        assert_eq!(w.scheme(), None);
    }

    #[test]
    fn sink_delivers_in_order() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink = FetchSink::new(tx);
        sink.progress(10, Some(100));
        sink.fail("boom");
        let events: Vec<TransportEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            TransportEvent::Progress {
                loaded: 10,
                total: Some(100)
            }
        ));
        assert!(matches!(&events[1], TransportEvent::Failed(r) if r == "boom"));
    }

    #[test]
    fn sink_tolerates_dropped_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        FetchSink::new(tx).complete(DisplacementMap::flat(1, 1, 0.0).unwrap());
    }

    #[test]
    fn manual_transport_parks_requests() {
        let mut transport = ManualTransport::new();
        let (tx, _rx) = crossbeam_channel::unbounded();
        transport.fetch(&AssetSource::new("a"), FetchSink::new(tx));
        assert_eq!(transport.pending_count(), 1);
        let (source, _sink) = transport.take().unwrap();
        assert_eq!(source.as_str(), "a");
        assert!(transport.take().is_none());
    }

    #[test]
    fn unknown_scheme_fails_immediately() {
        let mut transport = SchemeTransport::default();
        let (tx, rx) = crossbeam_channel::unbounded();
        transport.fetch(&AssetSource::new("ftp://host/x.png"), FetchSink::new(tx));
        assert!(matches!(rx.try_recv(), Ok(TransportEvent::Failed(_))));
    }
}
