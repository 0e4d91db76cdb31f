//! In-process publish/subscribe wiring between live streams and recorders.

use super::frame::{Frame, FrameSource};
use dashmap::DashMap;
use hlsvault_common::Result;
use hlsvault_media::Tracks;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

/// Frames queued per subscriber before `send` blocks the publisher.
pub const FRAME_QUEUE_CAPACITY: usize = 1024;

/// Something a recording session can subscribe to.
pub trait StreamSource: Send + Sync {
    /// Subscribe to the frames of `stream_path`.
    fn subscribe(&self, stream_path: &str) -> Result<Box<dyn FrameSource>>;
}

#[derive(Clone)]
struct Subscriber {
    id: u64,
    tx: mpsc::SyncSender<Frame>,
}

/// Fan-out hub delivering published frames to every subscriber.
///
/// Subscribing before a stream is published is allowed; the subscriber
/// receives the track announcement once the stream appears. A late
/// subscriber receives the current announcement immediately.
///
/// Each subscriber has a bounded queue. A full queue blocks [`FrameHub::send`]
/// until the session catches up, so a slow writer slows the publisher.
#[derive(Clone)]
pub struct FrameHub {
    subscribers: Arc<DashMap<String, Vec<Subscriber>>>,
    published: Arc<DashMap<String, Tracks>>,
    next_id: Arc<AtomicU64>,
    capacity: usize,
}

impl Default for FrameHub {
    fn default() -> Self {
        Self::with_capacity(FRAME_QUEUE_CAPACITY)
    }
}

impl FrameHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hub whose subscribers queue at most `capacity` frames each.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            published: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(0)),
            capacity: capacity.max(1),
        }
    }

    /// Announce a stream and its tracks.
    pub fn publish(&self, stream_path: &str, tracks: Tracks) {
        self.published.insert(stream_path.to_string(), tracks);
        let delivered = self.send(stream_path, Frame::SessionStart(tracks));
        tracing::info!(
            stream_path = %stream_path,
            subscribers = delivered,
            "Stream published"
        );
    }

    /// Deliver a frame to every live subscriber of `stream_path`.
    ///
    /// Blocks while a subscriber's queue is full. Returns the number of
    /// subscribers reached. Subscribers that have gone away are dropped.
    pub fn send(&self, stream_path: &str, frame: Frame) -> usize {
        // Sending happens outside the map guard so a blocked send does not
        // hold up other streams or new subscribers.
        let targets: Vec<Subscriber> = match self.subscribers.get(stream_path) {
            Some(subscribers) => subscribers.clone(),
            None => return 0,
        };

        let mut gone = Vec::new();
        for subscriber in &targets {
            if subscriber.tx.send(frame.clone()).is_err() {
                gone.push(subscriber.id);
            }
        }

        if !gone.is_empty() {
            if let Some(mut subscribers) = self.subscribers.get_mut(stream_path) {
                subscribers.retain(|s| !gone.contains(&s.id));
            }
        }
        targets.len() - gone.len()
    }

    /// End a stream: subscribers see their source close.
    pub fn close(&self, stream_path: &str) {
        self.published.remove(stream_path);
        if let Some((_, subscribers)) = self.subscribers.remove(stream_path) {
            tracing::info!(
                stream_path = %stream_path,
                subscribers = subscribers.len(),
                "Stream closed"
            );
        }
    }

    /// Whether `stream_path` is currently published.
    pub fn is_published(&self, stream_path: &str) -> bool {
        self.published.contains_key(stream_path)
    }

    /// Paths of all published streams.
    pub fn streams(&self) -> Vec<String> {
        let mut streams: Vec<String> = self
            .published
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        streams.sort();
        streams
    }

    /// Number of live subscribers of `stream_path`.
    pub fn subscriber_count(&self, stream_path: &str) -> usize {
        self.subscribers
            .get(stream_path)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }
}

impl StreamSource for FrameHub {
    fn subscribe(&self, stream_path: &str) -> Result<Box<dyn FrameSource>> {
        let (tx, rx) = mpsc::sync_channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // The announcement check and the registration share the entry guard,
        // so a concurrent publish either is seen here or sees this subscriber.
        let mut entry = self.subscribers.entry(stream_path.to_string()).or_default();
        if let Some(tracks) = self.published.get(stream_path) {
            // The queue is empty and the receiver alive, so this cannot fail.
            let _ = tx.try_send(Frame::SessionStart(*tracks));
        }
        entry.push(Subscriber { id, tx });
        drop(entry);

        tracing::debug!(stream_path = %stream_path, "Subscribed to stream");
        Ok(Box::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlsvault_common::AudioCodec;
    use hlsvault_media::AudioFrame;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_millis(50);

    #[test]
    fn test_subscribe_before_publish() {
        let hub = FrameHub::new();
        let mut source = hub.subscribe("live/a").unwrap();
        assert_eq!(source.next_frame(WAIT), Ok(None));

        let tracks = Tracks::audio_only(AudioCodec::Aac);
        hub.publish("live/a", tracks);
        assert_eq!(
            source.next_frame(WAIT),
            Ok(Some(Frame::SessionStart(tracks)))
        );
    }

    #[test]
    fn test_late_subscriber_gets_announcement() {
        let hub = FrameHub::new();
        let tracks = Tracks::audio_only(AudioCodec::Pcmu);
        hub.publish("live/a", tracks);

        let mut source = hub.subscribe("live/a").unwrap();
        assert_eq!(
            source.next_frame(WAIT),
            Ok(Some(Frame::SessionStart(tracks)))
        );
        assert!(hub.is_published("live/a"));
        assert_eq!(hub.streams(), vec!["live/a".to_string()]);
    }

    #[test]
    fn test_send_and_close() {
        let hub = FrameHub::new();
        let mut first = hub.subscribe("live/a").unwrap();
        let second = hub.subscribe("live/a").unwrap();
        drop(second);

        let frame = Frame::Audio(AudioFrame::new(10, vec![1u8, 2, 3]));
        assert_eq!(hub.send("live/a", frame.clone()), 1);
        assert_eq!(hub.subscriber_count("live/a"), 1);
        assert_eq!(first.next_frame(WAIT), Ok(Some(frame)));

        hub.close("live/a");
        assert!(first.next_frame(WAIT).is_err());
        assert_eq!(hub.send("live/a", Frame::Stop), 0);
    }

    #[test]
    fn test_full_queue_blocks_publisher() {
        let hub = FrameHub::with_capacity(2);
        let mut source = hub.subscribe("live/a").unwrap();
        let frame = Frame::Audio(AudioFrame::new(0, vec![0u8; 1024]));

        assert_eq!(hub.send("live/a", frame.clone()), 1);
        assert_eq!(hub.send("live/a", frame.clone()), 1);

        let (done_tx, done_rx) = mpsc::channel();
        let publisher = {
            let hub = hub.clone();
            let frame = frame.clone();
            std::thread::spawn(move || {
                let delivered = hub.send("live/a", frame);
                done_tx.send(delivered).unwrap();
            })
        };
        assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());

        // Draining one frame lets the blocked send through.
        assert_eq!(source.next_frame(WAIT), Ok(Some(frame)));
        assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(1));
        publisher.join().unwrap();
    }

    #[test]
    fn test_dropped_subscriber_unblocks_publisher() {
        let hub = FrameHub::with_capacity(1);
        let source = hub.subscribe("live/a").unwrap();
        assert_eq!(hub.send("live/a", Frame::Stop), 1);

        let publisher = {
            let hub = hub.clone();
            std::thread::spawn(move || hub.send("live/a", Frame::Stop))
        };
        std::thread::sleep(Duration::from_millis(50));
        drop(source);

        assert_eq!(publisher.join().unwrap(), 0);
        assert_eq!(hub.subscriber_count("live/a"), 0);
    }

    #[test]
    fn test_concurrent_publish_always_announces() {
        for _ in 0..100 {
            let hub = FrameHub::new();
            let tracks = Tracks::audio_only(AudioCodec::Aac);
            let publisher = {
                let hub = hub.clone();
                std::thread::spawn(move || hub.publish("live/a", tracks))
            };
            let mut source = hub.subscribe("live/a").unwrap();
            publisher.join().unwrap();

            assert_eq!(
                source.next_frame(WAIT),
                Ok(Some(Frame::SessionStart(tracks)))
            );
        }
    }
}
