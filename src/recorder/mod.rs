//! Live stream recording.
//!
//! Frames arrive through a [`StreamSource`]; each recording runs as a
//! [`RecordingSession`] on a blocking task and writes rotating segments plus
//! one playlist per stream and day:
//!
//! ```text
//! <base>/<stream>/<yyyymmdd>.m3u8
//! <base>/<stream>/<yyyy-mm>/<dd>/<unix>.ts
//! ```
//!
//! The [`RecordingManager`] owns the [`SessionRegistry`] and starts, stops and
//! lists sessions.

pub mod clock;
pub mod formatter;
pub mod frame;
pub mod hub;
pub mod manager;
pub mod registry;
pub mod session;
pub mod stall;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use formatter::{formatter_for, SegmentFormatter, TsFormatter};
pub use frame::{Frame, FrameSource, SourceClosed};
pub use hub::{FrameHub, StreamSource};
pub use manager::{RecorderSettings, RecordingManager, SessionInfo, StartRequest};
pub use registry::{session_id, SessionHandle, SessionRegistry, SessionState};
pub use session::{should_cut, FrameKind, RecordingSession, SessionConfig};
pub use store::{DayPlaylist, PlaylistStore};
