//! Match recording for Arenaflow.
//!
//! A [`MatchRecorder`] samples every participant's position and health on
//! a game-tick timer. [`MatchRecorder::save`] encodes the samples as a
//! [`MatchRecord`] and hands the text to a [`RecordSink`];
//! [`MatchRecord::parse`] reads it back for replay.

mod config;
mod error;
mod record;
mod recorder;
mod sink;

pub use config::RecorderConfig;
pub use error::RecordError;
pub use record::{Frame, MatchRecord, RECORD_VERSION};
pub use recorder::MatchRecorder;
pub use sink::{DirectorySink, RecordSink};
