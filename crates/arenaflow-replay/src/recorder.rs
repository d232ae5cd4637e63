//! Frame capture for one arena.

use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use arenaflow_protocol::{Notice, Notifier, Participant, PlayerId};
use arenaflow_tick::{Scheduler, TaskId};
use chrono::{Local, Utc};
use tracing::{debug, error, info, warn};

use crate::{Frame, MatchRecord, RecordError, RecordSink, RecorderConfig};

/// Samples position and health of every participant at a fixed interval.
///
/// Participants are not stored: the host passes the current participant
/// set to every call that needs it, usually straight from the arena.
pub struct MatchRecorder {
    minigame: String,
    arena: String,
    config: RecorderConfig,
    frames: VecDeque<Frame>,
    names: BTreeMap<PlayerId, String>,
    ids: BTreeMap<PlayerId, u32>,
    next_local_id: u32,
    task: Option<TaskId>,
    overflow_warned: bool,
    scheduler: Arc<dyn Scheduler>,
    notifier: Arc<dyn Notifier>,
}

impl MatchRecorder {
    pub fn new(
        minigame: impl Into<String>,
        arena: impl Into<String>,
        config: RecorderConfig,
        scheduler: Arc<dyn Scheduler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            minigame: minigame.into(),
            arena: arena.into(),
            config: config.validated(),
            frames: VecDeque::new(),
            names: BTreeMap::new(),
            ids: BTreeMap::new(),
            next_local_id: 1,
            task: None,
            overflow_warned: false,
            scheduler,
            notifier,
        }
    }

    /// Whether a capture task is running.
    pub fn is_enabled(&self) -> bool {
        self.task.is_some()
    }

    pub fn frames(&self) -> impl ExactSizeIterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn names(&self) -> &BTreeMap<PlayerId, String> {
        &self.names
    }

    pub fn local_ids(&self) -> &BTreeMap<PlayerId, u32> {
        &self.ids
    }

    /// Starts sampling. The first frame is taken on the next tick.
    pub fn start_capturing<'a, P: Participant + 'a>(
        &mut self,
        participants: impl IntoIterator<Item = &'a P>,
    ) -> Result<(), RecordError> {
        if self.task.is_some() {
            return Err(RecordError::AlreadyCapturing);
        }
        let mut audience = Vec::new();
        for p in participants {
            self.local_id(p);
            audience.push(p.id());
        }
        audience.sort_unstable();

        self.notifier.broadcast(&audience, &Notice::RecordingWarning);
        self.notifier.broadcast(&audience, &Notice::RecordingStarted);

        let task = self
            .scheduler
            .schedule_repeating(0, self.config.interval_ticks);
        self.task = Some(task);
        info!(
            arena = %self.arena,
            interval = self.config.interval_ticks,
            players = audience.len(),
            %task,
            "recording started"
        );
        Ok(())
    }

    /// Appends one frame with every participant in `participants`.
    pub fn capture_frame<'a, P: Participant + 'a>(
        &mut self,
        participants: impl IntoIterator<Item = &'a P>,
    ) {
        let mut frame = Frame {
            tick: self.scheduler.now(),
            ..Frame::default()
        };
        for p in participants {
            let id = self.local_id(p);
            frame.positions.insert(id, p.location());
            frame.health.insert(id, p.health());
        }

        if self.frames.len() >= self.config.max_frames {
            if !self.overflow_warned {
                warn!(
                    arena = %self.arena,
                    max_frames = self.config.max_frames,
                    "frame buffer full, dropping oldest frames"
                );
                self.overflow_warned = true;
            }
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Captures a frame if `task` is the capture task. Returns whether the
    /// task belonged to the recorder.
    pub fn run_task<'a, P: Participant + 'a>(
        &mut self,
        task: TaskId,
        participants: impl IntoIterator<Item = &'a P>,
    ) -> bool {
        if self.task != Some(task) {
            return false;
        }
        self.capture_frame(participants);
        true
    }

    /// Stops sampling and tells `audience`. Returns whether it was running.
    pub fn stop_capturing(&mut self, audience: &[PlayerId]) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        self.scheduler.cancel(task);
        self.notifier.broadcast(audience, &Notice::RecordingStopped);
        info!(arena = %self.arena, frames = self.frames.len(), "recording stopped");
        true
    }

    /// Snapshot of everything recorded so far.
    pub fn to_record(&self) -> MatchRecord {
        MatchRecord {
            interval: self.config.interval_ticks,
            minigame: self.minigame.clone(),
            arena: self.arena.clone(),
            date: Utc::now(),
            names: self.names.clone(),
            ids: self.ids.clone(),
            frames: self.frames.iter().cloned().collect(),
        }
    }

    /// Writes the recording to `sink` as a new artifact named
    /// `dd-mm-yyyy-HH-MM-SS-<arena>`. Frames stay in memory either way.
    pub fn save<S: RecordSink + ?Sized>(&self, sink: &S) -> Result<PathBuf, RecordError> {
        let started = Instant::now();
        info!(arena = %self.arena, frames = self.frames.len(), "saving recording");

        let name = format!(
            "{}-{}",
            Local::now().format("%d-%m-%Y-%H-%M-%S"),
            self.arena.to_lowercase()
        );
        let text = self.to_record().encode();
        match sink.write_new(&name, text.as_bytes()) {
            Ok(path) => {
                info!(
                    arena = %self.arena,
                    path = %path.display(),
                    bytes = text.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "recording saved"
                );
                Ok(path)
            }
            Err(e) => {
                error!(arena = %self.arena, %name, error = %e, "failed to save recording");
                Err(RecordError::Io(e))
            }
        }
    }

    /// Drops all frames and tables and cancels capture.
    pub fn reset(&mut self) {
        if let Some(task) = self.task.take() {
            self.scheduler.cancel(task);
        }
        self.frames.clear();
        self.names.clear();
        self.ids.clear();
        self.next_local_id = 1;
        self.overflow_warned = false;
        debug!(arena = %self.arena, "recorder reset");
    }

    fn local_id<P: Participant>(&mut self, p: &P) -> u32 {
        if let Some(id) = self.ids.get(&p.id()) {
            return *id;
        }
        let id = self.next_local_id;
        self.next_local_id += 1;
        self.ids.insert(p.id(), id);
        self.names.insert(p.id(), p.name().to_owned());
        id
    }
}
