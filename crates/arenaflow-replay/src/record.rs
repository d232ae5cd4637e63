//! The match record format.
//!
//! A record is plain text, one item per line. Sections are delimited by
//! `# ... START` / `# ... END` marker lines, values are `key=value`, and a
//! position is `x|y|z|yaw|pitch`:
//!
//! ```text
//! # MATCH RECORD INFO START
//! version=1
//! interval=2
//! # MATCH RECORD INFO END
//! # MINIGAME INFO START
//! minigameName=spleef
//! arenaName=Alpha
//! date=1767225600000
//! # MINIGAME INFO END
//! # NAME TRANSLATE MAP START
//! 42=alice
//! # NAME TRANSLATE MAP END
//! # ID TRANSLATE MAP START
//! 42=1
//! # ID TRANSLATE MAP END
//! # FRAMES SECTION START
//! # FRAME 0 START
//! # FRAME PLAYER LOCATIONS LIST START
//! 1=10.5|64|-3|90|0
//! # FRAME PLAYER LOCATIONS LIST END
//! # FRAME PLAYER HEALTH LIST START
//! 1=20
//! # FRAME PLAYER HEALTH LIST END
//! # FRAME 0 END
//! # FRAMES SECTION END
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

use arenaflow_protocol::{Location, PlayerId};
use chrono::{DateTime, Utc};

use crate::RecordError;

/// The only format version this crate reads and writes.
pub const RECORD_VERSION: u32 = 1;

const INFO_START: &str = "# MATCH RECORD INFO START";
const INFO_END: &str = "# MATCH RECORD INFO END";
const MINIGAME_START: &str = "# MINIGAME INFO START";
const MINIGAME_END: &str = "# MINIGAME INFO END";
const NAMES_START: &str = "# NAME TRANSLATE MAP START";
const NAMES_END: &str = "# NAME TRANSLATE MAP END";
const IDS_START: &str = "# ID TRANSLATE MAP START";
const IDS_END: &str = "# ID TRANSLATE MAP END";
const FRAMES_START: &str = "# FRAMES SECTION START";
const FRAMES_END: &str = "# FRAMES SECTION END";
const LOCATIONS_START: &str = "# FRAME PLAYER LOCATIONS LIST START";
const LOCATIONS_END: &str = "# FRAME PLAYER LOCATIONS LIST END";
const HEALTH_START: &str = "# FRAME PLAYER HEALTH LIST START";
const HEALTH_END: &str = "# FRAME PLAYER HEALTH LIST END";

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One sample of every participant, keyed by session-local id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    /// Capture tick. Not part of the record text: parsed frames get
    /// `index * interval`.
    pub tick: u64,
    pub positions: BTreeMap<u32, Location>,
    pub health: BTreeMap<u32, f64>,
}

// ---------------------------------------------------------------------------
// MatchRecord
// ---------------------------------------------------------------------------

/// A complete recording, as written by `save()` and read by [`parse`].
///
/// [`parse`]: MatchRecord::parse
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub interval: u64,
    pub minigame: String,
    pub arena: String,
    /// Save time, stored with millisecond precision.
    pub date: DateTime<Utc>,
    pub names: BTreeMap<PlayerId, String>,
    pub ids: BTreeMap<PlayerId, u32>,
    pub frames: Vec<Frame>,
}

impl MatchRecord {
    /// Renders the record text.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        // Writing into a String can't fail.
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "{INFO_START}")?;
        writeln!(out, "version={RECORD_VERSION}")?;
        writeln!(out, "interval={}", self.interval)?;
        writeln!(out, "{INFO_END}")?;

        writeln!(out, "{MINIGAME_START}")?;
        writeln!(out, "minigameName={}", self.minigame)?;
        writeln!(out, "arenaName={}", self.arena)?;
        writeln!(out, "date={}", self.date.timestamp_millis())?;
        writeln!(out, "{MINIGAME_END}")?;

        writeln!(out, "{NAMES_START}")?;
        for (id, name) in &self.names {
            writeln!(out, "{}={name}", id.0)?;
        }
        writeln!(out, "{NAMES_END}")?;

        writeln!(out, "{IDS_START}")?;
        for (id, local) in &self.ids {
            writeln!(out, "{}={local}", id.0)?;
        }
        writeln!(out, "{IDS_END}")?;

        writeln!(out, "{FRAMES_START}")?;
        for (i, frame) in self.frames.iter().enumerate() {
            writeln!(out, "# FRAME {i} START")?;
            writeln!(out, "{LOCATIONS_START}")?;
            for (id, loc) in &frame.positions {
                writeln!(
                    out,
                    "{id}={}|{}|{}|{}|{}",
                    loc.x, loc.y, loc.z, loc.yaw, loc.pitch
                )?;
            }
            writeln!(out, "{LOCATIONS_END}")?;
            writeln!(out, "{HEALTH_START}")?;
            for (id, health) in &frame.health {
                writeln!(out, "{id}={health}")?;
            }
            writeln!(out, "{HEALTH_END}")?;
            writeln!(out, "# FRAME {i} END")?;
        }
        writeln!(out, "{FRAMES_END}")?;
        Ok(())
    }

    /// Reads a record back from its text.
    pub fn parse(text: &str) -> Result<Self, RecordError> {
        let mut r = Reader::new(text);

        r.expect(INFO_START)?;
        let version: u32 = r.value("version")?;
        if version != RECORD_VERSION {
            return Err(r.malformed(format!("unsupported version {version}")));
        }
        let interval: u64 = r.value("interval")?;
        r.expect(INFO_END)?;

        r.expect(MINIGAME_START)?;
        let minigame = r.value::<String>("minigameName")?;
        let arena = r.value::<String>("arenaName")?;
        let millis: i64 = r.value("date")?;
        let date = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| r.malformed(format!("date {millis} out of range")))?;
        r.expect(MINIGAME_END)?;

        r.expect(NAMES_START)?;
        let names = r
            .entries(NAMES_END)?
            .into_iter()
            .map(|(id, name): (u64, String)| (PlayerId(id), name))
            .collect();

        r.expect(IDS_START)?;
        let ids = r
            .entries(IDS_END)?
            .into_iter()
            .map(|(id, local): (u64, u32)| (PlayerId(id), local))
            .collect();

        r.expect(FRAMES_START)?;
        let mut frames = Vec::new();
        loop {
            let line = r.next_line()?;
            if line == FRAMES_END {
                break;
            }
            let index = frames.len();
            if line != format!("# FRAME {index} START") {
                return Err(r.malformed(format!("expected start of frame {index}, got `{line}`")));
            }

            r.expect(LOCATIONS_START)?;
            let positions = r
                .entries::<u32, String>(LOCATIONS_END)?
                .into_iter()
                .map(|(id, raw)| parse_location(&raw).map(|loc| (id, loc)))
                .collect::<Option<BTreeMap<_, _>>>()
                .ok_or_else(|| r.malformed(format!("bad position in frame {index}")))?;

            r.expect(HEALTH_START)?;
            let health = r.entries(HEALTH_END)?.into_iter().collect();

            r.expect(&format!("# FRAME {index} END"))?;
            frames.push(Frame {
                tick: index as u64 * interval,
                positions,
                health,
            });
        }
        r.expect_eof()?;

        Ok(Self {
            interval,
            minigame,
            arena,
            date,
            names,
            ids,
            frames,
        })
    }
}

fn parse_location(raw: &str) -> Option<Location> {
    let mut parts = raw.split('|');
    let mut next = || parts.next();
    let loc = Location {
        x: next()?.parse().ok()?,
        y: next()?.parse().ok()?,
        z: next()?.parse().ok()?,
        yaw: next()?.parse().ok()?,
        pitch: next()?.parse().ok()?,
    };
    match parts.next() {
        Some(_) => None,
        None => Some(loc),
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Line cursor that remembers where it is for error messages.
struct Reader<'a> {
    lines: std::str::Lines<'a>,
    line: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line: 0,
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> RecordError {
        RecordError::Malformed {
            line: self.line,
            reason: reason.into(),
        }
    }

    fn next_line(&mut self) -> Result<&'a str, RecordError> {
        match self.lines.next() {
            // `lines()` already drops the `\r` of a CRLF ending; anything
            // else on the line is content.
            Some(line) => {
                self.line += 1;
                Ok(line)
            }
            None => Err(self.malformed("unexpected end of record")),
        }
    }

    fn expect(&mut self, marker: &str) -> Result<(), RecordError> {
        let line = self.next_line()?;
        if line != marker {
            return Err(self.malformed(format!("expected `{marker}`, got `{line}`")));
        }
        Ok(())
    }

    fn expect_eof(&mut self) -> Result<(), RecordError> {
        for line in self.lines.by_ref() {
            self.line += 1;
            if !line.trim().is_empty() {
                return Err(self.malformed("trailing content after frames"));
            }
        }
        Ok(())
    }

    fn pair<K: FromStr, V: FromStr>(&self, line: &str) -> Result<(K, V), RecordError> {
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| self.malformed(format!("expected key=value, got `{line}`")))?;
        let key = key
            .parse()
            .map_err(|_| self.malformed(format!("bad key `{key}`")))?;
        let value = value
            .parse()
            .map_err(|_| self.malformed(format!("bad value `{value}`")))?;
        Ok((key, value))
    }

    /// Reads `key=value` and checks the key.
    fn value<V: FromStr>(&mut self, key: &str) -> Result<V, RecordError> {
        let line = self.next_line()?;
        let (found, value): (String, V) = self.pair(line)?;
        if found != key {
            return Err(self.malformed(format!("expected `{key}`, got `{found}`")));
        }
        Ok(value)
    }

    /// Reads `key=value` lines up to `end`.
    fn entries<K: FromStr, V: FromStr>(&mut self, end: &str) -> Result<Vec<(K, V)>, RecordError> {
        let mut out = Vec::new();
        loop {
            let line = self.next_line()?;
            if line == end {
                return Ok(out);
            }
            out.push(self.pair(line)?);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MatchRecord {
        let mut positions = BTreeMap::new();
        positions.insert(1, Location::new(10.5, 64.0, -3.0).facing(90.0, 0.0));
        let mut health = BTreeMap::new();
        health.insert(1, 20.0);
        MatchRecord {
            interval: 2,
            minigame: "spleef".into(),
            arena: "Alpha".into(),
            date: DateTime::from_timestamp_millis(1_767_225_600_000).unwrap(),
            names: BTreeMap::from([(PlayerId(42), "alice".to_string())]),
            ids: BTreeMap::from([(PlayerId(42), 1)]),
            frames: vec![Frame {
                tick: 0,
                positions,
                health,
            }],
        }
    }

    #[test]
    fn test_encode_layout() {
        let text = sample().encode();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# MATCH RECORD INFO START");
        assert_eq!(lines[1], "version=1");
        assert_eq!(lines[2], "interval=2");
        assert!(lines.contains(&"date=1767225600000"));
        assert!(lines.contains(&"42=alice"));
        assert!(lines.contains(&"1=10.5|64|-3|90|0"));
        assert!(lines.contains(&"1=20"));
        assert_eq!(*lines.last().unwrap(), "# FRAMES SECTION END");
    }

    #[test]
    fn test_parse_reads_back_encoded_record() {
        let record = sample();
        assert_eq!(MatchRecord::parse(&record.encode()).unwrap(), record);
    }

    #[test]
    fn test_names_keep_surrounding_whitespace() {
        let mut record = sample();
        record.arena = "Alpha ".into();
        record.names.insert(PlayerId(7), " bob  ".into());
        let parsed = MatchRecord::parse(&record.encode()).unwrap();
        assert_eq!(parsed.arena, "Alpha ");
        assert_eq!(parsed.names[&PlayerId(7)], " bob  ");
    }

    #[test]
    fn test_parse_accepts_crlf_line_endings() {
        let record = sample();
        let text = record.encode().replace('\n', "\r\n");
        assert_eq!(MatchRecord::parse(&text).unwrap(), record);
    }

    #[test]
    fn test_parse_rejects_other_versions() {
        let text = sample().encode().replace("version=1", "version=2");
        match MatchRecord::parse(&text) {
            Err(RecordError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_position() {
        let text = sample().encode().replace("1=10.5|64|-3|90|0", "1=10.5|64|-3");
        assert!(matches!(
            MatchRecord::parse(&text),
            Err(RecordError::Malformed { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_truncated_record() {
        let text = sample().encode();
        let truncated = &text[..text.len() - "# FRAMES SECTION END\n".len()];
        match MatchRecord::parse(truncated) {
            Err(RecordError::Malformed { reason, .. }) => {
                assert_eq!(reason, "unexpected end of record")
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_out_of_order_frame() {
        let text = sample()
            .encode()
            .replace("# FRAME 0 START", "# FRAME 3 START");
        assert!(MatchRecord::parse(&text).is_err());
    }

    #[test]
    fn test_location_needs_exactly_five_fields() {
        assert!(parse_location("1|2|3|4|5").is_some());
        assert!(parse_location("1|2|3|4").is_none());
        assert!(parse_location("1|2|3|4|5|6").is_none());
        assert!(parse_location("1|2|x|4|5").is_none());
    }
}
