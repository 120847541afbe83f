// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-message stream assembler for incremental text deltas.
//!
//! Converts an ordered sequence of text deltas into renderable snapshots
//! while transparently handling an embedded tagged sub-protocol used for
//! interactive responses. Providers deliver the sub-protocol as ordinary
//! text tokens, so a naive token-by-token render would flash malformed
//! intermediate markup; the assembler buffers until a complete fragment is
//! available and renders a placeholder during the buffering window.

use reverie_config::model::StreamConfig;
use reverie_core::types::StreamSnapshot;

/// States of the per-message segment state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentMode {
    /// No sub-protocol marker seen; raw deltas render verbatim.
    Plain,
    /// An opening marker was seen; the matching close has not arrived.
    TaggedOpen,
    /// A complete tagged fragment was extracted.
    TaggedClosed,
}

impl std::fmt::Display for SegmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentMode::Plain => write!(f, "plain"),
            SegmentMode::TaggedOpen => write!(f, "tagged-open"),
            SegmentMode::TaggedClosed => write!(f, "tagged-closed"),
        }
    }
}

/// Incremental text consumer for one in-flight assistant message.
///
/// Marker detection runs against the accumulated buffer, not individual
/// deltas, so markers split across delta boundaries are still found.
pub struct StreamAssembler {
    open_marker: String,
    close_marker: String,
    placeholder: String,
    buffer: String,
    mode: SegmentMode,
    /// Byte offset of the first opening marker, once seen.
    open_at: usize,
    /// Inner content, once the closing marker arrives.
    extracted: Option<String>,
    /// Last snapshot handed out, for suppressing redundant emissions.
    emitted: Option<StreamSnapshot>,
}

impl StreamAssembler {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            open_marker: config.open_marker.clone(),
            close_marker: config.close_marker.clone(),
            placeholder: config.placeholder.clone(),
            buffer: String::new(),
            mode: SegmentMode::Plain,
            open_at: 0,
            extracted: None,
            emitted: None,
        }
    }

    /// Current state machine mode.
    pub fn mode(&self) -> SegmentMode {
        self.mode
    }

    /// Ingests one delta and returns a new snapshot when the renderable
    /// content changed, or `None` when the previous emission still stands.
    pub fn push(&mut self, delta: &str) -> Option<StreamSnapshot> {
        self.buffer.push_str(delta);
        let snapshot = self.current_snapshot();
        if self.emitted.as_ref() == Some(&snapshot) {
            return None;
        }
        self.emitted = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Finalizes at end-of-stream and returns the definitive snapshot.
    ///
    /// If the stream ended while a tagged fragment was still open, the
    /// content after the opening marker is salvaged so the user is not left
    /// with a permanent placeholder.
    pub fn finalize(self) -> StreamSnapshot {
        match self.mode {
            SegmentMode::Plain => StreamSnapshot {
                text: self.buffer,
                buffering: false,
            },
            SegmentMode::TaggedOpen => {
                let inner_start = self.open_at + self.open_marker.len();
                StreamSnapshot {
                    text: self.buffer[inner_start..].trim().to_string(),
                    buffering: false,
                }
            }
            SegmentMode::TaggedClosed => StreamSnapshot {
                text: self.extracted.unwrap_or_default(),
                buffering: false,
            },
        }
    }

    /// Advances the state machine against the accumulated buffer and
    /// computes the renderable snapshot for the current mode.
    fn current_snapshot(&mut self) -> StreamSnapshot {
        if self.mode == SegmentMode::Plain
            && let Some(at) = self.buffer.find(&self.open_marker)
        {
            self.open_at = at;
            self.mode = SegmentMode::TaggedOpen;
        }

        if self.mode == SegmentMode::TaggedOpen {
            let inner_start = self.open_at + self.open_marker.len();
            if let Some(close) = self.buffer[inner_start..].find(&self.close_marker) {
                let inner = self.buffer[inner_start..inner_start + close].trim();
                self.extracted = Some(inner.to_string());
                self.mode = SegmentMode::TaggedClosed;
            }
        }

        match self.mode {
            SegmentMode::Plain => StreamSnapshot {
                text: self.buffer.clone(),
                buffering: false,
            },
            // Never render partial tagged content: prefix plus a fixed
            // placeholder, containing no unmatched marker.
            SegmentMode::TaggedOpen => StreamSnapshot {
                text: format!("{}{}", &self.buffer[..self.open_at], self.placeholder),
                buffering: true,
            },
            SegmentMode::TaggedClosed => StreamSnapshot {
                text: self.extracted.clone().unwrap_or_default(),
                buffering: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> StreamAssembler {
        StreamAssembler::new(&StreamConfig::default())
    }

    /// Collects every emission for a delta sequence, then finalizes.
    fn drive(deltas: &[&str]) -> (Vec<StreamSnapshot>, StreamSnapshot) {
        let mut asm = assembler();
        let mut emissions = Vec::new();
        for delta in deltas {
            if let Some(snap) = asm.push(delta) {
                emissions.push(snap);
            }
        }
        (emissions, asm.finalize())
    }

    #[test]
    fn plain_deltas_emit_growing_buffer() {
        let (emissions, final_snap) = drive(&["Hello ", "world", "!"]);
        let texts: Vec<&str> = emissions.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello ", "Hello world", "Hello world!"]);
        assert!(emissions.iter().all(|s| !s.buffering));
        assert_eq!(final_snap.text, "Hello world!");
    }

    #[test]
    fn tagged_sequence_matches_expected_snapshots() {
        let (emissions, final_snap) =
            drive(&["Hello ", "world<content>", "foo", "</content> done"]);

        assert_eq!(emissions[0].text, "Hello ");
        assert!(!emissions[0].buffering);
        // Opening marker detected: prefix plus placeholder, buffering.
        assert_eq!(emissions[1].text, "Hello world...");
        assert!(emissions[1].buffering);
        // "foo" alone does not close the fragment -- no new emission.
        // Close arrives: extracted inner content.
        let last = emissions.last().unwrap();
        assert_eq!(last.text, "foo");
        assert!(!last.buffering);

        assert_eq!(final_snap.text, "foo");
        assert!(!final_snap.buffering);
    }

    #[test]
    fn no_emission_while_open_and_unchanged() {
        let mut asm = assembler();
        asm.push("start<content>");
        // Placeholder already emitted; more inner content changes nothing.
        assert!(asm.push("partial inner ").is_none());
        assert!(asm.push("more inner").is_none());
        assert_eq!(asm.mode(), SegmentMode::TaggedOpen);
    }

    #[test]
    fn open_snapshots_never_contain_the_marker() {
        let mut asm = assembler();
        let mut snapshots = Vec::new();
        for delta in ["a<co", "ntent>unclosed ", "markup <div>"] {
            if let Some(s) = asm.push(delta) {
                snapshots.push(s);
            }
        }
        for snap in snapshots.iter().filter(|s| s.buffering) {
            assert!(
                !snap.text.contains("<content>"),
                "buffering snapshot leaked a marker: {}",
                snap.text
            );
        }
    }

    #[test]
    fn markers_split_across_deltas_are_detected() {
        let (emissions, final_snap) =
            drive(&["pre", "fix<con", "tent>INNER</con", "tent>suffix"]);
        assert_eq!(final_snap.text, "INNER");
        let last = emissions.last().unwrap();
        assert_eq!(last.text, "INNER");
    }

    #[test]
    fn round_trip_extraction_is_exact_and_trimmed() {
        let (_, final_snap) = drive(&["prefix<content>  INNER\n</content>suffix"]);
        assert_eq!(final_snap.text, "INNER");
    }

    #[test]
    fn unterminated_fragment_salvages_inner_content() {
        let (emissions, final_snap) = drive(&["intro <content>half an answ", "er"]);
        // While open, only the placeholder was rendered.
        assert!(emissions.last().unwrap().buffering);
        // Finalize salvages what arrived after the marker.
        assert_eq!(final_snap.text, "half an answer");
        assert!(!final_snap.buffering);
    }

    #[test]
    fn empty_stream_finalizes_empty() {
        let (emissions, final_snap) = drive(&[]);
        assert!(emissions.is_empty());
        assert_eq!(final_snap.text, "");
    }

    #[test]
    fn content_after_close_does_not_replace_extraction() {
        let mut asm = assembler();
        asm.push("<content>INNER</content>");
        assert_eq!(asm.mode(), SegmentMode::TaggedClosed);
        assert!(asm.push(" trailing commentary").is_none());
        assert_eq!(asm.finalize().text, "INNER");
    }

    #[test]
    fn mode_display() {
        assert_eq!(SegmentMode::Plain.to_string(), "plain");
        assert_eq!(SegmentMode::TaggedOpen.to_string(), "tagged-open");
        assert_eq!(SegmentMode::TaggedClosed.to_string(), "tagged-closed");
    }
}
