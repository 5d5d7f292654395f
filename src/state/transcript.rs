use std::time::{Duration, SystemTime};

use uuid::Uuid;

/// Identifier of a transcript line.
pub type LineId = Uuid;

/// Visual category of a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Status line, rendered instantly.
    System,
    /// Question to the user.
    Prompt,
    /// Echo of a submission.
    Input,
    /// Terminal response.
    Output,
}

impl LineKind {
    /// Simulated typing speed for this kind; zero renders instantly.
    fn typing_rate(self) -> Duration {
        match self {
            LineKind::Prompt => Duration::from_millis(50),
            LineKind::Output => Duration::from_millis(30),
            LineKind::System | LineKind::Input => Duration::ZERO,
        }
    }

    /// How long a line of this kind with `content` keeps rendering.
    pub fn typing_duration(self, content: &str) -> Duration {
        let chars = u32::try_from(content.chars().count()).unwrap_or(u32::MAX);
        self.typing_rate().saturating_mul(chars)
    }
}

/// A single displayed line. Only `still_rendering` changes after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalLine {
    /// Stable identifier.
    pub id: LineId,
    /// Text of the line.
    pub content: String,
    /// Visual category.
    pub kind: LineKind,
    /// Wall-clock time of the append.
    pub created_at: SystemTime,
    /// The typing effect is still running.
    pub still_rendering: bool,
}

impl TerminalLine {
    /// Build a fresh line, returning it with the duration of its typing effect.
    pub fn new(kind: LineKind, content: impl Into<String>) -> (Self, Duration) {
        let content = content.into();
        let typing = kind.typing_duration(&content);
        let line = Self {
            id: Uuid::new_v4(),
            content,
            kind,
            created_at: SystemTime::now(),
            still_rendering: !typing.is_zero(),
        };
        (line, typing)
    }
}

/// Ordered, append-only record of displayed lines.
///
/// Append order is call order; a line finishing its typing effect never moves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptLog {
    lines: Vec<TerminalLine>,
}

impl TranscriptLog {
    /// An empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line at the end of the transcript.
    pub fn push(&mut self, line: TerminalLine) {
        self.lines.push(line);
    }

    /// Replace the whole sequence with an empty one.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Flip the rendering flag of a line. Returns false when the line is gone
    /// (cleared in the meantime) or already rendered.
    pub fn finish_rendering(&mut self, id: LineId) -> bool {
        match self.lines.iter_mut().find(|line| line.id == id) {
            Some(line) if line.still_rendering => {
                line.still_rendering = false;
                true
            }
            _ => false,
        }
    }

    /// Lines in append order.
    pub fn lines(&self) -> &[TerminalLine] {
        &self.lines
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when no line is displayed.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True when any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.content.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_duration_is_proportional_to_length() {
        assert_eq!(
            LineKind::Prompt.typing_duration("abcd"),
            Duration::from_millis(200)
        );
        assert_eq!(
            LineKind::Output.typing_duration("abcd"),
            Duration::from_millis(120)
        );
        assert_eq!(LineKind::System.typing_duration("abcd"), Duration::ZERO);
        assert_eq!(LineKind::Input.typing_duration("> abcd"), Duration::ZERO);
    }

    #[test]
    fn lines_keep_append_order_and_unique_ids() {
        let mut log = TranscriptLog::new();
        let (first, _) = TerminalLine::new(LineKind::Prompt, "first, and rather long");
        let (second, _) = TerminalLine::new(LineKind::System, "second");
        assert_ne!(first.id, second.id);
        log.push(first.clone());
        log.push(second.clone());

        // Finishing the slower line first does not reorder anything.
        assert!(log.finish_rendering(first.id));
        let contents: Vec<_> = log.lines().iter().map(|l| l.content.as_str()).collect();
        assert_eq!(contents, vec!["first, and rather long", "second"]);
        assert!(!log.lines()[0].still_rendering);
    }

    #[test]
    fn finishing_a_cleared_line_is_a_no_op() {
        let mut log = TranscriptLog::new();
        let (line, typing) = TerminalLine::new(LineKind::Output, "hello");
        assert!(line.still_rendering);
        assert!(!typing.is_zero());
        let id = line.id;
        log.push(line);
        log.clear();
        assert!(log.is_empty());
        assert!(!log.finish_rendering(id));
    }

    #[test]
    fn instant_lines_are_not_rendering() {
        let (line, typing) = TerminalLine::new(LineKind::System, "ready");
        assert!(!line.still_rendering);
        assert!(typing.is_zero());

        let mut log = TranscriptLog::new();
        let id = line.id;
        log.push(line);
        assert!(!log.finish_rendering(id));
        assert!(log.contains("rea"));
    }
}
