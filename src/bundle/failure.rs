//! Bundle failure records and stack rendering.
//!
//! Bundle handlers report failures as a chain of causes, each carrying the
//! frames captured where it was raised. The server renders these for logs in
//! full, and for dev-mode responses truncated at the first frame the
//! bundle's sentinel predicate recognizes as framework internals, so the
//! visible trace starts at user code.

use std::sync::Arc;

/// A single frame in a failure trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Qualified symbol that raised or propagated the failure.
    pub symbol: String,
    /// Source location, when known (`file:line`).
    pub location: Option<String>,
}

impl StackFrame {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            location: None,
        }
    }

    pub fn at(symbol: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            location: Some(location.into()),
        }
    }
}

/// Predicate deciding whether a frame belongs to framework internals.
/// Supplied by the bundle loader; the core never hard-codes symbol names.
pub type FrameFilter = Arc<dyn Fn(&StackFrame) -> bool + Send + Sync>;

/// A filter that treats no frame as framework-internal.
pub fn keep_all_frames() -> FrameFilter {
    Arc::new(|_| false)
}

/// One cause in a failure chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureCause {
    /// Failure type name, e.g. `IllegalStateException`.
    pub kind: String,
    /// Optional human message.
    pub message: Option<String>,
    /// Frames, innermost first.
    pub frames: Vec<StackFrame>,
}

impl FailureCause {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: Some(message.into()),
            frames: Vec::new(),
        }
    }

    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }
}

/// A failure raised by a bundle handler: an ordered cause chain, outermost
/// cause first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    pub causes: Vec<FailureCause>,
}

impl DispatchFailure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            causes: vec![FailureCause::new(kind, message)],
        }
    }

    pub fn from_cause(cause: FailureCause) -> Self {
        Self {
            causes: vec![cause],
        }
    }

    /// Append a deeper cause to the chain.
    pub fn caused_by(mut self, cause: FailureCause) -> Self {
        self.causes.push(cause);
        self
    }

    /// Whether any frame in the chain satisfies the filter.
    pub fn any_frame_matches(&self, filter: &FrameFilter) -> bool {
        self.causes
            .iter()
            .flat_map(|c| c.frames.iter())
            .any(|f| filter(f))
    }

    /// Render the full chain for logging; no truncation.
    pub fn render_full(&self) -> String {
        self.render_truncated(&keep_all_frames())
    }

    /// Render the chain for display, stopping each cause's frames at the
    /// first frame the filter recognizes. A frame equal to the previous
    /// cause's topmost frame also stops emission, so repeated leading frames
    /// are not printed twice.
    pub fn render_truncated(&self, stop: &FrameFilter) -> String {
        let mut out = String::new();
        let mut prev_top: Option<&StackFrame> = None;

        for (i, cause) in self.causes.iter().enumerate() {
            if i > 0 {
                out.push_str("caused by: ");
            }
            out.push_str(&cause.kind);
            if let Some(msg) = &cause.message {
                out.push_str(": ");
                out.push_str(msg);
            }
            out.push('\n');

            for frame in &cause.frames {
                if stop(frame) || prev_top == Some(frame) {
                    break;
                }
                out.push_str("  at ");
                out.push_str(&frame.symbol);
                if let Some(loc) = &frame.location {
                    out.push_str(" (");
                    out.push_str(loc);
                    out.push(')');
                }
                out.push('\n');
            }

            prev_top = cause.frames.first();
        }

        out
    }
}

impl std::fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.causes.first() {
            Some(cause) => match &cause.message {
                Some(msg) => write!(f, "{}: {}", cause.kind, msg),
                None => write!(f, "{}", cause.kind),
            },
            None => write!(f, "bundle dispatch failed"),
        }
    }
}

impl std::error::Error for DispatchFailure {}
