/// Walk state definitions for the chapter walker
///
/// The walker moves through these states once per chapter until it reaches
/// `Done` or `Failed`.
use std::fmt;

/// Represents the current state of a chapter traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkState {
    // ===== Active States =====
    /// Nothing fetched yet; the initial URL is the frontier
    Start,

    /// The frontier page is being fetched
    FetchingPage,

    /// The fetched page is being parsed for content and its next link
    ExtractingNav,

    /// An unvisited next link was found and becomes the frontier
    Following,

    // ===== Terminal States =====
    /// No further chapter: no next link, a cycle, or a traversal limit
    Done,

    /// A chapter could not be fetched or parsed; the run is aborted
    Failed,
}

impl WalkState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if the walker may still produce chapters
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the traversal may move from `self` to `next`
    ///
    /// Any active state may fail. `ExtractingNav` may finish directly when the
    /// page has no next link or its next link was already visited, and
    /// `FetchingPage` when the fetch redirected to a visited chapter.
    pub fn can_transition_to(&self, next: WalkState) -> bool {
        use WalkState::*;

        if next == Failed {
            return self.is_active();
        }

        matches!(
            (self, next),
            (Start, FetchingPage)
                | (FetchingPage, ExtractingNav)
                | (FetchingPage, Done)
                | (ExtractingNav, Following)
                | (ExtractingNav, Done)
                | (Following, FetchingPage)
                | (Following, Done)
        )
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::FetchingPage => "fetching_page",
            Self::ExtractingNav => "extracting_nav",
            Self::Following => "following",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for WalkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
