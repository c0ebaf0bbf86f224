/// Why a stream handle stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The caller closed the handle.
    Requested,
    /// The tool delivered a short final read.
    EndOfStream,
    /// The handle's cancellation token fired.
    Cancelled,
    /// A read or write failed; the handle is unusable.
    Failed,
}

/// Stream handle lifecycle.
///
/// State transitions:
/// ```text
/// configured → streaming → closed(requested | end-of-stream | cancelled | failed)
/// configured ─────────────→ closed(requested)
/// ```
/// There is no way back out of `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Configured,
    Streaming,
    Closed(CloseReason),
}

impl StreamState {
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured)
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        match self {
            Self::Closed(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Move to `Closed(reason)` unless already closed; the first reason wins.
    pub fn close(&mut self, reason: CloseReason) {
        if !self.is_closed() {
            *self = Self::Closed(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_close_reason_wins() {
        let mut state = StreamState::Streaming;
        state.close(CloseReason::EndOfStream);
        state.close(CloseReason::Requested);
        assert_eq!(state.close_reason(), Some(CloseReason::EndOfStream));
    }

    #[test]
    fn predicates() {
        assert!(StreamState::Configured.is_configured());
        assert!(StreamState::Streaming.is_streaming());
        assert!(StreamState::Closed(CloseReason::Cancelled).is_closed());
        assert_eq!(StreamState::Streaming.close_reason(), None);
    }
}
