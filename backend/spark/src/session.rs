//! Streaming chat session state machine.
//!
//! ```text
//! Connecting -> Open -> Awaiting -> Accumulating -> Complete
//!      \          \         \             \
//!       `----------`---------`-------------`--> Failed
//! ```
//!
//! Exactly one request frame is sent. Replies are accumulated in arrival
//! order until a frame with the final status arrives. The receive budget
//! covers the whole session, not each frame. The transport is closed on every
//! exit, with the close itself bounded by the connect timeout, and dropping
//! an unfinished `run` future drops the transport with it.

use std::time::Duration;

use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use quill_core::{ChatFrame, QuillError};

use crate::transport::{Connector, FrameTransport};

/// Default bound on establishing the connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default total budget for receiving the reply.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Awaiting,
    Accumulating,
    Complete,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub connect_timeout: Duration,
    pub receive_timeout: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }
}

/// One request/reply exchange over a fresh transport.
pub struct ChatSession {
    limits: SessionLimits,
    state: SessionState,
    frames: Vec<ChatFrame>,
}

impl ChatSession {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            limits,
            state: SessionState::Connecting,
            frames: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "Chat session transition");
        self.state = next;
    }

    /// Close `transport`, giving up after the connect timeout. The transport
    /// is dropped by the caller either way.
    async fn close<T: FrameTransport>(&self, transport: &mut T) {
        if timeout(self.limits.connect_timeout, transport.close()).await.is_err() {
            warn!(limit = ?self.limits.connect_timeout, "Transport close timed out");
        }
    }

    fn fail(&mut self, err: QuillError) -> Result<Vec<ChatFrame>, QuillError> {
        warn!(
            kind = %err.kind(),
            error = %err,
            frames = self.frames.len(),
            "Chat session failed"
        );
        self.transition(SessionState::Failed);
        Err(err)
    }

    /// Connect, send `request`, and collect frames through the final one.
    ///
    /// On failure no frames are returned, even if some had arrived.
    pub async fn run<C: Connector>(
        &mut self,
        connector: &C,
        url: &str,
        request: String,
    ) -> Result<Vec<ChatFrame>, QuillError> {
        self.transition(SessionState::Connecting);
        let mut transport =
            match timeout(self.limits.connect_timeout, connector.connect(url)).await {
                Ok(Ok(transport)) => transport,
                Ok(Err(e)) => return self.fail(e),
                Err(_) => return self.fail(QuillError::TimeoutError(self.limits.connect_timeout)),
            };
        self.transition(SessionState::Open);

        if let Err(e) = transport.send_text(request).await {
            self.close(&mut transport).await;
            return self.fail(e);
        }
        self.transition(SessionState::Awaiting);

        let deadline = Instant::now() + self.limits.receive_timeout;
        loop {
            let text = match timeout_at(deadline, transport.next_text()).await {
                Ok(Some(Ok(text))) => text,
                Ok(Some(Err(e))) => {
                    self.close(&mut transport).await;
                    return self.fail(e);
                }
                Ok(None) => {
                    return self.fail(QuillError::TransportError(
                        "session closed before the final frame".into(),
                    ));
                }
                Err(_) => {
                    self.close(&mut transport).await;
                    return self.fail(QuillError::TimeoutError(self.limits.receive_timeout));
                }
            };

            let frame = ChatFrame::parse(&text);
            if let ChatFrame::Raw(raw) = &frame {
                warn!(len = raw.len(), "Keeping undecodable frame as raw text");
            }
            if self.state == SessionState::Awaiting {
                self.transition(SessionState::Accumulating);
            }

            let remote = frame.remote_error().map(|(code, message)| QuillError::RemoteError {
                code,
                message: message.to_string(),
            });
            let is_final = frame.is_final();
            self.frames.push(frame);

            if let Some(err) = remote {
                self.close(&mut transport).await;
                return self.fail(err);
            }
            if is_final {
                self.close(&mut transport).await;
                self.transition(SessionState::Complete);
                info!(frames = self.frames.len(), "Chat session complete");
                return Ok(std::mem::take(&mut self.frames));
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{frame, Exhausted, ScriptedConnector};
    use super::*;
    use quill_core::{ErrorKind, STATUS_CONTINUING, STATUS_FINAL};

    #[tokio::test(start_paused = true)]
    async fn stops_reading_after_final_frame() {
        let f1 = frame(STATUS_CONTINUING, "a");
        let f2 = frame(STATUS_CONTINUING, "b");
        let f3 = frame(STATUS_FINAL, "c");
        let extra = frame(STATUS_FINAL, "never read");
        let connector = ScriptedConnector::new(&[&f1, &f2, &f3, &extra], Exhausted::Close);

        let mut session = ChatSession::new(SessionLimits::default());
        let frames = session
            .run(&connector, "wss://example.com/v4.0/chat", "request".into())
            .await
            .unwrap();

        assert_eq!(frames.len(), 3);
        assert!(frames[2].is_final());
        assert_eq!(session.state(), SessionState::Complete);
        assert_eq!(connector.probe.remaining(), 1);
        assert_eq!(*connector.probe.sent.lock().unwrap(), vec!["request".to_string()]);
        assert!(connector.probe.closed());
    }

    #[tokio::test(start_paused = true)]
    async fn receive_budget_is_total_not_per_frame() {
        // Each frame arrives within a second, but the final one never does.
        let connector = ScriptedConnector::new(&[], Exhausted::Repeat(frame(1, "more")));
        let limits = SessionLimits {
            connect_timeout: Duration::from_secs(1),
            receive_timeout: Duration::from_secs(5),
        };

        let mut session = ChatSession::new(limits);
        let err = session
            .run(&connector, "wss://example.com/chat", "request".into())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(session.state(), SessionState::Failed);
        assert!(connector.probe.closed());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_close_is_bounded() {
        let f1 = frame(1, "a");
        let f2 = frame(2, "b");
        let mut connector = ScriptedConnector::new(&[&f1, &f2], Exhausted::Close);
        connector.close_hangs = true;
        let limits = SessionLimits {
            connect_timeout: Duration::from_secs(1),
            receive_timeout: Duration::from_secs(5),
        };

        let started = Instant::now();
        let mut session = ChatSession::new(limits);
        let frames = session
            .run(&connector, "wss://example.com/chat", "request".into())
            .await
            .unwrap();

        assert_eq!(frames.len(), 2);
        assert!(started.elapsed() <= Duration::from_secs(2));
        assert!(connector.probe.closed());
        assert!(connector.probe.dropped());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_close_after_timeout_is_bounded() {
        let mut connector = ScriptedConnector::new(&[], Exhausted::Hang);
        connector.close_hangs = true;
        let limits = SessionLimits {
            connect_timeout: Duration::from_secs(1),
            receive_timeout: Duration::from_secs(5),
        };

        let started = Instant::now();
        let mut session = ChatSession::new(limits);
        let err = session
            .run(&connector, "wss://example.com/chat", "request".into())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frames_do_not_stop_accumulation() {
        let f1 = frame(1, "x");
        let f3 = frame(2, "y");
        let connector = ScriptedConnector::new(&[&f1, "{{garbage", &f3], Exhausted::Close);

        let mut session = ChatSession::new(SessionLimits::default());
        let frames = session
            .run(&connector, "wss://example.com/chat", "request".into())
            .await
            .unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1], ChatFrame::Raw("{{garbage".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn peer_close_before_final_is_transport_error() {
        let f1 = frame(1, "x");
        let connector = ScriptedConnector::new(&[&f1], Exhausted::Close);

        let mut session = ChatSession::new(SessionLimits::default());
        let err = session
            .run(&connector, "wss://example.com/chat", "request".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_error_frame_fails_session() {
        let error_frame =
            r#"{"header":{"code":10013,"message":"content audit failed","status":2}}"#;
        let connector = ScriptedConnector::new(&[error_frame], Exhausted::Close);

        let mut session = ChatSession::new(SessionLimits::default());
        match session.run(&connector, "wss://example.com/chat", "r".into()).await {
            Err(QuillError::RemoteError { code, .. }) => assert_eq!(code, 10013),
            other => panic!("expected remote error, got {other:?}"),
        }
        assert!(connector.probe.closed());
    }

    #[tokio::test(start_paused = true)]
    async fn connect_failure_fails_session() {
        let connector = ScriptedConnector::refusing();
        let mut session = ChatSession::new(SessionLimits::default());
        let err = session
            .run(&connector, "wss://example.com/chat", "r".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoning_the_call_releases_the_transport() {
        let connector = ScriptedConnector::new(&[], Exhausted::Hang);
        let mut session = ChatSession::new(SessionLimits::default());

        let abandoned = tokio::time::timeout(
            Duration::from_secs(2),
            session.run(&connector, "wss://example.com/chat", "r".into()),
        )
        .await;

        assert!(abandoned.is_err());
        assert!(connector.probe.dropped());
        assert!(!session.state().is_terminal());
    }
}
