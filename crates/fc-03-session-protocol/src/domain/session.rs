//! Server-side session state machine
//!
//! One instance per client exchange. The machine decides; the session task
//! performs the I/O and reports back through `reply_sent`.
//!
//! ```text
//! AwaitingRequest --seq 1--> (serve) --reply sent--> AwaitingAck --seq 3--> Done
//!        |                                              |  seq 1: replay last reply
//!        +------------- timer fire #max ----------------+--> Done(RetriesExhausted)
//! ```

use super::frame::{Frame, SEQ_ACK, SEQ_REQUEST};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The client acknowledged the reply.
    Acknowledged,
    /// The timer fired too often without an acknowledgment.
    RetriesExhausted,
    /// A reply could not be sent at all.
    SendFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingRequest,
    AwaitingAck,
    Done(SessionOutcome),
}

/// What the session task must do with a datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<'a> {
    /// Fresh request: decode the roster, obtain tickets, send a reply.
    Serve(&'a [u8]),
    /// Duplicate request: send these bytes again, unmodified.
    Replay(Vec<u8>),
    /// Unknown sequence number; nothing to do.
    Ignore,
    /// The session is over.
    Terminate(SessionOutcome),
}

/// What the session task must do when the resend timer fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerAction {
    Resend(Vec<u8>),
    /// No reply exists yet; just re-arm.
    Rearm,
    Terminate(SessionOutcome),
}

#[derive(Debug, Clone)]
pub struct ServerSession {
    state: SessionState,
    expected: i8,
    last_reply: Option<Vec<u8>>,
    timer_fires: u32,
    max_timer_fires: u32,
}

impl ServerSession {
    pub fn new(max_timer_fires: u32) -> Self {
        Self {
            state: SessionState::AwaitingRequest,
            expected: SEQ_REQUEST,
            last_reply: None,
            timer_fires: 0,
            max_timer_fires,
        }
    }

    pub fn on_datagram<'a>(&mut self, frame: &Frame<'a>) -> Action<'a> {
        if let SessionState::Done(outcome) = self.state {
            return Action::Terminate(outcome);
        }
        match frame.seq {
            // A request that produced no reply yet is served again.
            SEQ_REQUEST => match &self.last_reply {
                Some(reply) => Action::Replay(reply.clone()),
                None => Action::Serve(frame.payload),
            },
            SEQ_ACK => self.finish(SessionOutcome::Acknowledged),
            _ => Action::Ignore,
        }
    }

    /// A reply went out; from now on only an ack (or a duplicate) is valid.
    pub fn reply_sent(&mut self, reply: Vec<u8>) {
        self.last_reply = Some(reply);
        self.expected = SEQ_ACK;
        self.state = SessionState::AwaitingAck;
    }

    /// Sending failed after every retry.
    pub fn send_failed(&mut self) -> SessionOutcome {
        self.state = SessionState::Done(SessionOutcome::SendFailed);
        SessionOutcome::SendFailed
    }

    /// The resend timer fired. Fires are never reset within a session.
    pub fn on_timer(&mut self) -> TimerAction {
        if let SessionState::Done(outcome) = self.state {
            return TimerAction::Terminate(outcome);
        }
        self.timer_fires += 1;
        if self.timer_fires >= self.max_timer_fires {
            self.state = SessionState::Done(SessionOutcome::RetriesExhausted);
            return TimerAction::Terminate(SessionOutcome::RetriesExhausted);
        }
        match &self.last_reply {
            Some(reply) => TimerAction::Resend(reply.clone()),
            None => TimerAction::Rearm,
        }
    }

    fn finish<'a>(&mut self, outcome: SessionOutcome) -> Action<'a> {
        self.state = SessionState::Done(outcome);
        Action::Terminate(outcome)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn expected(&self) -> i8 {
        self.expected
    }

    pub fn timer_fires(&self) -> u32 {
        self.timer_fires
    }

    pub fn last_reply(&self) -> Option<&[u8]> {
        self.last_reply.as_deref()
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, SessionState::Done(_))
    }
}
