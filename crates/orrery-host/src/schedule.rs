/// Identifier for the pending "render next frame" request.
///
/// The controller holds at most one outstanding token at a time; minting a
/// new one supersedes anything the controller knew about earlier tokens.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ScheduleToken(u64);

impl ScheduleToken {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Source of display-refresh callbacks.
///
/// `request_frame` asks for exactly one future frame step tied to the next
/// display refresh. `cancel_frame` withdraws a pending request where the
/// platform allows it; it must be idempotent, and a request that already
/// fired may be impossible to withdraw. The controller closes that race by
/// checking its own state when the step runs, not by token identity.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> ScheduleToken;
    fn cancel_frame(&mut self, token: ScheduleToken);
}
