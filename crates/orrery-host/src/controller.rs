use std::fmt;

use crate::engine::RenderEngine;
use crate::schedule::{FrameScheduler, ScheduleToken};

/// Which engine operation a failed session died in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FailurePhase {
    Construction,
    Render,
}

/// Last-observed surface size in physical pixels.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceDimensions {
    pub width: u32,
    pub height: u32,
}

/// Read-only projection of controller state for presentation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ViewState<'a> {
    /// No live engine yet. A stopped controller, detached from any
    /// presentation, also reports this inert placeholder.
    Loading,
    /// Engine running; live output is available.
    Ready,
    /// Terminal failure; `message` is the engine's report, verbatim.
    Error { message: &'a str },
}

/// Operation invoked in a state that does not permit it.
///
/// Reported to the caller; controller state is left unchanged.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MisuseError {
    pub operation: &'static str,
    pub state: &'static str,
}

impl fmt::Display for MisuseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot {}: controller is {}", self.operation, self.state)
    }
}

impl std::error::Error for MisuseError {}

/// Lifecycle state. The engine handle lives inside `Running`, so a handle
/// outside the running state is unrepresentable and dropping the variant
/// releases it.
enum ControllerState<E> {
    Uninitialized,
    Initializing,
    Running { engine: E },
    Failed { message: String, phase: FailurePhase },
    Stopped,
}

impl<E> ControllerState<E> {
    fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Running { .. } => "running",
            Self::Failed { .. } => "failed",
            Self::Stopped => "stopped",
        }
    }
}

/// Host controller for one engine session on one drawable surface.
///
/// Owns the engine's lifecycle state and the frame-scheduling loop, forwards
/// resize notifications, and translates engine failures into a terminal
/// error state. All operations execute on the host's single logical thread;
/// nothing here races against the engine handle.
///
/// Failures are terminal for the session. There is no retry and no
/// self-healing; recovery is re-creating the controller.
pub struct HostController<E, S>
where
    E: RenderEngine,
    S: FrameScheduler,
{
    state: ControllerState<E>,
    scheduler: S,
    dimensions: SurfaceDimensions,
    pending: Option<ScheduleToken>,
}

impl<E, S> HostController<E, S>
where
    E: RenderEngine,
    S: FrameScheduler,
{
    pub fn new(scheduler: S) -> Self {
        Self {
            state: ControllerState::Uninitialized,
            scheduler,
            dimensions: SurfaceDimensions::default(),
            pending: None,
        }
    }

    /// Brings the engine online and starts the frame loop.
    ///
    /// Valid exactly once, from the initial state; later calls report a
    /// [`MisuseError`] and change nothing. A construction failure is not a
    /// misuse: it lands the controller in the terminal error state, visible
    /// through [`view_state`](Self::view_state).
    pub fn start(&mut self, surface: E::Surface) -> Result<(), MisuseError> {
        if !matches!(self.state, ControllerState::Uninitialized) {
            return Err(MisuseError { operation: "start", state: self.state.name() });
        }

        self.state = ControllerState::Initializing;
        log::debug!("constructing engine");

        match E::construct(surface) {
            Ok(engine) => {
                log::info!("engine constructed; entering frame loop");
                self.state = ControllerState::Running { engine };
                self.pending = Some(self.scheduler.request_frame());
            }
            Err(err) => {
                log::error!("engine construction failed: {err}");
                self.state = ControllerState::Failed {
                    message: err.message().to_owned(),
                    phase: FailurePhase::Construction,
                };
            }
        }
        Ok(())
    }

    /// Runs one scheduled frame step.
    ///
    /// The platform calls this when the request issued through the scheduler
    /// fires. While running: render one frame, then request exactly one
    /// future step, so there is never a backlog. A step that fires after
    /// `stop()` or a failure observes the non-running state and exits
    /// without touching the engine.
    pub fn frame_step(&mut self) {
        // The firing consumed whatever request was outstanding.
        self.pending = None;

        let ControllerState::Running { engine } = &mut self.state else {
            return;
        };

        match engine.render() {
            Ok(()) => {
                self.pending = Some(self.scheduler.request_frame());
            }
            Err(err) => {
                log::error!("render failed: {err}");
                self.fail(err.message().to_owned(), FailurePhase::Render);
            }
        }
    }

    /// Records the surface size and forwards it to a running engine.
    ///
    /// There is no queue: a notification observed while no engine is running
    /// updates the stored dimensions and is otherwise dropped.
    pub fn notify_resize(&mut self, width: u32, height: u32) {
        self.dimensions = SurfaceDimensions { width, height };

        if let ControllerState::Running { engine } = &mut self.state {
            engine.resize(width, height);
        } else {
            log::trace!("resize {width}x{height} dropped; no running engine");
        }
    }

    /// Tears the session down: cancels any pending frame request and
    /// releases the engine. Idempotent and safe from every state; a failed
    /// controller stays failed.
    pub fn stop(&mut self) {
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel_frame(token);
        }

        match self.state {
            ControllerState::Failed { .. } | ControllerState::Stopped => {}
            _ => {
                log::debug!("controller stopped from {} state", self.state.name());
                self.state = ControllerState::Stopped;
            }
        }
    }

    /// Presentation projection of the current state.
    pub fn view_state(&self) -> ViewState<'_> {
        match &self.state {
            ControllerState::Running { .. } => ViewState::Ready,
            ControllerState::Failed { message, .. } => ViewState::Error { message },
            _ => ViewState::Loading,
        }
    }

    /// Last size reported via [`notify_resize`](Self::notify_resize).
    pub fn dimensions(&self) -> SurfaceDimensions {
        self.dimensions
    }

    /// Which phase a failed session died in, if any.
    pub fn failure_phase(&self) -> Option<FailurePhase> {
        match self.state {
            ControllerState::Failed { phase, .. } => Some(phase),
            _ => None,
        }
    }

    /// Whether a frame request is currently outstanding.
    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }

    fn fail(&mut self, message: String, phase: FailurePhase) {
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel_frame(token);
        }
        // Replacing the Running variant drops the engine handle.
        self.state = ControllerState::Failed { message, phase };
    }
}

impl<E, S> Drop for HostController<E, S>
where
    E: RenderEngine,
    S: FrameScheduler,
{
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;
    use crate::engine::EngineError;

    // Scripted engine: its surface handle carries the script and a shared
    // event log, so tests keep observing after the controller drops the
    // engine.

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Construct,
        Render,
        Resize(u32, u32),
        Dropped,
    }

    type EventLog = Rc<RefCell<Vec<Event>>>;

    struct Script {
        log: EventLog,
        construct_error: Option<&'static str>,
        render_plan: VecDeque<Result<(), EngineError>>,
    }

    struct ScriptedEngine {
        log: EventLog,
        render_plan: VecDeque<Result<(), EngineError>>,
    }

    impl RenderEngine for ScriptedEngine {
        type Surface = Script;

        fn construct(surface: Script) -> Result<Self, EngineError> {
            surface.log.borrow_mut().push(Event::Construct);
            if let Some(msg) = surface.construct_error {
                return Err(EngineError::new(msg));
            }
            Ok(Self { log: surface.log, render_plan: surface.render_plan })
        }

        fn render(&mut self) -> Result<(), EngineError> {
            self.log.borrow_mut().push(Event::Render);
            self.render_plan.pop_front().unwrap_or(Ok(()))
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.log.borrow_mut().push(Event::Resize(width, height));
        }
    }

    impl Drop for ScriptedEngine {
        fn drop(&mut self) {
            self.log.borrow_mut().push(Event::Dropped);
        }
    }

    #[derive(Default)]
    struct SchedLog {
        requests: u64,
        cancels: Vec<ScheduleToken>,
    }

    struct RecordingScheduler {
        log: Rc<RefCell<SchedLog>>,
    }

    impl FrameScheduler for RecordingScheduler {
        fn request_frame(&mut self) -> ScheduleToken {
            let mut log = self.log.borrow_mut();
            log.requests += 1;
            ScheduleToken::new(log.requests)
        }

        fn cancel_frame(&mut self, token: ScheduleToken) {
            self.log.borrow_mut().cancels.push(token);
        }
    }

    type Controller = HostController<ScriptedEngine, RecordingScheduler>;

    fn controller() -> (Controller, EventLog, Rc<RefCell<SchedLog>>) {
        let events: EventLog = Rc::new(RefCell::new(Vec::new()));
        let sched = Rc::new(RefCell::new(SchedLog::default()));
        let c = HostController::new(RecordingScheduler { log: Rc::clone(&sched) });
        (c, events, sched)
    }

    fn script(events: &EventLog) -> Script {
        Script {
            log: Rc::clone(events),
            construct_error: None,
            render_plan: VecDeque::new(),
        }
    }

    fn failing_script(events: &EventLog, msg: &'static str) -> Script {
        Script { construct_error: Some(msg), ..script(events) }
    }

    fn render_plan(events: &EventLog, plan: Vec<Result<(), EngineError>>) -> Script {
        Script { render_plan: plan.into(), ..script(events) }
    }

    fn renders(events: &EventLog) -> usize {
        events.borrow().iter().filter(|e| **e == Event::Render).count()
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn start_constructs_once_and_enters_running() {
        let (mut c, events, sched) = controller();

        c.start(script(&events)).unwrap();

        assert_eq!(*events.borrow(), [Event::Construct]);
        assert!(matches!(c.view_state(), ViewState::Ready));
        assert_eq!(sched.borrow().requests, 1);
        assert!(c.is_scheduled());
    }

    #[test]
    fn second_start_is_misuse_and_leaves_state_unchanged() {
        let (mut c, events, _) = controller();
        c.start(script(&events)).unwrap();

        let err = c.start(script(&events)).unwrap_err();

        assert_eq!(err, MisuseError { operation: "start", state: "running" });
        assert_eq!(err.to_string(), "cannot start: controller is running");
        assert!(matches!(c.view_state(), ViewState::Ready));
        // The second call never reached the engine constructor.
        assert_eq!(*events.borrow(), [Event::Construct]);
    }

    #[test]
    fn start_after_stop_is_misuse() {
        let (mut c, events, _) = controller();
        c.stop();

        let err = c.start(script(&events)).unwrap_err();

        assert_eq!(err.state, "stopped");
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn construction_failure_is_terminal() {
        let (mut c, events, sched) = controller();

        c.start(failing_script(&events, "adapter not found")).unwrap();

        assert_eq!(c.view_state(), ViewState::Error { message: "adapter not found" });
        assert_eq!(c.failure_phase(), Some(FailurePhase::Construction));
        assert_eq!(sched.borrow().requests, 0);
        assert!(!c.is_scheduled());
    }

    #[test]
    fn construction_failure_never_touches_an_engine_again() {
        let (mut c, events, _) = controller();
        c.start(failing_script(&events, "adapter not found")).unwrap();

        c.frame_step();
        c.notify_resize(320, 240);

        assert_eq!(*events.borrow(), [Event::Construct]);
        assert_eq!(c.dimensions(), SurfaceDimensions { width: 320, height: 240 });
    }

    #[test]
    fn error_message_survives_unrelated_resize() {
        let (mut c, events, _) = controller();
        c.start(failing_script(&events, "adapter not found")).unwrap();

        c.notify_resize(1024, 768);

        assert_eq!(c.view_state(), ViewState::Error { message: "adapter not found" });
    }

    // ── frame loop ────────────────────────────────────────────────────────

    #[test]
    fn frame_step_renders_once_then_requests_exactly_one_more() {
        let (mut c, events, sched) = controller();
        c.start(script(&events)).unwrap();

        for expected in 1..=3 {
            c.frame_step();
            assert_eq!(renders(&events), expected);
            assert_eq!(sched.borrow().requests, expected as u64 + 1);
            assert!(c.is_scheduled());
        }
    }

    #[test]
    fn frame_step_outside_running_is_a_no_op() {
        let (mut c, events, sched) = controller();

        c.frame_step();

        assert!(events.borrow().is_empty());
        assert_eq!(sched.borrow().requests, 0);
    }

    #[test]
    fn render_failure_is_terminal_and_stops_scheduling() {
        let (mut c, events, sched) = controller();
        c.start(render_plan(&events, vec![Err(EngineError::new("device lost"))]))
            .unwrap();

        c.frame_step();

        assert_eq!(c.view_state(), ViewState::Error { message: "device lost" });
        assert_eq!(c.failure_phase(), Some(FailurePhase::Render));
        assert_eq!(sched.borrow().requests, 1);
        assert!(!c.is_scheduled());
        // The failed engine was released.
        assert_eq!(events.borrow().last(), Some(&Event::Dropped));
    }

    #[test]
    fn step_fired_concurrently_with_failure_does_not_render() {
        let (mut c, events, _) = controller();
        c.start(render_plan(&events, vec![Err(EngineError::new("device lost"))]))
            .unwrap();
        c.frame_step();
        assert_eq!(renders(&events), 1);

        // A step that was already in flight when the failure landed fires
        // now; the state check makes it a no-op.
        c.frame_step();

        assert_eq!(renders(&events), 1);
    }

    // ── resize ────────────────────────────────────────────────────────────

    #[test]
    fn resize_while_running_forwards_exact_values_once() {
        let (mut c, events, _) = controller();
        c.start(script(&events)).unwrap();

        c.notify_resize(400, 300);

        assert_eq!(*events.borrow(), [Event::Construct, Event::Resize(400, 300)]);
        assert_eq!(c.dimensions(), SurfaceDimensions { width: 400, height: 300 });
    }

    #[test]
    fn resize_before_start_records_dimensions_only() {
        let (mut c, events, _) = controller();

        c.notify_resize(640, 480);

        assert!(events.borrow().is_empty());
        assert_eq!(c.dimensions(), SurfaceDimensions { width: 640, height: 480 });
    }

    #[test]
    fn resize_after_stop_is_dropped() {
        let (mut c, events, _) = controller();
        c.start(script(&events)).unwrap();
        c.stop();
        let before = events.borrow().len();

        c.notify_resize(200, 100);

        assert_eq!(events.borrow().len(), before);
        assert_eq!(c.dimensions(), SurfaceDimensions { width: 200, height: 100 });
    }

    // ── stop ──────────────────────────────────────────────────────────────

    #[test]
    fn stop_cancels_the_pending_request_and_releases_the_engine() {
        let (mut c, events, sched) = controller();
        c.start(script(&events)).unwrap();

        c.stop();

        assert_eq!(sched.borrow().cancels, [ScheduleToken::new(1)]);
        assert!(!c.is_scheduled());
        assert_eq!(events.borrow().last(), Some(&Event::Dropped));

        // A stale firing after teardown touches nothing.
        c.frame_step();
        assert_eq!(renders(&events), 0);
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut c, events, sched) = controller();
        c.start(script(&events)).unwrap();

        c.stop();
        c.stop();

        assert_eq!(sched.borrow().cancels.len(), 1);
        assert!(matches!(c.view_state(), ViewState::Loading));
    }

    #[test]
    fn stop_from_uninitialized_is_safe() {
        let (mut c, events, sched) = controller();

        c.stop();
        c.stop();

        assert!(events.borrow().is_empty());
        assert!(sched.borrow().cancels.is_empty());
    }

    #[test]
    fn stop_does_not_clear_a_failure() {
        let (mut c, events, _) = controller();
        c.start(failing_script(&events, "adapter not found")).unwrap();

        c.stop();

        assert_eq!(c.view_state(), ViewState::Error { message: "adapter not found" });
    }

    #[test]
    fn dropping_the_controller_tears_down() {
        let (mut c, events, sched) = controller();
        c.start(script(&events)).unwrap();

        drop(c);

        assert_eq!(sched.borrow().cancels.len(), 1);
        assert_eq!(events.borrow().last(), Some(&Event::Dropped));
    }

    // ── scenarios ─────────────────────────────────────────────────────────

    #[test]
    fn steady_state_resize_then_render_failure() {
        let (mut c, events, sched) = controller();
        let plan = vec![Ok(()), Ok(()), Ok(()), Ok(()), Err(EngineError::new("frame 5 exploded"))];
        c.start(render_plan(&events, plan)).unwrap();

        c.frame_step();
        c.frame_step();
        c.frame_step();
        c.notify_resize(400, 300);
        c.frame_step(); // frame 4, after the resize was forwarded
        c.frame_step(); // frame 5 fails
        c.frame_step(); // already-scheduled step fires into the failed state

        assert_eq!(
            *events.borrow(),
            [
                Event::Construct,
                Event::Render,
                Event::Render,
                Event::Render,
                Event::Resize(400, 300),
                Event::Render,
                Event::Render,
                Event::Dropped,
            ]
        );
        assert_eq!(c.view_state(), ViewState::Error { message: "frame 5 exploded" });
        assert_eq!(c.failure_phase(), Some(FailurePhase::Render));
        // One request from start plus one per successful render; none after
        // the failure.
        assert_eq!(sched.borrow().requests, 5);
    }

    #[test]
    fn failed_construction_scenario_keeps_reporting_the_error() {
        let (mut c, events, _) = controller();
        c.start(failing_script(&events, "adapter not found")).unwrap();

        c.notify_resize(800, 600);
        c.frame_step();
        c.stop();

        assert_eq!(c.view_state(), ViewState::Error { message: "adapter not found" });
        assert_eq!(*events.borrow(), [Event::Construct]);
    }
}
