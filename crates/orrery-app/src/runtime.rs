use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use orrery_engine::OrbitEngine;
use orrery_host::{FrameScheduler, HostController, ScheduleToken, ViewState};

use crate::clock::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "orrery".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
        }
    }
}

/// Seconds of frame delta above which a frame is logged as slow.
const SLOW_FRAME_SECS: f32 = 0.1;

/// Frame-request source backed by the window's redraw machinery.
///
/// A requested redraw cannot be withdrawn, so `cancel_frame` is advisory
/// here; the controller's state check makes a stale redraw a no-op.
struct RedrawScheduler {
    window: Arc<Window>,
    next: u64,
}

impl RedrawScheduler {
    fn new(window: Arc<Window>) -> Self {
        Self { window, next: 0 }
    }
}

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&mut self) -> ScheduleToken {
        self.window.request_redraw();
        self.next += 1;
        ScheduleToken::new(self.next)
    }

    fn cancel_frame(&mut self, _token: ScheduleToken) {}
}

type Controller = HostController<OrbitEngine, RedrawScheduler>;

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    pub fn run(config: RuntimeConfig) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut shell = Shell::new(config);

        event_loop
            .run_app(&mut shell)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

/// One mounted surface: the window, its controller, and what the title
/// currently shows.
struct Mounted {
    window: Arc<Window>,
    controller: Controller,
    clock: FrameClock,
    shown_title: String,
}

/// Presentation shell: creates the surface, drives the controller from
/// window events, and projects its observable state for display.
struct Shell {
    config: RuntimeConfig,
    mounted: Option<Mounted>,
}

impl Shell {
    fn new(config: RuntimeConfig) -> Self {
        Self { config, mounted: None }
    }

    fn mount(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let loading_title = title_for(&ViewState::Loading, &self.config.title);
        let attrs = Window::default_attributes()
            .with_title(&loading_title)
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let mut controller = Controller::new(RedrawScheduler::new(Arc::clone(&window)));

        // Blocks on GPU acquisition. Misuse is impossible on a fresh
        // controller but is surfaced anyway.
        if let Err(err) = controller.start(Arc::clone(&window)) {
            log::warn!("{err}");
        }

        let mut mounted = Mounted {
            window,
            controller,
            clock: FrameClock::new(),
            shown_title: loading_title,
        };
        present(&mut mounted, &self.config.title);

        self.mounted = Some(mounted);
        Ok(())
    }
}

impl ApplicationHandler for Shell {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.mounted.is_some() {
            return;
        }

        if let Err(err) = self.mount(event_loop) {
            log::error!("failed to mount render surface: {err:#}");
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // Frames are driven by the controller's own redraw requests, not by
        // a busy loop.
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        if mounted.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                mounted.controller.stop();
                self.mounted = None;
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                mounted.controller.notify_resize(new_size.width, new_size.height);
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = mounted.window.inner_size();
                mounted.controller.notify_resize(new_size.width, new_size.height);
            }

            WindowEvent::RedrawRequested => {
                let ft = mounted.clock.tick();
                if ft.frame_index > 0 && ft.dt > SLOW_FRAME_SECS {
                    log::warn!("slow frame #{}: {:.1} ms", ft.frame_index, ft.dt * 1000.0);
                }

                mounted.controller.frame_step();
                present(mounted, &self.config.title);
            }

            _ => {}
        }
    }
}

/// Pushes the controller's observable state into the window title, and into
/// the log on failure. Retitles only on transitions.
fn present(mounted: &mut Mounted, app_title: &str) {
    let view = mounted.controller.view_state();
    let title = title_for(&view, app_title);
    if title == mounted.shown_title {
        return;
    }

    if let ViewState::Error { message } = view {
        log::error!("renderer failed: {message}");
    }

    mounted.window.set_title(&title);
    mounted.shown_title = title;
}

/// Title projection of the observable state.
fn title_for(view: &ViewState<'_>, app_title: &str) -> String {
    match view {
        ViewState::Loading => format!("{app_title} - loading renderer..."),
        ViewState::Ready => app_title.to_string(),
        ViewState::Error { message } => format!("{app_title} - error: {message}"),
    }
}
