use std::sync::Arc;

use orrery_host::{EngineError, RenderEngine};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::gpu::{Gpu, GpuInit, SurfaceErrorAction};
use crate::scene::RingScene;

/// The production engine: one wgpu session drawing the orbit scene.
///
/// Hosted behind [`RenderEngine`]; the controller owns this value for the
/// session's lifetime, and dropping it releases every GPU resource.
pub struct OrbitEngine {
    gpu: Gpu,
    scene: RingScene,
}

impl RenderEngine for OrbitEngine {
    type Surface = Arc<Window>;

    fn construct(surface: Arc<Window>) -> Result<Self, EngineError> {
        log::info!("initializing wgpu renderer");

        let gpu = pollster::block_on(Gpu::new(surface, GpuInit::default()))
            .map_err(|err| EngineError::new(format!("{err:#}")))?;

        let size = gpu.size();
        let scene = RingScene::new(gpu.device(), gpu.surface_format(), size.width, size.height);

        Ok(Self { gpu, scene })
    }

    fn render(&mut self) -> Result<(), EngineError> {
        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                // Transient swapchain conditions are absorbed here; anything
                // reported upward is terminal for the hosted session.
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(()),
                    SurfaceErrorAction::Fatal => Err(EngineError::new("surface out of memory")),
                };
            }
        };

        self.scene.render(self.gpu.queue(), &mut frame.encoder, &frame.view);
        self.gpu.submit(frame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(PhysicalSize::new(width, height));
        self.scene.set_viewport(width, height);
    }
}
