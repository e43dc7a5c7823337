use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Number of circles in the ring.
const RING_COUNT: usize = 10;
/// Phase advance per rendered frame, in radians.
const PHASE_STEP: f32 = 0.01;
/// Angular spacing between successive circles, in radians.
const ANGLE_SPACING: f32 = 0.3;
/// Orbit radius in surface pixels.
const ORBIT_RADIUS: f32 = 100.0;
/// Vertical squash applied to the orbit; gives the ellipse its depth cue.
const ORBIT_SQUASH: f32 = 0.5;
/// Radius of the lead circle in pixels.
const BASE_RADIUS: f32 = 20.0;
/// Radius lost per trailing circle.
const RADIUS_STEP: f32 = 1.5;
/// Fill alpha shared by the whole ring.
const RING_ALPHA: f32 = 0.8;

/// Background clear color (#1a1a2e).
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 26.0 / 255.0,
    g: 26.0 / 255.0,
    b: 46.0 / 255.0,
    a: 1.0,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    viewport: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadVertex {
    pos: [f32; 2], // 0..1
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [0.0, 0.0] },
    QuadVertex { pos: [1.0, 0.0] },
    QuadVertex { pos: [1.0, 1.0] },
    QuadVertex { pos: [0.0, 1.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Instance data layout (32 bytes):
///
///  offset  0  center      [f32; 2]   loc 1
///  offset  8  radius_pad  [f32; 2]   loc 2  (.x = radius)
///  offset 16  color       [f32; 4]   loc 3  (premultiplied)
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct CircleInstance {
    center: [f32; 2],
    radius_pad: [f32; 2],
    color: [f32; 4],
}

impl CircleInstance {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        1 => Float32x2, // center
        2 => Float32x2, // radius
        3 => Float32x4  // color
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<CircleInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// The orbiting-ring scene.
///
/// One instanced draw per frame: a unit quad expanded around each circle's
/// center in the vertex stage, shaded as an antialiased disc in the fragment
/// stage. The orbit phase advances once per rendered frame.
pub struct RingScene {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    viewport_ubo: wgpu::Buffer,
    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
    instance_vbo: wgpu::Buffer,

    /// Drawable size in pixels; circle coordinates live in this space.
    viewport: [f32; 2],
    phase: f32,
}

impl RingScene {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("orrery ring shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/ring.wgsl").into()),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("orrery ring bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(viewport_ubo_min_binding_size()),
                    },
                    count: None,
                }],
            });

        let viewport_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("orrery ring viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("orrery ring bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_ubo.as_entire_binding(),
            }],
        });

        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("orrery ring pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("orrery ring pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), CircleInstance::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("orrery ring quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("orrery ring quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        // The ring never grows, so the instance buffer is sized once.
        let instance_vbo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("orrery ring instance vbo"),
            size: (RING_COUNT * std::mem::size_of::<CircleInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            bind_group,
            viewport_ubo,
            quad_vbo,
            quad_ibo,
            instance_vbo,
            viewport: [width.max(1) as f32, height.max(1) as f32],
            phase: 0.0,
        }
    }

    /// Adopts a new drawable size.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = [width.max(1) as f32, height.max(1) as f32];
    }

    /// Advances the orbit one frame and records the draw into `encoder`.
    pub fn render(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        self.phase += PHASE_STEP;

        let instances = ring_instances(self.viewport, self.phase);
        queue.write_buffer(&self.instance_vbo, 0, bytemuck::cast_slice(&instances));
        queue.write_buffer(
            &self.viewport_ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform { viewport: self.viewport, _pad: [0.0; 2] }),
        );

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("orrery ring pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, self.instance_vbo.slice(..));
        rpass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, 0..RING_COUNT as u32);
    }
}

fn viewport_ubo_min_binding_size() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<ViewportUniform>() as u64)
        .expect("ViewportUniform has non-zero size by construction")
}

/// Computes the ring's instances for one frame.
///
/// Circle `i` trails the lead by `i * ANGLE_SPACING` radians on an ellipse
/// around the viewport center, shrinking and shifting hue along the trail.
fn ring_instances(viewport: [f32; 2], phase: f32) -> [CircleInstance; RING_COUNT] {
    let cx = viewport[0] / 2.0;
    let cy = viewport[1] / 2.0;

    core::array::from_fn(|i| {
        let angle = phase + i as f32 * ANGLE_SPACING;
        CircleInstance {
            center: [
                cx + angle.cos() * ORBIT_RADIUS,
                cy + angle.sin() * ORBIT_RADIUS * ORBIT_SQUASH,
            ],
            radius_pad: [BASE_RADIUS - i as f32 * RADIUS_STEP, 0.0],
            color: ring_color(i),
        }
    })
}

/// Circle `i`'s fill color, premultiplied for the blend state.
fn ring_color(i: usize) -> [f32; 4] {
    let i = i as f32;
    [
        (100.0 + i * 15.0) / 255.0 * RING_ALPHA,
        (50.0 + i * 10.0) / 255.0 * RING_ALPHA,
        (200.0 - i * 5.0) / 255.0 * RING_ALPHA,
        RING_ALPHA,
    ]
}
