// Animated implicit-surface ("blob") visualization with a tracking face.
//
// Frame flow: scheduler → body simulation → field rebuild + polygonization →
// mass-center projection → face update → blob render pass → egui overlay.
// Hotkeys stand in for the external collaborators that drive the core:
//   Space      pause / resume
//   E / R      expand / reset the blob scale
//   T          toggle the talking loop
//   1..4, B    neutral / happy / surprised / wink, blink
//   F3         stats panel

mod engine;

use std::time::Instant;

use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use engine::camera::BlobCamera;
use engine::face::{Expression, Face};
use engine::face_overlay::{FaceOverlay, OverlayStats};
use engine::field::{FieldGrid, FIELD_RES, ISO_LEVEL};
use engine::input::InputState;
use engine::mesh::{triangulate_smooth, GpuVertex, PolyMesh, RenderMesh};
use engine::projector::MassCenterProjector;
use engine::scheduler::FrameScheduler;
use engine::simulation::{aggregate_color, inject_field, BlobSim, BODY_COUNT};
use engine::transition::{
    Tween, EXPANDED_SCALE, EXPAND_DURATION, RESET_DURATION, REST_SCALE,
};

// ============================================================================
// GPU BUFFER CAPACITY
// ============================================================================

// Fixed-capacity buffers refilled every frame (the isosurface is rebuilt from
// scratch each tick). MAX_VERTICES covers the surface-nets worst case of one
// vertex per lattice cell.
const MAX_VERTICES: usize = 32768;
const MAX_INDICES: usize = 196608;

// ============================================================================
// UNIFORM DATA
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    tint: [f32; 4],
}

impl Uniforms {
    fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            tint: [0.5, 0.5, 0.5, 1.0],
        }
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: std::sync::Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    // ECS world holding the body population
    world: World,
    sim: BlobSim,

    // Per-frame field/mesh pipeline with reused allocations
    grid: FieldGrid,
    poly: PolyMesh,
    render_mesh: RenderMesh,
    normal_scratch: Vec<Vec3>,
    cell_scratch: Vec<i32>,

    camera: BlobCamera,
    projector: MassCenterProjector,
    face: Face,
    face_overlay: FaceOverlay,
    input: InputState,
    scheduler: FrameScheduler,

    // Blob scale transition slot (expand / reset share it)
    scale_tween: Tween,
    blob_scale: f32,

    // FPS accounting for the stats panel and the once-a-second log line
    frame_count: u32,
    frame_time_accum: f32,
    last_fps_update: Instant,
    fps: u32,
    frame_time_avg_ms: f32,
}

impl State {
    async fn new(window: std::sync::Arc<Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone()).unwrap();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .unwrap();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .unwrap();

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blob Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_blob.wgsl").into()),
        });

        let uniforms = Uniforms::new();

        use wgpu::util::DeviceExt;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vertex Buffer"),
            size: (MAX_VERTICES * std::mem::size_of::<GpuVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Index Buffer"),
            size: (MAX_INDICES * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Seed the simulation and the face timers from entropy; log the seed
        // so an interesting run can be replayed.
        use rand::Rng;
        let seed: u64 = rand::thread_rng().r#gen();
        log::info!("simulation seed: {seed}");

        let mut world = World::new();
        let mut sim = BlobSim::new(seed);
        sim.spawn_bodies(&mut world, BODY_COUNT);
        log::info!("spawned {BODY_COUNT} bodies");

        let face_overlay = FaceOverlay::new(&window, &device, surface_format);

        Self {
            projector: MassCenterProjector::new((size.width, size.height)),
            face: Face::new(seed ^ 0x5fa3, (size.width, size.height)),
            face_overlay,
            window,
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            uniform_bind_group,
            world,
            sim,
            grid: FieldGrid::new(FIELD_RES),
            poly: PolyMesh::new(),
            render_mesh: RenderMesh::new(),
            normal_scratch: Vec::new(),
            cell_scratch: Vec::new(),
            camera: BlobCamera::new(),
            input: InputState::new(),
            scheduler: FrameScheduler::new(),
            scale_tween: Tween::settled(REST_SCALE),
            blob_scale: REST_SCALE,
            frame_count: 0,
            frame_time_accum: 0.0,
            last_fps_update: Instant::now(),
            fps: 0,
            frame_time_avg_ms: 0.0,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            // The old smoothed target may be far outside the new viewport;
            // snap it to the center rather than letting it animate back in.
            self.projector.on_resize(new_size.width, new_size.height);
        }
    }

    // ------------------------------------------------------------------------
    // INBOUND TRIGGERS
    // ------------------------------------------------------------------------

    fn start_expand(&mut self) {
        self.scale_tween.start(
            self.scale_tween.value(),
            EXPANDED_SCALE,
            EXPAND_DURATION,
            Some(Box::new(|| log::info!("expand transition complete"))),
        );
    }

    fn start_reset(&mut self) {
        self.scale_tween.start(
            self.scale_tween.value(),
            REST_SCALE,
            RESET_DURATION,
            Some(Box::new(|| log::info!("reset transition complete"))),
        );
    }

    fn toggle_pause(&mut self) {
        if self.scheduler.is_paused() {
            if self.scheduler.resume() {
                self.window.request_redraw();
            }
            log::info!("resumed");
        } else {
            self.scheduler.pause();
            log::info!("paused");
        }
    }

    // ------------------------------------------------------------------------
    // PER-FRAME UPDATE
    // ------------------------------------------------------------------------

    fn update(&mut self, dt: f32) {
        // Input → camera zoom and face parallax
        self.camera.zoom(self.input.scroll_delta);
        if let Some(pointer) = self.input.pointer_normalized() {
            self.face.update_parallax(pointer);
        }

        // Simulation advances strictly before projection, projection strictly
        // before face placement, face before rendering.
        self.sim.advance(&mut self.world, dt);
        inject_field(&mut self.world, &mut self.grid);
        self.grid.polygonize(ISO_LEVEL, &mut self.poly, &mut self.cell_scratch);
        triangulate_smooth(&self.poly, &mut self.normal_scratch, &mut self.render_mesh);

        self.blob_scale = self.scale_tween.advance(dt);

        let viewport = (self.size.width, self.size.height);
        self.projector
            .update(&mut self.world, &self.camera, self.blob_scale, viewport);

        self.face.update_position(self.projector.smoothed());
        self.face.advance(dt);
    }

    // ------------------------------------------------------------------------
    // RENDER
    // ------------------------------------------------------------------------

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Upload this frame's mesh BEFORE creating the render pass.
        let vertex_count = self.render_mesh.vertices.len();
        let mut index_count = self.render_mesh.index_count();
        if vertex_count > MAX_VERTICES || index_count > MAX_INDICES {
            // Capacity covers any realistic surface; a pathological field is
            // dropped for the frame rather than overflowing the buffers.
            log::warn!(
                "isosurface overflowed mesh buffers ({vertex_count} verts, {index_count} indices), skipping frame"
            );
            index_count = 0;
        } else if vertex_count > 0 {
            self.queue
                .write_buffer(&self.vertex_buffer, 0, self.render_mesh.vertex_bytes());
            self.queue
                .write_buffer(&self.index_buffer, 0, self.render_mesh.index_bytes());
        }

        let aspect = self.size.width as f32 / self.size.height as f32;
        let uniforms = Uniforms {
            view_proj: self.camera.view_projection(aspect).to_cols_array_2d(),
            model: Mat4::from_scale(Vec3::splat(self.blob_scale)).to_cols_array_2d(),
            tint: {
                let [r, g, b] = aggregate_color(&mut self.world);
                [r, g, b, 1.0]
            },
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blob Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.1,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if index_count > 0 {
                render_pass.set_pipeline(&self.render_pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..index_count as u32, 0, 0..1);
            }
        }

        // Overlay pass: the face, plus the stats panel while toggled on.
        let pose = self.face.pose();
        let target = self.projector.target();
        let stats = OverlayStats {
            fps: self.fps,
            frame_time_avg_ms: self.frame_time_avg_ms,
            body_count: BODY_COUNT,
            sim_clock: self.sim.clock(),
            blob_scale: self.blob_scale,
            scale_transitioning: self.scale_tween.is_active(),
            camera_distance: self.camera.distance(),
            resolution: (self.size.width, self.size.height),
            target_raw: (target.raw.x, target.raw.y),
            target_smoothed: (target.smoothed.x, target.smoothed.y),
            expression: expression_label(self.face.expression()),
            talking: self.face.is_talking(),
            pose_generation: self.face.pose_generation(),
            paused: self.scheduler.is_paused(),
        };
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        let stats_visible = self.face_overlay.stats_visible;
        self.face_overlay.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            &pose,
            stats_visible.then_some(&stats),
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn expression_label(e: Expression) -> &'static str {
    match e {
        Expression::Neutral => "neutral",
        Expression::Happy => "happy",
        Expression::Surprised => "surprised",
        Expression::Wink => "wink",
        Expression::Blink => "blink",
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() {
    env_logger::init();

    let event_loop = EventLoop::new().unwrap();

    let window_attributes = Window::default_attributes()
        .with_title("Globule")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = std::sync::Arc::new(event_loop.create_window(window_attributes).unwrap());

    let mut state = pollster::block_on(State::new(window.clone()));

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                state.input.process_event(event);
                let _ = state.face_overlay.handle_window_event(&window, event);

                match event {
                    WindowEvent::CloseRequested => control_flow.exit(),
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(code),
                                repeat: false,
                                ..
                            },
                        ..
                    } => match code {
                        KeyCode::Escape => control_flow.exit(),
                        KeyCode::Space => state.toggle_pause(),
                        KeyCode::KeyE => state.start_expand(),
                        KeyCode::KeyR => state.start_reset(),
                        KeyCode::KeyT => {
                            let talking = state.face.is_talking();
                            state.face.set_talking(!talking);
                        }
                        KeyCode::KeyB => state.face.set_expression(Expression::Blink),
                        KeyCode::Digit1 => state.face.set_expression(Expression::Neutral),
                        KeyCode::Digit2 => state.face.set_expression(Expression::Happy),
                        KeyCode::Digit3 => state.face.set_expression(Expression::Surprised),
                        KeyCode::Digit4 => state.face.set_expression(Expression::Wink),
                        KeyCode::F3 => state.face_overlay.toggle_stats(),
                        _ => {}
                    },
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        let frame_start = Instant::now();
                        if let Some(dt) = state.scheduler.begin_frame(frame_start) {
                            state.update(dt);
                            match state.render() {
                                Ok(_) => {}
                                Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                                Err(wgpu::SurfaceError::OutOfMemory) => control_flow.exit(),
                                Err(e) => log::error!("render error: {e:?}"),
                            }

                            state.frame_count += 1;
                            state.frame_time_accum += frame_start.elapsed().as_secs_f32();
                            let now = Instant::now();
                            if (now - state.last_fps_update).as_secs_f32() >= 1.0 {
                                state.fps = state.frame_count;
                                state.frame_time_avg_ms = if state.frame_count > 0 {
                                    state.frame_time_accum / state.frame_count as f32 * 1000.0
                                } else {
                                    0.0
                                };
                                log::debug!(
                                    "fps: {} | frame: {:.2} ms | scale: {:.1}",
                                    state.fps,
                                    state.frame_time_avg_ms,
                                    state.blob_scale
                                );
                                state.frame_count = 0;
                                state.frame_time_accum = 0.0;
                                state.last_fps_update = now;
                            }
                        }
                        state.input.end_frame();
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                if state.scheduler.request_frame() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }).unwrap();
}
