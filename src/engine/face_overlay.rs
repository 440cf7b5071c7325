// egui overlay pass: the tracking face, plus an F3 stats panel.
//
// The face is pure painter output (no widgets), drawn from the FacePose the
// core composed this frame. egui renders after the blob pass with LoadOp::Load
// so the overlay sits on top of the 3D scene.

use egui::epaint::Shadow;

use super::face::FacePose;

// Face proportions in screen points.
const EYE_RX: f32 = 7.0;
const EYE_RY: f32 = 10.0;
const NOSE_RADIUS: f32 = 3.5;
const MOUTH_HALF_WIDTH: f32 = 16.0;
const MOUTH_CURVE_PX: f32 = 9.0;
const MOUTH_OPEN_RY: f32 = 10.0;
const MOUTH_SAMPLES: usize = 12;

fn ink() -> egui::Color32 {
    egui::Color32::from_rgb(24, 28, 42)
}

/// Everything the F3 stats panel prints. Collected by the frame loop.
pub struct OverlayStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub body_count: usize,
    pub sim_clock: f32,
    pub blob_scale: f32,
    /// True while an expand/reset transition is in flight.
    pub scale_transitioning: bool,
    pub camera_distance: f32,
    pub resolution: (u32, u32),
    pub target_raw: (f32, f32),
    pub target_smoothed: (f32, f32),
    pub expression: &'static str,
    pub talking: bool,
    /// Animation-start counter of the face; handy for spotting stuck states.
    pub pose_generation: u64,
    pub paused: bool,
}

pub struct FaceOverlay {
    pub stats_visible: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl FaceOverlay {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        // Style: dark, semi-transparent, small monospace white font
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);
        visuals.window_stroke = egui::Stroke::NONE;
        visuals.window_shadow = Shadow::NONE;
        visuals.override_text_color = Some(egui::Color32::WHITE);
        egui_ctx.set_visuals(visuals);

        let mut style = (*egui_ctx.style()).clone();
        style.override_font_id = Some(egui::FontId::monospace(13.0));
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // no depth
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            stats_visible: false,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle_stats(&mut self) {
        self.stats_visible = !self.stats_visible;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Render one egui frame: the face layer, and the stats panel when
    /// toggled on. Both are tessellated in a single egui pass.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        pose: &FacePose,
        stats: Option<&OverlayStats>,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            // ── Face layer ────────────────────────────────────────────────────
            let painter = ctx.layer_painter(egui::LayerId::new(
                egui::Order::Background,
                egui::Id::new("tracking_face"),
            ));
            draw_face(&painter, pose);

            // ── F3: stats panel ──────────────────────────────────────────────
            if let Some(stats) = stats {
                egui::Area::new(egui::Id::new("stats_overlay"))
                    .fixed_pos(egui::pos2(10.0, 10.0))
                    .show(ctx, |ui| {
                        egui::Frame::none()
                            .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 180))
                            .inner_margin(egui::Margin::same(8.0))
                            .rounding(4.0)
                            .show(ui, |ui: &mut egui::Ui| {
                                ui.label(format!("FPS: {}", stats.fps));
                                ui.label(format!("Frame: {:.2} ms", stats.frame_time_avg_ms));
                                ui.label(format!(
                                    "Bodies: {}  Clock: {:.1} s",
                                    stats.body_count, stats.sim_clock
                                ));
                                ui.label(format!(
                                    "Scale: {:.1}{}",
                                    stats.blob_scale,
                                    if stats.scale_transitioning { " (animating)" } else { "" }
                                ));
                                ui.label(format!("Camera dist: {:.1}", stats.camera_distance));
                                ui.label(format!(
                                    "Resolution: {} x {}",
                                    stats.resolution.0, stats.resolution.1
                                ));
                                ui.label(format!(
                                    "Target: ({:.0}, {:.0})  raw ({:.0}, {:.0})",
                                    stats.target_smoothed.0,
                                    stats.target_smoothed.1,
                                    stats.target_raw.0,
                                    stats.target_raw.1
                                ));
                                ui.label(format!(
                                    "Face: {}{}  gen {}",
                                    stats.expression,
                                    if stats.talking { " (talking)" } else { "" },
                                    stats.pose_generation
                                ));
                                if stats.paused {
                                    ui.label("PAUSED");
                                }
                            });
                    });
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

// ============================================================================
// FACE DRAWING
// ============================================================================

fn draw_face(painter: &egui::Painter, pose: &FacePose) {
    draw_eye(painter, &pose.left_eye);
    draw_eye(painter, &pose.right_eye);

    painter.circle_filled(
        egui::pos2(pose.nose.x, pose.nose.y),
        NOSE_RADIUS,
        ink(),
    );

    draw_mouth(painter, pose);
}

fn draw_eye(painter: &egui::Painter, eye: &super::face::EyePose) {
    let center = egui::pos2(eye.center.x, eye.center.y);
    let ry = (EYE_RY * eye.openness).max(0.0);
    if ry < 1.0 {
        // Fully (or nearly) shut: a flat lid line reads better than a sliver.
        let stroke = egui::Stroke::new(2.0, ink());
        painter.line_segment(
            [
                egui::pos2(eye.center.x - EYE_RX, eye.center.y),
                egui::pos2(eye.center.x + EYE_RX, eye.center.y),
            ],
            stroke,
        );
    } else {
        painter.add(egui::epaint::EllipseShape::filled(
            center,
            egui::vec2(EYE_RX, ry),
            ink(),
        ));
    }
}

fn draw_mouth(painter: &egui::Painter, pose: &FacePose) {
    let mouth = &pose.mouth;

    // Open mouth: an ellipse whose height tracks the openness channel.
    let open_ry = MOUTH_OPEN_RY * mouth.openness;
    if open_ry >= 1.5 {
        painter.add(egui::epaint::EllipseShape::filled(
            egui::pos2(mouth.center.x, mouth.center.y),
            egui::vec2(MOUTH_HALF_WIDTH * 0.7, open_ry),
            ink(),
        ));
        return;
    }

    // Closed mouth: a sampled parabolic arc bent by the curve channel
    // (positive curve = smile, ends above the center).
    let stroke = egui::Stroke::new(2.5, ink());
    let points: Vec<egui::Pos2> = (0..=MOUTH_SAMPLES)
        .map(|i| {
            let t = i as f32 / MOUTH_SAMPLES as f32 * 2.0 - 1.0; // -1..1
            let x = mouth.center.x + t * MOUTH_HALF_WIDTH;
            let y = mouth.center.y + mouth.curve * MOUTH_CURVE_PX * (t * t - 0.5);
            egui::pos2(x, y)
        })
        .collect();
    painter.add(egui::Shape::line(points, stroke));
}
