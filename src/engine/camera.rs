// Fixed blob camera.
//
// Camera model:
//   - Eye sits on the +Z axis at `distance` (slightly raised by `height`),
//     always looking at the origin where the blob is centered
//   - Mouse wheel zooms by adjusting distance along the view axis
//   - No pan or rotation: the blob is the whole scene
//
// Also owns world→screen projection for the mass-center projector: NDC is
// mapped to pixels with the y axis flipped (NDC +y is up, screen +y is down).

use glam::{Mat4, Vec2, Vec3};

pub struct BlobCamera {
    /// Distance from the origin along the view axis.
    /// Private: always clamped to [min_distance, max_distance]. Use distance() to read.
    distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    /// Eye elevation above the blob center, in world units.
    pub height: f32,

    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    /// Zoom change (in distance units) per scroll line.
    pub zoom_speed: f32,
}

impl BlobCamera {
    pub fn new() -> Self {
        Self {
            distance: 24.0,
            min_distance: 10.0,
            max_distance: 60.0,
            height: 2.0,
            fov: 35.0_f32.to_radians(),
            near: 0.1,
            far: 200.0,
            zoom_speed: 2.0,
        }
    }

    /// Apply this frame's scroll input. Scroll up (positive delta) zooms in.
    pub fn zoom(&mut self, scroll_delta: f32) {
        self.distance -= scroll_delta * self.zoom_speed;
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    /// World-space position of the camera eye.
    pub fn camera_position(&self) -> Vec3 {
        Vec3::new(0.0, self.height, self.distance)
    }

    /// View matrix: looks from the eye toward the blob center.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.camera_position(), Vec3::ZERO, Vec3::Y)
    }

    /// Perspective projection matrix.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    pub fn distance(&self) -> f32 { self.distance }

    /// Project a world-space point to pixel coordinates.
    ///
    /// Returns `None` when the result is unusable: the point is behind the
    /// near plane, any coordinate is non-finite, or the pixel falls outside
    /// the viewport. Callers treat `None` as "keep the previous value".
    pub fn project_to_screen(&self, world: Vec3, viewport: (u32, u32)) -> Option<Vec2> {
        let (w, h) = (viewport.0 as f32, viewport.1 as f32);
        if w <= 0.0 || h <= 0.0 {
            return None;
        }

        let clip = self.view_projection(w / h) * world.extend(1.0);
        if !clip.is_finite() || clip.w <= 0.0 {
            return None;
        }

        let ndc = clip.truncate() / clip.w;
        // NDC +y is up; screen +y is down.
        let px = (ndc.x * 0.5 + 0.5) * w;
        let py = (1.0 - (ndc.y * 0.5 + 0.5)) * h;
        if !px.is_finite() || !py.is_finite() {
            return None;
        }
        if px < 0.0 || px > w || py < 0.0 || py > h {
            return None;
        }

        Some(Vec2::new(px, py))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn level_camera() -> BlobCamera {
        let mut cam = BlobCamera::new();
        cam.height = 0.0;
        cam
    }

    #[test]
    fn origin_projects_to_viewport_center() {
        let cam = level_camera();
        let p = cam.project_to_screen(Vec3::ZERO, (800, 600)).unwrap();
        assert_relative_eq!(p.x, 400.0, epsilon = 1e-3);
        assert_relative_eq!(p.y, 300.0, epsilon = 1e-3);
    }

    #[test]
    fn screen_y_is_flipped() {
        // A point above the origin in world space lands in the upper half of
        // the screen (smaller y).
        let cam = level_camera();
        let p = cam.project_to_screen(Vec3::new(0.0, 1.0, 0.0), (800, 600)).unwrap();
        assert!(p.y < 300.0);
    }

    #[test]
    fn point_behind_camera_is_rejected() {
        let cam = level_camera();
        let behind = Vec3::new(0.0, 0.0, cam.distance() + 10.0);
        assert!(cam.project_to_screen(behind, (800, 600)).is_none());
    }

    #[test]
    fn non_finite_point_is_rejected() {
        let cam = level_camera();
        assert!(cam.project_to_screen(Vec3::new(f32::NAN, 0.0, 0.0), (800, 600)).is_none());
        assert!(cam.project_to_screen(Vec3::new(f32::INFINITY, 0.0, 0.0), (800, 600)).is_none());
    }

    #[test]
    fn far_offscreen_point_is_rejected() {
        let cam = level_camera();
        assert!(cam.project_to_screen(Vec3::new(1000.0, 0.0, 0.0), (800, 600)).is_none());
    }

    #[test]
    fn zoom_clamps_to_distance_range() {
        let mut cam = BlobCamera::new();
        cam.zoom(1000.0);
        assert_relative_eq!(cam.distance(), cam.min_distance);
        cam.zoom(-1000.0);
        assert_relative_eq!(cam.distance(), cam.max_distance);
    }
}
