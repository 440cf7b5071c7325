// Mass-center projection and temporal smoothing.
//
// Reduces the body population to one strength-weighted 3D point, projects it
// through the camera into pixel coordinates, and exponentially smooths the
// result so the overlay face gets a stable target even when the raw
// projection jumps. Rejected frames (zero mass, non-finite or off-viewport
// projection) keep the previous value; a viewport resize force-resets the
// filter to the new center so a stale off-screen value never animates back in.

use bevy_ecs::prelude::*;
use glam::{Vec2, Vec3};

use super::camera::BlobCamera;
use super::components::{BlobBody, Transform};

/// Fraction of the remaining distance covered per frame. Tuned for
/// "responsive but not jumpy".
pub const SMOOTHING_ALPHA: f32 = 0.12;

/// The 2D tracking target, in pixels.
pub struct ProjectedTarget {
    pub raw:      Vec2,
    pub smoothed: Vec2,
}

pub struct MassCenterProjector {
    target: ProjectedTarget,
    alpha:  f32,
}

impl MassCenterProjector {
    /// Starts centered in the given viewport.
    pub fn new(viewport: (u32, u32)) -> Self {
        let center = viewport_center(viewport);
        Self {
            target: ProjectedTarget { raw: center, smoothed: center },
            alpha: SMOOTHING_ALPHA,
        }
    }

    pub fn target(&self) -> &ProjectedTarget { &self.target }

    pub fn smoothed(&self) -> Vec2 { self.target.smoothed }

    /// Force-reset to the center of a freshly resized viewport.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        let center = viewport_center((width, height));
        self.target.raw = center;
        self.target.smoothed = center;
    }

    /// Recompute the target from the current body set. `blob_scale` is the
    /// same world scale the renderer applies to the field mesh, so the
    /// projected point matches what is on screen mid-transition too.
    pub fn update(
        &mut self,
        world: &mut World,
        camera: &BlobCamera,
        blob_scale: f32,
        viewport: (u32, u32),
    ) {
        let Some(center) = mass_center(world) else {
            return;
        };
        let Some(pixel) = camera.project_to_screen(center * blob_scale, viewport) else {
            return;
        };
        self.target.raw = pixel;
        self.smooth_toward(pixel);
    }

    fn smooth_toward(&mut self, raw: Vec2) {
        self.target.smoothed += (raw - self.target.smoothed) * self.alpha;
    }
}

fn viewport_center(viewport: (u32, u32)) -> Vec2 {
    Vec2::new(viewport.0 as f32 * 0.5, viewport.1 as f32 * 0.5)
}

/// Strength-weighted average of body positions in simulation space.
/// `None` when the population is empty or carries no strength (degenerate
/// configuration — treated as "no update", never a division by zero).
pub fn mass_center(world: &mut World) -> Option<Vec3> {
    let mut sum = Vec3::ZERO;
    let mut mass = 0.0f32;
    let mut query = world.query::<(&Transform, &BlobBody)>();
    for (transform, body) in query.iter(world) {
        sum += transform.position * body.strength;
        mass += body.strength;
    }
    if mass > 0.0 { Some(sum / mass) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::components::{BlobBody, Transform};
    use approx::assert_relative_eq;

    fn body(position: Vec3, strength: f32) -> (Transform, BlobBody) {
        (
            Transform::from_position(position),
            BlobBody { strength, falloff: 12.0, phase_offset: 0.0 },
        )
    }

    #[test]
    fn smoothing_converges_without_overshoot() {
        let mut proj = MassCenterProjector::new((0, 0));
        let raw = Vec2::new(500.0, 500.0);

        let mut prev_gap = raw.x;
        for _ in 0..50 {
            proj.smooth_toward(raw);
            let gap = raw.x - proj.smoothed().x;
            assert!(gap >= 0.0, "smoothing overshot the target");
            assert!(gap < prev_gap, "smoothing stalled");
            prev_gap = gap;
        }
        assert!(proj.smoothed().distance(raw) < 1.0);
    }

    #[test]
    fn resize_resets_to_new_viewport_center() {
        let mut proj = MassCenterProjector::new((1000, 1000));
        for _ in 0..10 {
            proj.smooth_toward(Vec2::new(990.0, 990.0));
        }
        proj.on_resize(800, 600);
        assert_relative_eq!(proj.smoothed().x, 400.0);
        assert_relative_eq!(proj.smoothed().y, 300.0);
        assert_relative_eq!(proj.target().raw.x, 400.0);
    }

    #[test]
    fn zero_mass_population_skips_the_update() {
        let mut world = World::new();
        world.spawn(body(Vec3::new(0.3, 0.0, 0.0), 0.0));

        let mut proj = MassCenterProjector::new((800, 600));
        let before = proj.smoothed();
        let mut cam = BlobCamera::new();
        cam.height = 0.0;
        proj.update(&mut world, &cam, 5.0, (800, 600));
        assert_eq!(proj.smoothed(), before);
    }

    #[test]
    fn mass_center_is_strength_weighted() {
        let mut world = World::new();
        world.spawn(body(Vec3::new(-0.4, 0.0, 0.0), 1.0));
        world.spawn(body(Vec3::new(0.4, 0.0, 0.0), 3.0));

        let center = mass_center(&mut world).unwrap();
        assert_relative_eq!(center.x, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn offscreen_projection_keeps_prior_value() {
        let mut world = World::new();
        // Far outside the camera frustum once scaled into world space.
        world.spawn(body(Vec3::new(100.0, 0.0, 0.0), 1.0));

        let mut cam = BlobCamera::new();
        cam.height = 0.0;
        let mut proj = MassCenterProjector::new((800, 600));
        let before = proj.smoothed();
        proj.update(&mut world, &cam, 5.0, (800, 600));
        assert_eq!(proj.smoothed(), before);
    }

    #[test]
    fn centered_body_pulls_target_to_viewport_center() {
        let mut world = World::new();
        world.spawn(body(Vec3::ZERO, 1.0));

        let mut cam = BlobCamera::new();
        cam.height = 0.0;
        let mut proj = MassCenterProjector::new((800, 600));
        // Drag the filter away, then let the pipeline pull it back.
        proj.target.smoothed = Vec2::new(0.0, 0.0);
        for _ in 0..80 {
            proj.update(&mut world, &cam, 5.0, (800, 600));
        }
        assert!(proj.smoothed().distance(Vec2::new(400.0, 300.0)) < 1.0);
    }
}
