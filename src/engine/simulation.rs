// Body integration for the implicit field.
//
// A fixed population of bodies drifts around the origin on a 2.5D plane.
// Per tick, each body's velocity picks up a centering pull, damping, a
// per-body phase-offset periodic drive, and uniform jitter — in that order,
// so every later term acts on the already-updated velocity. There is no hard
// position clamp: the centering force is the only containment.
//
// All randomness flows through one seeded StdRng, so a fixed seed plus a
// fixed dt sequence reproduces trajectories exactly.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::components::{BlobBody, Color, Transform, Velocity};
use super::field::FieldGrid;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Size of the fixed body population.
pub const BODY_COUNT: usize = 10;

/// Centering pull toward the origin, per tick.
const K_CENTER: f32 = 0.004;
/// Velocity retained per tick.
const DAMPING: f32 = 0.97;
/// Amplitude of the periodic drive added to velocity per tick.
const DRIVE_AMP: f32 = 0.0005;
/// Drive phase advance per second of simulation time.
const DRIVE_RATE: f32 = 1.6;
/// Phase offset between consecutive bodies (golden angle, keeps them unsynced).
const PHASE_STEP: f32 = 2.399_963;
/// Uniform jitter added to each velocity axis per tick.
const JITTER: f32 = 0.000_6;
/// The constant plane all bodies are pinned to.
const Z_PLANE: f32 = 0.0;

/// Spawn ranges.
const SPAWN_EXTENT: f32 = 0.22;
const SPAWN_SPEED: f32 = 0.004;
const STRENGTH_MIN: f32 = 0.20;
const STRENGTH_MAX: f32 = 0.40;
/// Field-kernel subtraction constant shared by the population.
const BODY_FALLOFF: f32 = 12.0;

// ============================================================================
// SIMULATION
// ============================================================================

/// Owns the drive clock and the RNG; bodies themselves live in the ECS world.
pub struct BlobSim {
    rng: StdRng,
    clock: f32,
}

impl BlobSim {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            clock: 0.0,
        }
    }

    /// Spawn the fixed body population. Called once at startup; bodies are
    /// never despawned afterwards.
    pub fn spawn_bodies(&mut self, world: &mut World, count: usize) {
        for i in 0..count {
            let position = Vec3::new(
                self.rng.gen_range(-SPAWN_EXTENT..SPAWN_EXTENT),
                self.rng.gen_range(-SPAWN_EXTENT..SPAWN_EXTENT),
                Z_PLANE,
            );
            let velocity = Vec3::new(
                self.rng.gen_range(-SPAWN_SPEED..SPAWN_SPEED),
                self.rng.gen_range(-SPAWN_SPEED..SPAWN_SPEED),
                0.0,
            );
            let strength = self.rng.gen_range(STRENGTH_MIN..STRENGTH_MAX);
            // Teal-to-violet band; stronger bodies tint the surface more.
            let t = self.rng.gen_range(0.0..1.0f32);
            let color = Color {
                r: 0.25 + 0.35 * t,
                g: 0.55 - 0.25 * t,
                b: 0.85,
            };

            world.spawn((
                Transform::from_position(position),
                Velocity::new(velocity),
                color,
                BlobBody {
                    strength,
                    falloff: BODY_FALLOFF,
                    phase_offset: i as f32 * PHASE_STEP,
                },
            ));
        }
    }

    /// Advance every body by one tick. `dt` only feeds the drive clock; the
    /// integration itself is per-tick (`position += velocity`).
    pub fn advance(&mut self, world: &mut World, dt: f32) {
        self.clock += dt * DRIVE_RATE;

        let mut query = world.query::<(&mut Transform, &mut Velocity, &BlobBody)>();
        for (mut transform, mut velocity, body) in query.iter_mut(world) {
            let v = &mut velocity.linear;

            // 1. centering pull toward the origin
            *v += transform.position * -K_CENTER;
            // 2. damping
            *v *= DAMPING;
            // 3. periodic drive, out of phase per body
            let phase = self.clock + body.phase_offset;
            v.x += phase.sin() * DRIVE_AMP;
            v.y += phase.cos() * DRIVE_AMP;
            // 4. stochastic jitter
            v.x += self.rng.gen_range(-JITTER..=JITTER);
            v.y += self.rng.gen_range(-JITTER..=JITTER);
            v.z += self.rng.gen_range(-JITTER..=JITTER);
            // 5. integrate; z is pinned to the simulation plane
            transform.position += *v;
            transform.position.z = Z_PLANE;
        }
    }

    pub fn clock(&self) -> f32 { self.clock }
}

// ============================================================================
// FIELD REBUILD
// ============================================================================

/// Rebuild the scalar field from the current body set. The grid is cleared
/// and every body injects its contribution at its field-space position
/// (simulation space [-0.5, 0.5] remapped to field space [0, 1]).
pub fn inject_field(world: &mut World, grid: &mut FieldGrid) {
    grid.clear();
    let mut query = world.query::<(&Transform, &BlobBody)>();
    for (transform, body) in query.iter(world) {
        let center = transform.position + Vec3::splat(0.5);
        grid.add_ball(center, body.strength, body.falloff);
    }
}

/// Strength-weighted average of body colors, used as the surface tint.
/// Falls back to a neutral grey if the population is empty.
pub fn aggregate_color(world: &mut World) -> [f32; 3] {
    let mut sum = [0.0f32; 3];
    let mut mass = 0.0f32;
    let mut query = world.query::<(&Color, &BlobBody)>();
    for (color, body) in query.iter(world) {
        sum[0] += color.r * body.strength;
        sum[1] += color.g * body.strength;
        sum[2] += color.b * body.strength;
        mass += body.strength;
    }
    if mass > 0.0 {
        [sum[0] / mass, sum[1] / mass, sum[2] / mass]
    } else {
        [0.5, 0.5, 0.5]
    }
}
