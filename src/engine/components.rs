// Core ECS components for the blob simulation
// Every body in the implicit field is one entity carrying all four of these

use bevy_ecs::prelude::*;
use glam::Vec3;

/// Position of a body in simulation space.
/// Bodies live roughly within [-0.5, 0.5] per axis; the centering force is
/// the only containment, so this is a soft range, not a clamped one.
#[derive(Component, Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position }
    }
}

/// RGB color tint a body contributes to the rendered surface
#[derive(Component, Debug, Clone, Copy)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Velocity of a body in simulation space (units per tick)
#[derive(Component, Debug, Clone, Copy)]
pub struct Velocity {
    pub linear: Vec3,
}

impl Velocity {
    pub fn new(linear: Vec3) -> Self {
        Self { linear }
    }
}

/// Field-contribution parameters of one body.
///
/// `strength`     — peak contribution injected into the scalar field, and the
///                  body's mass when computing the weighted mass center.
/// `falloff`      — subtraction constant of the field kernel; larger values
///                  shrink the body's influence radius (see `field::add_ball`).
/// `phase_offset` — per-body offset into the periodic drive, assigned from the
///                  spawn index so the population never moves in lockstep.
#[derive(Component, Debug, Clone, Copy)]
pub struct BlobBody {
    pub strength:     f32,
    pub falloff:      f32,
    pub phase_offset: f32,
}
