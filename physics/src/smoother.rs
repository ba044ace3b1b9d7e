//! Render-only smoothing of the kart pose.
//!
//! The authoritative pose snaps to terrain normals every sub-step, which looks
//! jittery on bumpy ground. The renderer instead reads a [`VisualPose`] that eases
//! towards the authoritative one and carries the cosmetic wheelie and steering lean.
//! Data only flows one way: nothing here is ever written back into a `Pose`.

use crate::{
    config::VisualSettings,
    types::{Pose, Vec3, VisualPose},
    utils::{shortest_arc, wrap_angle},
};

/// Blend fraction for a frame of `dt` seconds, in `[0, 1]`.
#[inline]
pub fn relax_fraction(dt: f32, settings: &VisualSettings) -> f32 {
    let rate = settings.relax_rate * dt;
    if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 1.0 }
}

/// Ease `previous` towards `pose` by `rate` (0 = keep, 1 = snap).
///
/// - `wheelie_angle` is added to the pitch target and lifts the model by
///   `|sin(wheelie)| * wheelie_lift`.
/// - `steer_lean` is added to the roll target (radians).
pub fn smooth(
    pose: &Pose,
    previous: &VisualPose,
    wheelie_angle: f32,
    steer_lean: f32,
    rate: f32,
    settings: &VisualSettings,
) -> VisualPose {
    let relax = |prev: f32, target: f32| wrap_angle(prev + rate * shortest_arc(prev, target));

    let lift = wheelie_angle.sin().abs() * settings.wheelie_lift;

    VisualPose {
        position: pose.position + Vec3::new(0.0, lift, 0.0),
        heading: relax(previous.heading, pose.heading),
        pitch: relax(previous.pitch, pose.pitch + wheelie_angle),
        roll: relax(previous.roll, pose.roll + steer_lean),
    }
}
