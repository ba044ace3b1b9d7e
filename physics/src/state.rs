//! Per-kart simulation state.
//!
//! A `VehicleState` is owned by exactly one integrator. Everything the next sub-step
//! needs lives here; everything else (materials, scene, settings) is borrowed.

use crate::{
    constants::NO_GROUND_HEIGHT,
    flags::FlagSet,
    material::MaterialTag,
    scene::SurfaceId,
    types::{ControlInputs, Pose, Vec3, Velocity, VisualPose},
};

crate::define_flags!(
    /// Things that happened to a kart since the race rules last looked.
    KartEvent, u8, {
        Collided,
        Crashed,
        Zipper,
        Rescue,
        LapForward,
        LapBackward,
    }
);

pub type KartEvents = FlagSet<KartEvent>;

#[derive(Clone, Debug, PartialEq)]
pub struct VehicleState {
    pub pose: Pose,
    pub velocity: Velocity,
    pub controls: ControlInputs,

    pub support_height: f32,
    pub support_normal: Vec3,
    pub support_material: Option<MaterialTag>,
    /// Collider currently under the kart, grounded or not.
    pub support_surface: Option<SurfaceId>,
    /// Collider the kart stood on in its last grounded sub-step.
    pub ground_surface: Option<SurfaceId>,
    /// Friction coefficient of the current support.
    pub friction: f32,
    pub on_ground: bool,

    /// Contact flags of the most recent sub-step.
    pub collided: bool,
    pub crashed: bool,
    pub rescue_requested: bool,

    /// Seconds of zipper boost left.
    pub zipper_time_left: f32,
    /// Visual pitch offset from zippers and crashes (radians, nose up positive).
    pub wheelie_angle: f32,

    /// Completed laps; -1 while behind the start line before the first crossing.
    pub lap_count: i32,
    pub track_distance: f32,
    pub track_hint: usize,

    pub visual_pose: VisualPose,
    pub events: KartEvents,
}

impl VehicleState {
    /// State of a kart placed at `spawn`: at rest, grounded, before the start line.
    pub fn spawn(spawn: Pose) -> Self {
        Self {
            pose: spawn,
            velocity: Velocity::default(),
            controls: ControlInputs::default(),
            support_height: NO_GROUND_HEIGHT,
            support_normal: Vec3::y(),
            support_material: None,
            support_surface: None,
            ground_surface: None,
            friction: 1.0,
            on_ground: true,
            collided: false,
            crashed: false,
            rescue_requested: false,
            zipper_time_left: 0.0,
            wheelie_angle: 0.0,
            lap_count: -1,
            track_distance: 0.0,
            track_hint: 0,
            visual_pose: VisualPose::from(spawn),
            events: KartEvents::empty(),
        }
    }

    /// Height above the current support.
    #[inline]
    pub fn height_above_ground(&self) -> f32 {
        self.pose.height() - self.support_height
    }

    pub fn is_finite(&self) -> bool {
        self.pose.is_finite() && self.velocity.is_finite()
    }

    /// Record a one-shot event for the race rules.
    #[inline]
    pub fn emit(&mut self, event: KartEvent) {
        self.events.insert(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_is_at_rest_and_grounded() {
        let pose = Pose::at(Vec3::new(1.0, 2.0, 3.0), 0.5);
        let state = VehicleState::spawn(pose);
        assert_eq!(state.pose, pose);
        assert_eq!(state.velocity, Velocity::default());
        assert!(state.on_ground);
        assert_eq!(state.lap_count, -1);
        assert_eq!(state.visual_pose, VisualPose::from(pose));
        assert!(state.events.is_empty());
    }

    #[test]
    fn events_accumulate_until_taken() {
        let mut state = VehicleState::spawn(Pose::default());
        state.emit(KartEvent::Zipper);
        state.emit(KartEvent::Collided);
        state.emit(KartEvent::Zipper);

        let events = state.events.take();
        assert!(events.contains(KartEvent::Zipper));
        assert!(events.contains(KartEvent::Collided));
        assert!(!events.contains(KartEvent::Rescue));
        assert!(state.events.is_empty());
    }
}
