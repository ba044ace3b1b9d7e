/*!
Value types and math aliases shared by the kart modules.

This module intentionally contains no algorithms. Frames are explicit:

- World frame: right-handed, +Y up. Positions are world-space meters.
- Vehicle-local (heading) frame: `x` = left, `y` = up, `z` = forward. It is the
  world frame rotated about +Y by the kart heading only; pitch and roll do not
  tilt it. Velocities read by the force model are always in this frame.
- Angles are radians. Heading `h` maps local forward to world `(sin h, 0, cos h)`.
*/

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Point3 = na::Point3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// Authoritative simulation transform of a kart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// World-space position of the kart's ground contact point.
    pub position: Vec3,
    /// Rotation about +Y, wrapped to (-PI, PI].
    pub heading: f32,
    /// Nose-up rotation.
    pub pitch: f32,
    /// Left-side-up rotation.
    pub roll: f32,
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(Vec3::zeros(), 0.0)
    }
}

impl Pose {
    #[inline]
    pub fn at(position: Vec3, heading: f32) -> Self {
        Self {
            position,
            heading,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    /// World-space height (the Y coordinate).
    #[inline]
    pub fn height(&self) -> f32 {
        self.position.y
    }

    /// World-space unit vector the kart faces (heading only).
    #[inline]
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.heading.sin(), 0.0, self.heading.cos())
    }

    /// World-space unit vector pointing to the kart's left (heading only).
    #[inline]
    pub fn left(&self) -> Vec3 {
        Vec3::new(self.heading.cos(), 0.0, -self.heading.sin())
    }

    /// Rotate a vehicle-local vector into the world frame.
    #[inline]
    pub fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.left() * local.x + Vec3::y() * local.y + self.forward() * local.z
    }

    /// Rotate a world vector into the vehicle-local frame.
    #[inline]
    pub fn world_to_local(&self, world: Vec3) -> Vec3 {
        Vec3::new(world.dot(&self.left()), world.y, world.dot(&self.forward()))
    }

    /// Full orientation (heading, then pitch, then roll) as a quaternion, for renderers.
    pub fn rotation(&self) -> Quat {
        Quat::from_axis_angle(&Vec3::y_axis(), self.heading)
            * Quat::from_axis_angle(&Vec3::x_axis(), -self.pitch)
            * Quat::from_axis_angle(&Vec3::z_axis(), self.roll)
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
            && self.heading.is_finite()
            && self.pitch.is_finite()
            && self.roll.is_finite()
    }
}

/// Kart velocity in the vehicle-local frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    /// `x` = lateral (left), `y` = vertical, `z` = forward (meters per second).
    pub linear: Vec3,
    /// Rotation rate about +Y (radians per second, positive turns left).
    pub yaw_rate: f32,
}

impl Velocity {
    #[inline]
    pub fn lateral(&self) -> f32 {
        self.linear.x
    }

    #[inline]
    pub fn vertical(&self) -> f32 {
        self.linear.y
    }

    #[inline]
    pub fn forward(&self) -> f32 {
        self.linear.z
    }

    /// Speed in the ground plane (lateral and forward only).
    #[inline]
    pub fn planar_speed(&self) -> f32 {
        (self.linear.x * self.linear.x + self.linear.z * self.linear.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.linear.iter().all(|c| c.is_finite()) && self.yaw_rate.is_finite()
    }
}

/// Per-frame driver intent, written by a player or AI controller.
///
/// Values are clamped on construction; the core never validates them further.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlInputs {
    /// -1 = full right, +1 = full left.
    pub steer: f32,
    /// 0..=1
    pub throttle: f32,
    /// 0..=1
    pub brake: f32,
    /// Driver asks to be rescued (put back on the track).
    pub rescue: bool,
}

impl ControlInputs {
    pub fn new(steer: f32, throttle: f32, brake: f32) -> Self {
        Self {
            steer,
            throttle,
            brake,
            rescue: false,
        }
        .clamped()
    }

    /// Clamp to the documented ranges. NaN inputs become zero.
    pub fn clamped(self) -> Self {
        let clean = |v: f32, lo: f32, hi: f32| if v.is_nan() { 0.0 } else { v.clamp(lo, hi) };
        Self {
            steer: clean(self.steer, -1.0, 1.0),
            throttle: clean(self.throttle, 0.0, 1.0),
            brake: clean(self.brake, 0.0, 1.0),
            rescue: self.rescue,
        }
    }
}

/// Render-only copy of the pose, produced by the visual smoother.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VisualPose {
    pub position: Vec3,
    pub heading: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl From<Pose> for VisualPose {
    fn from(pose: Pose) -> Self {
        Self {
            position: pose.position,
            heading: pose.heading,
            pitch: pose.pitch,
            roll: pose.roll,
        }
    }
}
