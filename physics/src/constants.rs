/*!
Default tuning values for the kart core.

Every value here is only a default: `SimSettings`, `KartTuning` and the material
table can override all of them from configuration. The numbers are a playable
starting point, not balanced gameplay values.

Notes
- Distances are in meters, time in seconds, angles in radians, mass in kilograms.
- Favor practical world-space tolerances over machine epsilon for robust behavior.
*/

use std::f32::consts::FRAC_PI_4;

// ---------------------------------------------------------------------------
// Stepping
// ---------------------------------------------------------------------------

/// Fixed physics sub-step (seconds). 120 Hz keeps the slip model stable.
pub const FIXED_SUBSTEP_SECS: f32 = 1.0 / 120.0;

/// Most fixed sub-steps a single `advance()` may run. Anything beyond is discarded
/// (e.g. after a loading stall) instead of being caught up.
pub const MAX_SUBSTEPS_PER_ADVANCE: u32 = 30;

/// Remainders below this are treated as float noise rather than a partial sub-step.
pub const MIN_PARTIAL_SUBSTEP_SECS: f32 = 1.0e-6;

/// Gravity magnitude in meters per second squared (positive value).
pub const GRAVITY_MPS2: f32 = 9.81;

// ---------------------------------------------------------------------------
// Ground contact
// ---------------------------------------------------------------------------

/// Height above the support at which the kart still counts as grounded (meters).
pub const ON_GROUND_EPSILON: f32 = 0.01;

/// Max downward gap a grounded kart may be snapped across when moving down (meters).
/// Small values keep the kart from snapping through gaps and off ramps.
pub const SNAP_MAX_DISTANCE: f32 = 0.30;

/// Falling below this height requests a rescue.
pub const RESCUE_BELOW_HEIGHT: f32 = -100.0;

/// Support height returned when nothing solid lies below a probe.
pub const NO_GROUND_HEIGHT: f32 = -1_000_000.0;

// ---------------------------------------------------------------------------
// Terrain query
// ---------------------------------------------------------------------------

/// Radius of the collision sphere used for wall push-out (meters).
pub const COLLISION_SPHERE_RADIUS: f32 = 0.6;

/// Extra lift of the sphere center above `radius`, so the kart can stand on a slope
/// without the floor registering as a wall.
pub const COLLISION_SPHERE_LIFT: f32 = 0.3;

/// Longest incremental step of the swept path (meters). Thin walls are never skipped.
pub const ISECT_STEP_SIZE: f32 = 0.4;

/// Safety cap on incremental steps per query.
pub const MAX_ISECT_STEPS: u32 = 100;

/// Surfaces whose normal has a larger vertical component are floors, handled by the
/// support probe instead of the push-out.
pub const MAX_WALL_NORMAL_Y: f32 = 0.4;

/// Depth of the downward support probe below its origin (meters).
pub const SUPPORT_PROBE_DEPTH: f32 = 1000.0;

// ---------------------------------------------------------------------------
// Kart tuning
// ---------------------------------------------------------------------------

pub const KART_MASS: f32 = 225.0;
pub const ENGINE_FORCE: f32 = 2000.0;
pub const BRAKE_FORCE: f32 = 3000.0;
pub const REVERSE_FORCE: f32 = 800.0;
pub const MAX_REVERSE_SPEED: f32 = 6.0;
pub const MAX_STEER_ANGLE: f32 = 0.5;
pub const WHEELBASE: f32 = 1.2;
pub const YAW_INERTIA: f32 = 60.0;
/// Cornering stiffness per radian of slip, front and rear axle.
pub const CORNERING_FRONT: f32 = 4.5;
pub const CORNERING_REAR: f32 = 5.0;
/// Saturation of `cornering * slip` (dimensionless fraction of axle load).
pub const MAX_GRIP: f32 = 1.2;
pub const AIR_FRICTION: f32 = 0.8;
pub const ROLLING_RESISTANCE: f32 = 30.0;
pub const LATERAL_RESISTANCE: f32 = 300.0;
/// Below this planar speed the lateral tire forces fade out linearly.
pub const MIN_GRIP_SPEED: f32 = 0.5;
/// Speeds below this count as stopped for brake/reverse decisions.
pub const STOPPED_SPEED: f32 = 0.1;

// ---------------------------------------------------------------------------
// Terrain effects
// ---------------------------------------------------------------------------

pub const ZIPPER_TIME: f32 = 1.5;
pub const ZIPPER_SPEED: f32 = 25.0;
pub const ZIPPER_PITCH: f32 = FRAC_PI_4;
pub const CRASH_PITCH: f32 = -FRAC_PI_4;
/// Rate at which the wheelie angle relaxes back to level (radians per second).
pub const PITCH_RESTORE_RATE: f32 = 1.6;
pub const COLLIDE_BRAKING_RATE: f32 = 20.0;
pub const MIN_COLLIDE_SPEED: f32 = 0.5;
pub const MIN_CRASH_SPEED: f32 = 5.0;

// ---------------------------------------------------------------------------
// Visual smoothing
// ---------------------------------------------------------------------------

/// Relaxation rate per second; multiplied by the frame time and clamped to 1.
pub const VISUAL_RELAX_RATE: f32 = 25.0;
/// Vertical lift at a full 90 degree wheelie (meters).
pub const WHEELIE_LIFT: f32 = 0.3;
/// Visual roll per unit of steering input (radians).
pub const STEER_LEAN: f32 = 0.12;

// ---------------------------------------------------------------------------
// Lap counting
// ---------------------------------------------------------------------------

/// Fraction of the lap above which the kart is "before the line".
pub const LAP_WRAP_HIGH: f32 = 0.8;
/// Fraction of the lap below which the kart is "past the line".
pub const LAP_WRAP_LOW: f32 = 0.2;
/// Driveline hint changes larger than this many segments are rejected (except wraps).
pub const TRACK_HINT_WINDOW: usize = 2;
