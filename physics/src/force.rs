/*!
Slip-angle force model.

Inputs are the kart's vehicle-local velocity, the driver's controls, the friction
of the surface under it and whether it is grounded. The output is a local linear
acceleration and a yaw acceleration; the integrator applies them.

Model outline (all angles via `atan2`, so no input produces NaN):
- The kart slips sideways by `atan2(v_lat, |v_fwd|)`. Yawing adds a wheel yaw angle
  `atan2(yaw_rate * wheelbase / 2, |v_fwd|)` at each axle; the front axle subtracts
  the steering angle.
- Each axle pushes back against its slip with `cornering * slip`, saturated at
  `max_grip` and scaled by its share of the weight and the surface friction.
- Traction and brakes act along the kart's forward axis, only on the ground.
- Air drag is quadratic on every axis; rolling drag is linear, ground only.
*/

use crate::{
    config::KartTuning,
    types::{ControlInputs, Vec3, Velocity},
};

/// Below this speed the slip angles are defined as zero.
const SLIP_SPEED_EPS: f32 = 1.0e-3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceInput {
    pub velocity: Velocity,
    pub controls: ControlInputs,
    pub friction: f32,
    pub on_ground: bool,
}

/// Vehicle-local linear acceleration and yaw acceleration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Acceleration {
    pub linear: Vec3,
    pub angular: f32,
}

impl Acceleration {
    pub fn is_finite(&self) -> bool {
        self.linear.iter().all(|c| c.is_finite()) && self.angular.is_finite()
    }
}

/// Sideways slip of the whole kart (radians, positive when sliding left).
#[inline]
pub fn slip_angle(v_lat: f32, v_fwd: f32) -> f32 {
    if v_lat.abs() < SLIP_SPEED_EPS && v_fwd.abs() < SLIP_SPEED_EPS {
        return 0.0;
    }
    v_lat.atan2(v_fwd.abs())
}

/// Extra slip seen at each axle because the kart is rotating.
#[inline]
pub fn wheel_yaw_angle(yaw_rate: f32, wheelbase: f32, v_fwd: f32) -> f32 {
    let tangential = yaw_rate * wheelbase * 0.5;
    if tangential.abs() < SLIP_SPEED_EPS && v_fwd.abs() < SLIP_SPEED_EPS {
        return 0.0;
    }
    tangential.atan2(v_fwd.abs())
}

/// Lateral force of one axle carrying half the kart's weight.
///
/// The grip term `cornering * slip` saturates at `max_grip`, so the result never
/// exceeds `max_grip * m * g / 2 * friction` in magnitude.
#[inline]
pub fn lateral_force(
    tuning: &KartTuning,
    gravity: f32,
    cornering: f32,
    slip: f32,
    friction: f32,
) -> f32 {
    let grip = (cornering * slip).clamp(-tuning.max_grip, tuning.max_grip);
    -grip * tuning.mass * gravity * 0.5 * friction
}

/// Net acceleration of one kart for the current sub-step.
pub fn compute_acceleration(tuning: &KartTuning, gravity: f32, input: &ForceInput) -> Acceleration {
    let v = input.velocity.linear;
    let v_lat = v.x;
    let v_fwd = v.z;
    let controls = input.controls;

    let steer = controls.steer * tuning.max_steer_angle;
    let (sin_steer, cos_steer) = steer.sin_cos();

    // Steering turns the front axle against the direction of travel when reversing.
    let direction = if v_fwd < 0.0 { -1.0 } else { 1.0 };

    let slip = slip_angle(v_lat, v_fwd);
    let wheel_yaw = wheel_yaw_angle(input.velocity.yaw_rate, tuning.wheelbase, v_fwd);
    let slip_front = slip + wheel_yaw - steer * direction;
    let slip_rear = slip - wheel_yaw;

    let (force_front, force_rear) = if input.on_ground {
        let planar = input.velocity.planar_speed();
        let fade = (planar / tuning.min_grip_speed).min(1.0);
        let friction = input.friction.max(0.0) * fade;
        (
            lateral_force(tuning, gravity, tuning.cornering_front, slip_front, friction),
            lateral_force(tuning, gravity, tuning.cornering_rear, slip_rear, friction),
        )
    } else {
        (0.0, 0.0)
    };

    let traction = if input.on_ground {
        traction_force(tuning, &controls, v_fwd)
    } else {
        0.0
    };

    // Aero drag on every axis; rolling drag only while the wheels touch.
    let mut resistance = -v * v.norm() * tuning.air_friction;
    if input.on_ground {
        resistance.x -= v_lat * tuning.lateral_resistance;
        resistance.z -= v_fwd * tuning.rolling_resistance;
    }

    let force = Vec3::new(
        force_front * cos_steer + force_rear + resistance.x,
        resistance.y,
        -force_front * sin_steer + traction + resistance.z,
    );

    let torque = (force_front * cos_steer - force_rear) * tuning.wheelbase * 0.5;

    let mut linear = force / tuning.mass;
    linear.y -= gravity;

    Acceleration {
        linear,
        angular: torque / tuning.yaw_inertia,
    }
}

/// Engine and brake force along the forward axis.
fn traction_force(tuning: &KartTuning, controls: &ControlInputs, v_fwd: f32) -> f32 {
    if v_fwd > tuning.stopped_speed {
        return tuning.engine_force * controls.throttle - tuning.brake_force * controls.brake;
    }

    // Stopped or rolling backwards: throttle pulls forward, brake drives in reverse.
    let mut force = tuning.engine_force * controls.throttle;
    if controls.brake > 0.0 && -v_fwd < tuning.max_reverse_speed {
        force -= tuning.reverse_force * controls.brake;
    }
    force
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GRAVITY_MPS2;

    fn input(velocity: Vec3, yaw_rate: f32, controls: ControlInputs) -> ForceInput {
        ForceInput {
            velocity: Velocity {
                linear: velocity,
                yaw_rate,
            },
            controls,
            friction: 1.0,
            on_ground: true,
        }
    }

    #[test]
    fn zero_input_at_rest_is_equilibrium() {
        let tuning = KartTuning::default();
        let a = compute_acceleration(
            &tuning,
            GRAVITY_MPS2,
            &input(Vec3::zeros(), 0.0, ControlInputs::default()),
        );
        assert_eq!(a.linear.x, 0.0);
        assert_eq!(a.linear.z, 0.0);
        assert_eq!(a.angular, 0.0);
        // Only gravity remains; the integrator cancels it against the support.
        assert!((a.linear.y + GRAVITY_MPS2).abs() < 1.0e-6);
    }

    #[test]
    fn stationary_kart_with_full_steer_does_not_spin() {
        let tuning = KartTuning::default();
        let a = compute_acceleration(
            &tuning,
            GRAVITY_MPS2,
            &input(Vec3::zeros(), 0.0, ControlInputs::new(1.0, 0.0, 0.0)),
        );
        assert_eq!(a.angular, 0.0);
        assert_eq!(a.linear.x, 0.0);
    }

    #[test]
    fn lateral_force_saturates_at_max_grip() {
        let tuning = KartTuning::default();
        let bound = tuning.max_grip * tuning.mass * GRAVITY_MPS2 * 0.5 * 1.0;

        for slip in [-1.5_f32, -0.8, -0.1, 0.0, 0.05, 0.4, 1.2, 1.5] {
            for cornering in [tuning.cornering_front, tuning.cornering_rear, 100.0] {
                let f = lateral_force(&tuning, GRAVITY_MPS2, cornering, slip, 1.0);
                assert!(f.abs() <= bound + 1.0e-3, "slip {slip}: {f} > {bound}");
            }
        }
        let saturated = lateral_force(&tuning, GRAVITY_MPS2, 100.0, 1.0, 1.0);
        assert!((saturated + bound).abs() < 1.0e-3);
    }

    #[test]
    fn grip_opposes_sideways_slide() {
        let tuning = KartTuning::default();
        let a = compute_acceleration(
            &tuning,
            GRAVITY_MPS2,
            &input(Vec3::new(2.0, 0.0, 10.0), 0.0, ControlInputs::default()),
        );
        assert!(a.linear.x < 0.0);
    }

    #[test]
    fn steering_left_yaws_left() {
        let tuning = KartTuning::default();
        let a = compute_acceleration(
            &tuning,
            GRAVITY_MPS2,
            &input(Vec3::new(0.0, 0.0, 10.0), 0.0, ControlInputs::new(1.0, 0.0, 0.0)),
        );
        assert!(a.angular > 0.0);
        assert!(a.linear.x > 0.0);
    }

    #[test]
    fn throttle_accelerates_and_brake_decelerates() {
        let tuning = KartTuning::default();
        let cruising = Vec3::new(0.0, 0.0, 5.0);
        let gas = compute_acceleration(
            &tuning,
            GRAVITY_MPS2,
            &input(cruising, 0.0, ControlInputs::new(0.0, 1.0, 0.0)),
        );
        let brake = compute_acceleration(
            &tuning,
            GRAVITY_MPS2,
            &input(cruising, 0.0, ControlInputs::new(0.0, 0.0, 1.0)),
        );
        assert!(gas.linear.z > 0.0);
        assert!(brake.linear.z < 0.0);
    }

    #[test]
    fn brake_from_standstill_reverses_up_to_limit() {
        let tuning = KartTuning::default();
        let brake = ControlInputs::new(0.0, 0.0, 1.0);

        let a = compute_acceleration(&tuning, GRAVITY_MPS2, &input(Vec3::zeros(), 0.0, brake));
        assert!(a.linear.z < 0.0);

        let too_fast = Vec3::new(0.0, 0.0, -tuning.max_reverse_speed - 0.5);
        let a = compute_acceleration(&tuning, GRAVITY_MPS2, &input(too_fast, 0.0, brake));
        // Past the reverse limit only drag remains, which pushes forward.
        assert!(a.linear.z > 0.0);
    }

    #[test]
    fn airborne_kart_only_feels_gravity_and_drag() {
        let tuning = KartTuning::default();
        let mut airborne = input(Vec3::new(1.0, -2.0, 8.0), 0.5, ControlInputs::new(1.0, 1.0, 0.0));
        airborne.on_ground = false;
        let a = compute_acceleration(&tuning, GRAVITY_MPS2, &airborne);

        assert_eq!(a.angular, 0.0);
        let v = airborne.velocity.linear;
        let drag = -v * v.norm() * tuning.air_friction / tuning.mass;
        assert!((a.linear.x - drag.x).abs() < 1.0e-5);
        assert!((a.linear.z - drag.z).abs() < 1.0e-5);
        assert!((a.linear.y - (drag.y - GRAVITY_MPS2)).abs() < 1.0e-5);
    }

    #[test]
    fn extreme_inputs_stay_finite() {
        let tuning = KartTuning::default();
        let cases = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0e-9, 0.0, -1.0e-9),
            Vec3::new(-50.0, 3.0, 0.0),
            Vec3::new(0.0, 0.0, -80.0),
            Vec3::new(1.0e4, -1.0e4, 1.0e4),
        ];
        for v in cases {
            for yaw_rate in [-20.0, 0.0, 1.0e-7, 20.0] {
                let a = compute_acceleration(
                    &tuning,
                    GRAVITY_MPS2,
                    &input(v, yaw_rate, ControlInputs::new(-1.0, 1.0, 1.0)),
                );
                assert!(a.is_finite(), "v = {v:?}, yaw_rate = {yaw_rate}");
            }
        }
    }
}
