use std::f32::consts::{PI, TAU};

/// Wrap an angle into (-PI, PI].
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() || (angle > -PI && angle <= PI) {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Signed difference `to - from` along the shortest arc.
#[inline]
pub fn shortest_arc(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

/// Step `value` towards `target` by at most `max_delta`.
pub fn move_towards(value: f32, target: f32, max_delta: f32) -> f32 {
    let diff = target - value;
    if diff.abs() <= max_delta {
        target
    } else {
        value + max_delta.copysign(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wrap_angle_stays_in_range() {
        assert_relative_eq!(wrap_angle(0.0), 0.0);
        assert_relative_eq!(wrap_angle(PI), PI);
        assert_relative_eq!(wrap_angle(-PI), PI);
        assert_relative_eq!(wrap_angle(TAU + 0.25), 0.25, epsilon = 1.0e-5);
        assert_relative_eq!(wrap_angle(-TAU - 0.25), -0.25, epsilon = 1.0e-5);
    }

    #[test]
    fn wrap_angle_leaves_in_range_angles_untouched() {
        for angle in [1.0, -1.0, 0.3, -3.0, 3.1, PI - 1.0e-6] {
            assert_eq!(wrap_angle(angle), angle);
        }
        assert_eq!(shortest_arc(1.0, 1.0), 0.0);
    }

    #[test]
    fn shortest_arc_crosses_the_seam() {
        // 170 degrees to -170 degrees is a 20 degree turn, not 340.
        let from = 170.0_f32.to_radians();
        let to = (-170.0_f32).to_radians();
        assert_relative_eq!(shortest_arc(from, to), 20.0_f32.to_radians(), epsilon = 1.0e-5);
        assert_relative_eq!(shortest_arc(to, from), (-20.0_f32).to_radians(), epsilon = 1.0e-5);
    }

    #[test]
    fn move_towards_does_not_overshoot() {
        assert_eq!(move_towards(1.0, 0.0, 0.25), 0.75);
        assert_eq!(move_towards(-0.1, 0.0, 0.25), 0.0);
        assert_eq!(move_towards(0.0, 0.0, 0.25), 0.0);
    }
}
