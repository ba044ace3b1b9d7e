/*!
Runtime configuration for the kart core.

`SimSettings` is shared by every kart on a track; `KartTuning` is per kart class.
Both deserialize from TOML with every field optional (missing fields fall back to
the defaults in `constants`) and must pass `validate()` before use.

```toml
fixed_step = 0.008333
max_substeps = 30

[collision]
sphere_radius = 0.6

[effects]
zipper_speed = 30.0
```
*/

use std::path::Path;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{constants::*, error::ConfigError};

/// Wall push-out and support probe parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionSettings {
    pub sphere_radius: f32,
    pub sphere_lift: f32,
    pub isect_step: f32,
    pub max_isect_steps: u32,
    pub max_wall_normal_y: f32,
    pub probe_depth: f32,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            sphere_radius: COLLISION_SPHERE_RADIUS,
            sphere_lift: COLLISION_SPHERE_LIFT,
            isect_step: ISECT_STEP_SIZE,
            max_isect_steps: MAX_ISECT_STEPS,
            max_wall_normal_y: MAX_WALL_NORMAL_Y,
            probe_depth: SUPPORT_PROBE_DEPTH,
        }
    }
}

/// Zipper, crash and wall-contact responses.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    pub zipper_time: f32,
    pub zipper_speed: f32,
    pub zipper_pitch: f32,
    pub crash_pitch: f32,
    pub pitch_restore_rate: f32,
    pub collide_braking_rate: f32,
    pub min_collide_speed: f32,
    pub min_crash_speed: f32,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            zipper_time: ZIPPER_TIME,
            zipper_speed: ZIPPER_SPEED,
            zipper_pitch: ZIPPER_PITCH,
            crash_pitch: CRASH_PITCH,
            pitch_restore_rate: PITCH_RESTORE_RATE,
            collide_braking_rate: COLLIDE_BRAKING_RATE,
            min_collide_speed: MIN_COLLIDE_SPEED,
            min_crash_speed: MIN_CRASH_SPEED,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualSettings {
    pub relax_rate: f32,
    pub wheelie_lift: f32,
    pub steer_lean: f32,
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            relax_rate: VISUAL_RELAX_RATE,
            wheelie_lift: WHEELIE_LIFT,
            steer_lean: STEER_LEAN,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LapSettings {
    pub wrap_high: f32,
    pub wrap_low: f32,
    pub hint_window: usize,
}

impl Default for LapSettings {
    fn default() -> Self {
        Self {
            wrap_high: LAP_WRAP_HIGH,
            wrap_low: LAP_WRAP_LOW,
            hint_window: TRACK_HINT_WINDOW,
        }
    }
}

/// Track-wide simulation settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub fixed_step: f32,
    pub max_substeps: u32,
    pub gravity: f32,
    pub on_ground_epsilon: f32,
    pub snap_distance: f32,
    pub rescue_below_height: f32,
    pub collision: CollisionSettings,
    pub effects: EffectSettings,
    pub visual: VisualSettings,
    pub lap: LapSettings,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            fixed_step: FIXED_SUBSTEP_SECS,
            max_substeps: MAX_SUBSTEPS_PER_ADVANCE,
            gravity: GRAVITY_MPS2,
            on_ground_epsilon: ON_GROUND_EPSILON,
            snap_distance: SNAP_MAX_DISTANCE,
            rescue_below_height: RESCUE_BELOW_HEIGHT,
            collision: CollisionSettings::default(),
            effects: EffectSettings::default(),
            visual: VisualSettings::default(),
            lap: LapSettings::default(),
        }
    }
}

impl SimSettings {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = parse(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path.as_ref())?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("fixed_step", self.fixed_step)?;
        if self.max_substeps == 0 {
            return Err(ConfigError::Invalid("max_substeps must be at least 1".into()));
        }
        non_negative("gravity", self.gravity)?;
        non_negative("on_ground_epsilon", self.on_ground_epsilon)?;
        non_negative("snap_distance", self.snap_distance)?;
        finite("rescue_below_height", self.rescue_below_height)?;

        let c = &self.collision;
        positive("collision.sphere_radius", c.sphere_radius)?;
        non_negative("collision.sphere_lift", c.sphere_lift)?;
        positive("collision.isect_step", c.isect_step)?;
        if c.max_isect_steps == 0 {
            return Err(ConfigError::Invalid(
                "collision.max_isect_steps must be at least 1".into(),
            ));
        }
        finite("collision.max_wall_normal_y", c.max_wall_normal_y)?;
        positive("collision.probe_depth", c.probe_depth)?;

        let e = &self.effects;
        non_negative("effects.zipper_time", e.zipper_time)?;
        non_negative("effects.zipper_speed", e.zipper_speed)?;
        finite("effects.zipper_pitch", e.zipper_pitch)?;
        finite("effects.crash_pitch", e.crash_pitch)?;
        non_negative("effects.pitch_restore_rate", e.pitch_restore_rate)?;
        non_negative("effects.collide_braking_rate", e.collide_braking_rate)?;
        non_negative("effects.min_collide_speed", e.min_collide_speed)?;
        non_negative("effects.min_crash_speed", e.min_crash_speed)?;

        positive("visual.relax_rate", self.visual.relax_rate)?;
        non_negative("visual.wheelie_lift", self.visual.wheelie_lift)?;
        finite("visual.steer_lean", self.visual.steer_lean)?;

        let l = &self.lap;
        if !(0.0 < l.wrap_low && l.wrap_low < l.wrap_high && l.wrap_high < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "lap wrap fractions must satisfy 0 < wrap_low < wrap_high < 1 (got {} and {})",
                l.wrap_low, l.wrap_high
            )));
        }
        Ok(())
    }
}

/// Handling parameters of one kart class.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KartTuning {
    pub mass: f32,
    pub engine_force: f32,
    pub brake_force: f32,
    pub reverse_force: f32,
    pub max_reverse_speed: f32,
    /// Front wheel angle at full steering input (radians).
    pub max_steer_angle: f32,
    pub wheelbase: f32,
    pub yaw_inertia: f32,
    pub cornering_front: f32,
    pub cornering_rear: f32,
    pub max_grip: f32,
    pub air_friction: f32,
    pub rolling_resistance: f32,
    pub lateral_resistance: f32,
    pub min_grip_speed: f32,
    pub stopped_speed: f32,
}

impl Default for KartTuning {
    fn default() -> Self {
        Self {
            mass: KART_MASS,
            engine_force: ENGINE_FORCE,
            brake_force: BRAKE_FORCE,
            reverse_force: REVERSE_FORCE,
            max_reverse_speed: MAX_REVERSE_SPEED,
            max_steer_angle: MAX_STEER_ANGLE,
            wheelbase: WHEELBASE,
            yaw_inertia: YAW_INERTIA,
            cornering_front: CORNERING_FRONT,
            cornering_rear: CORNERING_REAR,
            max_grip: MAX_GRIP,
            air_friction: AIR_FRICTION,
            rolling_resistance: ROLLING_RESISTANCE,
            lateral_resistance: LATERAL_RESISTANCE,
            min_grip_speed: MIN_GRIP_SPEED,
            stopped_speed: STOPPED_SPEED,
        }
    }
}

impl KartTuning {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let tuning: Self = parse(text)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path.as_ref())?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("mass", self.mass)?;
        non_negative("engine_force", self.engine_force)?;
        non_negative("brake_force", self.brake_force)?;
        non_negative("reverse_force", self.reverse_force)?;
        non_negative("max_reverse_speed", self.max_reverse_speed)?;
        non_negative("max_steer_angle", self.max_steer_angle)?;
        if self.max_steer_angle >= std::f32::consts::FRAC_PI_2 {
            return Err(ConfigError::Invalid(
                "max_steer_angle must be below a quarter turn".into(),
            ));
        }
        positive("wheelbase", self.wheelbase)?;
        positive("yaw_inertia", self.yaw_inertia)?;
        non_negative("cornering_front", self.cornering_front)?;
        non_negative("cornering_rear", self.cornering_rear)?;
        non_negative("max_grip", self.max_grip)?;
        non_negative("air_friction", self.air_friction)?;
        non_negative("rolling_resistance", self.rolling_resistance)?;
        non_negative("lateral_resistance", self.lateral_resistance)?;
        positive("min_grip_speed", self.min_grip_speed)?;
        non_negative("stopped_speed", self.stopped_speed)?;
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(text: &str) -> Result<T, ConfigError> {
    Ok(toml::from_str(text)?)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn finite(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be finite (got {value})")))
    }
}

fn non_negative(name: &str, value: f32) -> Result<(), ConfigError> {
    finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must not be negative (got {value})")))
    }
}

fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be positive (got {value})")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimSettings::default().validate().unwrap();
        KartTuning::default().validate().unwrap();
    }

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(SimSettings::from_toml_str("").unwrap(), SimSettings::default());
        assert_eq!(KartTuning::from_toml_str("").unwrap(), KartTuning::default());
    }

    #[test]
    fn partial_tables_override_single_fields() {
        let text = r#"
            max_substeps = 12

            [collision]
            sphere_radius = 0.75

            [effects]
            zipper_speed = 30.0
        "#;
        let s = SimSettings::from_toml_str(text).unwrap();
        assert_eq!(s.max_substeps, 12);
        assert_eq!(s.collision.sphere_radius, 0.75);
        assert_eq!(s.collision.isect_step, ISECT_STEP_SIZE);
        assert_eq!(s.effects.zipper_speed, 30.0);
        assert_eq!(s.fixed_step, FIXED_SUBSTEP_SECS);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            SimSettings::from_toml_str("fixed_step = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            KartTuning::from_toml_str("mass = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SimSettings::from_toml_str("[lap]\nwrap_low = 0.9"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            KartTuning::from_toml_str("mass = \"heavy\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SimSettings::from_path("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
