/*!
Fixed-step integrator for one kart.

Every frame the caller hands over the real elapsed time. It is cut into fixed
sub-steps (plus one final partial sub-step) so the simulation does not depend on
the frame rate. Each sub-step:

1. applies an active zipper boost,
2. asks the force model for accelerations,
3. integrates velocity (semi-implicit Euler), then heading and position from the
   new velocity,
4. runs one terrain query along the displacement,
5. clamps/snaps the kart onto its support and classifies the surface,
6. responds to wall contacts and crashes,
7. aligns pitch/roll with the ground,
8. updates track distance and lap count.

The visual smoother runs once per frame afterwards.

Phases: `Idle` (spawned, waiting for the start), `Simulating`, and `Rescuing`
(the rescue collaborator owns the pose until `finish_rescue()`).
*/

use crate::{
    config::{KartTuning, SimSettings},
    constants::MIN_PARTIAL_SUBSTEP_SECS,
    driveline::{TrackParametrization, accept_hint, lap_delta},
    force::{ForceInput, compute_acceleration},
    material::MaterialTable,
    scene::SceneQuery,
    smoother::{relax_fraction, smooth},
    state::{KartEvent, KartEvents, VehicleState},
    terrain::query_terrain,
    types::{ControlInputs, Pose, Velocity, VisualPose},
    utils::{move_towards, wrap_angle},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Simulating,
    Rescuing,
}

/// Shared, read-only collaborators for one `advance` call.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub scene: &'a dyn SceneQuery,
    pub materials: &'a MaterialTable,
    pub track: &'a dyn TrackParametrization,
    pub settings: &'a SimSettings,
}

#[derive(Clone, Debug)]
pub struct KartIntegrator {
    state: VehicleState,
    tuning: KartTuning,
    spawn: Pose,
    phase: Phase,
    /// Seconds spent in the current rescue.
    rescue_clock: f32,
    /// Next track projection searches the whole driveline (after spawn or rescue).
    needs_full_projection: bool,
}

impl KartIntegrator {
    pub fn new(spawn: Pose, tuning: KartTuning) -> Self {
        Self {
            state: VehicleState::spawn(spawn),
            tuning,
            spawn,
            phase: Phase::Idle,
            rescue_clock: 0.0,
            needs_full_projection: true,
        }
    }

    /// Leave `Idle` and begin simulating. No effect in any other phase.
    pub fn start(&mut self) {
        if self.phase == Phase::Idle {
            log::debug!("kart started at {:?}", self.state.pose.position);
            self.phase = Phase::Simulating;
        }
    }

    /// Back to the spawn pose at rest, waiting for `start()`.
    pub fn reset(&mut self) {
        self.state = VehicleState::spawn(self.spawn);
        self.phase = Phase::Idle;
        self.rescue_clock = 0.0;
        self.needs_full_projection = true;
    }

    pub fn set_spawn(&mut self, spawn: Pose) {
        self.spawn = spawn;
    }

    pub fn set_controls(&mut self, controls: ControlInputs) {
        self.state.controls = controls.clamped();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn tuning(&self) -> &KartTuning {
        &self.tuning
    }

    pub fn pose(&self) -> &Pose {
        &self.state.pose
    }

    pub fn velocity(&self) -> &Velocity {
        &self.state.velocity
    }

    pub fn visual_pose(&self) -> VisualPose {
        self.state.visual_pose
    }

    pub fn lap_count(&self) -> i32 {
        self.state.lap_count
    }

    pub fn track_distance(&self) -> f32 {
        self.state.track_distance
    }

    /// Events since the last call.
    pub fn take_events(&mut self) -> KartEvents {
        self.state.events.take()
    }

    /// Seconds spent in the current rescue (0 outside `Rescuing`).
    pub fn rescue_elapsed(&self) -> f32 {
        self.rescue_clock
    }

    /// Pose handle for the rescue collaborator. Only available while `Rescuing`.
    pub fn rescue_pose_mut(&mut self) -> Option<&mut Pose> {
        match self.phase {
            Phase::Rescuing => Some(&mut self.state.pose),
            _ => None,
        }
    }

    /// End a rescue: the kart resumes at rest from wherever the rescuer left it.
    /// Returns `false` if no rescue was in progress.
    pub fn finish_rescue(&mut self) -> bool {
        if self.phase != Phase::Rescuing {
            return false;
        }

        let s = &mut self.state;
        s.velocity = Velocity::default();
        s.collided = false;
        s.crashed = false;
        s.rescue_requested = false;
        s.zipper_time_left = 0.0;
        s.wheelie_angle = 0.0;
        s.on_ground = true;
        s.support_surface = None;
        s.ground_surface = None;

        self.rescue_clock = 0.0;
        self.needs_full_projection = true;
        self.phase = Phase::Simulating;
        log::debug!("rescue finished at {:?}", self.state.pose.position);
        true
    }

    /// Advance by `real_dt` seconds of wall-clock time.
    pub fn advance(&mut self, real_dt: f32, ctx: &StepContext<'_>) {
        if !real_dt.is_finite() || real_dt < 0.0 {
            log::warn!("ignoring invalid frame time {real_dt}");
            return;
        }

        match self.phase {
            Phase::Idle => return,
            Phase::Rescuing => {
                self.rescue_clock += real_dt;
                self.update_visual(real_dt, ctx.settings);
                return;
            }
            Phase::Simulating => {}
        }

        let settings = ctx.settings;
        let step = settings.fixed_step;
        let budget = step * settings.max_substeps as f32;

        let mut pending = real_dt;
        if pending > budget {
            log::warn!(
                "frame time {real_dt:.3}s exceeds {} sub-steps, discarding {:.3}s",
                settings.max_substeps,
                pending - budget
            );
            pending = budget;
        }

        let mut substeps = 0;
        while pending >= step && substeps < settings.max_substeps {
            pending -= step;
            substeps += 1;
            self.substep(step, ctx);
            if self.phase == Phase::Rescuing {
                pending = 0.0;
                break;
            }
        }
        if pending > MIN_PARTIAL_SUBSTEP_SECS {
            self.substep(pending, ctx);
        }

        self.update_visual(real_dt, settings);
        debug_assert!(
            self.state.is_finite(),
            "kart state is not finite after advance: {:?}",
            self.state
        );
    }

    fn update_visual(&mut self, dt: f32, settings: &SimSettings) {
        let visual = &settings.visual;
        let s = &mut self.state;
        s.visual_pose = smooth(
            &s.pose,
            &s.visual_pose,
            s.wheelie_angle,
            s.controls.steer * visual.steer_lean,
            relax_fraction(dt, visual),
            visual,
        );
    }

    fn substep(&mut self, dt: f32, ctx: &StepContext<'_>) {
        let settings = ctx.settings;
        let effects = &settings.effects;
        let snapshot = self.state.clone();
        let s = &mut self.state;

        // Zipper boost holds a minimum forward speed while it lasts.
        if s.zipper_time_left > 0.0 {
            s.zipper_time_left = (s.zipper_time_left - dt).max(0.0);
            s.velocity.linear.z = s.velocity.linear.z.max(effects.zipper_speed);
        }

        let accel = compute_acceleration(
            &self.tuning,
            settings.gravity,
            &ForceInput {
                velocity: s.velocity,
                controls: s.controls,
                friction: s.friction,
                on_ground: s.on_ground,
            },
        );
        s.velocity.linear += accel.linear * dt;
        s.velocity.yaw_rate += accel.angular * dt;
        s.pose.heading = wrap_angle(s.pose.heading + s.velocity.yaw_rate * dt);

        let from = s.pose.position;
        let to = from + s.pose.local_to_world(s.velocity.linear) * dt;
        let q = query_terrain(ctx.scene, ctx.materials, from, to, &settings.collision);

        let was_on_ground = s.on_ground;
        let surface = q.support_material.map(|tag| ctx.materials.classify(tag));
        s.support_height = q.support_height;
        s.support_normal = q.support_normal;
        s.support_material = q.support_material;
        s.support_surface = q.support_surface;
        s.friction = surface.map_or(1.0, |c| c.friction_coefficient);

        // Ground contact: touching, or snapping down a slope the kart was already on.
        s.pose.position = q.end;
        let gap = s.pose.position.y - q.support_height;
        s.on_ground = gap <= settings.on_ground_epsilon
            || (s.on_ground && gap <= settings.snap_distance && s.velocity.linear.y <= 0.0);
        if s.on_ground {
            s.pose.position.y = q.support_height;
            s.velocity.linear.y = 0.0;
        }

        // A surface is entered by landing on it or by driving onto it.
        let entered = s.on_ground && (!was_on_ground || q.support_surface != s.ground_surface);
        if s.on_ground {
            s.ground_surface = q.support_surface;
        }
        if entered && surface.is_some_and(|c| c.is_zipper) {
            s.zipper_time_left = effects.zipper_time;
            s.wheelie_angle = effects.zipper_pitch;
            s.emit(KartEvent::Zipper);
            log::debug!("zipper at {:?}", s.pose.position);
        }

        s.collided = q.collided;
        s.crashed = q.crashed;
        if q.collided {
            s.emit(KartEvent::Collided);
            let v_fwd = s.velocity.linear.z;
            if v_fwd.abs() > effects.min_collide_speed {
                s.velocity.linear.z = move_towards(
                    v_fwd,
                    effects.min_collide_speed.copysign(v_fwd),
                    effects.collide_braking_rate * dt,
                );
            }
        }
        if q.crashed && s.velocity.linear.z > effects.min_crash_speed {
            s.velocity = Velocity::default();
            s.wheelie_angle = effects.crash_pitch;
            s.zipper_time_left = 0.0;
            s.emit(KartEvent::Crashed);
            log::debug!("crash at {:?}", s.pose.position);
        } else {
            s.wheelie_angle = move_towards(s.wheelie_angle, 0.0, effects.pitch_restore_rate * dt);
        }

        if s.on_ground {
            let n = q.support_normal;
            s.pose.pitch = (-n.dot(&s.pose.forward())).atan2(n.y);
            s.pose.roll = (-n.dot(&s.pose.left())).atan2(n.y);
        }

        s.rescue_requested |= q.rescue;
        if s.pose.position.y < settings.rescue_below_height {
            s.rescue_requested = true;
        }

        let track = ctx.track;
        let window = settings.lap.hint_window;
        let projection = if self.needs_full_projection {
            track.project(s.pose.position, None, window)
        } else {
            track.project(s.pose.position, Some(s.track_hint), window)
        };
        if self.needs_full_projection {
            s.track_hint = projection.segment;
            self.needs_full_projection = false;
        } else {
            if accept_hint(
                s.track_hint,
                projection.segment,
                track.segment_count(),
                window,
            ) {
                s.track_hint = projection.segment;
            }
            match lap_delta(s.track_distance, projection.distance, track.length(), &settings.lap) {
                1 => {
                    s.lap_count += 1;
                    s.emit(KartEvent::LapForward);
                }
                -1 => {
                    s.lap_count -= 1;
                    s.emit(KartEvent::LapBackward);
                }
                _ => {}
            }
        }
        s.track_distance = projection.distance;

        if !s.is_finite() {
            log::error!(
                "kart state became non-finite (pose {:?}, velocity {:?}); rolling back and rescuing",
                s.pose,
                s.velocity
            );
            *s = snapshot;
            s.velocity = Velocity::default();
            s.rescue_requested = true;
        }

        if s.rescue_requested || s.controls.rescue {
            self.begin_rescue();
        }
    }

    fn begin_rescue(&mut self) {
        let s = &mut self.state;
        s.rescue_requested = false;
        s.controls.rescue = false;
        s.velocity = Velocity::default();
        s.emit(KartEvent::Rescue);
        log::debug!("rescue requested at {:?}", s.pose.position);

        self.rescue_clock = 0.0;
        self.phase = Phase::Rescuing;
    }
}
