//! Per-frame morph controller.
//!
//! The controller owns the live transform of every particle in a population
//! and, once per frame, moves each one toward the target of the active
//! [`TargetState`]. The logical state is binary and flips instantly; the
//! visual transition is continuous and is driven only by the `dt` passed to
//! [`MorphController::update`], never by a wall clock.
//!
//! Two easing policies are available (see [`Easing`]):
//!
//! - **Exponential**: every frame moves a fixed fraction of the remaining
//!   distance, `clamp(dt * speed * rate_i, 0, 1)`, where `rate_i` spreads
//!   particles so they do not move in lockstep.
//! - **Tween**: on every state change the live transforms are snapshotted and
//!   each particle runs a fixed-duration eased tween after its own start
//!   delay.
//!
//! While dispersed, a bounded idle bob (and optional yaw spin) is layered on
//! top of the live transform when it is encoded into the instance buffer.
//! It is never accumulated into the live transform itself, so a settled
//! particle stays exactly on its target.
//!
//! # Example
//!
//! ```ignore
//! let mut controller = MorphController::new(&assembled, TargetState::Assembled, &motion, seed);
//! controller.set_state(TargetState::Dispersed);
//! let stats = controller.update(1.0 / 60.0, &assembled, &dispersed, &mut instances);
//! ```

use crate::config::MotionConfig;
use crate::generator::Transform;
use crate::instance::{InstanceBuffer, InstanceTransform};
use crate::sampling::{SampleContext, SampleStream};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Which arrangement particles are heading toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    /// The tree.
    #[default]
    Assembled,
    /// The scatter cloud or the text.
    Dispersed,
}

impl TargetState {
    /// The other state.
    pub fn toggled(self) -> Self {
        match self {
            TargetState::Assembled => TargetState::Dispersed,
            TargetState::Dispersed => TargetState::Assembled,
        }
    }

    pub fn is_assembled(self) -> bool {
        matches!(self, TargetState::Assembled)
    }
}

/// Easing curve applied to tween progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    Linear,
    #[default]
    CubicInOut,
    QuartInOut,
}

impl Ease {
    /// Map linear progress in `[0, 1]` onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Ease::QuartInOut => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
        }
    }
}

/// How live transforms approach their targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Easing {
    /// Move `dt * speed` of the remaining distance every frame.
    Exponential { speed: f32 },
    /// Fixed-duration eased tween from the state-change snapshot.
    Tween { duration: f32, ease: Ease },
}

impl Default for Easing {
    fn default() -> Self {
        Easing::Exponential { speed: 2.5 }
    }
}

/// Counters returned by every frame update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Particles whose live transform was recomputed.
    pub updated: usize,
    /// Particles left untouched (missing target or non-finite result).
    pub skipped: usize,
    /// Particles sitting exactly on their target after the frame.
    pub settled: usize,
}

impl FrameStats {
    /// Sum the counters of two frames or populations.
    pub fn merge(self, other: FrameStats) -> FrameStats {
        FrameStats {
            updated: self.updated + other.updated,
            skipped: self.skipped + other.skipped,
            settled: self.settled + other.settled,
        }
    }
}

/// Slow yaw of a whole population around the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupSpin {
    angle: f32,
    rate: f32,
    decay: f32,
}

impl GroupSpin {
    pub fn new(rate: f32, decay: f32) -> Self {
        Self {
            angle: 0.0,
            rate,
            decay,
        }
    }

    pub fn from_motion(motion: &MotionConfig) -> Self {
        Self::new(motion.group_spin_rate, motion.group_spin_decay)
    }

    /// Advance by `dt`: spin while assembled, decay toward zero otherwise.
    pub fn advance(&mut self, dt: f32, state: TargetState) {
        let dt = sanitize_dt(dt);
        match state {
            TargetState::Assembled => {
                self.angle = wrap_angle(self.angle + dt * self.rate);
            }
            TargetState::Dispersed => {
                self.angle *= self.decay.powf(dt * 60.0);
                if self.angle.abs() < 1e-6 {
                    self.angle = 0.0;
                }
            }
        }
    }

    /// Current yaw in radians, within `(-π, π]`.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.angle)
    }
}

/// Owns the live transforms of one population and advances them per frame.
#[derive(Debug, Clone)]
pub struct MorphController {
    live: Vec<Transform>,
    state: TargetState,
    motion: MotionConfig,
    /// Exponential rate multiplier per particle, `[1, 1 + stagger)`.
    rates: Vec<f32>,
    /// Tween start delay per particle, `[0, stagger)`.
    delays: Vec<f32>,
    /// Live transforms at the last state change, tween origin.
    snapshot: Vec<Transform>,
    /// Seconds since the last state change.
    since_change: f32,
    /// 0 when fully assembled, 1 when fully dispersed; fades idle motion.
    dispersal: f32,
    dispersal_from: f32,
    bob_phase: f32,
    /// Idle yaw per particle, within `(-π, π]`; zero whenever fully assembled.
    yaw: Vec<f32>,
    settled: bool,
    defect_reported: bool,
    defects: u64,
}

impl MorphController {
    /// Create a controller whose particles already sit on `initial`, the
    /// targets of `state`.
    pub fn new(initial: &[Transform], state: TargetState, motion: &MotionConfig, seed: u64) -> Self {
        let count = initial.len() as u32;
        let (rates, delays) = (0..count)
            .map(|i| {
                let mut ctx = SampleContext::new(seed, SampleStream::Motion, i, count);
                let roll = ctx.random() * motion.stagger;
                (1.0 + roll, roll)
            })
            .unzip();
        let dispersal = if state.is_assembled() { 0.0 } else { 1.0 };
        let since_change = match motion.easing {
            Easing::Tween { duration, .. } => duration + motion.stagger,
            Easing::Exponential { .. } => 0.0,
        };

        Self {
            live: initial.to_vec(),
            state,
            motion: *motion,
            rates,
            delays,
            snapshot: initial.to_vec(),
            since_change,
            dispersal,
            dispersal_from: dispersal,
            bob_phase: 0.0,
            yaw: vec![0.0; count as usize],
            settled: true,
            defect_reported: false,
            defects: 0,
        }
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    /// Switch the active state. Returns `false` if it was already active.
    ///
    /// In-flight motion is redirected on the next update; nothing is rolled
    /// back.
    pub fn set_state(&mut self, state: TargetState) -> bool {
        if state == self.state {
            return false;
        }
        self.state = state;
        self.restart();
        true
    }

    /// The active targets were replaced (e.g. new display text); head for
    /// them from wherever particles are now.
    pub fn retarget(&mut self) {
        self.restart();
    }

    fn restart(&mut self) {
        self.snapshot.clone_from(&self.live);
        self.since_change = 0.0;
        self.dispersal_from = self.dispersal;
        self.settled = false;
    }

    /// Live transforms, index-aligned with particle ids.
    pub fn live(&self) -> &[Transform] {
        &self.live
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Whether every particle sat on its target after the last update.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Number of frames in which at least one particle had no target.
    pub fn consistency_defects(&self) -> u64 {
        self.defects
    }

    /// Current idle-motion weight, 0 (assembled) to 1 (dispersed).
    pub fn dispersal(&self) -> f32 {
        self.dispersal
    }

    /// Advance every particle by `dt` seconds and rewrite `instances`.
    ///
    /// `assembled` and `dispersed` are the population's target arrays; a
    /// particle whose index is missing from the active one is skipped. Every
    /// slot of `instances` is written, unless the population was already
    /// resting on its assembled targets and still is.
    pub fn update(
        &mut self,
        dt: f32,
        assembled: &[Transform],
        dispersed: &[Transform],
        instances: &mut InstanceBuffer,
    ) -> FrameStats {
        let dt = sanitize_dt(dt);
        let targets = match self.state {
            TargetState::Assembled => assembled,
            TargetState::Dispersed => dispersed,
        };
        let was_resting = self.settled && self.dispersal == 0.0;
        self.since_change += dt;
        self.advance_idle(dt);

        let epsilon = self.motion.settle_epsilon;
        let mut stats = FrameStats::default();
        let mut missing = 0usize;

        for (i, live) in self.live.iter_mut().enumerate() {
            let Some(target) = targets.get(i) else {
                missing += 1;
                continue;
            };

            let next = match self.motion.easing {
                Easing::Exponential { speed } => {
                    let f = (dt * speed * self.rates[i]).clamp(0.0, 1.0);
                    live.interpolate(target, f)
                }
                Easing::Tween { duration, ease } => {
                    let p = ((self.since_change - self.delays[i]) / duration).clamp(0.0, 1.0);
                    if p >= 1.0 {
                        *target
                    } else {
                        self.snapshot[i].interpolate(target, ease.apply(p))
                    }
                }
            };

            let next = if next.approx_eq(target, epsilon) {
                *target
            } else {
                next
            };

            if !next.is_finite() {
                stats.skipped += 1;
                continue;
            }
            if next == *target {
                stats.settled += 1;
            }
            *live = next;
            stats.updated += 1;
        }

        if missing > 0 {
            stats.skipped += missing;
            self.defects += 1;
            if !self.defect_reported {
                self.defect_reported = true;
                log::warn!(
                    "{} of {} particles have no {:?} target; skipping them",
                    missing,
                    self.live.len(),
                    self.state
                );
            }
        }

        self.settled = stats.settled == self.live.len();
        if !(was_resting && self.settled && self.dispersal == 0.0) {
            self.encode(instances);
        }
        stats
    }

    fn advance_idle(&mut self, dt: f32) {
        let previous = self.dispersal;
        let goal = if self.state.is_assembled() { 0.0 } else { 1.0 };
        self.dispersal = match self.motion.easing {
            Easing::Exponential { speed } => {
                let f = (dt * speed).clamp(0.0, 1.0);
                self.dispersal + (goal - self.dispersal) * f
            }
            Easing::Tween { duration, ease } => {
                let p = ease.apply(self.since_change / duration);
                self.dispersal_from + (goal - self.dispersal_from) * p
            }
        };
        if (goal - self.dispersal).abs() < self.motion.settle_epsilon {
            self.dispersal = goal;
        }

        self.bob_phase = (self.bob_phase + dt * self.motion.bob_frequency) % TAU;
        self.advance_spin(dt, previous);
    }

    /// Integrate each particle's idle yaw.
    ///
    /// The spin rate is scaled by the dispersal weight, never the angle, so
    /// the yaw stays continuous while the weight fades in. While assembling,
    /// the yaw shrinks in proportion to the weight and reaches exactly zero
    /// with it.
    fn advance_spin(&mut self, dt: f32, previous: f32) {
        let weight = self.dispersal;
        let rate = self.motion.particle_spin_rate * weight;
        let phase = self.motion.particle_spin_phase;
        let shrink = match self.state {
            TargetState::Dispersed => 1.0,
            TargetState::Assembled if previous > 0.0 => (weight / previous).clamp(0.0, 1.0),
            TargetState::Assembled => return,
        };
        if rate <= 0.0 && shrink == 1.0 {
            return;
        }
        for (id, yaw) in self.yaw.iter_mut().enumerate() {
            *yaw = wrap_angle(*yaw + dt * rate * spin_multiplier(id, phase)) * shrink;
        }
    }

    /// Live transform of particle `id` with idle motion layered on.
    fn idle_transform(&self, id: usize, live: &Transform) -> Transform {
        let weight = self.dispersal;
        if weight <= 0.0 {
            return *live;
        }
        let motion = &self.motion;
        let mut out = *live;
        out.position += Vec3::Y * (weight * motion.bob_amplitude * (self.bob_phase + id as f32).sin());
        if let Some(&yaw) = self.yaw.get(id).filter(|yaw| **yaw != 0.0) {
            out.rotation = (Quat::from_rotation_y(yaw) * out.rotation).normalize();
        }
        out
    }

    fn encode(&self, instances: &mut InstanceBuffer) {
        instances.write_frame(|i| match self.live.get(i) {
            Some(live) => InstanceTransform::from_transform(&self.idle_transform(i, live)),
            None => InstanceTransform::IDENTITY,
        });
    }
}

/// Idle spin speed of particle `id` relative to the base rate, between 1 and 2.
fn spin_multiplier(id: usize, phase: f32) -> f32 {
    1.0 + (id as f32 * phase).rem_euclid(TAU) / TAU
}

/// Negative, NaN and infinite frame times count as zero.
fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        0.0
    }
}

/// Wrap an angle into `(-π, π]`.
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}
