//! Host-facing facade over all populations of a deployment.
//!
//! A [`MorphScene`] is built once from a [`MorphConfig`]. After that the host
//! drives it with three calls: [`set_target_state`](MorphScene::set_target_state)
//! (or [`toggle`](MorphScene::toggle)), [`set_display_text`](MorphScene::set_display_text)
//! and [`tick`](MorphScene::tick), once per rendered frame.
//!
//! ```ignore
//! let mut scene = MorphScene::new(MorphConfig::default())?;
//! scene.toggle();
//! loop {
//!     scene.tick(dt);
//!     for population in scene.populations_mut() {
//!         population.upload(&mut sink);
//!     }
//!     let model = scene.group_transform();
//! }
//! ```

use crate::config::MorphConfig;
use crate::error::Result;
use crate::generator::TargetGenerator;
use crate::morph::{FrameStats, GroupSpin, TargetState};
use crate::population::Population;
use glam::Mat4;

/// All populations of one deployment plus the shared state driving them.
#[derive(Debug, Clone)]
pub struct MorphScene {
    config: MorphConfig,
    state: TargetState,
    display_text: String,
    populations: Vec<Population>,
    group_spin: GroupSpin,
    frames: u64,
}

impl MorphScene {
    /// Validate `config` and generate every population.
    ///
    /// Fails without building anything if a parameter is out of range.
    pub fn new(config: MorphConfig) -> Result<Self> {
        config.validate()?;
        let generator = TargetGenerator::new(&config)?;
        let state = config.initial_state;

        let populations = config
            .populations
            .iter()
            .enumerate()
            .map(|(i, population)| {
                Population::new(
                    population,
                    generator.with_salt(i as u64 + 1),
                    &config.motion,
                    state,
                    &config.display_text,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Scene ready: {} populations, {} particles, starting {:?}",
            populations.len(),
            populations.iter().map(Population::len).sum::<usize>(),
            state
        );

        Ok(Self {
            state,
            display_text: config.display_text.clone(),
            group_spin: GroupSpin::from_motion(&config.motion),
            populations,
            config,
            frames: 0,
        })
    }

    pub fn config(&self) -> &MorphConfig {
        &self.config
    }

    /// Current logical state.
    pub fn state(&self) -> TargetState {
        self.state
    }

    /// Point every population at `state`. Returns `false` if it was already
    /// active.
    pub fn set_target_state(&mut self, state: TargetState) -> bool {
        if state == self.state {
            return false;
        }
        log::debug!("Target state {:?} -> {:?}", self.state, state);
        self.state = state;
        for population in &mut self.populations {
            population.set_state(state);
        }
        true
    }

    /// Flip to the other state and return it.
    pub fn toggle(&mut self) -> TargetState {
        let next = self.state.toggled();
        self.set_target_state(next);
        next
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    /// Change the text spelled by text-dispersed populations.
    ///
    /// Only dispersed targets are rebuilt, and only when the text actually
    /// changed.
    pub fn set_display_text(&mut self, text: &str) -> Result<()> {
        if text == self.display_text {
            return Ok(());
        }
        let mut rebuilt = 0;
        for population in &mut self.populations {
            if population.set_display_text(text)? {
                rebuilt += 1;
            }
        }
        log::debug!("Display text {:?}: rebuilt {} populations", text, rebuilt);
        self.display_text = text.to_string();
        Ok(())
    }

    /// Advance every population and the group rotation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> FrameStats {
        self.group_spin.advance(dt, self.state);
        let stats = self
            .populations
            .iter_mut()
            .map(|population| population.tick(dt))
            .fold(FrameStats::default(), FrameStats::merge);
        self.frames += 1;
        log::trace!("Frame {}: {:?}", self.frames, stats);
        stats
    }

    /// Logical state is assembled (the transition may still be running).
    pub fn is_assembled(&self) -> bool {
        self.state.is_assembled()
    }

    /// Logical state is assembled and every particle has arrived.
    pub fn is_fully_assembled(&self) -> bool {
        self.is_assembled() && self.populations.iter().all(Population::is_settled)
    }

    /// Yaw of the whole scene in radians.
    pub fn group_rotation(&self) -> f32 {
        self.group_spin.angle()
    }

    /// Model matrix to apply to every population.
    pub fn group_transform(&self) -> Mat4 {
        Mat4::from_quat(self.group_spin.rotation())
    }

    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    pub fn populations_mut(&mut self) -> &mut [Population] {
        &mut self.populations
    }

    pub fn population(&self, index: usize) -> Option<&Population> {
        self.populations.get(index)
    }

    /// Total particles across all populations.
    pub fn particle_count(&self) -> usize {
        self.populations.iter().map(Population::len).sum()
    }

    /// Frames ticked since construction.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PopulationConfig;
    use crate::error::ArborError;
    use crate::generator::{DispersedMode, PopulationKind};

    fn small_config() -> MorphConfig {
        MorphConfig {
            populations: vec![
                PopulationConfig::new(PopulationKind::Needle, 120),
                PopulationConfig::new(PopulationKind::Ornament, 12),
            ],
            ..MorphConfig::default()
        }
    }

    #[test]
    fn test_new_scene_is_fully_assembled() {
        let scene = MorphScene::new(small_config()).unwrap();
        assert!(scene.is_assembled());
        assert!(scene.is_fully_assembled());
        assert_eq!(scene.particle_count(), 132);
        assert_eq!(scene.group_rotation(), 0.0);
    }

    #[test]
    fn test_invalid_config_fails() {
        let mut config = small_config();
        config.scatter.radius = f32::NAN;
        assert!(matches!(
            MorphScene::new(config),
            Err(ArborError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_toggle_flips_logical_state_immediately() {
        let mut scene = MorphScene::new(small_config()).unwrap();
        assert_eq!(scene.toggle(), TargetState::Dispersed);
        assert!(!scene.is_assembled());
        assert!(!scene.set_target_state(TargetState::Dispersed));
        assert_eq!(scene.toggle(), TargetState::Assembled);
        assert!(scene.is_assembled());
    }

    #[test]
    fn test_fully_assembled_waits_for_particles() {
        let mut scene = MorphScene::new(small_config()).unwrap();
        scene.toggle();
        for _ in 0..30 {
            scene.tick(1.0 / 60.0);
        }
        scene.toggle();
        scene.tick(1.0 / 60.0);
        assert!(scene.is_assembled());
        assert!(!scene.is_fully_assembled());
        for _ in 0..1200 {
            scene.tick(1.0 / 60.0);
        }
        assert!(scene.is_fully_assembled());
    }

    #[test]
    fn test_populations_use_distinct_seeds() {
        let config = MorphConfig {
            populations: vec![
                PopulationConfig::new(PopulationKind::Ornament, 10),
                PopulationConfig::new(PopulationKind::Ornament, 10),
            ],
            ..MorphConfig::default()
        };
        let scene = MorphScene::new(config).unwrap();
        assert_ne!(
            scene.populations()[0].assembled_targets(),
            scene.populations()[1].assembled_targets()
        );
    }

    #[test]
    fn test_group_rotation_spins_then_decays() {
        let mut scene = MorphScene::new(small_config()).unwrap();
        for _ in 0..120 {
            scene.tick(1.0 / 60.0);
        }
        let spun = scene.group_rotation();
        assert!((spun - 0.2).abs() < 1e-3);

        scene.toggle();
        for _ in 0..600 {
            scene.tick(1.0 / 60.0);
        }
        assert!(scene.group_rotation().abs() < 1e-4);
    }

    #[test]
    fn test_display_text_reaches_text_populations_only() {
        let mut config = small_config();
        config
            .populations
            .push(PopulationConfig::new(PopulationKind::Sparkle, 300).with_dispersed(DispersedMode::Text));
        let mut scene = MorphScene::new(config).unwrap();
        scene.set_display_text("HI").unwrap();
        assert_eq!(scene.display_text(), "HI");
        assert_eq!(scene.populations()[0].display_text(), None);
        assert_eq!(scene.populations()[2].display_text(), Some("HI"));
        assert_eq!(scene.frame_count(), 0);
    }
}
