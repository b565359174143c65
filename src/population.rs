//! A fixed-size particle population.
//!
//! A [`Population`] ties together one shape policy, its two target arrays and
//! baked colors, a [`MorphController`] for the live transforms, and the
//! [`InstanceBuffer`] the host renders from. The particle count never changes
//! after construction and particle `i` always lives in instance slot `i`.

use crate::config::{MotionConfig, PopulationConfig};
use crate::error::Result;
use crate::generator::{DispersedMode, PopulationKind, ShapePolicy, TargetGenerator, Transform};
use crate::instance::{InstanceBuffer, InstanceSink};
use crate::morph::{FrameStats, MorphController, TargetState};
use glam::Vec3;

/// Read-only view of one particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle<'a> {
    /// Stable id, equal to the instance slot.
    pub id: usize,
    pub assembled: &'a Transform,
    pub dispersed: &'a Transform,
    pub color: Vec3,
    pub live: &'a Transform,
}

/// One independently rendered group of particles.
#[derive(Debug, Clone)]
pub struct Population {
    kind: PopulationKind,
    policy: ShapePolicy,
    mode: DispersedMode,
    generator: TargetGenerator,
    assembled: Vec<Transform>,
    dispersed: Vec<Transform>,
    colors: Vec<Vec3>,
    /// Text the dispersed targets were built from (text mode only).
    text_key: Option<String>,
    controller: MorphController,
    instances: InstanceBuffer,
}

impl Population {
    /// Generate every target for `config` and place the particles, settled,
    /// on the targets of `state`.
    ///
    /// `generator` should already be salted for this population.
    pub fn new(
        config: &PopulationConfig,
        generator: TargetGenerator,
        motion: &MotionConfig,
        state: TargetState,
        text: &str,
    ) -> Result<Self> {
        let policy = config.shape_policy();
        let mode = config.dispersed;
        let count = config.count;

        let assembled = generator.build_assembled_targets(count, &policy)?;
        let text_key = match mode {
            DispersedMode::Text => Some(text.to_string()),
            DispersedMode::Scatter => None,
        };
        let dispersed =
            generator.build_dispersed_targets(count, &policy, mode, text_key.as_deref())?;

        let initial = match state {
            TargetState::Assembled => &assembled.transforms,
            TargetState::Dispersed => &dispersed,
        };
        let controller = MorphController::new(initial, state, motion, generator.seed());
        let instances = InstanceBuffer::new(initial, &assembled.colors);

        log::debug!(
            "Created {:?} population: {} particles, {:?} dispersal",
            config.kind,
            count,
            mode
        );

        Ok(Self {
            kind: config.kind,
            policy,
            mode,
            generator,
            assembled: assembled.transforms,
            dispersed,
            colors: assembled.colors,
            text_key,
            controller,
            instances,
        })
    }

    pub fn kind(&self) -> PopulationKind {
        self.kind
    }

    pub fn policy(&self) -> &ShapePolicy {
        &self.policy
    }

    pub fn dispersed_mode(&self) -> DispersedMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.assembled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assembled.is_empty()
    }

    pub fn assembled_targets(&self) -> &[Transform] {
        &self.assembled
    }

    pub fn dispersed_targets(&self) -> &[Transform] {
        &self.dispersed
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    pub fn live(&self) -> &[Transform] {
        self.controller.live()
    }

    pub fn controller(&self) -> &MorphController {
        &self.controller
    }

    pub fn instances(&self) -> &InstanceBuffer {
        &self.instances
    }

    /// Text the dispersed targets currently spell, if this population forms
    /// text.
    pub fn display_text(&self) -> Option<&str> {
        self.text_key.as_deref()
    }

    /// Particle `id`, if it exists.
    pub fn particle(&self, id: usize) -> Option<Particle<'_>> {
        Some(Particle {
            id,
            assembled: self.assembled.get(id)?,
            dispersed: self.dispersed.get(id)?,
            color: *self.colors.get(id)?,
            live: self.controller.live().get(id)?,
        })
    }

    /// All particles in id order.
    pub fn particles(&self) -> impl Iterator<Item = Particle<'_>> + '_ {
        (0..self.len()).filter_map(move |id| self.particle(id))
    }

    /// Switch the active state. Returns `false` if it was already active.
    pub fn set_state(&mut self, state: TargetState) -> bool {
        self.controller.set_state(state)
    }

    /// Rebuild the dispersed targets for `text`.
    ///
    /// Scatter populations ignore text. Setting the text the targets were
    /// already built from is a no-op. Assembled targets, colors and live
    /// transforms are left alone. Returns whether anything was rebuilt.
    pub fn set_display_text(&mut self, text: &str) -> Result<bool> {
        if self.mode != DispersedMode::Text || self.text_key.as_deref() == Some(text) {
            return Ok(false);
        }
        self.dispersed = self.generator.build_dispersed_targets(
            self.assembled.len() as u32,
            &self.policy,
            self.mode,
            Some(text),
        )?;
        self.text_key = Some(text.to_string());
        if !self.controller.state().is_assembled() {
            self.controller.retarget();
        }
        Ok(true)
    }

    /// Advance the population by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> FrameStats {
        self.controller
            .update(dt, &self.assembled, &self.dispersed, &mut self.instances)
    }

    /// Push dirty instance data to `sink`. Returns `true` if anything was
    /// uploaded.
    pub fn upload(&mut self, sink: &mut impl InstanceSink) -> bool {
        self.instances.flush(sink)
    }

    /// Whether every particle sat on its target after the last tick.
    pub fn is_settled(&self) -> bool {
        self.controller.is_settled()
    }

    pub fn consistency_defects(&self) -> u64 {
        self.controller.consistency_defects()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MorphConfig;
    use crate::instance::{InstanceColor, InstanceTransform};

    fn sparkles(count: u32, state: TargetState, text: &str) -> Population {
        let config = MorphConfig::greeting();
        let generator = TargetGenerator::new(&config).unwrap();
        let population = PopulationConfig::new(PopulationKind::Sparkle, count)
            .with_dispersed(DispersedMode::Text);
        Population::new(&population, generator, &config.motion, state, text).unwrap()
    }

    fn needles(count: u32) -> Population {
        let config = MorphConfig::default();
        let generator = TargetGenerator::new(&config).unwrap();
        let population = PopulationConfig::new(PopulationKind::Needle, count);
        Population::new(&population, generator, &config.motion, TargetState::Assembled, "").unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        transforms: Vec<InstanceTransform>,
        colors: Vec<InstanceColor>,
        calls: usize,
    }

    impl InstanceSink for Recorder {
        fn upload_transforms(&mut self, transforms: &[InstanceTransform]) {
            self.transforms = transforms.to_vec();
            self.calls += 1;
        }

        fn upload_colors(&mut self, colors: &[InstanceColor]) {
            self.colors = colors.to_vec();
            self.calls += 1;
        }
    }

    #[test]
    fn test_starts_settled_on_initial_state() {
        let population = sparkles(400, TargetState::Dispersed, "HI");
        assert_eq!(population.len(), 400);
        assert_eq!(population.live(), population.dispersed_targets());
        assert!(population.is_settled());

        let population = needles(100);
        assert_eq!(population.live(), population.assembled_targets());
    }

    #[test]
    fn test_text_change_rebuilds_only_dispersed() {
        let mut population = sparkles(500, TargetState::Assembled, "HI");
        let assembled = population.assembled_targets().to_vec();
        let colors = population.colors().to_vec();
        let live = population.live().to_vec();
        let before = population.dispersed_targets().to_vec();

        assert!(population.set_display_text("TREE").unwrap());
        assert_eq!(population.display_text(), Some("TREE"));
        assert_ne!(population.dispersed_targets(), before.as_slice());
        assert_eq!(population.assembled_targets(), assembled.as_slice());
        assert_eq!(population.colors(), colors.as_slice());
        assert_eq!(population.live(), live.as_slice());
        assert_eq!(population.dispersed_targets().len(), 500);
    }

    #[test]
    fn test_same_text_is_memoized() {
        let mut population = sparkles(200, TargetState::Assembled, "HI");
        assert!(!population.set_display_text("HI").unwrap());
        assert!(population.set_display_text("").unwrap());
        assert!(!population.set_display_text("").unwrap());
    }

    #[test]
    fn test_scatter_population_ignores_text() {
        let mut population = needles(50);
        let before = population.dispersed_targets().to_vec();
        assert!(!population.set_display_text("MERRY").unwrap());
        assert_eq!(population.dispersed_targets(), before.as_slice());
        assert_eq!(population.display_text(), None);
    }

    #[test]
    fn test_text_change_while_dispersed_moves_particles() {
        let mut population = sparkles(300, TargetState::Dispersed, "HI");
        population.set_display_text("MERRY").unwrap();
        assert!(!population.is_settled());
        for _ in 0..(60 * 6) {
            population.tick(1.0 / 60.0);
        }
        assert!(population.is_settled());
        assert_eq!(population.live(), population.dispersed_targets());
    }

    #[test]
    fn test_upload_only_when_dirty() {
        let mut population = needles(32);
        let mut sink = Recorder::default();
        assert!(population.upload(&mut sink));
        assert_eq!(sink.calls, 2);
        assert_eq!(sink.colors.len(), 32);
        assert!(!population.upload(&mut sink));

        // resting on the assembled targets: nothing to rewrite
        population.tick(1.0 / 60.0);
        assert!(!population.upload(&mut sink));

        population.set_state(TargetState::Dispersed);
        population.tick(1.0 / 60.0);
        assert!(population.upload(&mut sink));
        assert_eq!(sink.calls, 3);
        assert_eq!(sink.transforms.len(), 32);
    }

    #[test]
    fn test_particle_views_are_index_aligned() {
        let population = needles(20);
        let particles: Vec<_> = population.particles().collect();
        assert_eq!(particles.len(), 20);
        for (i, p) in particles.iter().enumerate() {
            assert_eq!(p.id, i);
            assert_eq!(*p.assembled, population.assembled_targets()[i]);
            assert_eq!(p.color, population.colors()[i]);
        }
        assert!(population.particle(20).is_none());
    }

    #[test]
    fn test_zero_count_population() {
        let mut population = needles(0);
        assert!(population.is_empty());
        let stats = population.tick(1.0 / 60.0);
        assert_eq!(stats, FrameStats::default());
        assert!(population.is_settled());
    }
}
