//! Round engine - main entry point for playing a garage round

use std::time::Duration;

use hecs::{Entity, World};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use garage_logic::characters::{CharacterEvent, CharacterKind};
use garage_logic::config::{validate_config, GarageConfig, Tuning};
use garage_logic::garage::{generate_garage, Garage};
use garage_logic::grid::Direction;
use garage_logic::scheduler::{Scheduler, TimerQueue};

use crate::components::*;
use crate::error::EngineError;
use crate::events::{EngineEvent, LossReason, RoundOutcome};
use crate::snapshot::Snapshot;
use crate::systems::*;
use crate::timers::EngineTimer;

/// Player input for one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intent {
    /// Requested step for the active character.
    pub dir: Option<Direction>,
}

impl Intent {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn go(dir: Direction) -> Self {
        Self { dir: Some(dir) }
    }
}

/// One round in a generated garage.
pub struct GarageEngine {
    /// ECS world containing characters and guards
    pub world: World,
    config: GarageConfig,
    garage: Garage,
    timers: TimerQueue<EngineTimer>,
    rng: StdRng,
    seed: u64,
    /// Character entities in roster order
    roster: Vec<Entity>,
    active: Option<usize>,
    elapsed: Duration,
    time_left: Duration,
    outcome: RoundOutcome,
    events: Vec<EngineEvent>,
}

fn check(config: &GarageConfig) -> Result<(), EngineError> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(errors))
    }
}

impl GarageEngine {
    /// Generate a garage from `config` and set up a round in it.
    pub fn new(config: GarageConfig) -> Result<Self, EngineError> {
        check(&config)?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let garage = generate_garage(&config.garage_params(), &mut rng);
        Self::assemble(config, garage, rng, seed)
    }

    /// Set up a round in a ready-made garage. The garage's start positions
    /// are used in roster order.
    pub fn with_garage(config: GarageConfig, garage: Garage) -> Result<Self, EngineError> {
        check(&config)?;
        let seed = config.seed.unwrap_or(0);
        Self::assemble(config, garage, StdRng::seed_from_u64(seed), seed)
    }

    fn assemble(config: GarageConfig, garage: Garage, rng: StdRng, seed: u64) -> Result<Self, EngineError> {
        if garage.start_positions.len() < config.roster.len() {
            return Err(EngineError::NotEnoughStarts {
                needed: config.roster.len(),
                available: garage.start_positions.len(),
            });
        }

        let mut world = World::new();
        let mut timers = TimerQueue::new();

        let roster: Vec<Entity> = config
            .roster
            .iter()
            .zip(&garage.start_positions)
            .enumerate()
            .map(|(slot, (kind, start))| world.spawn((Character::new(*kind, *start), RosterSlot(slot))))
            .collect();

        let vision = config.tuning.vision();
        for spawn in &garage.guard_spawns {
            let guard = world.spawn((SecurityGuard::new(spawn.floor, spawn.pos, vision),));
            timers.schedule_every(config.tuning.guard_step, EngineTimer::GuardStep(guard));
        }

        info!(
            "round start: seed {seed}, {} floors, {} characters, {} guards",
            garage.floor_count(),
            roster.len(),
            garage.guard_spawns.len()
        );

        let time_left = config.tuning.round_length;
        let mut engine = Self {
            world,
            config,
            garage,
            timers,
            rng,
            seed,
            roster,
            active: None,
            elapsed: Duration::ZERO,
            time_left,
            outcome: RoundOutcome::InProgress,
            events: Vec::new(),
        };
        engine.activate(0);
        Ok(engine)
    }

    /// Make roster slot `slot` the controlled character. Returns `false`
    /// for a character already in the car.
    pub fn select_character(&mut self, slot: usize) -> Result<bool, EngineError> {
        let entity = *self
            .roster
            .get(slot)
            .ok_or(EngineError::UnknownCharacter(slot))?;
        let at_goal = self
            .world
            .get::<&Character>(entity)
            .map(|c| c.at_goal())
            .unwrap_or(true);
        if at_goal {
            return Ok(false);
        }
        self.activate(slot);
        Ok(true)
    }

    /// Select by hotkey ('1'..'4').
    pub fn select_hotkey(&mut self, key: char) -> Result<bool, EngineError> {
        let kind = CharacterKind::from_hotkey(key).ok_or(EngineError::UnknownHotkey(key))?;
        let slot = self
            .config
            .roster
            .iter()
            .position(|k| *k == kind)
            .ok_or(EngineError::UnknownHotkey(key))?;
        self.select_character(slot)
    }

    fn activate(&mut self, slot: usize) {
        if slot >= self.roster.len() {
            return;
        }
        for (i, entity) in self.roster.iter().enumerate() {
            if let Ok(mut c) = self.world.get::<&mut Character>(*entity) {
                c.set_active(i == slot);
            }
        }
        self.active = Some(slot);
        self.events.push(EngineEvent::Selected { slot });
    }

    /// Hand control to the next character still outside the car.
    fn advance_selection(&mut self) {
        let start = self.active.map_or(0, |s| s + 1);
        let count = self.roster.len();
        for offset in 0..count {
            let slot = (start + offset) % count;
            let free = self
                .world
                .get::<&Character>(self.roster[slot])
                .map(|c| !c.at_goal())
                .unwrap_or(false);
            if free {
                self.activate(slot);
                return;
            }
        }
    }

    /// Advance the round by `delta`.
    ///
    /// Order: fire due timers (step completions, unfreezes, guard patrol
    /// steps), apply input, tick mechanics, check guard sightings, count
    /// down the clock, resolve the outcome.
    ///
    /// Sightings are also checked after every guard step fired inside
    /// `delta`, so a long update cannot carry a guard through a character
    /// unseen.
    pub fn update(&mut self, delta: Duration, intent: Intent) {
        if self.outcome.is_over() {
            return;
        }
        self.elapsed += delta;

        self.fire_timers(delta);
        if let Some(dir) = intent.dir {
            self.move_active(dir);
        }
        self.run_mechanics(delta);
        self.run_detection();

        self.time_left = self.time_left.saturating_sub(delta);
        self.resolve_outcome();
    }

    fn fire_timers(&mut self, delta: Duration) {
        for (id, timer) in self.timers.advance(delta) {
            match timer {
                EngineTimer::Character(entity, t) => {
                    character_timer(&mut self.world, entity, id, t);
                }
                EngineTimer::GuardStep(guard) => {
                    if let Some(step) = patrol_guard(&mut self.world, &self.garage, guard, &mut self.rng) {
                        debug!("guard {guard:?}: {step:?}");
                        self.run_detection();
                    }
                }
            }
        }
    }

    fn move_active(&mut self, dir: Direction) -> bool {
        let Some((slot, entity)) = self.active_entity() else {
            return false;
        };
        let moved = move_character(
            &mut self.world,
            &self.garage,
            &mut self.timers,
            &self.config.tuning,
            entity,
            dir,
        );
        if !moved {
            return false;
        }

        match arrival_system(&mut self.world, &mut self.garage, &mut self.timers, entity) {
            Some(Arrival::Event(event)) => self.push_character_event(slot, entity, event),
            Some(Arrival::ReachedGoal) => {
                info!("slot {slot} reached the car");
                self.events.push(EngineEvent::ReachedGoal { slot });
                self.advance_selection();
            }
            None => {}
        }
        true
    }

    /// Take the stairs with the active character. Returns `false` unless
    /// the character is standing still on a stair tile with a floor in
    /// that direction.
    pub fn use_stairs(&mut self, up: bool) -> bool {
        if self.outcome.is_over() {
            return false;
        }
        let Some((slot, entity)) = self.active_entity() else {
            return false;
        };
        match crate::systems::use_stairs(&mut self.world, &self.garage, entity, up) {
            Some(floor) => {
                debug!("slot {slot} to floor {floor}");
                self.events.push(EngineEvent::FloorChanged { slot, floor });
                true
            }
            None => false,
        }
    }

    fn run_mechanics(&mut self, delta: Duration) {
        let fired = mechanics_system(
            &mut self.world,
            &mut self.timers,
            &mut self.rng,
            &self.config.tuning,
            delta,
        );
        for (entity, event) in fired {
            let Some(slot) = self.slot_of(entity) else {
                continue;
            };
            self.push_character_event(slot, entity, event);
            if event == CharacterEvent::StruckOut {
                if let Some(kind) = self.kind_of(entity) {
                    self.finish(RoundOutcome::Lost(LossReason::StruckOut(kind)));
                }
            }
        }
    }

    fn run_detection(&mut self) {
        if self.outcome.is_over() {
            return;
        }
        for sighting in detection_system(&self.world, &self.garage) {
            let caught = catch_character(
                &mut self.world,
                &mut self.garage,
                &mut self.timers,
                &mut self.rng,
                &self.config.tuning,
                sighting.character,
            );
            let (Some(outcome), Some(slot)) = (caught, self.slot_of(sighting.character)) else {
                continue;
            };

            let penalty = self.config.tuning.catch_penalty;
            self.time_left = self.time_left.saturating_sub(penalty);
            info!(
                "slot {slot} caught by guard at {:?}; {:?} left on the clock",
                sighting.guard_at, self.time_left
            );
            self.events.push(EngineEvent::Caught {
                slot,
                guard_at: sighting.guard_at,
                penalty_ms: penalty.as_millis() as u64,
            });
            if let Some((item, at)) = outcome.dropped {
                self.push_character_event(slot, sighting.character, CharacterEvent::Dropped(item));
                self.events.push(EngineEvent::ItemDropped { item, at });
            }
        }
    }

    fn resolve_outcome(&mut self) {
        if self.outcome.is_over() {
            return;
        }
        let all_home = self.world.query::<&Character>().iter().all(|(_, c)| c.at_goal());
        if all_home {
            self.finish(RoundOutcome::Won);
        } else if self.time_left.is_zero() {
            self.finish(RoundOutcome::Lost(LossReason::TimeUp));
        }
    }

    /// End the round. Pending timers are dropped; later updates are no-ops.
    fn finish(&mut self, outcome: RoundOutcome) {
        if self.outcome.is_over() {
            return;
        }
        self.outcome = outcome;
        self.timers.clear();
        info!("round over after {:?}: {outcome:?}", self.elapsed);
        self.events.push(EngineEvent::RoundOver(outcome));
    }

    fn push_character_event(&mut self, slot: usize, entity: Entity, event: CharacterEvent) {
        if let Some(kind) = self.kind_of(entity) {
            self.events.push(EngineEvent::Character { slot, kind, event });
        }
    }

    fn active_entity(&self) -> Option<(usize, Entity)> {
        let slot = self.active?;
        self.roster.get(slot).map(|e| (slot, *e))
    }

    fn slot_of(&self, entity: Entity) -> Option<usize> {
        self.world.get::<&RosterSlot>(entity).ok().map(|s| s.0)
    }

    fn kind_of(&self, entity: Entity) -> Option<CharacterKind> {
        self.world.get::<&Character>(entity).ok().map(|c| c.kind())
    }

    /// Take every event reported since the last call.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    pub fn garage(&self) -> &Garage {
        &self.garage
    }

    pub fn config(&self) -> &GarageConfig {
        &self.config
    }

    pub fn tuning(&self) -> &Tuning {
        &self.config.tuning
    }

    /// Seed the garage and all round randomness came from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn outcome(&self) -> RoundOutcome {
        self.outcome
    }

    pub fn time_left(&self) -> Duration {
        self.time_left
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn active_slot(&self) -> Option<usize> {
        self.active
    }

    /// Copy of the character in roster slot `slot`.
    pub fn character(&self, slot: usize) -> Option<Character> {
        let entity = *self.roster.get(slot)?;
        self.world.get::<&Character>(entity).ok().map(|c| (*c).clone())
    }

    pub fn character_count(&self) -> usize {
        self.roster.len()
    }

    /// Copies of all guards, in spawn order.
    pub fn guards(&self) -> Vec<SecurityGuard> {
        self.world
            .query::<&SecurityGuard>()
            .iter()
            .map(|(_, g)| g.clone())
            .collect()
    }

    pub fn guard_count(&self) -> usize {
        self.world.query::<&SecurityGuard>().iter().count()
    }

    /// Number of armed timers (step completions, freezes, patrols).
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_logic::config::ConfigError;

    fn seeded(seed: u64) -> GarageEngine {
        build(GarageConfig {
            seed: Some(seed),
            ..GarageConfig::default()
        })
    }

    fn build(config: GarageConfig) -> GarageEngine {
        match GarageEngine::new(config) {
            Ok(engine) => engine,
            Err(e) => panic!("engine setup failed: {e}"),
        }
    }

    #[test]
    fn test_engine_creation() {
        let engine = seeded(7);
        assert_eq!(engine.character_count(), 4);
        assert_eq!(engine.guard_count(), 4);
        assert_eq!(engine.active_slot(), Some(0));
        assert_eq!(engine.outcome(), RoundOutcome::InProgress);
        assert_eq!(engine.time_left(), Duration::from_secs(180));
        assert_eq!(engine.pending_timers(), 4);
        for slot in 0..4 {
            let c = engine.character(slot).expect("slot exists");
            assert_eq!(c.at.floor, 0);
            assert_eq!(c.is_active(), slot == 0);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GarageConfig {
            floors: 0,
            ..GarageConfig::default()
        };
        match GarageEngine::new(config) {
            Err(EngineError::InvalidConfig(errors)) => {
                assert!(errors.contains(&ConfigError::InvalidFloorCount(0)));
            }
            Err(e) => panic!("wrong error: {e}"),
            Ok(_) => panic!("invalid config accepted"),
        }
    }

    #[test]
    fn test_select_character() {
        let mut engine = seeded(8);
        engine.drain_events();
        assert!(engine.select_character(2).unwrap());
        assert_eq!(engine.active_slot(), Some(2));
        assert!(engine.character(2).unwrap().is_active());
        assert!(!engine.character(0).unwrap().is_active());
        assert_eq!(engine.drain_events(), vec![EngineEvent::Selected { slot: 2 }]);

        assert!(matches!(
            engine.select_character(9),
            Err(EngineError::UnknownCharacter(9))
        ));
        assert!(engine.select_hotkey('4').unwrap());
        assert_eq!(engine.active_slot(), Some(3));
        assert!(matches!(
            engine.select_hotkey('x'),
            Err(EngineError::UnknownHotkey('x'))
        ));
    }

    #[test]
    fn test_clock_runs_out() {
        // No meter character, so nothing else can end the round early.
        let mut engine = build(GarageConfig {
            seed: Some(9),
            roster: vec![CharacterKind::George, CharacterKind::Kramer, CharacterKind::Jerry],
            ..GarageConfig::default()
        });
        for _ in 0..180 {
            engine.update(Duration::from_secs(1), Intent::idle());
        }
        assert_eq!(
            engine.outcome(),
            RoundOutcome::Lost(LossReason::TimeUp)
        );
        assert_eq!(engine.pending_timers(), 0);

        let elapsed = engine.elapsed();
        engine.update(Duration::from_secs(1), Intent::idle());
        assert_eq!(engine.elapsed(), elapsed);
    }

    #[test]
    fn test_same_seed_same_round() {
        let mut a = seeded(10);
        let mut b = seeded(10);
        for i in 0..300 {
            let intent = Intent::go(Direction::ALL[(i / 7) % 4]);
            a.update(Duration::from_millis(16), intent);
            b.update(Duration::from_millis(16), intent);
        }
        let ja = a.snapshot().to_json().unwrap();
        let jb = b.snapshot().to_json().unwrap();
        assert_eq!(ja, jb);
    }
}
