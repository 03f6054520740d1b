//! Playable characters: roster, per-character mechanics and movement state.
//!
//! The roster is a static strategy table. Each [`CharacterDef`] names a
//! [`Mechanic`], and each mechanic maps to a pair of hooks: a speed modifier
//! and a per-frame tick.
//!
//! | Key | Character | Speed | Mechanic | Needs |
//! |-----|-----------|-------|----------|-------|
//! | 1 | George | 1.0 | Half speed while carrying | AC unit (carried, dropped when caught) |
//! | 2 | Elaine | 1.0 | Meter fills; overflow freezes, too many lose the round | - |
//! | 3 | Kramer | 1.5 | Random forced direction until the keys are found | Keys |
//! | 4 | Jerry | 1.0 | Idle remarks (cosmetic) | - |
//!
//! # Movement
//!
//! ```text
//! Unstarted ──move──▶ Moving ──step done──▶ Idle ──move──▶ Moving
//!                       │                    │
//!                       └──────freeze────────┴──▶ Frozen ──timer──▶ Idle
//!
//! any ──reach goal──▶ AtGoal (terminal)
//! ```
//!
//! A move updates the grid position immediately and arms a
//! `MoveComplete` timer; further input is ignored until it fires. Freezing
//! cancels that timer so a stale completion can never unfreeze.

use std::time::Duration;

use log::debug;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::config::Tuning;
use crate::grid::{Direction, FloorPos, Item};
use crate::scheduler::{Scheduler, TimerId};

/// Slack when comparing the meter against its maximum.
const METER_EPSILON: f64 = 1e-9;

/// Things Jerry says when left standing around.
pub const REMARKS: [&str; 8] = [
    "What's the deal with parking garages?",
    "We're like rats in a maze...",
    "I could be home watching TV.",
    "This is a nightmare.",
    "Who designed this place?!",
    "Are we on 3 or 4?",
    "I knew we should've taken a cab.",
    "Every floor looks the same!",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterKind {
    George,
    Elaine,
    Kramer,
    Jerry,
}

impl CharacterKind {
    pub const ALL: [CharacterKind; 4] = [
        CharacterKind::George,
        CharacterKind::Elaine,
        CharacterKind::Kramer,
        CharacterKind::Jerry,
    ];

    pub fn def(self) -> &'static CharacterDef {
        &ROSTER[self as usize]
    }

    pub fn from_hotkey(key: char) -> Option<Self> {
        ROSTER.iter().find(|d| d.hotkey == key).map(|d| d.kind)
    }
}

/// Per-character rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mechanic {
    SpeedPenalty,
    Meter,
    Erratic,
    IdleCommentary,
}

/// An item a character needs before the car will let them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prerequisite {
    /// Bulky: slows the carrier and is dropped when caught.
    Carried(Item),
    /// Kept once found.
    Held(Item),
}

impl Prerequisite {
    pub fn item(self) -> Item {
        match self {
            Prerequisite::Carried(item) | Prerequisite::Held(item) => item,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CharacterDef {
    pub kind: CharacterKind,
    pub name: &'static str,
    /// Letter drawn on the sprite.
    pub portrait: char,
    pub hotkey: char,
    pub base_speed: f32,
    pub mechanic: Mechanic,
    pub prerequisite: Option<Prerequisite>,
}

/// Indexed by `CharacterKind as usize`.
pub static ROSTER: [CharacterDef; 4] = [
    CharacterDef {
        kind: CharacterKind::George,
        name: "George",
        portrait: 'G',
        hotkey: '1',
        base_speed: 1.0,
        mechanic: Mechanic::SpeedPenalty,
        prerequisite: Some(Prerequisite::Carried(Item::AcUnit)),
    },
    CharacterDef {
        kind: CharacterKind::Elaine,
        name: "Elaine",
        portrait: 'E',
        hotkey: '2',
        base_speed: 1.0,
        mechanic: Mechanic::Meter,
        prerequisite: None,
    },
    CharacterDef {
        kind: CharacterKind::Kramer,
        name: "Kramer",
        portrait: 'K',
        hotkey: '3',
        base_speed: 1.5,
        mechanic: Mechanic::Erratic,
        prerequisite: Some(Prerequisite::Held(Item::Keys)),
    },
    CharacterDef {
        kind: CharacterKind::Jerry,
        name: "Jerry",
        portrait: 'J',
        hotkey: '4',
        base_speed: 1.0,
        mechanic: Mechanic::IdleCommentary,
        prerequisite: None,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveState {
    /// Spawned, never moved.
    Unstarted,
    Idle,
    Moving,
    Frozen,
    AtGoal,
}

/// Timer events owned by a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterTimer {
    MoveComplete,
    Unfreeze,
    ErraticWindowEnd,
}

/// Something worth showing the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CharacterEvent {
    MeterOverflow { strikes: u32 },
    /// Strike limit reached; the round is lost.
    StruckOut,
    /// An erratic window opened with this forced direction.
    Lurched(Direction),
    Remark(&'static str),
    PickedUp(Item),
    Dropped(Item),
    Relieved,
}

impl CharacterEvent {
    /// Floating text for the event.
    pub fn text(&self) -> String {
        match self {
            CharacterEvent::MeterOverflow { .. } => "Can't hold it!".to_string(),
            CharacterEvent::StruckOut => "That's it, I'm done.".to_string(),
            CharacterEvent::Lurched(_) => "Whoa!".to_string(),
            CharacterEvent::Remark(text) => (*text).to_string(),
            CharacterEvent::PickedUp(Item::AcUnit) => "Got the AC unit!".to_string(),
            CharacterEvent::PickedUp(Item::Keys) => "Found the keys!".to_string(),
            CharacterEvent::Dropped(item) => format!("Dropped the {}!", item.label()),
            CharacterEvent::Relieved => "Relief!".to_string(),
        }
    }
}

/// Per-tick context handed to mechanic hooks.
struct Tick<'a> {
    delta: Duration,
    tuning: &'a Tuning,
    rng: &'a mut dyn RngCore,
    timers: &'a mut dyn Scheduler<CharacterTimer>,
    events: Vec<CharacterEvent>,
}

struct MechanicHooks {
    speed: fn(&Character, &Tuning) -> f32,
    tick: fn(&mut Character, &mut Tick<'_>),
}

static SPEED_PENALTY_HOOKS: MechanicHooks = MechanicHooks {
    speed: carry_speed,
    tick: no_tick,
};
static METER_HOOKS: MechanicHooks = MechanicHooks {
    speed: base_speed,
    tick: meter_tick,
};
static ERRATIC_HOOKS: MechanicHooks = MechanicHooks {
    speed: base_speed,
    tick: erratic_tick,
};
static IDLE_HOOKS: MechanicHooks = MechanicHooks {
    speed: base_speed,
    tick: idle_tick,
};

fn hooks(mechanic: Mechanic) -> &'static MechanicHooks {
    match mechanic {
        Mechanic::SpeedPenalty => &SPEED_PENALTY_HOOKS,
        Mechanic::Meter => &METER_HOOKS,
        Mechanic::Erratic => &ERRATIC_HOOKS,
        Mechanic::IdleCommentary => &IDLE_HOOKS,
    }
}

fn base_speed(c: &Character, _: &Tuning) -> f32 {
    c.def().base_speed
}

fn carry_speed(c: &Character, tuning: &Tuning) -> f32 {
    if c.carrying() {
        c.def().base_speed * tuning.carry_speed_factor
    } else {
        c.def().base_speed
    }
}

fn no_tick(_: &mut Character, _: &mut Tick<'_>) {}

fn meter_tick(c: &mut Character, t: &mut Tick<'_>) {
    let max = t.tuning.meter_max;
    c.meter = (c.meter + t.tuning.meter_fill_per_sec * t.delta.as_secs_f64()).min(max);
    if c.meter < max - METER_EPSILON {
        return;
    }

    c.meter = 0.0;
    c.strikes += 1;
    c.freeze(t.tuning.meter_freeze, t.timers);
    t.events.push(CharacterEvent::MeterOverflow { strikes: c.strikes });
    if c.strikes >= t.tuning.strike_limit {
        t.events.push(CharacterEvent::StruckOut);
    }
}

fn erratic_tick(c: &mut Character, t: &mut Tick<'_>) {
    if c.meets_goal_requirement() {
        return;
    }
    c.erratic_elapsed += t.delta;
    if c.erratic_elapsed < t.tuning.erratic_interval {
        return;
    }

    c.erratic_elapsed = Duration::ZERO;
    let dir = Direction::ALL[t.rng.gen_range(0..Direction::ALL.len())];
    c.forced = Some(dir);
    if let Some(id) = c.erratic_timer.take() {
        t.timers.cancel(id);
    }
    c.erratic_timer = Some(
        t.timers
            .schedule_after(t.tuning.erratic_window, CharacterTimer::ErraticWindowEnd),
    );
    t.events.push(CharacterEvent::Lurched(dir));
}

fn idle_tick(c: &mut Character, t: &mut Tick<'_>) {
    if !c.active {
        return;
    }
    c.idle += t.delta;
    if c.idle < t.tuning.idle_remark_interval {
        return;
    }
    c.idle = Duration::ZERO;
    if let Some(remark) = REMARKS.choose(&mut *t.rng) {
        t.events.push(CharacterEvent::Remark(*remark));
    }
}

/// Runtime state of one character.
#[derive(Debug, Clone)]
pub struct Character {
    kind: CharacterKind,
    pub at: FloorPos,
    pub start: FloorPos,
    state: MoveState,
    active: bool,
    inventory: Vec<Item>,
    meter: f64,
    strikes: u32,
    erratic_elapsed: Duration,
    forced: Option<Direction>,
    idle: Duration,
    move_timer: Option<TimerId>,
    freeze_timer: Option<TimerId>,
    erratic_timer: Option<TimerId>,
}

impl Character {
    pub fn new(kind: CharacterKind, start: FloorPos) -> Self {
        Self {
            kind,
            at: start,
            start,
            state: MoveState::Unstarted,
            active: false,
            inventory: Vec::new(),
            meter: 0.0,
            strikes: 0,
            erratic_elapsed: Duration::ZERO,
            forced: None,
            idle: Duration::ZERO,
            move_timer: None,
            freeze_timer: None,
            erratic_timer: None,
        }
    }

    pub fn kind(&self) -> CharacterKind {
        self.kind
    }

    pub fn def(&self) -> &'static CharacterDef {
        self.kind.def()
    }

    pub fn state(&self) -> MoveState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if active {
            self.idle = Duration::ZERO;
        }
    }

    pub fn inventory(&self) -> &[Item] {
        &self.inventory
    }

    pub fn has(&self, item: Item) -> bool {
        self.inventory.contains(&item)
    }

    pub fn meter(&self) -> f64 {
        self.meter
    }

    pub fn strikes(&self) -> u32 {
        self.strikes
    }

    /// Direction currently overriding input, if an erratic window is open.
    pub fn forced_direction(&self) -> Option<Direction> {
        self.forced
    }

    /// Holding a bulky prerequisite.
    pub fn carrying(&self) -> bool {
        matches!(self.def().prerequisite, Some(Prerequisite::Carried(item)) if self.has(item))
    }

    pub fn speed_multiplier(&self, tuning: &Tuning) -> f32 {
        (hooks(self.def().mechanic).speed)(self, tuning)
    }

    /// Time one grid step takes at the current speed, to the microsecond.
    pub fn step_duration(&self, tuning: &Tuning) -> Duration {
        let speed = f64::from(self.speed_multiplier(tuning).max(0.01));
        Duration::from_micros((tuning.step.as_micros() as f64 / speed).round() as u64)
    }

    /// Idle or never moved.
    pub fn accepts_input(&self) -> bool {
        matches!(self.state, MoveState::Unstarted | MoveState::Idle)
    }

    pub fn at_goal(&self) -> bool {
        self.state == MoveState::AtGoal
    }

    /// Try to step one cell. `can_enter` decides whether the target is open
    /// (walls, the goal without prerequisites). Returns `true` if the move
    /// started.
    pub fn try_move<F>(
        &mut self,
        dir: Direction,
        can_enter: F,
        tuning: &Tuning,
        timers: &mut dyn Scheduler<CharacterTimer>,
    ) -> bool
    where
        F: FnOnce(&Character, FloorPos) -> bool,
    {
        if !self.accepts_input() {
            return false;
        }
        let dir = self.forced.unwrap_or(dir);
        let target = FloorPos {
            floor: self.at.floor,
            pos: self.at.pos.step(dir),
        };
        if !can_enter(self, target) {
            return false;
        }

        self.at = target;
        self.state = MoveState::Moving;
        self.idle = Duration::ZERO;
        self.move_timer = Some(timers.schedule_after(self.step_duration(tuning), CharacterTimer::MoveComplete));
        true
    }

    /// Apply a fired timer. Timers this character no longer tracks are
    /// ignored; returns whether anything changed.
    pub fn handle_timer(&mut self, id: TimerId, timer: CharacterTimer) -> bool {
        match timer {
            CharacterTimer::MoveComplete if self.move_timer == Some(id) => {
                self.move_timer = None;
                if self.state == MoveState::Moving {
                    self.state = MoveState::Idle;
                }
                true
            }
            CharacterTimer::Unfreeze if self.freeze_timer == Some(id) => {
                self.freeze_timer = None;
                if self.state == MoveState::Frozen {
                    self.state = MoveState::Idle;
                }
                true
            }
            CharacterTimer::ErraticWindowEnd if self.erratic_timer == Some(id) => {
                self.erratic_timer = None;
                self.forced = None;
                true
            }
            _ => false,
        }
    }

    /// Freeze for `duration`. A pending step is cut short; an existing
    /// freeze is replaced. No effect at the goal.
    pub fn freeze(&mut self, duration: Duration, timers: &mut dyn Scheduler<CharacterTimer>) {
        if self.at_goal() {
            return;
        }
        if let Some(id) = self.move_timer.take() {
            timers.cancel(id);
        }
        if let Some(id) = self.freeze_timer.take() {
            timers.cancel(id);
        }
        self.state = MoveState::Frozen;
        self.freeze_timer = Some(timers.schedule_after(duration, CharacterTimer::Unfreeze));
        debug!("{} frozen for {:?}", self.def().name, duration);
    }

    /// Run this frame's mechanic. Nothing happens while frozen or at the goal.
    pub fn update_mechanics(
        &mut self,
        delta: Duration,
        tuning: &Tuning,
        rng: &mut dyn RngCore,
        timers: &mut dyn Scheduler<CharacterTimer>,
    ) -> Vec<CharacterEvent> {
        if matches!(self.state, MoveState::Frozen | MoveState::AtGoal) {
            return Vec::new();
        }
        let mut tick = Tick {
            delta,
            tuning,
            rng,
            timers,
            events: Vec::new(),
        };
        (hooks(self.def().mechanic).tick)(self, &mut tick);
        tick.events
    }

    /// Only the character whose prerequisite this is may take it.
    pub fn can_pick_up(&self, item: Item) -> bool {
        self.def().prerequisite.map(Prerequisite::item) == Some(item) && !self.has(item)
    }

    pub fn pick_up(&mut self, item: Item, timers: &mut dyn Scheduler<CharacterTimer>) -> Option<CharacterEvent> {
        if !self.can_pick_up(item) {
            return None;
        }
        self.inventory.push(item);
        if self.def().mechanic == Mechanic::Erratic {
            self.forced = None;
            if let Some(id) = self.erratic_timer.take() {
                timers.cancel(id);
            }
        }
        Some(CharacterEvent::PickedUp(item))
    }

    /// Give up a carried prerequisite. Held items are kept.
    pub fn drop_carried(&mut self) -> Option<Item> {
        let Some(Prerequisite::Carried(item)) = self.def().prerequisite else {
            return None;
        };
        let idx = self.inventory.iter().position(|i| *i == item)?;
        Some(self.inventory.remove(idx))
    }

    pub fn use_bathroom(&mut self) -> Option<CharacterEvent> {
        if self.def().mechanic != Mechanic::Meter {
            return None;
        }
        self.meter = 0.0;
        Some(CharacterEvent::Relieved)
    }

    /// Whether the car accepts this character.
    pub fn meets_goal_requirement(&self) -> bool {
        match self.def().prerequisite {
            Some(p) => self.has(p.item()),
            None => true,
        }
    }

    /// Enter the car. Terminal; every pending timer is cancelled.
    pub fn reach_goal(&mut self, timers: &mut dyn Scheduler<CharacterTimer>) {
        self.cancel_timers(timers);
        self.state = MoveState::AtGoal;
    }

    /// Teleport back to the start cell.
    pub fn reset_to_start(&mut self) {
        self.at = self.start;
    }

    /// Move to the same coordinates on another floor.
    pub fn change_floor(&mut self, floor: usize) {
        self.at.floor = floor;
        self.idle = Duration::ZERO;
    }

    pub fn cancel_timers(&mut self, timers: &mut dyn Scheduler<CharacterTimer>) {
        for id in [
            self.move_timer.take(),
            self.freeze_timer.take(),
            self.erratic_timer.take(),
        ]
        .into_iter()
        .flatten()
        {
            timers.cancel(id);
        }
        self.forced = None;
    }
}
