//! Host session
//!
//! Owns the meta ledger and at most one active run. Frames are fed through
//! a fixed-step accumulator; the run is recorded and persisted the moment
//! it ends.

use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::persistence::{MetaLedger, MetaStorage};
use crate::settings::Settings;
use crate::sim::{
    EntityId, GameEvent, GamePhase, GameState, RunSummary, TickInput, create_run, tick,
};
use crate::MetaSave;

/// Longest frame the accumulator accepts (seconds)
const MAX_FRAME_DT: f32 = 0.1;

type GameOverCallback = Box<dyn FnMut(&RunSummary)>;

pub struct Session<S: MetaStorage> {
    ledger: MetaLedger<S>,
    settings: Settings,
    run: Option<GameState>,
    accumulator: f32,
    /// Held movement plus one-shot intents for the next step
    pub input: TickInput,
    on_game_over: Option<GameOverCallback>,
}

impl<S: MetaStorage> Session<S> {
    /// Open the ledger from `storage`; no run is active yet
    pub fn new(settings: Settings, storage: S) -> Self {
        Self {
            ledger: MetaLedger::open(storage),
            settings,
            run: None,
            accumulator: 0.0,
            input: TickInput::default(),
            on_game_over: None,
        }
    }

    pub fn ledger(&self) -> &MetaLedger<S> {
        &self.ledger
    }

    pub fn meta(&self) -> &MetaSave {
        self.ledger.meta()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn run(&self) -> Option<&GameState> {
        self.run.as_ref()
    }

    pub fn run_mut(&mut self) -> Option<&mut GameState> {
        self.run.as_mut()
    }

    /// A run exists and has not ended
    pub fn is_active(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.run_active)
    }

    /// Called once with the summary of every run that ends
    pub fn set_on_game_over(&mut self, callback: impl FnMut(&RunSummary) + 'static) {
        self.on_game_over = Some(Box::new(callback));
    }

    /// Start a fresh run from the ledger's current start stats. An active
    /// run is abandoned as if quit to the menu.
    pub fn start_run(&mut self, seed: Option<u32>) -> EntityId {
        if self.is_active() {
            self.quit_to_menu();
        }
        let config = self
            .settings
            .to_run_config(seed.unwrap_or(self.settings.seed));
        let (state, player_id) = create_run(
            config,
            self.ledger.start_stats(),
            self.ledger.meta().clone(),
        );
        self.run = Some(state);
        self.accumulator = 0.0;
        self.input = TickInput::default();
        player_id
    }

    /// Advance the active run by exactly `dt`
    pub fn tick(&mut self, input: &TickInput, dt: f32) -> Vec<GameEvent> {
        let Some(run) = self.run.as_mut() else {
            return Vec::new();
        };
        let events = tick(run, input, dt);
        let summary = events.iter().find_map(|e| match e {
            GameEvent::GameOver(summary) => Some(*summary),
            _ => None,
        });
        if let Some(summary) = summary {
            self.finish_run(summary);
        }
        events
    }

    /// Feed a frame of wall-clock time through the fixed-step accumulator
    pub fn update(&mut self, frame_dt: f32) -> Vec<GameEvent> {
        if self.run.is_none() {
            return Vec::new();
        }
        let frame_dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        self.accumulator += frame_dt;

        let mut events = Vec::new();
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.input.clone();
            events.extend(self.tick(&input, SIM_DT));
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.input.pause = false;
            self.input.resume = false;
            self.input.toggle_stats = false;
            self.input.navigate_upgrade = 0;
            self.input.confirm_upgrade = false;
            self.input.choose_upgrade = None;
        }
        events
    }

    /// Drop the current run. Shards collected in it were never merged and
    /// are lost.
    pub fn quit_to_menu(&mut self) {
        if let Some(run) = self.run.take()
            && run.run_active
        {
            log::info!(
                "Run abandoned at {:.1}s ({} shards lost)",
                run.time,
                run.run_shards
            );
        }
        self.accumulator = 0.0;
    }

    /// Buy a meta upgrade level; refused while a run is active
    pub fn purchase(&mut self, id: &str) -> bool {
        if self.is_active() {
            log::debug!("Purchase of {id} refused during a run");
            return false;
        }
        self.ledger.purchase(id)
    }

    /// Refund every meta level; refused while a run is active
    pub fn refund_all(&mut self) -> Option<u64> {
        if self.is_active() {
            return None;
        }
        Some(self.ledger.refund_all())
    }

    /// Wipe the meta record; refused while a run is active
    pub fn reset_meta(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        self.ledger.reset();
        true
    }

    fn finish_run(&mut self, summary: RunSummary) {
        let Some(run) = self.run.as_ref() else {
            return;
        };
        debug_assert_eq!(run.phase, GamePhase::GameOver);
        // The run's copy already carries the merged shards
        self.ledger.replace(run.meta.clone());
        self.ledger.record_run(&summary);
        if let Some(callback) = self.on_game_over.as_mut() {
            callback(&summary);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::balance::StartStats;
    use crate::persistence::{MemoryStorage, PersistPayload};
    use crate::sim::tick::damage_player;

    fn session_with_shards(shards: u64) -> Session<MemoryStorage> {
        let seeded = serde_json::to_string(&PersistPayload {
            meta: MetaSave {
                shards,
                ..Default::default()
            },
        })
        .expect("serialize");
        Session::new(Settings::default(), MemoryStorage::with_contents(seeded))
    }

    fn stored(session: &Session<MemoryStorage>) -> MetaSave {
        let raw = session.ledger().storage().contents().expect("payload");
        serde_json::from_str::<PersistPayload>(raw)
            .expect("valid payload")
            .meta
    }

    fn kill_player(session: &mut Session<MemoryStorage>) {
        let run = session.run_mut().expect("active run");
        damage_player(run, 1.0e6);
    }

    #[test]
    fn test_run_starts_with_purchased_stats() {
        let mut session = session_with_shards(100);
        assert!(session.purchase("meta_damage"));
        session.start_run(Some(3));
        let run = session.run().expect("run");
        assert_eq!(run.config.seed, 3);
        assert_eq!(run.player_stats().damage, StartStats::BASE.damage + 5.0);
    }

    #[test]
    fn test_meta_changes_refused_during_run() {
        let mut session = session_with_shards(100);
        session.start_run(None);
        assert!(!session.purchase("meta_damage"));
        assert_eq!(session.refund_all(), None);
        assert!(!session.reset_meta());
        assert_eq!(session.meta().shards, 100);

        session.quit_to_menu();
        assert!(session.purchase("meta_damage"));
    }

    #[test]
    fn test_game_over_records_run_and_fires_callback_once() {
        let mut session = session_with_shards(10);
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        session.set_on_game_over(move |summary| {
            assert_eq!(summary.shards, 7);
            seen.set(seen.get() + 1);
        });
        session.start_run(None);
        session.run_mut().expect("run").run_shards = 7;
        kill_player(&mut session);

        let events = session.tick(&TickInput::default(), SIM_DT);
        assert!(events.iter().any(|e| matches!(e, GameEvent::GameOver(_))));
        for _ in 0..5 {
            session.tick(&TickInput::default(), SIM_DT);
        }
        session.update(0.1);

        assert_eq!(calls.get(), 1);
        assert!(!session.is_active());
        let saved = stored(&session);
        assert_eq!(saved.shards, 17);
        assert_eq!(saved.stats.runs, 1);
        assert_eq!(session.meta(), &saved);
    }

    #[test]
    fn test_quitting_loses_unmerged_shards() {
        let mut session = session_with_shards(10);
        session.start_run(None);
        session.run_mut().expect("run").run_shards = 25;
        session.quit_to_menu();
        assert!(session.run().is_none());
        assert_eq!(session.meta().shards, 10);
        assert_eq!(session.meta().stats.runs, 0);
    }

    #[test]
    fn test_one_shot_pause_applies_once_per_frame() {
        let mut session = session_with_shards(0);
        session.start_run(None);
        session.input.pause = true;
        let events = session.update(0.1);
        let toggles = events
            .iter()
            .filter(|e| matches!(e, GameEvent::Paused | GameEvent::Resumed))
            .count();
        assert_eq!(toggles, 1);
        assert_eq!(session.run().expect("run").phase, GamePhase::Paused);
        assert!(!session.input.pause);
    }

    #[test]
    fn test_update_advances_in_fixed_steps() {
        let mut session = session_with_shards(0);
        assert!(session.update(0.1).is_empty());
        session.start_run(None);
        session.update(0.1);
        let time = session.run().expect("run").time;
        assert!(time > 0.0 && time <= 0.1 + 1e-4);
        session.update(f32::NAN);
        assert_eq!(session.run().expect("run").time, time);
    }
}
