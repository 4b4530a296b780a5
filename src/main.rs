//! Void Survivor headless runner
//!
//! Plays one scripted run at a fixed 60 Hz step against the meta record on
//! disk, then logs the summary and lifetime statistics.
//!
//! Usage: `void-survivor [settings.json] [snapshot-out.json]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::Path;

    use glam::Vec2;
    use void_survivor::consts::SIM_DT;
    use void_survivor::meta::meta_stats_lines;
    use void_survivor::persistence::FileStorage;
    use void_survivor::persistence::snapshot::{build_snapshot, now_ms, snapshot_to_json};
    use void_survivor::sim::{Body, GamePhase, GameState, TickInput};
    use void_survivor::{Session, Settings};

    /// Mobs closer than this push the bot away
    const THREAT_RADIUS: f32 = 160.0;
    /// Axis dead zone for turning a direction into held keys
    const DEAD_ZONE: f32 = 0.3;

    /// Flee the local mob crowd, otherwise drift back toward the center
    fn bot_input(state: &GameState) -> TickInput {
        let mut input = TickInput::default();
        match state.phase {
            GamePhase::UpgradeChoice if state.offered_upgrades.is_empty() => {
                input.resume = true;
                return input;
            }
            GamePhase::UpgradeChoice => {
                input.choose_upgrade = Some(0);
                return input;
            }
            GamePhase::Paused => {
                input.resume = true;
                return input;
            }
            _ => {}
        }

        let pos = state.player().pos;
        let threat_sq = THREAT_RADIUS * THREAT_RADIUS;
        let away: Vec2 = state
            .entities
            .values()
            .filter(|e| matches!(e.body, Body::Mob(_)))
            .filter(|e| void_survivor::dist_sq(e.pos, pos) < threat_sq)
            .map(|e| void_survivor::direction_to(e.pos, pos))
            .sum();
        let dir = if away != Vec2::ZERO {
            away.normalize_or_zero()
        } else {
            void_survivor::direction_to(pos, state.config.arena * 0.5)
        };

        input.left = dir.x < -DEAD_ZONE;
        input.right = dir.x > DEAD_ZONE;
        input.up = dir.y < -DEAD_ZONE;
        input.down = dir.y > DEAD_ZONE;
        input
    }

    pub fn run() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .init();

        let mut args = std::env::args().skip(1);
        let settings_path = args
            .next()
            .unwrap_or_else(|| "void_survivor_settings.json".to_string());
        let snapshot_path = args.next();

        log::info!("Void Survivor (headless) starting...");
        let settings = Settings::load(Path::new(&settings_path));
        let max_time = settings.max_run_seconds;
        let storage = FileStorage::new(&settings.save_path);
        let mut session = Session::new(settings, storage);

        session.set_on_game_over(|summary| {
            log::info!(
                "Run over: survived {:.1}s, {} kills, {} shards",
                summary.time,
                summary.kills,
                summary.shards
            );
        });

        let player_id = session.start_run(None);
        log::info!("Player spawned as entity {player_id}");

        loop {
            let Some(state) = session.run() else {
                break;
            };
            if !state.run_active {
                break;
            }
            if state.time >= max_time {
                log::info!(
                    "Time cap reached at {:.1}s (level {}, {} kills)",
                    state.time,
                    state.level,
                    state.kills
                );
                break;
            }
            let input = bot_input(state);
            session.tick(&input, SIM_DT);
        }

        if let (Some(path), Some(state)) = (snapshot_path, session.run()) {
            match snapshot_to_json(&build_snapshot(state, now_ms())) {
                Ok(json) => match std::fs::write(&path, json) {
                    Ok(()) => log::info!("Snapshot written to {path}"),
                    Err(e) => log::warn!("Failed to write snapshot: {e}"),
                },
                Err(e) => log::warn!("Failed to build snapshot: {e}"),
            }
        }
        session.quit_to_menu();

        for line in meta_stats_lines(session.meta()) {
            log::info!("{line}");
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    headless::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the embedding page on wasm32
}
