//! Integration tests for KnightGuard: end-to-end flows through the engine,
//! the simulated host and saved-player storage.
//!
//! Each storage test creates its own in-memory SQLite database.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::{Value, json};
    use sqlx::SqlitePool;
    use tokio::sync::mpsc;

    use crate::config::KnightConfig;
    use crate::db::pool::{create_pool, run_migrations};
    use crate::db::queries::saved_entries;
    use crate::engine::bus::{BusEvent, ChannelNoticeKind, NoticeLevel};
    use crate::engine::commands::{Command, CommandError};
    use crate::engine::knight_engine::KnightEngine;
    use crate::engine::presence::ClassKey;
    use crate::engine::saved::{BadgePosition, SavedSet};
    use crate::engine::view_model::{SAVED_LABEL, UNKNOWN_ZONE};
    use crate::host::sim::{MemberDialect, SimulatedServer};
    use crate::host::{HostInput, flush_saved, pump_once, run};

    // ── Helpers ──────────────────────────────────────────────────

    const CHANNEL: &str = "KnightGuard";

    async fn setup_db() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn config(max_visible: usize) -> KnightConfig {
        let mut config = KnightConfig::default();
        config.channel.name = CHANNEL.into();
        config.view.max_visible = max_visible;
        config
    }

    fn engine_with(sim: SimulatedServer, max_visible: usize) -> KnightEngine<SimulatedServer> {
        KnightEngine::new(sim, &config(max_visible), SavedSet::new())
    }

    fn pump(engine: &mut KnightEngine<SimulatedServer>, ticks: usize) {
        for _ in 0..ticks {
            pump_once(engine);
        }
    }

    fn visible_names(engine: &KnightEngine<SimulatedServer>) -> Vec<String> {
        engine
            .rows()
            .iter()
            .flatten()
            .map(|row| row.name.clone())
            .collect()
    }

    // ── Join flow ────────────────────────────────────────────────

    #[test]
    fn test_join_flow_requests_members_after_delay() {
        let sim = SimulatedServer::demo("Realm1", CHANNEL).with_join_delay(5);
        let mut engine = engine_with(sim, 12);

        engine.execute(Command::Join).unwrap();

        // Registered on the sixth host step
        pump(&mut engine, 5);
        assert!(!engine.channel().is_joined());
        pump(&mut engine, 1);
        assert!(engine.channel().is_joined());
        assert!(engine.is_window_shown());
        assert_eq!(engine.bus().channel_color(CHANNEL), Some("ff8040"));
        assert!(engine.bus().is_shown_in_default_output(CHANNEL));

        // 60 quiet ticks, then the member request goes out
        pump(&mut engine, 60);
        assert!(engine.bus().list_queries.is_empty());
        pump(&mut engine, 1);
        assert_eq!(engine.bus().list_queries, vec![CHANNEL]);
        assert!(engine.pending_request().is_some());
        assert!(engine.status_line().starts_with("Requesting members"));

        let notices = engine.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Info);
        assert_eq!(notices[0].text, "Requesting members of KnightGuard...");

        // The answer lands on the next step
        pump(&mut engine, 1);
        assert!(engine.pending_request().is_none());
        assert_eq!(
            engine.snapshot().members,
            vec!["Aldric", "Brenna", "Cedric", "Dagny", "Elowen", "Fenwick"]
        );
        assert_eq!(engine.pollers_active(), [false, false, false]);
    }

    #[test]
    fn test_join_from_cold_engine_decorates_rows() {
        let sim = SimulatedServer::demo("Realm1", CHANNEL).with_join_delay(5);
        let mut engine = engine_with(sim, 12);
        assert!(!engine.is_window_shown());

        engine.execute(Command::Join).unwrap();
        pump(&mut engine, 6);
        assert!(engine.is_window_shown());
        assert!(engine.presence().class_count() > 0);

        pump(&mut engine, 62);
        let rows: Vec<_> = engine.rows().iter().flatten().cloned().collect();
        assert_eq!(rows[0].name, "Aldric");
        assert_eq!(rows[0].zone_label, "Ironforge");
        assert_eq!(rows[0].class_color, ClassKey::Warrior.color());
    }

    #[test]
    fn test_channel_notice_updates_registry_while_shown() {
        let mut sim = SimulatedServer::demo("Realm1", CHANNEL);
        sim.register_channel(CHANNEL);
        let mut engine = engine_with(sim, 12);
        engine.open_view();
        pump(&mut engine, 1);
        assert_eq!(visible_names(&engine).len(), 6);

        engine.bus_mut().push_event(BusEvent::ChannelNotice {
            channel: CHANNEL.into(),
            kind: ChannelNoticeKind::Joined,
        });
        pump(&mut engine, 1);
        assert!(engine.channel().is_joined());

        engine.bus_mut().push_event(BusEvent::ChannelNotice {
            channel: CHANNEL.into(),
            kind: ChannelNoticeKind::Left,
        });
        pump(&mut engine, 1);
        assert!(!engine.channel().is_joined());
        assert_eq!(engine.rows().len(), 12);
        assert_eq!(visible_names(&engine).len(), 6);
        assert!(engine.status_line().starts_with("Showing 6 of 6"));
    }

    #[test]
    fn test_join_exhaustion_is_user_visible() {
        let sim = SimulatedServer::new("Realm1").with_join_delay(1_000);
        let mut engine = engine_with(sim, 12);
        engine.join_channel();

        pump(&mut engine, 60);
        assert!(engine.drain_notices().is_empty());

        pump(&mut engine, 1);
        let notices = engine.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert_eq!(notices[0].text, "Could not join KnightGuard");
        assert_eq!(engine.pollers_active(), [false, false, false]);

        // No member request follows a failed join
        pump(&mut engine, 200);
        assert!(engine.bus().list_queries.is_empty());
    }

    #[test]
    fn test_color_setup_gives_up_silently() {
        let sim = SimulatedServer::new("Realm1");
        let mut engine = engine_with(sim, 12);
        engine.login();

        pump(&mut engine, 20);
        assert_eq!(engine.pollers_active(), [true, false, false]);
        pump(&mut engine, 1);
        assert_eq!(engine.pollers_active(), [false, false, false]);
        assert!(engine.drain_notices().is_empty());
        assert_eq!(engine.bus().channel_color(CHANNEL), None);
    }

    #[test]
    fn test_color_setup_applies_to_channel_from_previous_session() {
        let mut sim = SimulatedServer::new("Realm1");
        sim.register_channel(CHANNEL);
        let mut engine = engine_with(sim, 12);
        engine.login();

        pump(&mut engine, 1);
        assert_eq!(engine.bus().channel_color(CHANNEL), Some("ff8040"));
        assert!(engine.channel().is_joined());
        // Color setup never opens the window
        assert!(!engine.is_window_shown());
    }

    // ── Open view and correlation ────────────────────────────────

    #[test]
    fn test_open_view_correlates_despite_foreign_traffic() {
        let mut sim = SimulatedServer::demo("Realm1", CHANNEL);
        sim.push_event(BusEvent::ChannelList {
            channel: "OtherChannel".into(),
            payload: "Xavier, Yara".into(),
        });
        let mut engine = engine_with(sim, 12);

        engine.open_view();
        assert!(engine.is_window_shown());
        assert!(engine.snapshot().members.is_empty());

        pump(&mut engine, 1);
        assert_eq!(engine.snapshot().members.len(), 6);
        assert!(!engine.snapshot().members.contains(&"Xavier".to_string()));
    }

    #[test]
    fn test_all_dialects_produce_same_rows() {
        for dialect in [
            MemberDialect::MembersOf,
            MemberDialect::Bracketed,
            MemberDialect::Bare,
        ] {
            let sim = SimulatedServer::demo("Realm1", CHANNEL).with_dialect(dialect);
            let mut engine = engine_with(sim, 12);
            engine.open_view();
            pump(&mut engine, 1);
            assert_eq!(
                visible_names(&engine),
                vec!["Aldric", "Brenna", "Cedric", "Dagny", "Elowen", "Fenwick"],
                "dialect {dialect:?}"
            );
        }
    }

    #[test]
    fn test_rows_decorated_from_presence() {
        let sim = SimulatedServer::demo("Realm1", CHANNEL);
        let mut engine = engine_with(sim, 12);
        engine.execute(Command::Add("Brenna".into())).unwrap();
        engine.open_view();
        pump(&mut engine, 1);

        let rows: Vec<_> = engine.rows().iter().flatten().cloned().collect();
        let aldric = &rows[0];
        assert_eq!(aldric.zone_label, "Ironforge");
        assert_eq!(aldric.class_color, ClassKey::Warrior.color());

        let brenna = &rows[1];
        assert!(brenna.saved);
        assert_eq!(brenna.save_label(), SAVED_LABEL);
        assert_eq!(brenna.zone_label, "Stormwind City");

        // Offline roster member: class known, zone not taken
        let cedric = &rows[2];
        assert_eq!(cedric.class_color, ClassKey::Mage.color());
        assert_eq!(cedric.zone_label, UNKNOWN_ZONE);

        // Friend reported with "Unknown" values
        let dagny = &rows[3];
        assert_eq!(dagny.zone_label, UNKNOWN_ZONE);
        assert!(rows.iter().all(|r| r.online));
    }

    #[test]
    fn test_scrolling_through_engine() {
        let sim = SimulatedServer::demo("Realm1", CHANNEL);
        let mut engine = engine_with(sim, 4);
        engine.open_view();
        pump(&mut engine, 1);

        assert_eq!(engine.rows().len(), 4);
        for _ in 0..5 {
            engine.scroll_down();
        }
        assert_eq!(engine.scroll().offset, 2);
        assert_eq!(visible_names(&engine), vec!["Cedric", "Dagny", "Elowen", "Fenwick"]);

        engine.scroll_up();
        assert_eq!(engine.scroll().offset, 1);

        // Re-request clears the snapshot and the offset clamps back to 0
        engine.request_members();
        assert_eq!(engine.scroll().offset, 0);
        assert!(visible_names(&engine).is_empty());
        assert_eq!(engine.rows().len(), 4);
    }

    #[test]
    fn test_member_leaving_shows_on_refresh() {
        let sim = SimulatedServer::demo("Realm1", CHANNEL);
        let mut engine = engine_with(sim, 12);
        engine.open_view();
        pump(&mut engine, 1);
        assert_eq!(engine.snapshot().members.len(), 6);

        engine.bus_mut().remove_channel_member(CHANNEL, "Aldric");
        engine.execute(Command::Refresh).unwrap();
        pump(&mut engine, 1);
        assert_eq!(engine.snapshot().members.len(), 5);
        assert!(!visible_names(&engine).contains(&"Aldric".to_string()));
    }

    #[test]
    fn test_toggle_window_hides_then_reopens_with_new_request() {
        let sim = SimulatedServer::demo("Realm1", CHANNEL);
        let mut engine = engine_with(sim, 12);

        let lines = engine.execute(Command::ToggleWindow).unwrap();
        assert!(engine.is_window_shown());
        assert!(lines.last().unwrap().starts_with("Requesting members"));

        let lines = engine.execute(Command::ToggleWindow).unwrap();
        assert_eq!(lines, vec!["Window hidden"]);
        assert!(!engine.is_window_shown());

        engine.execute(Command::ToggleWindow).unwrap();
        assert_eq!(engine.bus().list_queries.len(), 2);
    }

    // ── Commands ─────────────────────────────────────────────────

    #[test]
    fn test_add_remove_and_list_saved() {
        let mut engine = engine_with(SimulatedServer::new("Realm1"), 12);

        assert_eq!(
            engine.execute(Command::Add(" *Zed ".into())).unwrap(),
            vec!["Saved Zed"]
        );
        engine.execute(Command::Add("Amy".into())).unwrap();
        assert_eq!(
            engine.execute(Command::Add("Amy".into())).unwrap(),
            vec!["Amy is already saved"]
        );

        let lines = engine.execute(Command::ListSaved).unwrap();
        assert_eq!(lines, vec!["Saved players (2):", "  Amy", "  Zed"]);

        assert_eq!(
            engine.execute(Command::Remove("Zed".into())).unwrap(),
            vec!["Removed Zed"]
        );
        assert_eq!(
            engine.execute(Command::Remove("Zed".into())).unwrap(),
            vec!["Zed was not saved"]
        );
        assert_eq!(engine.list_saved(), vec!["Amy"]);
    }

    #[test]
    fn test_toggle_command_pair_is_identity() {
        let mut engine = engine_with(SimulatedServer::new("Realm1"), 12);
        engine.execute(Command::Toggle("Kim".into())).unwrap();
        engine.execute(Command::Toggle("Kim".into())).unwrap();
        assert!(engine.list_saved().is_empty());
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut engine = engine_with(SimulatedServer::new("Realm1"), 12);
        assert_eq!(
            engine.execute(Command::Add("  + ".into())),
            Err(CommandError::EmptyName)
        );
        assert!(matches!(
            engine.execute(Command::Add("__kgBtnPoint".into())),
            Err(CommandError::ReservedName(_))
        ));
    }

    #[test]
    fn test_debug_dump_lists_diagnostics() {
        let sim = SimulatedServer::demo("Realm1", CHANNEL);
        let mut engine = engine_with(sim, 12);
        engine.open_view();

        let lines = engine.execute(Command::DebugDump).unwrap();
        assert!(lines[0].starts_with("channel KnightGuard: registry index None"));
        assert!(lines.iter().any(|l| l.starts_with("pending request: KnightGuard")));
        assert!(lines.iter().any(|l| l == "friends: 2 (1 connected)"));
        assert!(lines.iter().any(|l| l == "roster: 3 (2 online)"));
        assert!(lines.iter().any(|l| l == "  Aldric: warrior / Ironforge"));
        assert!(lines.iter().any(|l| l.starts_with("poller join-setup")));
    }

    // ── Persistence ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_saved_players_survive_restart_with_badge_keys() {
        let pool = setup_db().await;
        let seeded: BTreeMap<String, Value> = serde_json::from_value(json!({
            "Brenna": true,
            "__kgBtnPoint": "TOPLEFT",
            "__kgBtnRelPoint": "TOPLEFT",
            "__kgBtnX": 10.0,
            "__kgBtnY": -20.0,
        }))
        .unwrap();
        saved_entries::replace_all(&pool, &seeded).await.unwrap();

        let saved = SavedSet::from_persisted(saved_entries::load_all(&pool).await.unwrap());
        let mut engine =
            KnightEngine::new(SimulatedServer::new("Realm1"), &config(12), saved);
        assert_eq!(engine.list_saved(), vec!["Brenna"]);

        engine.execute(Command::Add("Cedric".into())).unwrap();
        flush_saved(&mut engine, Some(&pool)).await;

        let reloaded = saved_entries::load_all(&pool).await.unwrap();
        assert_eq!(reloaded.len(), 6);
        assert_eq!(reloaded["Cedric"], Value::Bool(true));
        assert_eq!(reloaded["__kgBtnX"], json!(10.0));

        let restored = SavedSet::from_persisted(reloaded);
        let names: Vec<&str> = restored.names().collect();
        assert_eq!(names, vec!["Brenna", "Cedric"]);
    }

    #[tokio::test]
    async fn test_badge_position_persists_apart_from_players() {
        let pool = setup_db().await;
        let mut engine = engine_with(SimulatedServer::new("Realm1"), 12);
        engine.execute(Command::Add("Brenna".into())).unwrap();
        engine.set_badge_position(BadgePosition {
            point: Some("TOPRIGHT".into()),
            rel_point: Some("TOPRIGHT".into()),
            x: Some(-12.0),
            y: Some(30.5),
        });
        flush_saved(&mut engine, Some(&pool)).await;

        let reloaded = saved_entries::load_all(&pool).await.unwrap();
        assert_eq!(reloaded["__kgBtnPoint"], json!("TOPRIGHT"));
        assert_eq!(reloaded["__kgBtnY"], json!(30.5));

        let restored = SavedSet::from_persisted(reloaded);
        assert_eq!(restored.badge().x, Some(-12.0));
        let names: Vec<&str> = restored.names().collect();
        assert_eq!(names, vec!["Brenna"]);
        assert_eq!(engine.list_saved(), vec!["Brenna"]);
    }

    #[tokio::test]
    async fn test_flush_without_changes_writes_nothing() {
        let pool = setup_db().await;
        let mut engine = engine_with(SimulatedServer::new("Realm1"), 12);
        engine.execute(Command::ListSaved).unwrap();
        flush_saved(&mut engine, Some(&pool)).await;
        assert!(saved_entries::load_all(&pool).await.unwrap().is_empty());
    }

    // ── Host loop ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_host_loop_runs_commands_and_persists() {
        let pool = setup_db().await;
        let engine = engine_with(SimulatedServer::demo("Realm1", CHANNEL), 12);

        let (tx, rx) = mpsc::channel(8);
        tx.send(HostInput::Command(Command::Add("Zed".into())))
            .await
            .unwrap();
        tx.send(HostInput::Command(Command::ListSaved))
            .await
            .unwrap();
        tx.send(HostInput::Quit).await.unwrap();

        let mut out: Vec<String> = Vec::new();
        let engine = run(engine, Some(pool.clone()), 1_000, rx, |line| {
            out.push(line.to_string())
        })
        .await;

        assert!(out.contains(&"Saved players (1):".to_string()));
        assert!(out.contains(&"  Zed".to_string()));
        assert_eq!(engine.list_saved(), vec!["Zed"]);

        let stored = saved_entries::load_all(&pool).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored.contains_key("Zed"));
    }

    #[tokio::test]
    async fn test_host_loop_stops_when_input_closes() {
        let engine = engine_with(SimulatedServer::new("Realm1"), 12);
        let (tx, rx) = mpsc::channel::<HostInput>(1);
        drop(tx);
        let engine = run(engine, None, 50, rx, |_| {}).await;
        assert!(engine.list_saved().is_empty());
    }
}
