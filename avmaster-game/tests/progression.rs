use avmaster_game::{
    CableType, CatalogError, CompletionStatus, ConnectionCategory, ConnectionOutcome,
    ConnectorRef, ConnectorType, GameSession, GameState, InstanceId, LevelCatalog,
    MemoryProgressStore, Position, ProgressStore, RuleMatch, RulesConfig, SessionError,
    SessionEvent, catalog, check_completion, complete_level, evaluate, recompute,
};

type Session = GameSession<'static, MemoryProgressStore>;

fn new_session() -> Session {
    GameSession::new(catalog(), RulesConfig::default(), MemoryProgressStore::new())
}

fn place(session: &mut Session, slot: usize, x: f32) -> InstanceId {
    session
        .place_equipment(slot, Position::new(x, 200.0))
        .unwrap()
        .instance
}

fn connect(
    session: &mut Session,
    from: (InstanceId, usize),
    to: (InstanceId, usize),
    cable: CableType,
) -> ConnectionOutcome {
    session
        .attempt_connection(
            ConnectorRef::new(from.0, from.1),
            ConnectorRef::new(to.0, to.1),
            cable,
        )
        .unwrap()
}

/// Wire audio-1 by hand: four power runs, three XLR runs, two wireless links.
fn wire_audio_one(session: &mut Session) -> Vec<ConnectionOutcome> {
    let mic_a = place(session, 0, 50.0);
    let mic_b = place(session, 0, 90.0);
    let receiver = place(session, 1, 150.0);
    let console = place(session, 2, 250.0);
    let speaker_l = place(session, 3, 350.0);
    let speaker_r = place(session, 3, 450.0);
    let distro = place(session, 4, 550.0);

    let plan = [
        ((distro, 0), (receiver, 0), CableType::PowerCable),
        ((distro, 1), (console, 0), CableType::PowerCable),
        ((distro, 2), (speaker_l, 0), CableType::PowerCable),
        ((distro, 3), (speaker_r, 0), CableType::PowerCable),
        ((receiver, 2), (console, 1), CableType::XlrCable),
        ((console, 2), (speaker_l, 1), CableType::XlrCable),
        ((console, 2), (speaker_r, 1), CableType::XlrCable),
        ((mic_a, 0), (receiver, 1), CableType::WirelessCable),
        ((mic_b, 0), (receiver, 1), CableType::WirelessCable),
    ];
    plan.into_iter()
        .map(|(from, to, cable)| connect(session, from, to, cable))
        .collect()
}

#[test]
fn audio_one_completes_and_unlocks_audio_two() {
    let mut session = new_session();
    session.select_level("audio-1").unwrap();
    let outcomes = wire_audio_one(&mut session);

    assert!(outcomes.iter().all(ConnectionOutcome::is_connected));
    let completions: Vec<_> = outcomes.iter().filter_map(|o| o.completion()).collect();
    assert_eq!(completions.len(), 1);
    assert!(outcomes.last().unwrap().completion().is_some());

    let progress = session.progress().unwrap();
    assert_eq!(progress.get(ConnectionCategory::Power).current, 4);
    assert_eq!(progress.get(ConnectionCategory::Xlr).current, 3);
    assert_eq!(progress.get(ConnectionCategory::Wireless).current, 2);
    assert_eq!(check_completion(progress), CompletionStatus::Complete);

    let state = session.state();
    assert_eq!(state.score, 100);
    assert!(state.is_completed("audio-1"));
    assert!(state.is_unlocked("audio-2"));

    let events = session.drain_events();
    assert!(
        events
            .iter()
            .any(|event| matches!(event, SessionEvent::LevelCompleted(report) if report.level_id == "audio-1"))
    );

    let next = session.next_level().unwrap().unwrap();
    assert_eq!(next.level().id, "audio-2");
}

#[test]
fn completion_fires_once_per_attempt() {
    let mut session = new_session();
    session.load_level("audio-1").unwrap();
    wire_audio_one(&mut session);
    let distro = session.attempt().unwrap().placed()[6].id;
    let console = session.attempt().unwrap().placed()[3].id;
    let extra = connect(&mut session, (distro, 0), (console, 0), CableType::PowerCable);
    assert!(extra.is_connected());
    assert!(extra.completion().is_none());
    assert_eq!(session.state().score, 100);
}

#[test]
fn replaying_a_level_rescores_without_duplicates() {
    let mut session = new_session();
    session.load_level("audio-1").unwrap();
    wire_audio_one(&mut session);
    session.restart().unwrap();
    wire_audio_one(&mut session);

    let state = session.state();
    assert_eq!(state.score, 200);
    assert_eq!(state.completed_levels, vec!["audio-1".to_string()]);
    assert_eq!(
        state.unlocked_levels,
        vec!["audio-1".to_string(), "audio-2".to_string()]
    );
}

#[test]
fn power_out_to_power_out_never_matches() {
    for level in catalog().levels() {
        for cable in CableType::ALL {
            assert_eq!(
                evaluate(level, ConnectorType::PowerOut, ConnectorType::PowerOut, cable),
                RuleMatch::Unmatched,
                "level {} cable {cable}",
                level.id
            );
        }
    }
}

#[test]
fn unknown_level_leaves_nothing_loaded() {
    let mut session = new_session();
    let err = session.load_level("not-a-level").unwrap_err();
    assert!(matches!(
        err,
        SessionError::Catalog(CatalogError::UnknownLevel { ref id }) if id == "not-a-level"
    ));
    assert!(session.attempt().is_none());
    assert!(session.current_level().is_none());
}

#[test]
fn fresh_player_has_only_first_level() {
    let session = new_session();
    assert_eq!(session.state().unlocked_levels, vec!["audio-1".to_string()]);
    assert_eq!(session.state().score, 0);
    assert_eq!(session.state().lives, 3);
}

#[test]
fn completing_the_last_level_unlocks_nothing() {
    let config = RulesConfig::default();
    let store = MemoryProgressStore::new();
    let mut state = GameState::fresh(catalog(), &config);
    let report = complete_level(&mut state, "set-3", catalog(), &config, &store);
    assert!(report.next_level.is_none());
    assert_eq!(
        state.unlocked_levels,
        vec!["audio-1".to_string(), "set-3".to_string()]
    );
    assert!(state.is_completed("set-3"));
}

#[test]
fn progress_is_monotonic_and_recompute_is_pure() {
    let mut session = new_session();
    session.load_level("audio-1").unwrap();
    let outcomes = wire_audio_one(&mut session);
    assert!(!outcomes.is_empty());

    let attempt = session.attempt().unwrap();
    let level = attempt.level();
    let connections = attempt.connections();
    let mut last_total = 0;
    let mut seen_complete = false;
    for end in 0..=connections.len() {
        let progress = recompute(level, &connections[..end]);
        assert_eq!(progress, recompute(level, &connections[..end]));
        let total: u32 = progress.iter().map(|(_, entry)| entry.current).sum();
        assert!(total >= last_total);
        last_total = total;
        let complete = check_completion(&progress) == CompletionStatus::Complete;
        assert!(complete || !seen_complete);
        seen_complete |= complete;
    }
    assert!(seen_complete);
}

#[test]
fn progress_survives_a_new_session() {
    let store = MemoryProgressStore::new();
    {
        let mut session = GameSession::new(catalog(), RulesConfig::default(), store.clone());
        session.load_level("audio-1").unwrap();
        wire_audio_one(&mut session);
        session.tick(30);
    }
    let session = GameSession::new(catalog(), RulesConfig::default(), store);
    let state = session.state();
    assert_eq!(state.score, 100);
    assert_eq!(state.time, 0);
    assert!(state.is_unlocked("audio-2"));
}

#[test]
fn corrupt_save_falls_back_to_fresh_state() {
    let store = MemoryProgressStore::new();
    store.insert_raw("avMasterGameState", r#"{"score": "lots"}"#);
    let session = GameSession::new(catalog(), RulesConfig::default(), store);
    assert_eq!(
        session.state(),
        &GameState::fresh(catalog(), &RulesConfig::default())
    );
}

#[test]
fn failed_save_is_reported_not_raised() {
    let store = MemoryProgressStore::new();
    store.set_read_only(true);
    let mut session = GameSession::new(catalog(), RulesConfig::default(), store.clone());
    session.load_level("audio-1").unwrap();
    let outcomes = wire_audio_one(&mut session);
    let report = outcomes.last().and_then(ConnectionOutcome::completion).unwrap();
    assert!(report.persist_failure.is_some());
    assert!(session.state().is_completed("audio-1"));
    assert!(
        session
            .drain_events()
            .iter()
            .any(|event| matches!(event, SessionEvent::ProgressNotSaved(_)))
    );
    assert!(store.load("avMasterGameState").unwrap().is_none());
}

#[test]
fn custom_catalog_drives_progression() {
    let json = r##"{
        "order": ["intro", "finale"],
        "levels": [
            {"id":"intro","title":"Intro","category":"audio","difficulty":"beginner",
             "description":"d","stage":{"width_pct":100,"height_pct":100},
             "equipment":[
                {"type":"distro","name":"Distro","icon":"i","quantity":1,
                 "connectors":[{"type":"power-out","position":"right","label":"Out"}]},
                {"type":"amp","name":"Amp","icon":"i","quantity":1,"requires_power":true,
                 "connectors":[{"type":"power-in","position":"left","label":"In"}]}],
             "connections":[{"type":"power-cable","name":"Power","icon":"i","quantity":1,"color":"#f00"}],
             "rules":[{"from":"power-out","to":"power-in","cable":"power-cable","animation":"power-glow"}]},
            {"id":"finale","title":"Finale","category":"set","difficulty":"advanced",
             "description":"d","stage":{"width_pct":100,"height_pct":100}}
        ]
    }"##;
    let catalog: &'static LevelCatalog = Box::leak(Box::new(LevelCatalog::from_json(json).unwrap()));
    let mut session = GameSession::new(catalog, RulesConfig::default(), MemoryProgressStore::new());
    assert_eq!(session.state().unlocked_levels, vec!["intro".to_string()]);
    session.select_level("intro").unwrap();
    let distro = session.place_equipment(0, Position::default()).unwrap().instance;
    let amp = session.place_equipment(1, Position::default()).unwrap().instance;
    let outcome = session
        .attempt_connection(
            ConnectorRef::new(distro, 0),
            ConnectorRef::new(amp, 0),
            CableType::PowerCable,
        )
        .unwrap();
    let report = outcome.completion().unwrap();
    assert_eq!(report.next_level.as_deref(), Some("finale"));
    assert!(session.state().is_unlocked("finale"));
}
