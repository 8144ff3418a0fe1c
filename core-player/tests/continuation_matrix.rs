//! End-of-track continuation across the play modes, driven through the
//! public crate API the way the engine drives it.

use core_player::models::Track;
use core_player::playlist::PlaylistStore;
use core_player::settings::{PlayMode, PlayerSettings};
use core_player::{next_action, ContinuationAction, RemoveOutcome};

fn track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        title: id.to_string(),
        thumbnail_url: String::new(),
        duration_secs: 0,
        active_part_id: None,
        audio_url: Some(format!("https://cdn.example.com/{}.m4a", id)),
        audio_bitrate_kbps: Some(128),
        parts: None,
    }
}

fn playlist_of(n: usize, cursor: usize) -> PlaylistStore {
    let mut store = PlaylistStore::new();
    for i in 0..n {
        store.append_placeholder(track(&format!("t{}", i)));
    }
    store.set_cursor(cursor);
    store
}

#[test]
fn sequence_walks_to_the_end_and_stops() {
    let store = playlist_of(3, 0);
    let mut cursor = store.cursor();

    let mut steps = Vec::new();
    loop {
        match next_action(PlayMode::Sequence, store.len(), cursor, None) {
            ContinuationAction::Advance(next) => {
                steps.push(next);
                cursor = Some(next);
            }
            ContinuationAction::Stop => break,
            other => panic!("unexpected action {:?}", other),
        }
    }
    assert_eq!(steps, vec![1, 2]);
}

#[test]
fn loop_wraps_from_the_tail() {
    let store = playlist_of(2, 1);
    assert_eq!(
        next_action(PlayMode::Loop, store.len(), store.cursor(), None),
        ContinuationAction::WrapToStart
    );
}

#[test]
fn single_replays_even_mid_collection() {
    // Single mode ignores remaining parts.
    assert_eq!(
        next_action(PlayMode::Single, 1, Some(0), Some((0, 4))),
        ContinuationAction::Restart
    );
}

#[test]
fn auto_fetches_only_at_the_playlist_edge() {
    assert_eq!(
        next_action(PlayMode::Auto, 3, Some(1), None),
        ContinuationAction::Advance(2)
    );
    assert_eq!(
        next_action(PlayMode::Auto, 3, Some(2), None),
        ContinuationAction::FetchFresh
    );
}

#[test]
fn part_advance_wins_over_every_mode_but_single() {
    for mode in [PlayMode::Sequence, PlayMode::Loop, PlayMode::Auto] {
        assert_eq!(
            next_action(mode, 2, Some(0), Some((1, 3))),
            ContinuationAction::AdvancePart(2),
            "mode {:?}",
            mode
        );
    }
}

#[test]
fn removal_keeps_the_continuation_cursor_coherent() {
    let mut store = playlist_of(3, 2);

    // Removing behind the cursor shifts it; the same entry stays current.
    assert_eq!(store.remove(0), RemoveOutcome::CursorShifted { index: 1 });
    assert_eq!(store.current().map(|t| t.id.as_str()), Some("t2"));

    // Continuation still sees a valid tail position.
    assert_eq!(
        next_action(PlayMode::Sequence, store.len(), store.cursor(), None),
        ContinuationAction::Stop
    );
}

#[test]
fn stale_cursor_always_stops() {
    for mode in PlayMode::CYCLE {
        assert_eq!(next_action(mode, 2, Some(5), None), ContinuationAction::Stop);
        assert_eq!(next_action(mode, 0, None, None), ContinuationAction::Stop);
    }
}

#[test]
fn mode_cycle_visits_all_four_modes() {
    let mut settings = PlayerSettings::default();
    let start = settings.play_mode;
    let mut seen = vec![start];
    for _ in 0..3 {
        settings.cycle_play_mode();
        seen.push(settings.play_mode);
    }
    seen.sort_by_key(|m| m.as_str().to_string());
    seen.dedup();
    assert_eq!(seen.len(), 4);

    settings.cycle_play_mode();
    assert_eq!(settings.play_mode, start);
}
