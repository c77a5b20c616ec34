//! Game and event iteration tests
//!
//! Runs the binding against the stand-in library built from
//! `test/fixtures/cwstub.c`. Standard field `F<i>` writes `F<i>:<event text>`;
//! extended fields `VIS_TEAM`/`HOME_TEAM` write the roster team ids.

use chadwick::{Chadwick, ChadwickError, ColumnType, FfiSignature, FfiValue};
use std::ffi::CStr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

// Field flags are globals of the one loaded library.
static FLAGS: Mutex<()> = Mutex::new(());

fn setup() -> Option<(MutexGuard<'static, ()>, Chadwick)> {
    let Some(lib) = option_env!("CHADWICK_STUB_LIB") else {
        eprintln!("skipping: stand-in library was not built");
        return None;
    };
    let guard = FLAGS.lock().unwrap_or_else(|e| e.into_inner());
    let cw = Chadwick::new(lib).unwrap();
    assert!(cw.set_fields(&["F0"]).is_empty());
    Some((guard, cw))
}

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn values(records: &[chadwick::EventRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.values().map(str::to_string).collect::<Vec<_>>())
        .collect()
}

const TWO_GAMES: &str = "id,ANA201804020
info,visteam,CLE
info,hometeam,ANA
play,S8
play,K
id,ANA201804030
info,visteam,CLE
play,W
";

// ============================================================================
// Games
// ============================================================================

#[test]
fn test_games_in_one_file() {
    let Some((_guard, cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "2018ANA.EVA", TWO_GAMES);

    let mut games = cw.games(&path).unwrap();
    let first = games.next().unwrap();
    assert_eq!(first.id(), "ANA201804020");
    assert_eq!(first.version(), "2");
    assert_eq!(first.info("visteam").unwrap().as_deref(), Some("CLE"));
    assert_eq!(first.info("hometeam").unwrap().as_deref(), Some("ANA"));
    assert_eq!(first.info("umphome").unwrap(), None);

    let second = games.next().unwrap();
    assert_eq!(second.id(), "ANA201804030");
    assert_eq!(second.info("hometeam").unwrap(), None);

    assert!(games.next().is_none());
    assert!(games.next().is_none());
    assert_eq!(games.count_read(), 2);
}

#[test]
fn test_null_game_ends_iteration() {
    let Some((_guard, cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "2018ANA.EVA",
        "id,ANA201804020\nplay,S8\nstop\nid,ANA201804030\nplay,K\n",
    );

    let mut games = cw.games(&path).unwrap();
    assert_eq!(games.next().unwrap().id(), "ANA201804020");
    // The reader stops before end of file; the second game is never read.
    assert!(games.next().is_none());
    assert!(games.next().is_none());
    assert_eq!(games.count_read(), 1);
}

#[test]
fn test_empty_file_has_no_games() {
    let Some((_guard, cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "empty.EVA", "");

    assert_eq!(cw.games(&path).unwrap().count(), 0);
}

#[test]
fn test_games_missing_file() {
    let Some((_guard, cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        cw.games(dir.path().join("missing.EVA")),
        Err(ChadwickError::Open { .. })
    ));
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn test_events_without_output_are_skipped() {
    let Some((_guard, cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "2018ANA.EVA",
        "id,ANA201804020\ncom,leadoff\nplay,S8\ncom,mound visit\ncom,again\nplay,K\n",
    );

    let game = cw.games(&path).unwrap().next().unwrap();
    let events: Vec<_> = cw.process_game(&game, None, None).unwrap().collect();
    assert_eq!(values(&events), ["F0:S8", "F0:K"]);
}

#[test]
fn test_game_iterator_advances_to_end() {
    let Some((_guard, cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "2018ANA.EVA", TWO_GAMES);

    let game = cw.games(&path).unwrap().next().unwrap();
    let mut iter = cw.game_iterator(&game).unwrap();
    let mut seen = 0;
    while iter.has_event() {
        iter.advance();
        seen += 1;
    }
    assert_eq!(seen, 2);
    iter.advance();
    assert!(!iter.has_event());
}

#[test]
fn test_field_change_applies_to_later_events() {
    let Some((_guard, cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "2018ANA.EVA", "id,ANA201804020\nplay,S8\nplay,K\n");
    cw.set_fields(&["F0", "F1"]);

    let game = cw.games(&path).unwrap().next().unwrap();
    let mut events = cw.process_game(&game, None, None).unwrap();

    let first = events.next().unwrap();
    assert_eq!(first.headers().collect::<Vec<_>>(), ["F0", "F1"]);
    assert_eq!(first.get("F1"), Some("F1:S8"));

    cw.set_fields(&["F5"]);
    assert_eq!(events.headers(), ["F5"]);

    let second = events.next().unwrap();
    assert_eq!(second.headers().collect::<Vec<_>>(), ["F5"]);
    assert_eq!(second.get("F5"), Some("F5:K"));
    assert_eq!(second.get("F0"), None);
    assert!(events.next().is_none());
}

#[test]
fn test_file_events_span_games() {
    let Some((_guard, cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "2018ANA.EVA", TWO_GAMES);

    let mut events = cw.events(&path).unwrap();
    let records: Vec<_> = events.by_ref().map(Result::unwrap).collect();
    assert_eq!(values(&records), ["F0:S8", "F0:K", "F0:W"]);

    assert!(events.next().is_none());
    assert!(events.next().is_none());
}

#[test]
fn test_game_to_frame() {
    let Some((_guard, cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "2018ANA.EVA", TWO_GAMES);
    cw.set_fields(&["F0", "F1"]);

    let game = cw.games(&path).unwrap().next().unwrap();
    let frame = cw.game_to_frame(&game, None).unwrap();
    assert_eq!(frame.shape(), (2, 2));
    assert_eq!(frame.column_names(), ["F0", "F1"]);
    assert_eq!(frame.column("F1").unwrap().column_type(), ColumnType::Str);
    assert_eq!(frame.row(1).unwrap().get("F0").unwrap().as_str(), Some("F0:K"));
}

// ============================================================================
// Rosters
// ============================================================================

#[test]
fn test_missing_rosters_become_empty() {
    let Some((_guard, cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "2018ANA.EVA", TWO_GAMES);
    cw.set_fields(&["VIS_TEAM", "HOME_TEAM"]);

    let game = cw.games(&path).unwrap().next().unwrap();
    let event = cw.process_game(&game, None, None).unwrap().next().unwrap();
    // The library sees a zeroed roster, not a null pointer
    assert_eq!(event.get("VIS_TEAM"), Some(""));
    assert_eq!(event.get("HOME_TEAM"), Some(""));
}

#[test]
fn test_read_roster_and_process() {
    let Some((_guard, cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();
    let events = write(dir.path(), "2018ANA.EVA", TWO_GAMES);
    let roster_file = write(
        dir.path(),
        "CLE2018.ROS",
        "lindf001,Lindor,Francisco,B,R,CLE,SS\nkipnj001,Kipnis,Jason,L,R,CLE,2B\n",
    );
    cw.set_fields(&["VIS_TEAM", "HOME_TEAM"]);

    let mut visitor = cw.read_roster(&roster_file, "CLE", 2018).unwrap();
    assert_eq!(visitor.team_id(), "CLE");
    assert_eq!(visitor.year(), 2018);
    assert!(visitor.has_players());

    let game = cw.games(&events).unwrap().next().unwrap();
    let records: Vec<_> = cw
        .process_game(&game, Some(&mut visitor), None)
        .unwrap()
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("VIS_TEAM"), Some("CLE"));
    assert_eq!(records[0].get("HOME_TEAM"), Some(""));
    drop(visitor);
}

#[test]
fn test_read_roster_empty_file() {
    let Some((_guard, cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();
    let roster_file = write(dir.path(), "ANA2018.ROS", "");

    match cw.read_roster(&roster_file, "ANA", 2018) {
        Err(ChadwickError::Roster { team_id, year, .. }) => {
            assert_eq!(team_id, "ANA");
            assert_eq!(year, 2018);
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("read a roster from an empty file"),
    }
}

// ============================================================================
// Runtime-declared functions
// ============================================================================

#[test]
fn test_registered_function_call() {
    let Some((_guard, mut cw)) = setup() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "2018ANA.EVA", TWO_GAMES);

    let sig = FfiSignature::parse("char *cw_game_info_lookup(CWGame *game, char *label);").unwrap();
    cw.register_function(sig).unwrap();
    assert_eq!(cw.registered_functions().len(), 1);

    let game = cw.games(&path).unwrap().next().unwrap();
    let result = unsafe {
        cw.call(
            "cw_game_info_lookup",
            &[
                FfiValue::Pointer(game.as_ptr() as usize),
                FfiValue::string("visteam").unwrap(),
            ],
        )
    }
    .unwrap();

    let ptr = result.as_ptr().unwrap() as *const std::os::raw::c_char;
    assert!(!ptr.is_null());
    assert_eq!(unsafe { CStr::from_ptr(ptr) }.to_str().unwrap(), "CLE");
}
