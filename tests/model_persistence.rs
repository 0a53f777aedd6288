use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use ludo_sim::ai::learning::ModelError;
use ludo_sim::{LearningAgent, StateKey};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

fn model_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(format!("{}.json", name))
}

fn populated_agent() -> LearningAgent {
    let agent = LearningAgent::new();
    agent.learn(StateKey::new([-1, -1, -1, -1], 6), 0, 1.0).unwrap();
    agent.learn(StateKey::new([-1, -1, -1, -1], 6), 2, 1.0).unwrap();
    agent.learn(StateKey::new([0, 12, -1, 51], 4), 1, 52.6).unwrap();
    agent.learn(StateKey::new([0, 12, -1, 51], 4), 1, 2.6).unwrap();
    agent.learn(StateKey::new([56, 57, 57, 57], 1), 0, 106.7).unwrap();
    agent
}

#[test]
fn repeated_updates_average_toward_the_reward() {
    let agent = LearningAgent::new();
    let key = StateKey::new([3, -1, 20, -1], 2);
    let reward = 12.0;
    agent.learn(key, 2, reward).unwrap();
    assert_eq!(agent.value(&key, 2), Some(0.5 * reward));
    agent.learn(key, 2, reward).unwrap();
    assert_eq!(agent.value(&key, 2), Some(0.75 * reward));
}

#[test]
fn round_trip_populated_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = model_path(&dir, "round_trip_populated");
    let original = populated_agent();
    original.save(&path).unwrap();

    let restored = LearningAgent::new();
    restored.load(&path).unwrap();
    assert_eq!(restored.snapshot(), original.snapshot());
    assert_eq!(restored.state_count(), 3);
    assert_eq!(restored.entry_count(), 4);
}

#[test]
fn round_trip_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = model_path(&dir, "round_trip_empty");
    LearningAgent::new().save(&path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "{}");

    let restored = populated_agent();
    restored.load(&path).unwrap();
    assert_eq!(restored.state_count(), 0);
}

#[test]
fn reloading_a_saved_file_saves_the_same_text() {
    let dir = tempfile::tempdir().unwrap();
    let first = model_path(&dir, "first");
    let second = model_path(&dir, "second");
    populated_agent().save(&first).unwrap();

    let agent = LearningAgent::new();
    agent.load(&first).unwrap();
    agent.save(&second).unwrap();
    assert_eq!(
        std::fs::read_to_string(&first).unwrap(),
        std::fs::read_to_string(&second).unwrap()
    );
}

#[test]
fn saved_file_uses_string_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = model_path(&dir, "string_keys");
    populated_agent().save(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["-1,-1,-1,-1|6"]["0"], serde_json::json!(0.5));
    assert_eq!(json["-1,-1,-1,-1|6"]["2"], serde_json::json!(0.5));
    assert!(json["-1,-1,-1,-1|6"].get("1").is_none());
}

#[test]
fn failed_loads_keep_the_current_table() {
    let agent = populated_agent();
    let before = agent.snapshot();

    let dir = tempfile::tempdir().unwrap();
    let missing = model_path(&dir, "does_not_exist");
    assert!(matches!(agent.load(&missing), Err(ModelError::Io(_))));
    assert_eq!(agent.snapshot(), before);

    let cases = [
        ("truncated", r#"{"0,0,0,0|1": {"0": 1.5}, "1,1,1,1|2": {"#, true),
        ("wrong_shape", r#"{"0,0,0,0|1": [1.5]}"#, true),
        ("bad_state", r#"{"0,0,0,0|1": {"0": 1.5}, "banana": {"0": 2.0}}"#, false),
        ("bad_action", r#"{"0,0,0,0|1": {"0": 1.5, "9": 2.0}}"#, false),
        ("padded_state", r#"{" 1,2,3,4|5": {"0": 1.0}}"#, false),
        ("signed_roll", r#"{"1,2,3,4|+5": {"0": 1.0}}"#, false),
    ];
    for (name, contents, is_shape_error) in cases {
        let path = model_path(&dir, name);
        std::fs::write(&path, contents).unwrap();
        let err = agent.load(&path).unwrap_err();
        if is_shape_error {
            assert!(matches!(err, ModelError::Json(_)), "{}: {}", name, err);
        } else {
            assert!(matches!(err, ModelError::Malformed(_)), "{}: {}", name, err);
        }
        assert_eq!(agent.snapshot(), before, "{} changed the table", name);
    }
}

#[test]
fn save_reports_unwritable_destination() {
    // A regular file where a parent directory is expected
    let dir = tempfile::tempdir().unwrap();
    let blocker = model_path(&dir, "blocker_file");
    std::fs::write(&blocker, "x").unwrap();
    let path = blocker.join("model.json");
    assert!(matches!(populated_agent().save(&path), Err(ModelError::Io(_))));
}

#[test]
fn loaded_table_drives_greedy_choice() {
    let dir = tempfile::tempdir().unwrap();
    let path = model_path(&dir, "greedy_choice");
    std::fs::write(&path, r#"{"10,20,-1,-1|3": {"0": 1.0, "1": 40.0}}"#).unwrap();

    let agent = LearningAgent::new();
    agent.load(&path).unwrap();
    let mut rng = StdRng::seed_from_u64(8);
    let picks: Vec<usize> = (0..400)
        .filter_map(|_| agent.choose_action([10, 20, -1, -1], 3, &[0, 1], false, &mut rng))
        .collect();
    let greedy = picks.iter().filter(|&&p| p == 1).count();
    // 95% exploit plus half of the 5% exploration
    assert!(greedy > 360, "piece 1 chosen {} of 400 times", greedy);
}

#[test]
fn concurrent_updates_are_not_lost() {
    let agent = Arc::new(LearningAgent::new());
    let key = StateKey::new([1, 2, 3, 4], 5);
    let threads = 8;
    let per_thread = 250;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let agent = Arc::clone(&agent);
            thread::spawn(move || {
                for i in 0..per_thread {
                    agent.learn(key, 0, 4.0).unwrap();
                    agent.learn(StateKey::new([t as i8, (i % 50) as i8, -1, -1], 1), 1, 1.0).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut expected = 0.0f64;
    for _ in 0..threads * per_thread {
        expected += 0.5 * (4.0 - expected);
    }
    assert_eq!(agent.value(&key, 0), Some(expected));
    assert_eq!(agent.state_count(), 1 + threads * 50);
}
