//! End-to-end integration tests for Tutor Loop sessions
//!
//! These tests drive the engine through complete sessions with a scripted
//! content provider, covering fallback behavior, advancement and the
//! progress log.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tutor_engine::{
    parse_sections, serialize_sections, Config, ContentProvider, ProviderError, ProviderKind,
    RetryPolicy, RetryingGenerator, ScriptedProvider, Sections, SessionEngine, SessionStatus,
    TutorError, Verdict,
};
use tutor_progress::{MarkdownGenerator, ProgressEntry, ProgressLog, ProgressSummary};

const LESSON: &str = "[OBJECTIVES]\n- Understand the idea\n\
                      [INTRODUCTION]\nWhy it matters.\n\
                      [KEY CONCEPT]\nThe central idea.\n\
                      [EXAMPLE]\nA worked example.\n\
                      [PRACTICE QUESTION]\nExplain the idea in your own words.";

const CORRECT: &str = "[CONCEPTUAL UNDERSTANDING]\nSolid.\n\
                       [SPECIFIC FEEDBACK]\nClear and accurate.\n\
                       [MASTERY]\nConceptual Understanding: 5\nApplication of Knowledge: 5\n\
                       Critical Thinking: 4\nCommunication: 5\n\
                       [MOVE ON]\nyes";

/// Path to the fixture directory.
fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Scratch directory unique to this test process.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tutor_it_{name}_{}", std::process::id()));
    std::fs::remove_dir_all(&dir).ok();
    dir
}

/// Engine over `provider` with three attempts and no backoff delay.
fn engine(provider: &Arc<ScriptedProvider>) -> SessionEngine {
    let provider: Arc<dyn ContentProvider> = Arc::clone(provider) as Arc<dyn ContentProvider>;
    SessionEngine::new(RetryingGenerator::new(
        provider,
        RetryPolicy::new(3, Duration::ZERO),
    ))
}

/// Tests that the sample config loads successfully.
#[test]
fn test_sample_config_loads() {
    let config_path = fixture_path().join("tutor.json");
    assert!(
        config_path.exists(),
        "Config fixture not found at: {config_path:?}"
    );

    let config = Config::load_from_file(&config_path).expect("Failed to load config");

    assert_eq!(config.user, "ada");
    assert_eq!(config.curriculum_size, 3);
    assert_eq!(config.provider.kind, ProviderKind::Offline);
    assert_eq!(config.retry.max_attempts, 2);
    assert_eq!(config.retry_policy().backoff_base, Duration::ZERO);
    // Unset keys keep their defaults.
    assert_eq!(config.provider.model, "gemini-pro");
}

/// An always-failing provider still yields a complete, usable session.
#[tokio::test]
async fn test_always_failing_provider_uses_fallbacks() {
    let provider = Arc::new(ScriptedProvider::new());
    let mut engine = engine(&provider);

    engine
        .start("Mathematics", "Beginner", "Fractions", "")
        .await
        .expect("start should succeed");

    let state = engine.get_state();
    assert_eq!(state.curriculum.len(), 5);
    for name in &state.curriculum {
        assert!(name.contains("Fractions"), "{name} should mention the topic");
    }
    // Curriculum generation is attempted exactly three times.
    assert_eq!(provider.calls(), 3);

    let lesson = engine
        .get_current_lesson()
        .await
        .expect("lesson should be delivered")
        .lesson;
    for field in [
        &lesson.objectives,
        &lesson.introduction,
        &lesson.core_concepts,
        &lesson.examples,
        &lesson.practice_question,
    ] {
        assert!(!field.trim().is_empty());
    }

    let outcome = engine
        .submit_answer("I don't know")
        .await
        .expect("answer should be evaluated");
    assert_eq!(outcome.evaluation.verdict, Verdict::Partial);
    assert!(!outcome.advanced);
    assert_eq!(engine.get_state().current_index, 0);
    assert_eq!(engine.status(), SessionStatus::AwaitingAnswer);
}

/// A well-formed numbered list becomes the curriculum verbatim.
#[tokio::test]
async fn test_generated_curriculum_is_used_verbatim() {
    let provider = Arc::new(ScriptedProvider::new().with_response(
        "Here is your learning path:\n\
         1. What is a Fraction - parts of a whole\n\
         2. Numerators and Denominators - naming the parts\n\
         3. Equivalent Fractions - same value, different form\n\
         4. Comparing Fractions - which is larger\n\
         5. Adding Fractions - common denominators",
    ));
    let mut engine = engine(&provider);

    let turn = engine
        .start("Mathematics", "Beginner", "Fractions", "Whole numbers")
        .await
        .expect("start should succeed");

    assert_eq!(
        engine.get_state().curriculum,
        vec![
            "What is a Fraction",
            "Numerators and Denominators",
            "Equivalent Fractions",
            "Comparing Fractions",
            "Adding Fractions",
        ]
    );
    assert!(turn.message.contains("**3.** Equivalent Fractions"));
    assert!(provider.prompts()[0].contains("Background context: Whole numbers"));
}

/// Mastery scores of 5, 5, 4, 5 average 4.75 and count as correct.
#[tokio::test]
async fn test_high_mastery_advances() {
    let provider = Arc::new(ScriptedProvider::new());
    let mut engine = engine(&provider);
    engine
        .start("Mathematics", "Beginner", "Fractions", "")
        .await
        .expect("start should succeed");

    provider.push_response(LESSON);
    let lesson = engine.get_current_lesson().await.expect("lesson");
    assert_eq!(lesson.question, "Explain the idea in your own words.");

    provider.push_response(CORRECT);
    let outcome = engine
        .submit_answer("A fraction is part of a whole.")
        .await
        .expect("answer should be evaluated");

    assert_eq!(outcome.evaluation.verdict, Verdict::Correct);
    assert_eq!(outcome.evaluation.mastery_mean(), Some(4.75));
    assert!(outcome.advanced);
    assert_eq!(outcome.current_index, 1);
    assert_eq!(outcome.status, SessionStatus::Teaching);
    assert!(outcome.message.contains("Moving on to **Fundamental Concepts of Fractions**"));
}

/// A completed session appends one entry to the progress log.
#[tokio::test]
async fn test_complete_session_writes_progress_log() {
    let dir = scratch_dir("complete");
    let log = ProgressLog::new(dir.join("progress.json"));
    let provider =
        Arc::new(ScriptedProvider::new().with_response("1. Basics\n2. Practice\n3. Mastery"));
    let mut engine = engine(&provider)
        .with_curriculum_size(3)
        .with_user("ada")
        .with_progress_log(log.clone());

    engine
        .start("Mathematics", "Intermediate", "Ratios", "")
        .await
        .expect("start should succeed");

    let mut last_index = 0;
    while engine.status() != SessionStatus::Finished {
        provider.push_response(LESSON);
        engine.get_current_lesson().await.expect("lesson");

        // First try misses, the second one is accepted.
        provider.push_response("[CORRECTNESS]\nincorrect\n[FOLLOW-UP]\nTry again with an example.");
        let miss = engine.submit_answer("not sure").await.expect("evaluated");
        assert!(!miss.advanced);
        assert_eq!(miss.current_index, last_index);

        provider.push_response(CORRECT);
        let hit = engine.submit_answer("a worked example").await.expect("evaluated");
        assert!(hit.advanced);
        assert_eq!(hit.current_index, last_index + 1);
        last_index = hit.current_index;
    }

    assert_eq!(last_index, 3);
    assert!((engine.get_state().progress - 1.0).abs() < f64::EPSILON);

    let history = log.load().expect("progress log should load");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user, "ada");
    assert_eq!(history[0].subject, "Mathematics");
    assert_eq!(history[0].topic, "Ratios");
    // Three misses at 20 and three hits at 95.
    assert_eq!(history[0].score, 58);

    let summary = ProgressSummary::from_entries(&history);
    assert_eq!(summary.sessions, 1);
    assert_eq!(summary.latest_by_topic.get("Ratios"), Some(&58));

    let markdown = MarkdownGenerator::new(&history).generate();
    assert!(markdown.contains("Ratios"));

    engine.choose_new_topic().expect("finished session can choose a new topic");
    assert_eq!(engine.status(), SessionStatus::AwaitingTopicSelection);

    std::fs::remove_dir_all(&dir).ok();
}

/// Answers are only accepted while awaiting an answer.
#[tokio::test]
async fn test_submit_answer_rejected_outside_awaiting_answer() {
    let provider = Arc::new(ScriptedProvider::new());
    let mut engine = engine(&provider);

    let err = engine.submit_answer("early").await.expect_err("uninitialized");
    assert!(matches!(err, TutorError::InvalidStateTransition { .. }));

    engine.reset();
    let err = engine.submit_answer("still early").await.expect_err("awaiting topic");
    assert!(matches!(err, TutorError::InvalidStateTransition { .. }));

    engine
        .start("Mathematics", "Beginner", "Fractions", "")
        .await
        .expect("start should succeed");
    let calls = provider.calls();
    let err = engine.submit_answer("before lesson").await.expect_err("teaching");
    assert!(matches!(err, TutorError::InvalidStateTransition { .. }));
    assert_eq!(provider.calls(), calls, "rejected answers never reach the provider");
    assert_eq!(engine.transcript().len(), 1);
}

/// The current index never decreases, whatever the evaluations say.
#[tokio::test]
async fn test_index_is_monotonic() {
    let provider = Arc::new(ScriptedProvider::new().with_response("1. A\n2. B"));
    let mut engine = engine(&provider).with_curriculum_size(2);
    engine
        .start("Science", "Beginner", "Cells", "")
        .await
        .expect("start should succeed");

    let evaluations = [
        "[VERDICT]\nno",
        "nothing structured here",
        "[VERDICT]\nyes",
        "[MASTERY]\nA: 1\nB: 2",
        "[MASTERY]\nA: 4\nB: 4",
    ];

    let mut previous = 0;
    for evaluation in evaluations {
        if engine.status() == SessionStatus::Teaching {
            engine.get_current_lesson().await.expect("lesson");
        }
        // Two transient failures, then the evaluation on the last attempt.
        provider.push_failure(ProviderError::Timeout);
        provider.push_failure(ProviderError::RateLimited);
        provider.push_response(evaluation);

        let outcome = engine.submit_answer("answer").await.expect("evaluated");
        assert!(outcome.current_index >= previous);
        assert!(outcome.current_index <= 2);
        if outcome.current_index == 2 {
            assert_eq!(outcome.status, SessionStatus::Finished);
        }
        previous = outcome.current_index;
    }

    assert_eq!(engine.status(), SessionStatus::Finished);
}

/// Requesting a new question replaces the pending question only.
#[tokio::test]
async fn test_new_question_keeps_subtopic() {
    let provider = Arc::new(ScriptedProvider::new());
    let mut engine = engine(&provider);
    engine
        .start("Mathematics", "Beginner", "Fractions", "")
        .await
        .expect("start should succeed");
    engine.get_current_lesson().await.expect("lesson");

    let turn = engine.request_new_question().await.expect("new question");
    assert_eq!(turn.status, SessionStatus::AwaitingAnswer);

    let state = engine.get_state();
    assert_eq!(state.current_index, 0);
    assert_eq!(
        state.last_question.as_deref(),
        Some("Explain a key concept of Introduction to Fractions and provide an example.")
    );
}

/// The state snapshot serializes with camelCase keys for presentation layers.
#[tokio::test]
async fn test_snapshot_json_shape() {
    let provider = Arc::new(ScriptedProvider::new());
    let mut engine = engine(&provider);
    engine
        .start("Mathematics", "Beginner", "Fractions", "")
        .await
        .expect("start should succeed");
    engine.get_current_lesson().await.expect("lesson");

    let json = serde_json::to_value(engine.get_state()).expect("snapshot serializes");
    assert_eq!(json["status"], "awaiting_answer");
    assert_eq!(json["topic"], "Fractions");
    assert_eq!(json["currentIndex"], 0);
    assert_eq!(json["curriculum"].as_array().map(Vec::len), Some(5));
    assert!(json["lastQuestion"].is_string());

    engine.reset();
    let json = serde_json::to_value(engine.get_state()).expect("snapshot serializes");
    assert_eq!(json["status"], "awaiting_topic_selection");
    assert!(json["topic"].is_null());
}

/// Existing history survives later sessions and sorts by time in reports.
#[test]
fn test_progress_history_accumulates() {
    let dir = scratch_dir("history");
    let log = ProgressLog::new(dir.join("progress.json"));

    let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2024, 3, 2, 18, 0, 0).unwrap();
    log.append(ProgressEntry::with_timestamp("ada", "Science", "Cells", 70, later))
        .expect("append");
    log.append(ProgressEntry::with_timestamp("ada", "Science", "Cells", 40, earlier))
        .expect("append");
    log.append(ProgressEntry::new("ada", "Mathematics", "Ratios", 88))
        .expect("append");

    let history = log.load().expect("load");
    assert_eq!(history.len(), 3);

    let summary = ProgressSummary::from_entries(&history);
    assert_eq!(summary.best_score, Some(88));
    // Latest by timestamp, not by append order.
    assert_eq!(summary.latest_by_topic.get("Cells"), Some(&70));

    let markdown = MarkdownGenerator::new(&history).generate();
    let first = markdown.find("2024-03-01 09:30 UTC").expect("earlier row");
    let second = markdown.find("2024-03-02 18:00 UTC").expect("later row");
    assert!(first < second);

    std::fs::remove_dir_all(&dir).ok();
}

/// Serialized sections parse back to the same sections.
#[test]
fn test_sections_round_trip() {
    let mut sections = Sections::new();
    sections.insert("SCENARIO", "A baker splits a cake into 8 slices.");
    sections.insert("QUESTION", "How many slices make 3/4 of the cake?");
    sections.insert("POINTS_TO_CONSIDER", "- equal parts\n- 8 * 3/4");

    let text = serialize_sections(&sections);
    let parsed = parse_sections(&text, &["SCENARIO", "QUESTION", "POINTS TO CONSIDER"]);
    assert_eq!(parsed, sections);
}
