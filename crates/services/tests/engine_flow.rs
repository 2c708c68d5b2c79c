use std::sync::Arc;

use gauntlet_core::model::{ChallengeId, ParticipantName, Station};
use gauntlet_core::registry::ChallengeRegistry;
use services::{AppServices, HttpMirror, ProgressEngine};
use storage::repository::{ProgressLookup, ProgressStore};

fn id(token: &str) -> ChallengeId {
    ChallengeId::new(token)
}

fn name(value: &str) -> ParticipantName {
    ParticipantName::new(value).unwrap()
}

fn engine_over(store: &ProgressStore) -> ProgressEngine {
    let registry =
        Arc::new(ChallengeRegistry::new(vec![id("typing"), id("trivia"), id("mcq1")]).unwrap());
    ProgressEngine::new(registry, store.clone(), Arc::new(HttpMirror::new(None)))
}

#[tokio::test]
async fn participant_resumes_exactly_where_they_left_off() {
    let store = ProgressStore::in_memory();

    {
        let mut engine = engine_over(&store);
        engine.start_or_resume(name("Alex")).await.unwrap();
        engine.record_completion(&id("typing")).await.unwrap();
        engine.update_score(5.0).await.unwrap();
        let station = engine.advance().await.unwrap();
        assert_eq!(station, &Station::Challenge(id("trivia")));
    }

    // A new engine over the same store stands in for an app restart.
    let mut engine = engine_over(&store);
    let session = engine.start_or_resume(name("Alex")).await.unwrap();

    assert_eq!(session.current_challenge(), Some(&id("trivia")));
    assert_eq!(session.completed(), &[id("typing")]);
    assert!((session.score() - 5.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn jumping_to_a_completed_challenge_lands_on_the_next_open_one() {
    let store = ProgressStore::in_memory();
    let mut engine = engine_over(&store);

    engine.start_or_resume(name("Alex")).await.unwrap();
    engine.record_completion(&id("typing")).await.unwrap();
    engine.advance().await.unwrap();

    // Completed challenges cannot be re-entered; the jump slides forward
    // to the first incomplete challenge after the target.
    let station = engine.jump_to(&id("typing")).await.unwrap();
    assert_eq!(station, &Station::Challenge(id("trivia")));
}

#[tokio::test]
async fn finishing_wipes_progress_so_the_next_visit_starts_fresh() {
    let store = ProgressStore::in_memory();

    {
        let mut engine = engine_over(&store);
        engine.start_or_resume(name("Alex")).await.unwrap();
        for challenge in ["typing", "trivia", "mcq1"] {
            engine.record_completion(&id(challenge)).await.unwrap();
            engine.advance().await.unwrap();
        }
        assert!(engine.station().is_done());
        engine.finish().await.unwrap();
    }

    assert!(matches!(
        store.load(&name("Alex")).await.unwrap(),
        ProgressLookup::Missing
    ));

    let mut engine = engine_over(&store);
    assert!(engine.resume_last_active().await.unwrap().is_none());

    let session = engine.start_or_resume(name("Alex")).await.unwrap();
    assert_eq!(session.current_challenge(), Some(&id("typing")));
    assert!(session.completed().is_empty());
    assert!(session.score().abs() < f64::EPSILON);
}

#[tokio::test]
async fn assembled_services_run_the_standard_order() {
    let mut app = AppServices::in_memory();
    let first = app.engine().registry().first().clone();

    let session = app.engine_mut().start_or_resume(name("Alex")).await.unwrap();
    assert_eq!(session.current_challenge(), Some(&first));

    app.engine_mut().record_completion(&first).await.unwrap();
    let station = app.engine_mut().advance().await.unwrap().clone();
    let second = app.engine().registry().get(1).unwrap();
    assert_eq!(station.challenge(), Some(second));
}
