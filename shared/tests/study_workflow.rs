use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use shared::exam::ExamPhase;
use shared::{
    BaseQuizSource, Config, Error, ExamConfig, FlashcardAction, Notice, QuestionCost,
    SessionAction, StudyApp, SummaryVariant, Tab, UltraGeneration, UltraKind,
};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pdf(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("notes.pdf");
    std::fs::write(&path, b"%PDF-1.4 test document").unwrap();
    path
}

fn token() -> String {
    let claims = json!({ "sub": "user-1", "email": "student@example.com", "exp": 0 });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret")).unwrap()
}

fn app_for(server: &MockServer) -> StudyApp {
    let mut config = Config::new(server.uri());
    config.poll_interval = Duration::from_millis(20);
    config.poll_timeout = Duration::from_secs(5);
    StudyApp::new(config).unwrap()
}

async fn mount_processed(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/process-pdf-v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn uploaded_app(server: &MockServer, body: serde_json::Value) -> (StudyApp, TempDir) {
    mount_processed(server, body).await;
    let dir = TempDir::new().unwrap();
    let mut app = app_for(server);
    app.upload_document(&pdf(&dir), None).await.unwrap();
    (app, dir)
}

fn mc_question(text: &str) -> serde_json::Value {
    json!({
        "question": text,
        "type": "multiple_choice",
        "options": ["a", "b", "c"],
        "correct_option_index": 1,
        "explanation": "b is right"
    })
}

#[tokio::test]
async fn upload_shows_single_flashcard() {
    let server = MockServer::start().await;
    let (mut app, _dir) = uploaded_app(
        &server,
        json!({ "flashcard": [{ "front": "Q1", "back": "A1" }], "sessionId": "abc" }),
    )
    .await;

    let state = app.state();
    assert_eq!(state.session_id(), Some("abc"));
    assert_eq!(state.session.as_ref().unwrap().file_name, "notes.pdf");
    assert_eq!(state.flashcards.position_label(state.flashcards().len()), "1 / 1");
    assert_eq!(state.flashcards.visible(state.flashcards()), Some("Q1"));

    app.dispatch(SessionAction::Flashcards(FlashcardAction::Flip));
    let state = app.state();
    assert_eq!(state.flashcards.visible(state.flashcards()), Some("A1"));
}

#[tokio::test]
async fn insufficient_credits_opens_modal_and_keeps_balance() {
    let server = MockServer::start().await;
    let (mut app, _dir) = uploaded_app(
        &server,
        json!({ "sessionId": "abc", "riassunto_esteso": "context", "creditsRemaining": 40 }),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/generate-exam"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": "insufficient_credits",
            "required": 30,
            "current": 12
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = app.generate_custom_exam(ExamConfig::default()).await.unwrap_err();
    assert_eq!(
        err.notice(),
        Notice::CreditsModal {
            required: 30,
            current: 12,
            description: None
        }
    );
    assert_eq!(app.credits().current(), Some(40));
    assert_eq!(app.state().exam.phase(), ExamPhase::Configuration);
}

#[tokio::test]
async fn generation_failure_leaves_exam_in_configuration() {
    let server = MockServer::start().await;
    let (mut app, _dir) = uploaded_app(
        &server,
        json!({ "sessionId": "abc", "extractedText": "context", "creditsRemaining": 40 }),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/generate-exam"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "generation_failed",
            "message": "Model unavailable."
        })))
        .mount(&server)
        .await;

    let err = app.generate_custom_exam(ExamConfig::default()).await.unwrap_err();
    assert!(matches!(err, Error::GenerationFailed(_)));
    assert_eq!(app.credits().current(), Some(40));
    assert_eq!(app.state().exam.phase(), ExamPhase::Configuration);
}

#[tokio::test]
async fn custom_exam_starts_and_refreshes_credits() {
    let server = MockServer::start().await;
    let (mut app, _dir) = uploaded_app(
        &server,
        json!({ "sessionId": "abc", "extractedText": "context", "creditsRemaining": 40 }),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/generate-exam"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "questions": [mc_question("one"), mc_question("two")],
            "creditsRemaining": 25
        })))
        .expect(1)
        .mount(&server)
        .await;

    let count = app.generate_custom_exam(ExamConfig::default()).await.unwrap();
    assert_eq!(count, 2);
    assert_eq!(app.credits().current(), Some(25));
    assert_eq!(
        app.state().exam.phase(),
        ExamPhase::InProgress { index: 0, total: 2 }
    );
}

#[tokio::test]
async fn custom_exam_requires_reset_of_running_quiz() {
    let server = MockServer::start().await;
    let (mut app, _dir) = uploaded_app(
        &server,
        json!({ "sessionId": "abc", "extractedText": "context", "creditsRemaining": 40 }),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/generate-exam"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    app.start_base_quiz().await.unwrap();
    let running = app.state().exam.custom_exam_config;

    let config = ExamConfig {
        num_questions: 5,
        ..ExamConfig::default()
    };
    let err = app.generate_custom_exam(config).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(app.state().exam.phase(), ExamPhase::InProgress { index: 0, total: 3 });
    assert_eq!(app.state().exam.custom_exam_config, running);
    assert_eq!(app.credits().current(), Some(40));
}

#[tokio::test]
async fn base_quiz_falls_back_without_sign_in() {
    let server = MockServer::start().await;
    let (mut app, _dir) = uploaded_app(&server, json!({ "sessionId": "abc", "extractedText": "context" })).await;

    Mock::given(method("POST"))
        .and(path("/api/generate-basic-quiz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let source = app.start_base_quiz().await.unwrap();
    assert_eq!(source, BaseQuizSource::Fallback);
    assert_eq!(
        app.state().exam.phase(),
        ExamPhase::InProgress { index: 0, total: 3 }
    );
}

#[tokio::test]
async fn base_quiz_falls_back_on_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/probable-questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isFree": true, "cost": 5 })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate-basic-quiz"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let (mut app, _dir) = uploaded_app(&server, json!({ "sessionId": "abc", "extractedText": "context" })).await;
    app.sign_in(&token()).await.unwrap();

    assert_eq!(app.start_base_quiz().await.unwrap(), BaseQuizSource::Fallback);
    assert_eq!(app.state().exam.custom_questions.len(), 3);
}

#[tokio::test]
async fn base_quiz_generated_when_signed_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/probable-questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isFree": true, "cost": 5 })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate-basic-quiz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "questions": [mc_question("one"), mc_question("two"), mc_question("three")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (mut app, _dir) = uploaded_app(&server, json!({ "sessionId": "abc", "extractedText": "context" })).await;
    app.sign_in(&token()).await.unwrap();

    assert_eq!(app.start_base_quiz().await.unwrap(), BaseQuizSource::Generated);
    assert_eq!(app.state().exam.custom_questions[0].question, "one");
}

#[tokio::test]
async fn ultra_maps_applied_inline() {
    let server = MockServer::start().await;
    let (mut app, _dir) = uploaded_app(&server, json!({ "sessionId": "abc", "creditsRemaining": 150 })).await;

    Mock::given(method("POST"))
        .and(path("/api/generate-ultra-maps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mappa_ultra": [{ "title": "Root", "children": [{ "title": "Leaf" }] }],
            "creditsRemaining": 50
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/history"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = app
        .generate_ultra(UltraKind::Maps, |_| true, |_| {})
        .await
        .unwrap();

    assert_eq!(outcome, UltraGeneration::Completed { polled: false });
    assert_eq!(app.credits().current(), Some(50));
    assert_eq!(app.state().tab, Tab::UltraMap);
    let maps = app.state().results().unwrap().mappa_ultra.clone().unwrap();
    assert_eq!(maps[0].node_count(), 2);
}

#[tokio::test]
async fn ultra_summary_polled_until_ready() {
    let server = MockServer::start().await;
    let (mut app, _dir) = uploaded_app(&server, json!({ "sessionId": "abc", "creditsRemaining": 500 })).await;

    Mock::given(method("POST"))
        .and(path("/api/generate-ultra-summary"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "status": "processing",
            "creditsRemaining": 250
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessions": [{
                "id": "abc",
                "processing_metadata": {
                    "ultra_summary_status": "in_progress",
                    "ultra_summary_current_section": 1,
                    "ultra_summary_total_sections": 3
                }
            }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessions": [{
                "id": "abc",
                "results": { "riassunto_ultra": "Very long summary" },
                "processing_metadata": { "ultra_summary_status": "completed" }
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/history"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut progress = Vec::new();
    let outcome = app
        .generate_ultra(UltraKind::Summary, |_| true, |p| progress.push((p.current, p.total, p.eta_minutes)))
        .await
        .unwrap();

    assert_eq!(outcome, UltraGeneration::Completed { polled: true });
    assert_eq!(progress, vec![(1, 3, 6)]);
    assert_eq!(app.credits().current(), Some(250));
    assert_eq!(app.state().tab, Tab::UltraSummary);
    assert!(app.state().ultra_progress.is_none());
    assert_eq!(
        app.state().results().unwrap().riassunto_ultra.as_deref(),
        Some("Very long summary")
    );
}

#[tokio::test]
async fn ultra_blocked_locally_below_threshold() {
    let server = MockServer::start().await;
    let (mut app, _dir) = uploaded_app(&server, json!({ "sessionId": "abc", "creditsRemaining": 100 })).await;

    Mock::given(method("POST"))
        .and(path("/api/generate-ultra-summary"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut asked = false;
    let err = app
        .generate_ultra(
            UltraKind::Summary,
            |_| {
                asked = true;
                true
            },
            |_| {},
        )
        .await
        .unwrap_err();

    assert!(!asked);
    match err {
        Error::InsufficientCredits { required, current, .. } => {
            assert_eq!((required, current), (250, 100));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(app.credits().current(), Some(100));
}

#[tokio::test]
async fn ultra_declined_spends_nothing() {
    let server = MockServer::start().await;
    let (mut app, _dir) = uploaded_app(&server, json!({ "sessionId": "abc", "creditsRemaining": 300 })).await;

    Mock::given(method("POST"))
        .and(path("/api/generate-ultra-flashcards"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = app
        .generate_ultra(
            UltraKind::Flashcards,
            |quote| {
                assert_eq!(quote.cost, 100);
                assert_eq!(quote.balance, Some(300));
                false
            },
            |_| {},
        )
        .await
        .unwrap();
    assert_eq!(outcome, UltraGeneration::Declined);
}

#[tokio::test]
async fn free_probable_questions_reconciled_with_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/probable-questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isFree": true, "cost": 5 })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/probable-questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isFree": false, "cost": 5 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/history"))
        .and(query_param("sessionId", "other"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessions": [{
                "id": "other",
                "extractedText": "more context",
                "results": { "riassunto_breve": "short" }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/probable-questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "questions": ["Define entropy."],
            "wasFree": true,
            "creditsRemaining": 20
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (mut app, _dir) = uploaded_app(&server, json!({ "sessionId": "abc", "extractedText": "context" })).await;
    app.sign_in(&token()).await.unwrap();
    assert_eq!(app.question_cost(), QuestionCost::Confirmed(0));

    // the price is per account: a different document keeps the free question set
    app.load_history_entry("other").await.unwrap();
    assert_eq!(app.state().session_id(), Some("other"));
    assert_eq!(app.refresh_question_cost(false).await.unwrap(), QuestionCost::Confirmed(0));
    assert_eq!(app.question_cost(), QuestionCost::Confirmed(0));

    let questions = app.generate_probable_questions().await.unwrap();
    assert_eq!(questions, vec!["Define entropy.".to_string()]);
    assert_eq!(app.question_cost(), QuestionCost::Confirmed(5));
    assert_eq!(app.credits().current(), Some(20));
    assert_eq!(app.state().guide.probable_questions.len(), 1);

    app.sign_out();
    assert_eq!(app.question_cost(), QuestionCost::Unknown);
    assert!(matches!(app.generate_probable_questions().await, Err(Error::Auth(_))));
}

#[tokio::test]
async fn loading_history_entry_replaces_session() {
    let server = MockServer::start().await;
    let (mut app, _dir) = uploaded_app(&server, json!({ "sessionId": "a", "extractedText": "context" })).await;
    app.start_base_quiz().await.unwrap();

    Mock::given(method("GET"))
        .and(path("/api/history"))
        .and(query_param("sessionId", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessions": [{
                "id": "b",
                "fileName": "other.pdf",
                "results": { "riassunto_breve": "short" }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    app.load_history_entry("b").await.unwrap();

    let state = app.state();
    assert_eq!(state.session_id(), Some("b"));
    assert_eq!(state.session.as_ref().unwrap().file_name, "other.pdf");
    assert_eq!(state.exam.phase(), ExamPhase::Configuration);
}

#[tokio::test]
async fn summary_read_aloud_with_configured_voice() {
    let server = MockServer::start().await;
    mount_processed(&server, json!({ "sessionId": "abc", "riassunto_breve": "Breve testo" })).await;
    Mock::given(method("POST"))
        .and(path("/api/tts"))
        .and(body_partial_json(json!({ "text": "Breve testo", "voice": "it-IT-Standard-A" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "audioContent": STANDARD.encode(b"ID3 audio"),
            "creditsRemaining": 40
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = Config::new(server.uri());
    config.tts_voice = Some("it-IT-Standard-A".to_string());
    let mut app = StudyApp::new(config).unwrap();
    app.upload_document(&pdf(&dir), None).await.unwrap();

    let audio = app.synthesize_audio(SummaryVariant::Breve).await.unwrap();
    assert_eq!(audio.mp3, b"ID3 audio".to_vec());
    assert!(!audio.truncated);
    assert_eq!(app.credits().current(), Some(40));

    let err = app.synthesize_audio(SummaryVariant::Ultra).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn study_plan_validates_days_before_calling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/study-plan"))
        .and(body_partial_json(json!({ "sessionId": "abc", "days": 7 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "studyPlan": "Day 1: read chapter one",
            "creditsRemaining": 15
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (mut app, _dir) = uploaded_app(&server, json!({ "sessionId": "abc", "extractedText": "context" })).await;

    app.dispatch(SessionAction::DaysInputChanged("0".to_string()));
    assert!(matches!(app.generate_study_plan().await, Err(Error::Validation(_))));

    app.dispatch(SessionAction::DaysInputChanged("7".to_string()));
    let plan = app.generate_study_plan().await.unwrap();
    assert_eq!(plan, "Day 1: read chapter one");
    assert_eq!(app.state().guide.study_plan.as_deref(), Some("Day 1: read chapter one"));
    assert_eq!(app.credits().current(), Some(15));
}

#[tokio::test]
async fn summary_download_returns_file_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/download-summary"))
        .and(body_partial_json(json!({ "sessionId": "abc", "variant": "esteso", "fileName": "notes.pdf" })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _dir) = uploaded_app(&server, json!({ "sessionId": "abc", "riassunto_esteso": "Long text" })).await;

    assert_eq!(app.download_summary(SummaryVariant::Esteso).await.unwrap(), b"%PDF-1.7".to_vec());
    assert!(matches!(
        app.download_summary(SummaryVariant::Breve).await,
        Err(Error::Validation(_))
    ));
}

#[tokio::test]
async fn credit_grants_confirm_balance() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/magic/claim"))
        .and(body_partial_json(json!({ "token": "magic-123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "credits": 100 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/credits/add"))
        .and(body_partial_json(json!({ "amount": 50 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "creditsAdded": 50, "newBalance": 150 })))
        .expect(1)
        .mount(&server)
        .await;

    let mut app = app_for(&server);
    assert_eq!(app.claim_magic_link("magic-123").await.unwrap(), 100);
    assert_eq!(app.credits().current(), Some(100));

    assert!(matches!(app.add_credits(0, None).await, Err(Error::Validation(_))));
    assert_eq!(app.add_credits(50, Some("promo")).await.unwrap(), 150);
    assert_eq!(app.credits().current(), Some(150));
}
