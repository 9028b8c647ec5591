use application::rag_service::RagService;
use domain::prompt::PromptTemplate;
use domain::session::Transcript;
use infrastructure::config::Config;
use infrastructure::groq_client::GroqClient;
use presentation::renderer;
use shared::errors::{BotError, ServiceError};
use std::sync::Arc;
use tests::{loader_for, medical_chunks, write_fixture_index, KeywordEmbedder, ScriptedCompletion};

#[tokio::test]
async fn fever_question_cites_pharma_page() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    let path = write_fixture_index(dir.path(), &embedder, medical_chunks()).await;
    let completion = Arc::new(ScriptedCompletion::answering("Aspirin reduces fever."));
    let loader = Arc::new(loader_for(path));

    let service = RagService::new(
        loader.clone(),
        embedder.clone(),
        completion.clone(),
        PromptTemplate::medical().unwrap(),
    );
    let answer = service.answer("What reduces fever?").await.unwrap();

    assert_eq!(answer.text, "Aspirin reduces fever.");
    assert_eq!(answer.citations.len(), 3);
    assert_eq!(answer.sources[0].chunk.text, "Aspirin reduces fever and mild pain.");

    let prompts = completion.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Aspirin reduces fever and mild pain."));
    assert!(prompts[0].contains("What reduces fever?"));
    assert!(!prompts[0].contains("{context}"));

    let mut transcript = Transcript::new();
    transcript.push_user("What reduces fever?");
    transcript.push_assistant(renderer::format_answer(&answer));
    let rendered = renderer::render(&transcript);
    assert!(rendered.contains("**Source Docs:**"));
    assert!(rendered.contains("`pharma.pdf` — Page 3"));
    assert!(loader.is_loaded());
}

#[tokio::test]
async fn index_is_loaded_once_across_questions() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    let path = write_fixture_index(dir.path(), &embedder, medical_chunks()).await;
    let loader = Arc::new(loader_for(path));
    let service = RagService::new(
        loader.clone(),
        embedder,
        Arc::new(ScriptedCompletion::answering("ok")),
        PromptTemplate::medical().unwrap(),
    );

    let first = loader.get().await.unwrap();
    service.answer("What lowers blood sugar?").await.unwrap();
    service.answer("How do vaccines work?").await.unwrap();
    let again = loader.get().await.unwrap();
    assert!(Arc::ptr_eq(&first, &again));
}

#[tokio::test]
async fn missing_credential_fails_before_any_network_call() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    let path = write_fixture_index(dir.path(), &embedder, medical_chunks()).await;
    let embedded_during_setup = embedder.calls();

    let config = Config::from_lookup(|_| None).unwrap();
    let service = RagService::new(
        Arc::new(loader_for(path)),
        embedder.clone(),
        Arc::new(GroqClient::new(&config).unwrap()),
        PromptTemplate::medical().unwrap(),
    );

    let err = service.answer("What reduces fever?").await.unwrap_err();
    assert!(matches!(err, BotError::Configuration(ref m) if m.contains("GROQ_API_KEY")));
    assert!(err.is_fatal());
    assert_eq!(embedder.calls(), embedded_during_setup);
}

#[tokio::test]
async fn every_failure_is_a_single_error_kind() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    let path = write_fixture_index(dir.path(), &embedder, medical_chunks()).await;

    let cases = [
        ScriptedCompletion::answering("Aspirin."),
        ScriptedCompletion::failing(ServiceError::Timeout { secs: 60 }),
        ScriptedCompletion::failing(ServiceError::Api {
            status: 503,
            message: "overloaded".into(),
        }),
        ScriptedCompletion::failing(ServiceError::MalformedResponse("no choices".into())),
    ];

    for completion in cases {
        let service = RagService::new(
            Arc::new(loader_for(&path)),
            embedder.clone(),
            Arc::new(completion),
            PromptTemplate::medical().unwrap(),
        );
        match service.answer("What reduces fever?").await {
            Ok(answer) => assert!(!answer.text.is_empty()),
            Err(BotError::QueryExecution(message)) => assert!(!message.is_empty()),
            Err(other) => panic!("unexpected error kind: {other:?}"),
        }
    }
}

#[tokio::test]
async fn missing_index_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nowhere.db");
    let service = RagService::new(
        Arc::new(loader_for(&path)),
        Arc::new(KeywordEmbedder::default()),
        Arc::new(ScriptedCompletion::answering("unused")),
        PromptTemplate::medical().unwrap(),
    );
    match service.ensure_ready().await {
        Err(BotError::IndexLoad { path: reported, .. }) => {
            assert!(reported.contains("nowhere.db"))
        }
        other => panic!("expected index load error, got {other:?}"),
    }
}
