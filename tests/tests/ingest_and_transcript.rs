use application::ingest_service::IngestService;
use application::rag_service::RagService;
use domain::prompt::PromptTemplate;
use domain::session::{Role, Transcript};
use presentation::renderer;
use std::fs;
use std::sync::Arc;
use tests::{loader_for, KeywordEmbedder, ScriptedCompletion, DIMENSION};

#[tokio::test]
async fn ingested_directory_answers_questions() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(data.join("cardio")).unwrap();
    fs::write(data.join("fever.txt"), "Paracetamol reduces fever in adults.").unwrap();
    fs::write(data.join("cardio").join("heart.md"), "Beta blockers slow the heart rate.").unwrap();
    fs::write(data.join("ignored.bin"), [0u8, 1, 2]).unwrap();

    let embedder = Arc::new(KeywordEmbedder::default());
    let db_path = dir.path().join("vectorstore").join("medibot.db");
    let ingest = IngestService::new(&db_path, embedder.clone(), DIMENSION);
    let report = ingest.ingest(&data).await.unwrap();
    assert_eq!(report.documents, 2);
    assert_eq!(report.manifest.chunk_count, 2);
    assert_eq!(report.manifest.dimension, DIMENSION);

    let service = RagService::new(
        Arc::new(loader_for(&db_path)),
        embedder,
        Arc::new(ScriptedCompletion::answering("Beta blockers.")),
        PromptTemplate::medical().unwrap(),
    )
    .with_top_k(1);
    let answer = service.answer("What slows the heart rate?").await.unwrap();
    assert_eq!(answer.citations.len(), 1);
    assert!(renderer::format_answer(&answer).contains("heart.md"));
}

#[test]
fn transcript_renders_every_turn_in_order() {
    let mut transcript = Transcript::new();
    let exchanges = [
        ("What reduces fever?", "Aspirin reduces fever."),
        ("What lowers blood sugar?", "Insulin."),
        ("Is it safe for children?", "I don't know."),
    ];
    for (question, reply) in exchanges {
        transcript.push_user(question);
        transcript.push_assistant(reply);
    }
    assert_eq!(transcript.len(), 6);
    assert_eq!(transcript.last().map(|t| t.role), Some(Role::Assistant));

    let rendered = renderer::render(&transcript);
    let mut cursor = 0;
    for (question, reply) in exchanges {
        for needle in [question, reply] {
            let pos = rendered[cursor..].find(needle).unwrap() + cursor;
            cursor = pos + needle.len();
        }
    }
    assert_eq!(rendered.matches("You:").count(), 3);
    assert_eq!(rendered.matches("MediBot:").count(), 3);
}
