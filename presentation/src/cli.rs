use crate::renderer::{self, TITLE};
use anyhow::Result;
use application::index_loader::{EmbeddingSpec, IndexLoader};
use application::ingest_service::IngestService;
use application::rag_service::RagService;
use clap::Parser;
use colored::Colorize;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use dialoguer::{theme::ColorfulTheme, Input};
use domain::prompt::PromptTemplate;
use domain::session::Transcript;
use infrastructure::config::Config;
use infrastructure::groq_client::GroqClient;
use infrastructure::ollama_client::OllamaClient;
use shared::confirmation::ask_confirmation;
use shared::errors::BotError;
use std::io::{self, IsTerminal};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "medibot")]
#[command(about = "Ask questions about your medical documents", long_about = None)]
pub struct Cli {
    /// Build the vector index from a document directory (defaults to DATA_DIR)
    #[arg(long, value_name = "DIR", num_args = 0..=1, default_missing_value = "")]
    pub ingest: Option<String>,

    /// Overwrite an existing index without asking
    #[arg(long)]
    pub yes: bool,
}

pub struct CliApp {
    config: Config,
}

impl CliApp {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&mut self, cli: Cli) -> Result<()> {
        match cli.ingest {
            Some(dir) => self.handle_ingest(&dir, cli.yes).await,
            None => self.handle_chat().await,
        }
    }

    async fn handle_ingest(&self, dir: &str, assume_yes: bool) -> Result<()> {
        let dir = if dir.trim().is_empty() {
            self.config.data_dir.as_str()
        } else {
            dir
        };
        let provider = Arc::new(OllamaClient::new(&self.config)?);
        let service = IngestService::new(&self.config.db_path, provider, self.config.embedding_dimension);

        if service.index_exists() && !assume_yes {
            let prompt = format!(
                "An index already exists at {}. Rebuild it?",
                service.db_path().display()
            );
            if !ask_confirmation(&prompt, false)? {
                println!("{}", "Keeping the existing index.".yellow());
                return Ok(());
            }
        }

        eprintln!("Building index from {}...", dir);
        let report = service.ingest(dir).await?;
        println!(
            "{}",
            format!(
                "Indexed {} chunks from {} documents ({} pages) into {}",
                report.manifest.chunk_count,
                report.documents,
                report.pages,
                service.db_path().display()
            )
            .green()
        );
        Ok(())
    }

    fn build_rag_service(&self) -> Result<RagService> {
        let template = PromptTemplate::medical()?;
        let embedder = Arc::new(OllamaClient::new(&self.config)?);
        let completion = Arc::new(GroqClient::new(&self.config)?);
        let index = Arc::new(IndexLoader::new(
            &self.config.db_path,
            EmbeddingSpec {
                model: self.config.embedding_model.clone(),
                dimension: self.config.embedding_dimension,
            },
        ));
        Ok(RagService::new(index, embedder, completion, template).with_top_k(self.config.top_k))
    }

    async fn handle_chat(&self) -> Result<()> {
        // Credential first: no network traffic without it.
        self.config.require_api_key()?;
        let service = self.build_rag_service()?;
        eprintln!("Loading vector index...");
        service.ensure_ready().await?;

        let mut transcript = Transcript::new();
        redraw(&transcript)?;
        println!("Type 'exit' to quit. Press Ctrl-C while waiting to cancel a question.");

        loop {
            let input: String = match Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Write your medical query here")
                .allow_empty(true)
                .interact_text()
            {
                Ok(input) => input,
                // Ctrl-C at the prompt ends the session like `exit`.
                Err(err) if is_interrupted(&err) => {
                    println!();
                    break;
                }
                Err(err) => return Err(err.into()),
            };
            let query = input.trim();
            if query.is_empty() {
                continue;
            }
            if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
                break;
            }

            transcript.push_user(query);
            redraw(&transcript)?;
            eprintln!("Thinking...");

            let outcome = tokio::select! {
                result = service.answer(query) => Some(result),
                _ = tokio::signal::ctrl_c() => None,
            };

            match outcome {
                Some(Ok(answer)) => {
                    transcript.push_assistant(renderer::format_answer(&answer));
                    redraw(&transcript)?;
                }
                Some(Err(err)) if err.is_fatal() => return Err(err.into()),
                Some(Err(err)) => report_error(&err),
                None => {
                    tracing::info!("question cancelled");
                    println!("\n{}", "Cancelled. The question was not answered.".yellow());
                }
            }
        }

        Ok(())
    }
}

/// Repaint the title and the whole conversation.
fn redraw(transcript: &Transcript) -> io::Result<()> {
    let mut stdout = io::stdout();
    if stdout.is_terminal() {
        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
    }
    println!("{}\n", TITLE.bold());
    if !transcript.is_empty() {
        println!("{}\n", renderer::render_colored(transcript));
    }
    Ok(())
}

fn is_interrupted(err: &dialoguer::Error) -> bool {
    matches!(err, dialoguer::Error::IO(io_err) if io_err.kind() == io::ErrorKind::Interrupted)
}

fn report_error(err: &BotError) {
    tracing::warn!(code = err.error_code(), error = %err, "turn failed");
    println!("{} {}", "Error:".red().bold(), err.to_string().red());
}
