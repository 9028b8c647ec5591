use colored::Colorize;
use domain::models::Answer;
use domain::session::{ConversationTurn, Role, Transcript};

pub const TITLE: &str = "👨‍⚕️ MediBot - Ask Your Medical Assistant";

/// Assistant turn content: the answer followed by a bulleted citation list.
pub fn format_answer(answer: &Answer) -> String {
    if answer.citations.is_empty() {
        return answer.text.clone();
    }
    let sources = answer
        .citations
        .iter()
        .map(|c| format!("- {}", c.display_line()))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\n**Source Docs:**\n{}", answer.text, sources)
}

fn label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "MediBot",
    }
}

fn render_turn(turn: &ConversationTurn, styled: bool) -> String {
    let label = if styled {
        match turn.role {
            Role::User => label(turn.role).cyan().bold().to_string(),
            Role::Assistant => label(turn.role).green().bold().to_string(),
        }
    } else {
        label(turn.role).to_string()
    };
    format!("{}:\n{}", label, turn.content)
}

fn render_styled(transcript: &Transcript, styled: bool) -> String {
    transcript
        .turns()
        .iter()
        .map(|turn| render_turn(turn, styled))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Plain-text projection of the whole transcript, oldest turn first.
pub fn render(transcript: &Transcript) -> String {
    render_styled(transcript, false)
}

pub fn render_colored(transcript: &Transcript) -> String {
    render_styled(transcript, true)
}
