use shared::errors::BotError;
use shared::types::Result;

/// Instruction sent to the model with every question.
pub const MEDICAL_PROMPT_TEMPLATE: &str = "\
Use the pieces of information provided in the context to answer the user's question.
If you don't know the answer, just say that you don't know, don't try to make up an answer.
Do not provide anything outside the given context.

Context: {context}
Question: {question}

Start the answer directly. No small talk please.
";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Context,
    Question,
}

/// A prompt with `{context}` and `{question}` slots, validated once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn medical() -> Result<Self> {
        Self::parse(MEDICAL_PROMPT_TEMPLATE)
    }

    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let name_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let closes = after[name_len..].starts_with('}');

            // Braces that don't wrap an identifier are plain text.
            if name_len == 0 || !closes {
                literal.push('{');
                rest = after;
                continue;
            }

            let slot = match &after[..name_len] {
                "context" => Segment::Context,
                "question" => Segment::Question,
                other => {
                    return Err(BotError::Configuration(format!(
                        "prompt template has unknown placeholder {{{other}}}"
                    )))
                }
            };
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(slot);
            rest = &after[name_len + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        for (slot, name) in [(Segment::Context, "context"), (Segment::Question, "question")] {
            if !segments.contains(&slot) {
                return Err(BotError::Configuration(format!(
                    "prompt template is missing the {{{name}}} placeholder"
                )));
            }
        }

        Ok(Self { segments })
    }

    /// Fill both slots in one pass; values are inserted verbatim.
    pub fn build(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(
            self.segments
                .iter()
                .map(|s| match s {
                    Segment::Literal(text) => text.len(),
                    Segment::Context => context.len(),
                    Segment::Question => question.len(),
                })
                .sum(),
        );
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Context => out.push_str(context),
                Segment::Question => out.push_str(question),
            }
        }
        out
    }
}
