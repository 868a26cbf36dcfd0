//! Prompt template with three named slots.
//!
//! A template is plain text containing `{sensor_status}`, `{rag_context}`
//! and `{user_query}`. Literal braces are written `{{` and `}}`. Templates
//! are parsed once at startup; rendering is a single pass over the parsed
//! segments, so braces inside substituted values are copied verbatim.

use std::path::Path;

use crate::error::TemplateError;

/// A named slot in the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    SensorStatus,
    RagContext,
    UserQuery,
}

impl Placeholder {
    pub const ALL: [Placeholder; 3] = [
        Placeholder::SensorStatus,
        Placeholder::RagContext,
        Placeholder::UserQuery,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::SensorStatus => "sensor_status",
            Placeholder::RagContext => "rag_context",
            Placeholder::UserQuery => "user_query",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Placeholder),
}

/// Values substituted into a [`PromptTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub sensor_status: &'a str,
    pub rag_context: &'a str,
    pub user_query: &'a str,
}

impl<'a> PromptInputs<'a> {
    fn get(&self, slot: Placeholder) -> &'a str {
        match slot {
            Placeholder::SensorStatus => self.sensor_status,
            Placeholder::RagContext => self.rag_context,
            Placeholder::UserQuery => self.user_query,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let template = Self::parse(&text)?;
        tracing::debug!(path = %path.display(), "loaded prompt template");
        Ok(template)
    }

    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, n) in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        if n == '{' {
                            return Err(TemplateError::UnbalancedBrace(pos));
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(TemplateError::UnbalancedBrace(pos));
                    }
                    let slot = Placeholder::from_name(name.trim())
                        .ok_or(TemplateError::UnknownPlaceholder(name))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot(slot));
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                    } else {
                        return Err(TemplateError::UnbalancedBrace(pos));
                    }
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let template = Self { segments };
        for slot in Placeholder::ALL {
            if !template.uses(slot) {
                tracing::warn!(placeholder = slot.name(), "prompt template never uses placeholder");
            }
        }
        Ok(template)
    }

    pub fn uses(&self, slot: Placeholder) -> bool {
        self.segments.contains(&Segment::Slot(slot))
    }

    pub fn render(&self, inputs: &PromptInputs<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(inputs.get(*slot)),
            }
        }
        out
    }
}
