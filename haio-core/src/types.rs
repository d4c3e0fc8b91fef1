use serde::{Deserialize, Serialize};

use crate::error::{HaioError, Result};

/// A question-body value that is either a literal string or an index
/// into the [`DataList`] supplied at instantiation time.
///
/// `Slot` must be tried before `Literal` under `#[serde(untagged)]` so a
/// JSON integer deserialises as a slot index rather than being coerced
/// into a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Slot(usize),
    Literal(String),
}

impl SlotValue {
    fn resolve(&self, data: &[String]) -> Result<String> {
        match self {
            SlotValue::Literal(s) => Ok(s.clone()),
            SlotValue::Slot(i) => data.get(*i).cloned().ok_or_else(|| HaioError::InvalidQuestion {
                reason: format!("slot index {i} out of range for a data list of length {}", data.len()),
            }),
        }
    }
}

impl From<&str> for SlotValue {
    fn from(s: &str) -> Self {
        SlotValue::Literal(s.to_string())
    }
}

impl From<usize> for SlotValue {
    fn from(i: usize) -> Self {
        SlotValue::Slot(i)
    }
}

/// One element of a question body.
///
/// Rendering a `Node` into Markdown, HTML, or a multimodal request body
/// is the responsibility of a specific worker back-end, never of this
/// crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Heading { level: u8, value: SlotValue },
    Paragraph { value: SlotValue },
    Image { src: SlotValue },
}

impl Node {
    fn resolve(&self, data: &[String]) -> Result<Node> {
        Ok(match self {
            Node::Heading { level, value } => Node::Heading { level: *level, value: SlotValue::Literal(value.resolve(data)?) },
            Node::Paragraph { value } => Node::Paragraph { value: SlotValue::Literal(value.resolve(data)?) },
            Node::Image { src } => Node::Image { src: SlotValue::Literal(src.resolve(data)?) },
        })
    }

    fn validate(&self) -> Result<()> {
        if let Node::Heading { level, .. } = self {
            if !(1..=6).contains(level) {
                return Err(HaioError::InvalidQuestion { reason: format!("heading level {level} out of range 1..=6") });
            }
        }
        Ok(())
    }
}

/// The shape of an answer a worker must produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerSpec {
    Number,
    Text,
    Select { options: Vec<String> },
}

impl AnswerSpec {
    pub fn is_select(&self) -> bool {
        matches!(self, AnswerSpec::Select { .. })
    }

    fn validate(&self) -> Result<()> {
        if let AnswerSpec::Select { options } = self {
            if options.is_empty() {
                return Err(HaioError::InvalidQuestion { reason: "select answer must have at least one option".into() });
            }
            let mut seen = std::collections::HashSet::with_capacity(options.len());
            for option in options {
                if !seen.insert(option) {
                    return Err(HaioError::InvalidQuestion { reason: format!("duplicate select option '{option}'") });
                }
            }
        }
        Ok(())
    }
}

/// An immutable description of a question's shape, independent of any
/// particular data binding.
///
/// `QuestionConfig` is the same shape after every [`SlotValue::Slot`]
/// has been resolved to a [`SlotValue::Literal`] by [`insert_data`] — the
/// two are aliased, mirroring the original package's own `QuestionConfig`/
/// `QuestionTemplate` `TypedDict`s, which share one definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTemplate {
    pub title: String,
    pub description: String,
    pub question: Vec<Node>,
    pub answer: AnswerSpec,
}

pub type QuestionConfig = QuestionTemplate;

impl QuestionTemplate {
    pub fn new(title: impl Into<String>, description: impl Into<String>, question: Vec<Node>, answer: AnswerSpec) -> Self {
        Self { title: title.into(), description: description.into(), question, answer }
    }

    /// Reject unknown answer types (impossible once deserialised, but
    /// checked for templates built in-process) and malformed `Select`
    /// option lists.
    pub fn validate(&self) -> Result<()> {
        self.answer.validate()?;
        for node in &self.question {
            node.validate()?;
        }
        Ok(())
    }
}

/// An ordered sequence of strings a template's slots are bound against.
pub type DataList = Vec<String>;

/// A worker's raw answer string. Numeric answers travel as decimal
/// strings; `Select` answers hold exactly one option value.
pub type Answer = String;

/// Bind `data` into every slot of `template`, producing a fully concrete
/// [`QuestionConfig`]. `template` is never mutated.
pub fn insert_data(template: &QuestionTemplate, data: &DataList) -> Result<QuestionConfig> {
    template.validate()?;
    let question = template.question.iter().map(|node| node.resolve(data)).collect::<Result<Vec<_>>>()?;
    Ok(QuestionConfig { title: template.title.clone(), description: template.description.clone(), question, answer: template.answer.clone() })
}

/// The discriminated identity of a worker back-end.
///
/// Serialises as the lowercase label used in the on-disk cache format
/// `"human"`, `"openai"`, `"gemini"`, ...
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum WorkerKind {
    Human,
    Ai(String),
}

impl WorkerKind {
    pub fn ai(kind: impl Into<String>) -> Self {
        WorkerKind::Ai(kind.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            WorkerKind::Human => "human",
            WorkerKind::Ai(kind) => kind.as_str(),
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, WorkerKind::Human)
    }
}

impl std::fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<WorkerKind> for String {
    fn from(kind: WorkerKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for WorkerKind {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Ok(if value == "human" { WorkerKind::Human } else { WorkerKind::Ai(value) })
    }
}
