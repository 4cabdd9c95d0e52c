/// Routing decision for one page, produced by the classifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Task {
    NumericSum {
        resource: Option<String>,
        page_text: String,
    },
    TextLookup {
        resource: Option<String>,
    },
    ImageDescribe {
        resource: Option<String>,
        question: String,
    },
    Trivia {
        question: String,
    },
    Unknown {
        page_text: String,
    },
}

/// Tag used to key the resolver dispatch table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    NumericSum,
    TextLookup,
    ImageDescribe,
    Trivia,
    Unknown,
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Task::NumericSum { .. } => TaskKind::NumericSum,
            Task::TextLookup { .. } => TaskKind::TextLookup,
            Task::ImageDescribe { .. } => TaskKind::ImageDescribe,
            Task::Trivia { .. } => TaskKind::Trivia,
            Task::Unknown { .. } => TaskKind::Unknown,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::NumericSum => write!(f, "numeric_sum"),
            TaskKind::TextLookup => write!(f, "text_lookup"),
            TaskKind::ImageDescribe => write!(f, "image_describe"),
            TaskKind::Trivia => write!(f, "trivia"),
            TaskKind::Unknown => write!(f, "unknown"),
        }
    }
}
