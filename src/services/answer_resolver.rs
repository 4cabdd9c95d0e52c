use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    models::domain::{AnswerValue, Task, TaskKind},
    services::{
        heuristic_resolvers::{
            CsvSumResolver, ImagePlaceholderResolver, KnownAnswerResolver, TextLookupResolver,
        },
        model_service::{LanguageModel, ModelImageResolver, ModelTextResolver},
        page_fetcher::PageFetcher,
    },
};

/// Turns a classified task into an answer. Failures are reported as
/// `AnswerValue::ErrorMarker`, never as errors.
#[async_trait]
pub trait AnswerResolver: Send + Sync {
    async fn resolve(&self, task: &Task) -> AnswerValue;
}

/// Flat dispatch table keyed by task tag.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<TaskKind, Arc<dyn AnswerResolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(mut self, kind: TaskKind, resolver: Arc<dyn AnswerResolver>) -> Self {
        self.resolvers.insert(kind, resolver);
        self
    }

    /// String heuristics only; no external model calls.
    pub fn heuristic(fetcher: Arc<dyn PageFetcher>) -> Self {
        let known = Arc::new(KnownAnswerResolver);

        Self::new()
            .with_resolver(
                TaskKind::NumericSum,
                Arc::new(CsvSumResolver::new(fetcher.clone())),
            )
            .with_resolver(TaskKind::TextLookup, Arc::new(TextLookupResolver::new(fetcher)))
            .with_resolver(TaskKind::ImageDescribe, Arc::new(ImagePlaceholderResolver))
            .with_resolver(TaskKind::Trivia, known.clone())
            .with_resolver(TaskKind::Unknown, known)
    }

    /// Heuristics, with image and unrecognised pages sent to the model.
    pub fn model_augmented(fetcher: Arc<dyn PageFetcher>, model: Arc<dyn LanguageModel>) -> Self {
        Self::heuristic(fetcher.clone())
            .with_resolver(
                TaskKind::ImageDescribe,
                Arc::new(ModelImageResolver::new(fetcher, model.clone())),
            )
            .with_resolver(TaskKind::Unknown, Arc::new(ModelTextResolver::new(model)))
    }

    pub fn has_resolver(&self, kind: TaskKind) -> bool {
        self.resolvers.contains_key(&kind)
    }
}

#[async_trait]
impl AnswerResolver for ResolverRegistry {
    async fn resolve(&self, task: &Task) -> AnswerValue {
        let kind = task.kind();
        match self.resolvers.get(&kind) {
            Some(resolver) => resolver.resolve(task).await,
            None => {
                log::warn!("No resolver registered for {} task", kind);
                AnswerValue::undetermined()
            }
        }
    }
}
