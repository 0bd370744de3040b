use super::error::TransformError;
use expression_engine::{EvalContext, FunctionRegistry};
use std::sync::Arc;

/// What a stage can see besides the value flowing through the chain.
pub struct StageContext<'a> {
    pub eval: &'a EvalContext,
    pub functions: &'a FunctionRegistry,
}

/// One link of a field's mapping chain. Stages exchange values as text so
/// that any stage can follow any other.
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        value: Option<String>,
        ctx: &StageContext<'_>,
    ) -> Result<Option<String>, TransformError>;

    /// Whether the stage reads the expression context.
    fn needs_context(&self) -> bool {
        false
    }
}

#[derive(Clone)]
pub struct TransformPipeline {
    transforms: Vec<Arc<dyn Transform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Runs the stages left to right; the first error stops the chain.
    pub fn apply(
        &self,
        value: Option<String>,
        ctx: &StageContext<'_>,
    ) -> Result<Option<String>, TransformError> {
        self.transforms
            .iter()
            .try_fold(value, |acc, transform| transform.apply(acc, ctx))
    }

    pub fn add_transform<T: Transform + 'static>(mut self, transform: T) -> Self {
        self.transforms.push(Arc::new(transform));
        self
    }

    pub fn needs_context(&self) -> bool {
        self.transforms.iter().any(|t| t.needs_context())
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Suffix(&'static str);

    impl Transform for Suffix {
        fn name(&self) -> &'static str {
            "suffix"
        }

        fn apply(
            &self,
            value: Option<String>,
            _ctx: &StageContext<'_>,
        ) -> Result<Option<String>, TransformError> {
            Ok(Some(format!("{}{}", value.unwrap_or_default(), self.0)))
        }
    }

    #[test]
    fn test_stages_run_left_to_right() {
        let eval = EvalContext::default();
        let functions = FunctionRegistry::default();
        let ctx = StageContext {
            eval: &eval,
            functions: &functions,
        };

        let pipeline = TransformPipeline::new()
            .add_transform(Suffix("a"))
            .add_transform(Suffix("b"));

        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.apply(None, &ctx).unwrap().as_deref(), Some("ab"));
        assert!(!pipeline.needs_context());
    }
}
