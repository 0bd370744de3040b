use crate::{
    error::ProcessingError,
    transform::{
        build_pipeline,
        coerce::coerce,
        error::{ErrorType, TransformError},
        pipeline::{StageContext, TransformPipeline},
    },
};
use model::{
    MappingContract, Value,
    contract::{
        field::{FieldMapping, NullFallback},
        lookup::BitConversions,
        mapping_type::MappingType,
    },
};
use std::sync::Arc;
use tracing::{debug, warn};

/// What one mapping contributes to its row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    Value(Value),
    /// Nothing to write; the column is left out.
    Absent,
    /// The row this field belongs to must be dropped.
    SkipRow,
}

/// A mapping with its stage chain built once, up front.
pub struct FieldPlan {
    pub mapping: FieldMapping,
    pipeline: TransformPipeline,
}

impl FieldPlan {
    pub fn new(
        mapping: FieldMapping,
        contract: &MappingContract,
        bits: &Arc<BitConversions>,
    ) -> Result<Self, ProcessingError> {
        let pipeline = build_pipeline(&mapping, contract, bits)?;
        Ok(Self { mapping, pipeline })
    }

    pub fn selector(&self) -> Option<&MappingType> {
        self.mapping
            .mapping_type
            .iter()
            .find(|t| t.is_source_selector())
    }

    pub fn is_identity_insert(&self) -> bool {
        self.mapping.has(&MappingType::IdentityInsert)
    }

    pub fn needs_context(&self) -> bool {
        self.pipeline.needs_context()
    }

    /// Attribute to read; a slot number replaces the `{n}` placeholder.
    pub fn attribute(&self, slot: Option<u32>) -> Option<String> {
        let attr = self.mapping.xml_attribute.as_deref()?;
        Some(match slot {
            Some(n) => attr.replace("{n}", &n.to_string()),
            None => attr.to_string(),
        })
    }

    /// Runs the stage chain only. Row-level failures are returned; field
    /// failures are logged and turn into `None`.
    pub fn chain(
        &self,
        raw: Option<String>,
        ctx: &StageContext<'_>,
    ) -> Result<Option<String>, TransformError> {
        match self.pipeline.apply(raw, ctx) {
            Ok(value) => Ok(value),
            Err(err) if err.error_type() == ErrorType::Row => Err(err),
            Err(err) => {
                warn!(
                    table = %self.mapping.target_table,
                    column = %self.mapping.target_column,
                    error = %err,
                    "Stage failed; field treated as absent"
                );
                Ok(None)
            }
        }
    }

    /// Chain, type coercion, then `default_value` and the null fallback.
    pub fn resolve(&self, raw: Option<String>, ctx: &StageContext<'_>) -> FieldOutcome {
        match self.chain(raw, ctx) {
            Ok(chained) => self.finish(chained),
            Err(err) => {
                debug!(
                    table = %self.mapping.target_table,
                    column = %self.mapping.target_column,
                    reason = %err,
                    "Row skipped"
                );
                FieldOutcome::SkipRow
            }
        }
    }

    pub fn finish(&self, chained: Option<String>) -> FieldOutcome {
        let value = chained
            .as_deref()
            .and_then(|text| self.coerce(text))
            .or_else(|| {
                self.mapping
                    .default_text()
                    .and_then(|text| self.coerce(&text))
            });

        match value {
            Some(value) => FieldOutcome::Value(value),
            None if self.mapping.required => FieldOutcome::SkipRow,
            None => match self.mapping.null_fallback() {
                NullFallback::Null => FieldOutcome::Absent,
                NullFallback::EmptyString => FieldOutcome::Value(Value::String(String::new())),
                NullFallback::Skip => FieldOutcome::SkipRow,
            },
        }
    }

    /// Coerces to the column type, logging failures.
    pub fn coerce(&self, text: &str) -> Option<Value> {
        coerce(text, self.mapping.data_type, self.mapping.data_length).unwrap_or_else(|err| {
            warn!(
                table = %self.mapping.target_table,
                column = %self.mapping.target_column,
                error = %err,
                "Type conversion failed"
            );
            None
        })
    }
}
