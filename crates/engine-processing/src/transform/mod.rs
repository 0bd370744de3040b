pub mod coerce;
pub mod computed;
pub mod error;
pub mod pipeline;
pub mod stages;

use crate::error::ProcessingError;
use computed::CalculatedTransform;
use expression_engine::CompiledExpression;
use model::{
    MappingContract,
    contract::{
        field::FieldMapping,
        lookup::{BitConversions, BitKind},
        mapping_type::MappingType,
    },
};
use pipeline::TransformPipeline;
use stages::{BitTransform, CaseOp, CaseTransform, DigitsTransform, EnumTransform, UtcNowDefault};
use std::sync::Arc;

/// Builds the value stages for one mapping, in declaration order. Tags that
/// select a source element, flag identity insert or route to a key-value
/// table have no value stage.
pub fn build_pipeline(
    mapping: &FieldMapping,
    contract: &MappingContract,
    bits: &Arc<BitConversions>,
) -> Result<TransformPipeline, ProcessingError> {
    let mut pipeline = TransformPipeline::new();

    for tag in &mapping.mapping_type {
        pipeline = match tag {
            MappingType::Enum => {
                let name = mapping.enum_name();
                let table = contract.enum_table(&name).cloned().unwrap_or_default();
                let critical = contract.is_critical_enum(&name);
                pipeline.add_transform(EnumTransform::new(name, table, critical))
            }
            MappingType::CharToBit => {
                pipeline.add_transform(BitTransform::new(BitKind::Char, Arc::clone(bits)))
            }
            MappingType::BooleanToBit => {
                pipeline.add_transform(BitTransform::new(BitKind::Boolean, Arc::clone(bits)))
            }
            MappingType::NumbersOnly => pipeline.add_transform(DigitsTransform::numbers_only()),
            MappingType::ExtractNumeric => {
                pipeline.add_transform(DigitsTransform::extract_numeric())
            }
            MappingType::CalculatedField => {
                let source = mapping.expression.as_deref().unwrap_or_default();
                if source.trim().is_empty() {
                    return Err(ProcessingError::MissingExpression {
                        table: mapping.target_table.to_string(),
                        column: mapping.target_column.clone(),
                    });
                }
                let compiled =
                    CompiledExpression::compile(source).map_err(|source| {
                        ProcessingError::Expression {
                            table: mapping.target_table.to_string(),
                            column: mapping.target_column.clone(),
                            source,
                        }
                    })?;
                pipeline.add_transform(CalculatedTransform::new(compiled))
            }
            MappingType::DefaultGetUtcDateIfNull => pipeline.add_transform(UtcNowDefault),
            MappingType::Trim => pipeline.add_transform(CaseTransform(CaseOp::Trim)),
            MappingType::Upper => pipeline.add_transform(CaseTransform(CaseOp::Upper)),
            MappingType::Lower => pipeline.add_transform(CaseTransform(CaseOp::Lower)),
            MappingType::IdentityInsert
            | MappingType::CurrAddressOnly
            | MappingType::LastValidPrContact
            | MappingType::AddScore { .. }
            | MappingType::AddIndicator { .. }
            | MappingType::AddHistory => pipeline,
        };
    }

    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> MappingContract {
        MappingContract::from_json(
            r#"{
                "source_table": "app_xml", "source_column": "xml", "xml_root_element": "Provenir",
                "mappings": [],
                "enum_mappings": {"status_enum": {"Y": 5}}
            }"#,
        )
        .unwrap()
    }

    fn mapping(json: &str) -> FieldMapping {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_stage_order_follows_declaration() {
        let m = mapping(
            r#"{"xml_path": "/Provenir/a", "xml_attribute": "s", "target_table": "app_base",
                "target_column": "status_enum", "data_type": "int",
                "mapping_type": "trim, enum, char_to_bit, identity_insert"}"#,
        );
        let bits = Arc::new(BitConversions::default());
        let pipeline = build_pipeline(&m, &contract(), &bits).unwrap();
        assert_eq!(pipeline.stage_names(), vec!["trim", "enum", "char_to_bit"]);
    }

    #[test]
    fn test_calculated_field_requires_valid_expression() {
        let bits = Arc::new(BitConversions::default());
        let missing = mapping(
            r#"{"xml_path": "/Provenir/a", "target_table": "app_base", "target_column": "x",
                "data_type": "int", "mapping_type": "calculated_field"}"#,
        );
        assert!(matches!(
            build_pipeline(&missing, &contract(), &bits),
            Err(ProcessingError::MissingExpression { .. })
        ));

        let mut broken = missing.clone();
        broken.expression = Some("CASE WHEN".into());
        assert!(matches!(
            build_pipeline(&broken, &contract(), &bits),
            Err(ProcessingError::Expression { .. })
        ));
    }
}
