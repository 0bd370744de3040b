pub mod clock;
pub mod context;
pub mod contact;
pub mod key_value;
pub mod plan;
pub mod slot;

use crate::{error::ProcessingError, transform::pipeline::StageContext, validation::ValidationResult};
use clock::{Clock, SystemClock};
use connectors::xml::{NodeId, XmlTree};
use context::{DocumentContext, SlotBinding};
use expression_engine::{EvalContext, FunctionRegistry};
use model::{
    MappingContract, Value,
    contract::{
        mapping_type::MappingType,
        tables::{TableScope, TargetTable},
    },
    records::{batch::MappedRecords, row::Row},
};
use plan::{FieldOutcome, FieldPlan};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, trace};

/// Turns a parsed document into per-table rows, driven by the contract.
///
/// Stage chains and expressions are built once in [`DataMapper::new`]; a
/// mapper holds no per-document state, so mapping the same tree twice
/// yields the same rows.
pub struct DataMapper {
    contract: Arc<MappingContract>,
    plans: BTreeMap<TargetTable, Vec<FieldPlan>>,
    order: Vec<TargetTable>,
    functions: FunctionRegistry,
    clock: Arc<dyn Clock>,
}

impl DataMapper {
    pub fn new(contract: Arc<MappingContract>) -> Result<Self, ProcessingError> {
        let bits = Arc::new(contract.bit_conversions.clone());

        let mut plans: BTreeMap<TargetTable, Vec<FieldPlan>> = BTreeMap::new();
        for mapping in &contract.mappings {
            let plan = FieldPlan::new(mapping.clone(), &contract, &bits)?;
            plans.entry(mapping.target_table).or_default().push(plan);
        }

        Ok(Self {
            order: contract.insertion_order(),
            contract,
            plans,
            functions: FunctionRegistry::default(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn contract(&self) -> &MappingContract {
        &self.contract
    }

    pub fn insertion_order(&self) -> &[TargetTable] {
        &self.order
    }

    /// Maps one validated document. `validation` must come from the same
    /// tree, since its contacts are node ids into it.
    pub fn map(
        &self,
        tree: &XmlTree,
        validation: &ValidationResult,
    ) -> Result<MappedRecords, ProcessingError> {
        let app_id = validation.app_id.ok_or(ProcessingError::MissingAppId)?;

        let mut run = DocumentRun {
            mapper: self,
            doc: DocumentContext::new(tree, &self.contract, self.clock.now()),
            validation,
            app_id,
            records: MappedRecords::new(),
        };

        for table in &self.order {
            let Some(plans) = self.plans.get(table) else {
                continue;
            };
            match table.scope() {
                TableScope::Application => run.map_application(*table, plans),
                TableScope::Contact => run.map_contacts(*table, plans),
                TableScope::ContactChild => run.map_contact_children(*table, plans),
                TableScope::Slot => run.map_slots(*table, plans),
                TableScope::KeyValue => run.map_key_values(*table, plans),
            }
        }

        let records = run.records;
        if records.is_empty() {
            return Err(ProcessingError::EmptyResult { app_id });
        }

        debug!(
            app_id,
            rows = records.total_rows(),
            tables = records.ordered(&self.order).len(),
            "Mapped document"
        );
        Ok(records)
    }
}

/// State for mapping a single document.
pub(crate) struct DocumentRun<'a> {
    mapper: &'a DataMapper,
    doc: DocumentContext<'a>,
    validation: &'a ValidationResult,
    app_id: i64,
    records: MappedRecords,
}

/// A row built from one anchor element, before key injection.
pub(crate) struct BuiltRow {
    row: Row,
    identity_insert: bool,
}

impl DocumentRun<'_> {
    fn contract(&self) -> &MappingContract {
        &self.mapper.contract
    }

    fn stage_context<'c>(&'c self, eval: &'c EvalContext) -> StageContext<'c> {
        StageContext {
            eval,
            functions: &self.mapper.functions,
        }
    }

    fn source_node(&self, plan: &FieldPlan, anchor: Option<NodeId>) -> Option<NodeId> {
        match plan.selector() {
            Some(MappingType::LastValidPrContact) => self
                .validation
                .primary_contact(&self.contract().element_filtering)
                .map(|c| c.node),
            Some(MappingType::CurrAddressOnly) => self.current_address(anchor),
            _ => self.doc.resolve_node(&plan.mapping.xml_path, anchor),
        }
    }

    /// Resolves every non key-value plan of `table` against `anchor`.
    /// `None` means a field asked for the row to be dropped.
    fn build_row(
        &self,
        table: TargetTable,
        plans: &[FieldPlan],
        anchor: Option<NodeId>,
        slot: Option<&SlotBinding>,
    ) -> Option<BuiltRow> {
        let mut built = BuiltRow {
            row: Row::new(),
            identity_insert: false,
        };

        for plan in plans {
            if plan.mapping.key_value().is_some() {
                continue;
            }

            // A missing element still runs the chain so defaults and
            // `required` apply.
            let node = self.source_node(plan, anchor);
            let raw = node.and_then(|n| {
                self.doc
                    .read(n, plan.attribute(slot.map(|s| s.number)).as_deref())
            });
            let eval = if plan.needs_context() {
                self.doc.element_context(node, slot)
            } else {
                EvalContext::new(self.doc.now)
            };

            match plan.resolve(raw, &self.stage_context(&eval)) {
                FieldOutcome::Value(value) => {
                    built.identity_insert |= plan.is_identity_insert();
                    built.row.set(plan.mapping.target_column.clone(), value);
                }
                FieldOutcome::Absent => {}
                FieldOutcome::SkipRow => {
                    trace!(table = %table, column = %plan.mapping.target_column, "Dropping row");
                    return None;
                }
            }
        }

        Some(built)
    }

    /// Adds the built row unless it carries no mapped value. The root table
    /// row is always kept.
    fn keep(&mut self, table: TargetTable, built: BuiltRow, con_id: Option<&str>) -> Option<Row> {
        if built.row.is_empty() && table != TargetTable::AppBase {
            trace!(table = %table, "Dropping row without values");
            return None;
        }
        if built.identity_insert {
            self.records.mark_identity_insert(table);
        }
        let mut row = built.row;
        self.inject_keys(table, &mut row, con_id);
        Some(row)
    }

    /// Writes parent keys that no mapping populated: the relationship's
    /// foreign key, `app_id` on document-level tables and `con_id` on
    /// contact tables.
    fn inject_keys(&self, table: TargetTable, row: &mut Row, con_id: Option<&str>) {
        let app_id = Value::Int(self.app_id);
        let con_id = con_id.map(key_value_of);

        if let Some(rel) = self.contract().relationship_for(table) {
            let parent_key = match rel.parent_table.scope() {
                TableScope::Contact | TableScope::ContactChild => con_id.clone(),
                _ => Some(app_id.clone()),
            };
            if let Some(key) = parent_key {
                row.set_if_absent(&rel.foreign_key_column, key);
            }
        }

        let scope = table.scope();
        if scope != TableScope::ContactChild {
            row.set_if_absent("app_id", app_id);
        }
        if matches!(scope, TableScope::Contact | TableScope::ContactChild) {
            if let Some(con_id) = con_id {
                row.set_if_absent("con_id", con_id);
            }
        }
    }

    fn map_application(&mut self, table: TargetTable, plans: &[FieldPlan]) {
        let Some(built) = self.build_row(table, plans, None, None) else {
            return;
        };
        if let Some(row) = self.keep(table, built, None) {
            self.records.push(table, row);
        }
    }
}

/// Numeric keys are written as integers, anything else verbatim.
fn key_value_of(raw: &str) -> Value {
    raw.trim()
        .parse::<i64>()
        .map(Value::Int)
        .unwrap_or_else(|_| Value::String(raw.trim().to_string()))
}

/// Replaces an earlier row with the same key, so the last occurrence wins.
/// Rows missing a key column are always appended.
fn push_unique(rows: &mut Vec<Row>, row: Row, key_columns: &[&str]) {
    if key_columns.is_empty() {
        rows.push(row);
        return;
    }
    let key: Option<Vec<&Value>> = key_columns.iter().map(|c| row.get(c)).collect();
    let existing = key.and_then(|key| {
        rows.iter().position(|r| {
            key_columns
                .iter()
                .zip(&key)
                .all(|(c, v)| r.get(c) == Some(*v))
        })
    });
    match existing {
        Some(pos) => rows[pos] = row,
        None => rows.push(row),
    }
}

#[cfg(test)]
mod tests;
