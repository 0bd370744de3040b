use super::{DocumentRun, context::SlotBinding, plan::FieldPlan};
use model::{Value, contract::tables::TargetTable};
use tracing::trace;

impl DocumentRun<'_> {
    /// One row per slot that carries a meaningful value. A table without a
    /// slot group is mapped as a single document-level row.
    pub(crate) fn map_slots(&mut self, table: TargetTable, plans: &[FieldPlan]) {
        let mapper = self.mapper;
        let Some(group) = mapper.contract.slot_group(table) else {
            self.map_application(table, plans);
            return;
        };
        let Some(node) = self.doc.resolve_node(&group.xml_path, None) else {
            return;
        };

        for &number in &group.slots {
            let attributes = self
                .doc
                .tree
                .attributes(node)
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()));
            if !group.slot_present(number, attributes) {
                trace!(table = %table, slot = number, "Slot is empty");
                continue;
            }

            let binding = SlotBinding {
                number,
                prefix: group.prefix(number),
            };
            let Some(mut built) = self.build_row(table, plans, Some(node), Some(&binding)) else {
                continue;
            };
            if built.row.is_empty() {
                continue;
            }
            if let Some(column) = &group.slot_column {
                built.row.set_if_absent(column, Value::Int(i64::from(number)));
            }
            if let Some(row) = self.keep(table, built, None) {
                self.records.push(table, row);
            }
        }
    }
}
