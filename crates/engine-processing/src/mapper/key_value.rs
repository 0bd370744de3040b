use super::{DocumentRun, plan::FieldPlan};
use expression_engine::EvalContext;
use model::{
    Value,
    contract::{mapping_type::KeyValueKind, tables::TargetTable},
    records::row::Row,
};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Values that never produce a key-value row, compared after trimming.
fn is_emittable(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != "None"
}

impl DocumentRun<'_> {
    /// Zero or one row per identifier. The source element is searched for
    /// by name anywhere in the document; the first one holding an emittable
    /// value wins.
    pub(crate) fn map_key_values(&mut self, table: TargetTable, plans: &[FieldPlan]) {
        let mut seen: HashSet<String> = HashSet::new();

        for plan in plans {
            let Some((kind, identifier)) = plan.mapping.key_value() else {
                debug!(
                    table = %table,
                    column = %plan.mapping.target_column,
                    "Ignoring mapping without a key-value tag"
                );
                continue;
            };
            let name = identifier
                .map(str::to_string)
                .unwrap_or_else(|| plan.mapping.target_column.clone());
            if seen.contains(&name) {
                continue;
            }

            if let Some(row) = self.key_value_row(plan, kind, &name) {
                seen.insert(name);
                self.records.push(table, row);
            }
        }
    }

    fn key_value_row(&self, plan: &FieldPlan, kind: KeyValueKind, name: &str) -> Option<Row> {
        let tree = self.doc.tree;
        let element = plan
            .mapping
            .xml_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let attribute = plan.attribute(None);

        for node in tree.find_descendants(element) {
            let raw = self.doc.read(node, attribute.as_deref());
            let eval = if plan.needs_context() {
                self.doc.element_context(Some(node), None)
            } else {
                EvalContext::new(self.doc.now)
            };

            let text = match plan.chain(raw, &self.stage_context(&eval)) {
                Ok(Some(text)) if is_emittable(&text) => text,
                Ok(_) => continue,
                Err(err) => {
                    trace!(identifier = name, reason = %err, "Key-value value skipped");
                    continue;
                }
            };
            let Some(value) = plan.coerce(&text) else {
                continue;
            };

            let mut row = Row::new();
            row.set("app_id", Value::Int(self.app_id));
            match kind {
                KeyValueKind::Score => {
                    row.set("score_identifier", Value::from(name));
                    row.set("score", value);
                }
                KeyValueKind::Indicator => {
                    row.set("indicator", Value::from(name));
                    row.set("value", value);
                }
                KeyValueKind::History => {
                    row.set("name", Value::from(name));
                    row.set("source", Value::from(tree.node(node).name.as_str()));
                    row.set("value", value);
                }
            }
            return Some(row);
        }

        None
    }
}
