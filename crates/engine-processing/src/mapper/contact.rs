use super::{DocumentRun, plan::FieldPlan, push_unique};
use connectors::xml::NodeId;
use model::{contract::tables::TargetTable, records::row::Row};
use tracing::trace;

impl DocumentRun<'_> {
    /// One row per valid contact.
    pub(crate) fn map_contacts(&mut self, table: TargetTable, plans: &[FieldPlan]) {
        let validation = self.validation;
        let mut rows: Vec<Row> = Vec::new();

        for contact in &validation.valid_contacts {
            let Some(built) = self.build_row(table, plans, Some(contact.node), None) else {
                continue;
            };
            if let Some(row) = self.keep(table, built, Some(&contact.con_id)) {
                push_unique(&mut rows, row, table.unique_key());
            }
        }

        self.records.extend(table, rows);
    }

    /// One row per address or employment element of each valid contact,
    /// deduplicated on `(con_id, type)`.
    pub(crate) fn map_contact_children(&mut self, table: TargetTable, plans: &[FieldPlan]) {
        let (mapper, validation) = (self.mapper, self.validation);
        let Some(element) = mapper.contract.element_filtering.child_element(table) else {
            return;
        };

        let mut rows: Vec<Row> = Vec::new();
        for contact in &validation.valid_contacts {
            let children: Vec<NodeId> = self
                .doc
                .tree
                .children_named(contact.node, element)
                .collect();

            for child in children {
                let Some(built) = self.build_row(table, plans, Some(child), None) else {
                    continue;
                };
                if let Some(row) = self.keep(table, built, Some(&contact.con_id)) {
                    push_unique(&mut rows, row, table.unique_key());
                }
            }
        }

        trace!(table = %table, rows = rows.len(), "Mapped contact children");
        self.records.extend(table, rows);
    }

    /// The contact that `anchor` belongs to, or the primary contact when the
    /// anchor sits outside any valid contact.
    fn owning_contact(&self, anchor: Option<NodeId>) -> Option<NodeId> {
        let tree = self.doc.tree;
        let contacts = &self.validation.valid_contacts;

        if let Some(anchor) = anchor {
            let owner = std::iter::once(anchor)
                .chain(tree.ancestors(anchor))
                .find(|id| contacts.iter().any(|c| c.node == *id));
            if owner.is_some() {
                return owner;
            }
        }

        self.validation
            .primary_contact(&self.mapper.contract.element_filtering)
            .map(|c| c.node)
    }

    /// Last address child of the owning contact whose type is the current one.
    pub(crate) fn current_address(&self, anchor: Option<NodeId>) -> Option<NodeId> {
        let tree = self.doc.tree;
        let filtering = &self.mapper.contract.element_filtering;
        let contact = self.owning_contact(anchor)?;

        tree.children_named(contact, &filtering.address_element)
            .filter(|id| {
                tree.attribute(*id, &filtering.address_type_attribute)
                    .is_some_and(|t| t.trim() == filtering.current_address_type)
            })
            .last()
    }
}
