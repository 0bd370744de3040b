use chrono::{NaiveDate, NaiveDateTime};
use connectors::sql::{insert::ConnectionProvider, memory::MemoryProvider};
use engine_config::load_contract;
use engine_core::RetryPolicy;
use engine_processing::FixedClock;
use engine_runtime::{Coordinator, CoordinatorConfig};
use model::{MappingContract, execution::work::WorkItem};
use std::{path::PathBuf, sync::Arc, time::Duration};

pub const SCHEMA: &str = "dbo";

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

pub fn fixture_contract() -> Arc<MappingContract> {
    Arc::new(load_contract(&fixture_path("contract.json")).expect("fixture contract loads"))
}

/// Wall clock every fixture run is pinned to.
pub fn fixture_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

pub fn qualified(table: &str) -> String {
    format!("[{SCHEMA}].[{table}]")
}

pub fn test_config(workers: usize) -> CoordinatorConfig {
    CoordinatorConfig {
        workers,
        item_timeout: Duration::from_secs(10),
        queue_capacity: 8,
        progress_interval: 5,
        max_failed_listed: 20,
        retry: RetryPolicy::none(),
    }
}

pub fn coordinator(provider: &MemoryProvider, config: CoordinatorConfig) -> Coordinator {
    let provider: Arc<dyn ConnectionProvider> = Arc::new(provider.clone());
    Coordinator::new(fixture_contract(), provider, config)
        .with_clock(Arc::new(FixedClock(fixture_now())))
}

/// Work items numbered from zero, in the order given.
pub fn work_items(documents: impl IntoIterator<Item = String>) -> Vec<WorkItem> {
    documents
        .into_iter()
        .enumerate()
        .map(|(seq, xml)| WorkItem::new(seq as u64, None, xml, format!("doc-{seq}")))
        .collect()
}

type Attrs = Vec<(String, String)>;

fn attrs(pairs: &[(&str, &str)]) -> Attrs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn set(attrs: &mut Attrs, key: &str, value: &str) {
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some(slot) => slot.1 = value.to_string(),
        None => attrs.push((key.to_string(), value.to_string())),
    }
}

fn render_element(out: &mut String, indent: usize, name: &str, attrs: &Attrs, children: &[String]) {
    out.push_str(&" ".repeat(indent));
    out.push('<');
    out.push_str(name);
    for (k, v) in attrs {
        out.push_str(&format!(" {k}=\"{v}\""));
    }
    if children.is_empty() {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");
    for child in children {
        out.push_str(child);
    }
    out.push_str(&" ".repeat(indent));
    out.push_str(&format!("</{name}>\n"));
}

/// A `<contact>` element with its address and employment children.
#[derive(Debug, Clone)]
pub struct ContactXml {
    attrs: Attrs,
    children: Vec<(&'static str, Attrs)>,
}

impl ContactXml {
    pub fn new(con_id: i64, role: &str, first_name: &str) -> Self {
        let con_id = con_id.to_string();
        Self {
            attrs: attrs(&[
                ("con_id", &con_id),
                ("ac_role_tp_c", role),
                ("first_name", first_name),
            ]),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        set(&mut self.attrs, key, value);
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.attrs.retain(|(k, _)| k != key);
        self
    }

    pub fn address(mut self, address_type: &str, city: &str, state: &str) -> Self {
        self.children.push((
            "contact_address",
            attrs(&[("address_tp_c", address_type), ("city", city), ("state", state)]),
        ));
        self
    }

    pub fn employment(mut self, employment_type: &str, years: &str, months: &str) -> Self {
        self.children.push((
            "contact_employment",
            attrs(&[
                ("employment_tp_c", employment_type),
                ("b_years_at_job", years),
                ("b_months_at_job", months),
            ]),
        ));
        self
    }

    pub fn employment_attr(mut self, key: &str, value: &str) -> Self {
        if let Some((_, attrs)) = self
            .children
            .iter_mut()
            .rev()
            .find(|(name, _)| *name == "contact_employment")
        {
            set(attrs, key, value);
        }
        self
    }

    fn render(&self, indent: usize) -> String {
        let children: Vec<String> = self
            .children
            .iter()
            .map(|(name, attrs)| {
                let mut out = String::new();
                render_element(&mut out, indent + 2, name, attrs, &[]);
                out
            })
            .collect();
        let mut out = String::new();
        render_element(&mut out, indent, "contact", &self.attrs, &children);
        out
    }
}

/// Builds `<Provenir>` documents shaped like the production feed.
#[derive(Debug, Clone)]
pub struct ApplicationXml {
    app_id: Option<String>,
    application: Attrs,
    collateral: Attrs,
    rmts_info: Attrs,
    contacts: Vec<ContactXml>,
}

impl ApplicationXml {
    /// An application with every fixture table populated.
    pub fn standard(app_id: i64) -> Self {
        let primary = app_id * 10 + 1;
        let secondary = app_id * 10 + 2;
        Self {
            app_id: Some(app_id.to_string()),
            application: attrs(&[
                ("app_type_code", "PRODB"),
                ("decision_tp_c", "APPRV"),
                ("app_receive_date", "2023-11-02 14:05:00"),
                ("rushed_flag", "Y"),
                ("assigned_to", "ANALYST"),
                ("requested_amount", "$12,500.00"),
                ("population_assignment", "CM"),
                ("rush_ind", "Y"),
                ("legacy_status", "ACTIVE"),
            ]),
            collateral: attrs(&[
                ("coll1_year", "2020"),
                ("coll1_make", "FORD"),
                ("coll1_value", "15000.00"),
                ("coll1_new_used_demo", "U"),
                ("coll2_new_used_demo", "N"),
            ]),
            rmts_info: attrs(&[("TU_TRIGGER", "0"), ("FICO", "")]),
            contacts: vec![
                ContactXml::new(primary, "PR", " Ann ")
                    .attr("home_phone", "(701) 555-0100")
                    .attr("birth_date", "1985-03-14")
                    .address("CURR", "Fargo", "ND")
                    .address("PREV", "Minot", "ND")
                    .address("CURR", "Bismarck", "ND")
                    .employment("CURR", "2", "10")
                    .employment_attr("b_salary", "$4,500.00"),
                ContactXml::new(secondary, "AUTHU", "bob").address("MAIL", "Nowhere", "ND"),
            ],
        }
    }

    pub fn without_app_id(mut self) -> Self {
        self.app_id = None;
        self
    }

    pub fn application(mut self, key: &str, value: &str) -> Self {
        set(&mut self.application, key, value);
        self
    }

    pub fn without_application(mut self, key: &str) -> Self {
        self.application.retain(|(k, _)| k != key);
        self
    }

    pub fn collateral(mut self, key: &str, value: &str) -> Self {
        set(&mut self.collateral, key, value);
        self
    }

    pub fn score(mut self, identifier: &str, value: &str) -> Self {
        set(&mut self.rmts_info, identifier, value);
        self
    }

    pub fn contacts(mut self, contacts: Vec<ContactXml>) -> Self {
        self.contacts = contacts;
        self
    }

    pub fn render(&self) -> String {
        let mut request = Attrs::new();
        if let Some(id) = &self.app_id {
            request.push(("ID".to_string(), id.clone()));
        }

        let mut collateral = String::new();
        render_element(&mut collateral, 8, "collateral", &self.collateral, &[]);
        let mut application = String::new();
        render_element(&mut application, 6, "application", &self.application, &[collateral]);
        let mut rmts = String::new();
        render_element(&mut rmts, 6, "rmts_info", &self.rmts_info, &[]);

        let mut cust_app = vec![application, rmts];
        cust_app.extend(self.contacts.iter().map(|c| c.render(6)));

        let mut cust = String::new();
        render_element(&mut cust, 4, "CustApp", &Attrs::new(), &cust_app);
        let mut out = String::new();
        render_element(&mut out, 2, "Request", &request, &[cust]);

        format!("<Provenir>\n{out}</Provenir>\n")
    }
}

/// A document cut off mid-element.
pub fn truncated_document(app_id: i64) -> String {
    let full = ApplicationXml::standard(app_id).render();
    full[..full.len() / 2].to_string()
}
