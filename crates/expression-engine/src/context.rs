use chrono::{NaiveDateTime, Utc};
use std::collections::HashMap;

/// Flat `{qualified_name: raw value}` view of the attributes visible to an
/// expression, plus the instant `GETDATE()` resolves to.
#[derive(Debug, Clone)]
pub struct EvalContext {
    values: HashMap<String, String>,
    /// ASCII-lowercased name to the first name inserted with that spelling.
    folded: HashMap<String, String>,
    now: NaiveDateTime,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new(Utc::now().naive_utc())
    }
}

impl EvalContext {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            values: HashMap::new(),
            folded: HashMap::new(),
            now,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.folded
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| name.clone());
        self.values.insert(name, value.into());
    }

    /// Adds attributes as `scope.name`, and also unqualified when `unqualified` is set.
    pub fn insert_scope<'a, I>(&mut self, scope: &str, attributes: I, unqualified: bool)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in attributes {
            if unqualified {
                self.insert(name, value);
            }
            self.insert(format!("{scope}.{name}"), value);
        }
    }

    /// Exact match first, then an ASCII case-insensitive match. Among names
    /// differing only by case, the one inserted first is chosen.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .or_else(|| {
                self.folded
                    .get(&name.to_ascii_lowercase())
                    .and_then(|original| self.values.get(original))
            })
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_and_unqualified_names() {
        let mut ctx = EvalContext::default();
        ctx.insert_scope("application", [("population_assignment", "CM")], false);
        ctx.insert_scope("contact", [("first_name", "Ann")], true);

        assert_eq!(ctx.get("application.population_assignment"), Some("CM"));
        assert_eq!(ctx.get("population_assignment"), None);
        assert_eq!(ctx.get("first_name"), Some("Ann"));
        assert_eq!(ctx.get("contact.first_name"), Some("Ann"));
        assert_eq!(ctx.get("Contact.First_Name"), Some("Ann"));
    }

    #[test]
    fn case_insensitive_lookup_prefers_first_spelling() {
        let mut ctx = EvalContext::default();
        ctx.insert("Status", "A");
        ctx.insert("STATUS", "B");
        ctx.insert("Status", "C");

        assert_eq!(ctx.get("STATUS"), Some("B"));
        assert_eq!(ctx.get("Status"), Some("C"));
        for _ in 0..10 {
            assert_eq!(ctx.get("status"), Some("C"));
        }
        assert_eq!(ctx.len(), 2);
    }
}
