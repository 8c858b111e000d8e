//! Reference model of the per-key state machine.

use std::collections::HashMap;

use ledgerkv_store::EventKind;

/// Outcome the store is expected to produce for an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    /// Write succeeds and appends an event
    Appended,
    AlreadyExists,
    NotFound,
}

/// Tracks what every key should resolve to and which events it should have.
#[derive(Debug, Default, Clone)]
pub struct KeyModel {
    current: HashMap<String, String>,
    history: HashMap<String, Vec<(EventKind, String)>>,
}

impl KeyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value the key should currently resolve to
    pub fn current(&self, key: &str) -> Option<&str> {
        self.current.get(key).map(String::as_str)
    }

    /// Events the key's history should contain, oldest first
    pub fn history(&self, key: &str) -> &[(EventKind, String)] {
        self.history.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of successful writes on the key
    pub fn writes(&self, key: &str) -> usize {
        self.history(key).len()
    }

    pub fn create(&mut self, key: &str, value: &str) -> Expected {
        if self.current.contains_key(key) {
            return Expected::AlreadyExists;
        }
        self.current.insert(key.to_string(), value.to_string());
        self.record(key, EventKind::Create, value);
        Expected::Appended
    }

    pub fn update(&mut self, key: &str, value: &str) -> Expected {
        match self.current.get_mut(key) {
            Some(current) => {
                *current = value.to_string();
                self.record(key, EventKind::Update, value);
                Expected::Appended
            }
            None => Expected::NotFound,
        }
    }

    pub fn delete(&mut self, key: &str) -> Expected {
        if self.current.remove(key).is_none() {
            return Expected::NotFound;
        }
        self.record(key, EventKind::Delete, "");
        Expected::Appended
    }

    fn record(&mut self, key: &str, kind: EventKind, value: &str) {
        self.history
            .entry(key.to_string())
            .or_default()
            .push((kind, value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine() {
        let mut model = KeyModel::new();

        assert_eq!(model.update("x", "1"), Expected::NotFound);
        assert_eq!(model.delete("x"), Expected::NotFound);
        assert_eq!(model.create("x", "1"), Expected::Appended);
        assert_eq!(model.create("x", "2"), Expected::AlreadyExists);
        assert_eq!(model.update("x", "2"), Expected::Appended);
        assert_eq!(model.current("x"), Some("2"));
        assert_eq!(model.delete("x"), Expected::Appended);
        assert_eq!(model.current("x"), None);
        assert_eq!(model.create("x", "3"), Expected::Appended);

        assert_eq!(model.writes("x"), 4);
        assert_eq!(model.history("x")[2], (EventKind::Delete, String::new()));
        assert_eq!(model.writes("never"), 0);
    }
}
