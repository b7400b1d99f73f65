//! Symbol table for labels

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::ErrorKind;

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    labels: HashMap<String, u32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            labels: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    /// Bind `name` to `offset`. A label can only be bound once.
    pub fn define(&mut self, name: &str, offset: u32) -> Result<(), ErrorKind> {
        match self.labels.entry(name.to_string()) {
            Entry::Occupied(_) => Err(ErrorKind::DuplicateLabel(name.to_string())),
            Entry::Vacant(v) => {
                v.insert(offset);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.labels.get(name).copied()
    }

    pub fn labels(&self) -> &HashMap<String, u32> {
        &self.labels
    }

    pub fn clone_labels(&self) -> HashMap<String, u32> {
        self.labels.clone()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut symbols = SymbolTable::new();
        symbols.define("start", 0).unwrap();
        symbols.define("loop", 12).unwrap();
        assert_eq!(symbols.get("loop"), Some(12));
        assert_eq!(symbols.get("Loop"), None);
        assert_eq!(symbols.len(), 2);
    }

    #[test]
    fn test_duplicate_keeps_first_binding() {
        let mut symbols = SymbolTable::new();
        symbols.define("a", 0).unwrap();
        assert_eq!(
            symbols.define("a", 5),
            Err(ErrorKind::DuplicateLabel("a".to_string()))
        );
        assert_eq!(symbols.get("a"), Some(0));
    }
}
