/*!
The symbol table --- the pool of interned string constants for one
compilation run.

Insertions are serialized behind a mutex, as the generated machine program
may intern symbols from worker threads; lookups are rare after parsing.
Indices are stable for the lifetime of the table.
*/

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
struct Store {
    to_symbol: Vec<String>,
    to_index: HashMap<String, usize>,
}

impl Store {
    fn intern(&mut self, symbol: &str) -> usize {
        match self.to_index.get(symbol) {
            Some(&index) => index,
            None => {
                let index = self.to_symbol.len();
                self.to_symbol.push(symbol.to_string());
                self.to_index.insert(symbol.to_string(), index);
                index
            }
        }
    }
}

/// A pool of re-usable strings, indexed by insertion order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    store: Mutex<Store>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Interns a symbol, returning its index.
    pub fn intern(&self, symbol: &str) -> usize {
        self.store.lock().expect("poisoned symbol table").intern(symbol)
    }

    /// The symbol stored at the given index, if any.
    pub fn resolve(&self, index: usize) -> Option<String> {
        let store = self.store.lock().expect("poisoned symbol table");
        store.to_symbol.get(index).cloned()
    }

    /// The index of a symbol, without interning it.
    pub fn lookup(&self, symbol: &str) -> Option<usize> {
        let store = self.store.lock().expect("poisoned symbol table");
        store.to_index.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.store.lock().expect("poisoned symbol table").to_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The symbols in index order.
    pub fn symbols(&self) -> Vec<String> {
        self.store
            .lock()
            .expect("poisoned symbol table")
            .to_symbol
            .clone()
    }
}

impl Clone for SymbolTable {
    fn clone(&self) -> Self {
        let symbols = self.symbols();
        let table = SymbolTable::new();
        for symbol in symbols {
            table.intern(&symbol);
        }
        table
    }
}

impl Serialize for SymbolTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.symbols().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SymbolTable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let symbols = Vec::<String>::deserialize(deserializer)?;
        let table = SymbolTable::new();
        for symbol in symbols {
            table.intern(&symbol);
        }
        Ok(table)
    }
}
