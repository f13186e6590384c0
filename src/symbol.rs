use rustc_hash::FxHashMap;

use crate::value::SymbolId;

/// Interned symbol table. Each unique symbol name maps to a unique SymbolId,
/// so identical names compare by identity as well as by value.
pub struct SymbolTable {
    name_to_id: FxHashMap<String, SymbolId>,
    id_to_name: Vec<String>,
}

/// Well-known symbol IDs, pre-interned at startup.
/// These must match the order of interning in SymbolTable::new().
pub mod sym {
    use crate::value::SymbolId;

    /// `#ignore` — the formal-parameter marker that consumes an operand
    /// position without binding anything.
    pub const IGNORE: SymbolId = SymbolId(0);
    /// `$quote` — target of the reader's `'x` sugar.
    pub const QUOTE: SymbolId = SymbolId(1);
}

impl SymbolTable {
    /// Create a new symbol table with the well-known symbols pre-interned.
    /// The order MUST match the constants in the `sym` module above.
    pub fn new() -> Self {
        let mut table = SymbolTable {
            name_to_id: FxHashMap::default(),
            id_to_name: Vec::new(),
        };
        table.intern("#ignore");
        table.intern("$quote");
        table
    }

    /// Intern a symbol name. Returns the existing ID if already interned,
    /// or creates a new one.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = SymbolId(self.id_to_name.len() as u32);
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.push(name.to_string());
        id
    }

    /// Look up a symbol name by its ID.
    pub fn name(&self, id: SymbolId) -> &str {
        &self.id_to_name[id.0 as usize]
    }

    /// Look up a symbol ID by name, without interning.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.name_to_id.get(name).copied()
    }

    /// Total number of interned symbols.
    pub fn count(&self) -> usize {
        self.id_to_name.len()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn interning_is_stable() {
        let mut table = SymbolTable::new();
        let a = table.intern("foldl");
        let b = table.intern("foldl");
        assert_eq!(a, b);
        assert_eq!(table.name(a), "foldl");
    }

    #[test]
    fn well_known_symbols_match_constants() {
        let table = SymbolTable::new();
        assert_eq!(table.lookup("#ignore"), Some(sym::IGNORE));
        assert_eq!(table.lookup("$quote"), Some(sym::QUOTE));
    }
}
