use rustc_hash::FxHashMap;

use crate::value::{EnvId, SymbolId, Value};

/// One binding frame: a symbol-to-value map plus an optional parent link.
struct Frame {
    bindings: FxHashMap<SymbolId, Value>,
    parent: Option<EnvId>,
}

/// The environment arena. Frames are shared by reference (EnvId): every
/// operative that captured a frame observes later mutations to it. Parent
/// links only ever point at older frames, so the graph is acyclic and
/// nothing is freed while the machine lives.
pub struct EnvTable {
    frames: Vec<Frame>,
}

impl EnvTable {
    pub fn new() -> Self {
        EnvTable { frames: Vec::new() }
    }

    /// Create a fresh, empty frame.
    pub fn create(&mut self, parent: Option<EnvId>) -> EnvId {
        let id = EnvId(self.frames.len() as u32);
        self.frames.push(Frame {
            bindings: FxHashMap::default(),
            parent,
        });
        id
    }

    pub fn parent(&self, env: EnvId) -> Option<EnvId> {
        self.frames[env.0 as usize].parent
    }

    /// Walk the chain from `env` outward; the first frame containing
    /// `name` wins.
    pub fn lookup(&self, env: EnvId, name: SymbolId) -> Option<Value> {
        let mut current = Some(env);
        while let Some(id) = current {
            let frame = &self.frames[id.0 as usize];
            if let Some(&value) = frame.bindings.get(&name) {
                return Some(value);
            }
            current = frame.parent;
        }
        None
    }

    /// Bind in `env`'s own frame only, silently overwriting an existing
    /// local binding. Never searches ancestors.
    pub fn define(&mut self, env: EnvId, name: SymbolId, value: Value) {
        self.frames[env.0 as usize].bindings.insert(name, value);
    }

    /// Find the frame that owns `name` and mutate it in place. Returns
    /// false if no frame in the chain owns the symbol.
    pub fn assign(&mut self, env: EnvId, name: SymbolId, value: Value) -> bool {
        let mut current = Some(env);
        while let Some(id) = current {
            let frame = &mut self.frames[id.0 as usize];
            if let Some(slot) = frame.bindings.get_mut(&name) {
                *slot = value;
                return true;
            }
            current = frame.parent;
        }
        false
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl Default for EnvTable {
    fn default() -> Self {
        EnvTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sym(n: u32) -> SymbolId {
        SymbolId(n)
    }

    #[test]
    fn define_then_lookup() {
        let mut envs = EnvTable::new();
        let root = envs.create(None);
        envs.define(root, sym(0), Value::Int(42));
        assert_eq!(envs.lookup(root, sym(0)), Some(Value::Int(42)));
        assert_eq!(envs.lookup(root, sym(1)), None);
    }

    #[test]
    fn lookup_walks_the_parent_chain() {
        let mut envs = EnvTable::new();
        let root = envs.create(None);
        let inner = envs.create(Some(root));
        envs.define(root, sym(0), Value::Int(1));
        assert_eq!(envs.lookup(inner, sym(0)), Some(Value::Int(1)));
    }

    #[test]
    fn inner_bindings_shadow_without_destroying() {
        let mut envs = EnvTable::new();
        let root = envs.create(None);
        let inner = envs.create(Some(root));
        envs.define(root, sym(0), Value::Int(1));
        envs.define(inner, sym(0), Value::Int(2));
        assert_eq!(envs.lookup(inner, sym(0)), Some(Value::Int(2)));
        assert_eq!(envs.lookup(root, sym(0)), Some(Value::Int(1)));
    }

    #[test]
    fn define_never_touches_the_parent() {
        let mut envs = EnvTable::new();
        let root = envs.create(None);
        let inner = envs.create(Some(root));
        envs.define(inner, sym(0), Value::Int(2));
        assert_eq!(envs.lookup(root, sym(0)), None);
    }

    #[test]
    fn assign_mutates_the_owning_frame() {
        let mut envs = EnvTable::new();
        let root = envs.create(None);
        let inner = envs.create(Some(root));
        envs.define(root, sym(0), Value::Int(1));
        assert!(envs.assign(inner, sym(0), Value::Int(9)));
        // The root frame owns the binding, so the mutation lands there.
        assert_eq!(envs.lookup(root, sym(0)), Some(Value::Int(9)));
    }

    #[test]
    fn assign_to_unbound_symbol_fails() {
        let mut envs = EnvTable::new();
        let root = envs.create(None);
        assert!(!envs.assign(root, sym(0), Value::Int(1)));
    }
}
