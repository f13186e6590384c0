use crate::error::{VauError, VauResult};
use crate::value::{PairId, Value};

/// A single cons cell on the heap. Both slots are mutable in place
/// (`set-head!` / `set-tail!`).
pub struct ConsCell {
    pub head: Value,
    pub tail: Value,
}

/// The cons-cell arena. All pairs are allocated here; PairId is an index
/// into `cells`. Cells live as long as the machine — the host memory model
/// frees everything at once, so there is no collector and no free list.
pub struct Heap {
    cells: Vec<ConsCell>,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            cells: Vec::with_capacity(1024),
        }
    }

    /// Allocate a new cons cell.
    pub fn alloc(&mut self, head: Value, tail: Value) -> PairId {
        let id = PairId(self.cells.len() as u32);
        self.cells.push(ConsCell { head, tail });
        id
    }

    #[inline]
    pub fn head(&self, id: PairId) -> Value {
        self.cells[id.0 as usize].head
    }

    #[inline]
    pub fn tail(&self, id: PairId) -> Value {
        self.cells[id.0 as usize].tail
    }

    #[inline]
    pub fn set_head(&mut self, id: PairId, val: Value) {
        self.cells[id.0 as usize].head = val;
    }

    #[inline]
    pub fn set_tail(&mut self, id: PairId, val: Value) {
        self.cells[id.0 as usize].tail = val;
    }

    /// Head of a value that must be a pair.
    pub fn head_val(&self, val: Value) -> VauResult<Value> {
        match val {
            Value::Pair(id) => Ok(self.head(id)),
            other => Err(VauError::TypeMismatch {
                expected: "pair".into(),
                actual: other.kind_name().into(),
            }),
        }
    }

    /// Tail of a value that must be a pair.
    pub fn tail_val(&self, val: Value) -> VauResult<Value> {
        match val {
            Value::Pair(id) => Ok(self.tail(id)),
            other => Err(VauError::TypeMismatch {
                expected: "pair".into(),
                actual: other.kind_name().into(),
            }),
        }
    }

    /// Build a proper list from a slice of values.
    pub fn list(&mut self, values: &[Value]) -> Value {
        let mut result = Value::Nil;
        for &val in values.iter().rev() {
            let pair = self.alloc(val, result);
            result = Value::Pair(pair);
        }
        result
    }

    /// Returns true if this value is a proper list (right-nested pairs
    /// terminated by nil).
    pub fn is_proper_list(&self, val: Value) -> bool {
        let mut current = val;
        loop {
            match current {
                Value::Nil => return true,
                Value::Pair(id) => current = self.tail(id),
                _ => return false,
            }
        }
    }

    /// Collect a proper list into a Vec. Returns None if not a proper list.
    pub fn list_to_vec(&self, val: Value) -> Option<Vec<Value>> {
        let mut result = Vec::new();
        let mut current = val;
        loop {
            match current {
                Value::Nil => return Some(result),
                Value::Pair(id) => {
                    result.push(self.head(id));
                    current = self.tail(id);
                }
                _ => return None,
            }
        }
    }

    /// Length of a proper list. Returns None if not a proper list.
    pub fn list_len(&self, val: Value) -> Option<usize> {
        let mut count = 0;
        let mut current = val;
        loop {
            match current {
                Value::Nil => return Some(count),
                Value::Pair(id) => {
                    count += 1;
                    current = self.tail(id);
                }
                _ => return None,
            }
        }
    }

    /// Number of allocated cells.
    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_builds_proper_lists() {
        let mut heap = Heap::new();
        let list = heap.list(&[Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(heap.is_proper_list(list));
        assert_eq!(heap.list_len(list), Some(3));
        assert_eq!(
            heap.list_to_vec(list),
            Some(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn dotted_tails_are_not_proper() {
        let mut heap = Heap::new();
        let id = heap.alloc(Value::Int(1), Value::Int(2));
        let dotted = Value::Pair(id);
        assert!(!heap.is_proper_list(dotted));
        assert_eq!(heap.list_to_vec(dotted), None);
        assert_eq!(heap.list_len(dotted), None);
    }

    #[test]
    fn cells_mutate_in_place() {
        let mut heap = Heap::new();
        let id = heap.alloc(Value::Int(1), Value::Nil);
        heap.set_head(id, Value::Int(9));
        heap.set_tail(id, Value::Bool(true));
        assert_eq!(heap.head(id), Value::Int(9));
        assert_eq!(heap.tail(id), Value::Bool(true));
    }

    #[test]
    fn head_of_non_pair_is_a_type_mismatch() {
        let heap = Heap::new();
        assert!(matches!(
            heap.head_val(Value::Nil),
            Err(VauError::TypeMismatch { .. })
        ));
    }
}
