use std::ops::Range;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use miette::SourceSpan;

use crate::program::{Line, Program};

/// Insertion-ordered map, iteration follows definition order.
pub type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Symbolic register name -> register slot.
///
/// Slots are handed out contiguously from 0 in allocation order and are never reassigned.
#[derive(Debug, Default)]
pub struct RegisterTable {
    table: FxMap<String, usize>,
}

impl RegisterTable {
    pub fn new() -> Self {
        RegisterTable {
            table: IndexMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Give each new name the next free slot, in order. Names that already have a slot keep it.
    pub fn allocate<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            let name = name.as_ref();
            if !self.table.contains_key(name) {
                let slot = self.table.len();
                self.table.insert(name.to_string(), slot);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.table.get(name).copied()
    }

    /// Names in allocation order.
    pub fn names(&self) -> impl Iterator<Item = (&str, usize)> {
        self.table.iter().map(|(name, slot)| (name.as_str(), *slot))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Label name -> line index, computed once per program.
#[derive(Debug, Default)]
pub struct LabelIndex {
    table: FxMap<String, usize>,
}

impl LabelIndex {
    /// Scan every line once. A label defined twice resolves to its last definition.
    pub fn build(program: &Program) -> Self {
        let mut table = IndexMap::with_hasher(FxBuildHasher::default());
        for (idx, line) in program.into_iter().enumerate() {
            if let Line::Lab(name) = line {
                table.insert(name.clone(), idx);
            }
        }
        LabelIndex { table }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.table.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Location within source
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Span {
    offs: SrcOffset,
    len: usize,
}

impl Span {
    pub fn new(offs: SrcOffset, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn range(&self) -> Range<usize> {
        self.offs.0..self.offs.0 + self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn offs(&self) -> usize {
        self.offs.0
    }

    pub fn end(&self) -> usize {
        self.offs.0 + self.len
    }

    /// Smallest span covering both `self` and `other`.
    pub fn join(&self, other: Span) -> Span {
        let start = self.offs().min(other.offs());
        let end = self.end().max(other.end());
        Span::new(SrcOffset(start), end - start)
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}

/// Used to refer to offsets from the start of a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct SrcOffset(pub usize);

#[cfg(test)]
mod test {
    use super::*;
    use crate::program::Command;

    #[test]
    fn allocation_is_contiguous_across_batches() {
        let mut regs = RegisterTable::new();
        regs.allocate(&["a", "b"]);
        regs.allocate(&["c"]);
        assert_eq!(regs.get("a"), Some(0));
        assert_eq!(regs.get("b"), Some(1));
        assert_eq!(regs.get("c"), Some(2));
        assert_eq!(regs.get("d"), None);
    }

    #[test]
    fn reallocation_keeps_slot() {
        let mut regs = RegisterTable::new();
        regs.allocate(&["a", "b"]);
        regs.allocate(&["b", "c", "c"]);
        assert_eq!(regs.get("b"), Some(1));
        assert_eq!(regs.get("c"), Some(2));
        assert_eq!(regs.len(), 3);
        let order: Vec<_> = regs.names().map(|(name, _)| name).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn labels_index_lines() {
        let program = Program::new(vec![
            Line::Blank,
            Line::Lab("start".into()),
            Line::Cmd(Command::Halt),
            Line::Lab("end".into()),
            Line::Lab("start".into()),
        ]);
        let labels = LabelIndex::build(&program);
        assert_eq!(labels.get("end"), Some(3));
        // Last definition wins
        assert_eq!(labels.get("start"), Some(4));
        assert_eq!(labels.get("missing"), None);
    }

    #[test]
    fn span_join() {
        let a = Span::new(SrcOffset(4), 2);
        let b = Span::new(SrcOffset(10), 3);
        assert_eq!(a.join(b).range(), 4..13);
        assert_eq!(b.join(a).range(), 4..13);
    }
}
