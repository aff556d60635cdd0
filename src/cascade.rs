use std::collections::HashMap;
use std::rc::Rc;

use crate::selector::{Chain, IndexName};
use crate::style::ConditionId;
use crate::types::Order;

pub const UNIVERSAL_KEY: &str = "*";

/// Compiled rule store. Each index maps a key to the chains installed
/// under it, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Cascade {
    tags: HashMap<String, Vec<Rc<Chain>>>,
    ns_tags: HashMap<String, Vec<Rc<Chain>>>,
    ids: HashMap<String, Vec<Rc<Chain>>>,
    classes: HashMap<String, Vec<Rc<Chain>>>,
    epub_types: HashMap<String, Vec<Rc<Chain>>>,
    page_types: HashMap<String, Vec<Rc<Chain>>>,
    order: Order,
}

impl Cascade {
    pub fn new() -> Cascade {
        Cascade::default()
    }

    fn index_mut(&mut self, index: IndexName) -> &mut HashMap<String, Vec<Rc<Chain>>> {
        match index {
            IndexName::Tag => &mut self.tags,
            IndexName::NsTag => &mut self.ns_tags,
            IndexName::Id => &mut self.ids,
            IndexName::Class => &mut self.classes,
            IndexName::EpubType => &mut self.epub_types,
            IndexName::PageType => &mut self.page_types,
        }
    }

    fn index(&self, index: IndexName) -> &HashMap<String, Vec<Rc<Chain>>> {
        match index {
            IndexName::Tag => &self.tags,
            IndexName::NsTag => &self.ns_tags,
            IndexName::Id => &self.ids,
            IndexName::Class => &self.classes,
            IndexName::EpubType => &self.epub_types,
            IndexName::PageType => &self.page_types,
        }
    }

    pub fn insert(&mut self, index: IndexName, key: &str, chain: Chain) {
        self.index_mut(index)
            .entry(key.to_string())
            .or_default()
            .push(Rc::new(chain));
    }

    /// Files `chain` (already in evaluation order) under its leading index
    /// step, or under the universal tag when it has none.
    pub fn install(&mut self, chain: Chain) {
        match chain.make_primary() {
            (Some((index, key)), rest) => self.insert(index, &key, rest),
            (None, whole) => self.insert(IndexName::Tag, UNIVERSAL_KEY, whole),
        }
    }

    pub fn lookup(&self, index: IndexName, key: &str) -> &[Rc<Chain>] {
        self.index(index)
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn next_order(&mut self) -> Order {
        self.order.advance()
    }

    pub fn rule_count(&self) -> usize {
        [
            &self.tags,
            &self.ns_tags,
            &self.ids,
            &self.classes,
            &self.epub_types,
            &self.page_types,
        ]
        .iter()
        .map(|index| index.values().map(Vec::len).sum::<usize>())
        .sum()
    }
}

/// Per-compilation allocator for combinator condition names.
#[derive(Debug, Clone, Default)]
pub struct CompileContext {
    next_condition: u32,
}

impl CompileContext {
    pub fn new() -> CompileContext {
        CompileContext::default()
    }

    // Continues numbering after conditions already present in a base store.
    pub fn continuing(previous: &CompileContext) -> CompileContext {
        previous.clone()
    }

    pub fn new_condition(&mut self) -> ConditionId {
        let id = ConditionId(self.next_condition);
        self.next_condition += 1;
        id
    }
}
