//! Context tree - definitions of a file nested by containment
//!
//! Children of a node are sorted by start offset, never overlap, and lie
//! within their parent's range. The root stands for the whole file.

use crate::symbol::{ContextItem, ItemKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ContextTreeNode {
    pub value: Option<ContextItem>,
    pub children: Vec<ContextTreeNode>,
}

impl ContextTreeNode {
    pub fn new(value: ContextItem) -> Self {
        Self {
            value: Some(value),
            children: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self {
            value: None,
            children: Vec::new(),
        }
    }

    fn span(&self) -> Option<(usize, usize)> {
        self.value.as_ref().map(|item| (item.range.start, item.range.end))
    }

    fn is_root(&self) -> bool {
        matches!(&self.value, Some(item) if item.kind == ItemKind::Module)
    }

    /// Definitions fully contained in `[start, end)`, in document order.
    pub fn query_range(&self, start: usize, end: usize) -> Vec<&ContextItem> {
        let mut out = Vec::new();
        if start < end {
            self.collect_range(start, end, &mut out);
        }
        out
    }

    fn collect_range<'a>(&'a self, start: usize, end: usize, out: &mut Vec<&'a ContextItem>) {
        if let Some(item) = &self.value {
            if !self.is_root() && start <= item.range.start && item.range.end <= end {
                out.push(item);
            }
        }

        for child in &self.children {
            match child.span() {
                Some((_, child_end)) if child_end <= start => continue,
                Some((child_start, _)) if child_start >= end => break,
                _ => child.collect_range(start, end, out),
            }
        }
    }

    /// Depth-first walk yielding each item with its nesting depth.
    pub fn walk(&self) -> Vec<(usize, &ContextItem)> {
        let mut out = Vec::new();
        self.walk_into(0, &mut out);
        out
    }

    fn walk_into<'a>(&'a self, depth: usize, out: &mut Vec<(usize, &'a ContextItem)>) {
        let next = match &self.value {
            Some(item) if !self.is_root() => {
                out.push((depth, item));
                depth + 1
            }
            _ => depth,
        };
        for child in &self.children {
            child.walk_into(next, out);
        }
    }

    /// Number of items below (and including) this node.
    pub fn len(&self) -> usize {
        usize::from(self.value.is_some()) + self.children.iter().map(ContextTreeNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Incremental builder that keeps the containment invariant while a
/// traversal opens and closes definitions in document order.
#[derive(Debug)]
pub struct TreeAssembler {
    stack: Vec<ContextTreeNode>,
}

impl TreeAssembler {
    pub fn new(root: ContextItem) -> Self {
        Self {
            stack: vec![ContextTreeNode::new(root)],
        }
    }

    pub fn open(&mut self, item: ContextItem) {
        self.stack.push(ContextTreeNode::new(item));
    }

    /// Close the innermost open node and attach it to its parent.
    pub fn close(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(node) = self.stack.pop() {
            if let Some(parent) = self.stack.last_mut() {
                attach(parent, node);
            }
        }
    }

    pub fn finish(mut self) -> ContextTreeNode {
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack.pop().unwrap_or_else(ContextTreeNode::empty)
    }
}

/// Attach a child, dropping it into a sibling that already contains it and
/// skipping it when it overlaps a sibling without containment.
fn attach(parent: &mut ContextTreeNode, node: ContextTreeNode) {
    let Some((start, end)) = node.span() else {
        return;
    };

    if let Some(last) = parent.children.last_mut() {
        if let Some((last_start, last_end)) = last.span() {
            if last_start <= start && end <= last_end && (last_start, last_end) != (start, end) {
                attach(last, node);
                return;
            }
            if start < last_end {
                return;
            }
        }
    }
    parent.children.push(node);
}
