//! Board tree model
//!
//! A board is a forest encoded with first-child / next-sibling links:
//! the board points at its first column, each column at its first task,
//! each task at its first sub-task, and every node at the sibling that
//! follows it. There are no parent pointers.
//!
//! Nodes live in an arena owned by the [`Board`]. Links are slot handles
//! into that arena, so splicing a node in or out is a couple of handle
//! writes and a node is only ever reachable from the one link that owns it.
//! Freed slots are recycled for later nodes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::id::{IdAllocator, NodeId};

/// Handle to a node's slot in the board arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Slot(usize);

impl Slot {
    fn index(self) -> usize {
        self.0
    }
}

/// Whether a node is a column or a task
///
/// Columns and tasks share the same link shape but never mix: a column is
/// only ever linked from the board or another column, a task only from a
/// column or another task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Column,
    Task,
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Column => "column",
            NodeKind::Task => "task",
        }
    }
}

/// A column or task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    /// Column title or task content
    text: String,
    child: Option<Slot>,
    after: Option<Slot>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Column title or task content
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_column(&self) -> bool {
        self.kind == NodeKind::Column
    }

    pub fn is_task(&self) -> bool {
        self.kind == NodeKind::Task
    }

    pub(crate) fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

/// Owner of a child chain: the board itself (columns) or a node (tasks)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Parent {
    Root,
    Node(Slot),
}

/// The link that owns a node: some parent's `child` or some node's `after`
#[derive(Debug, Clone, Copy)]
enum Link {
    Child(Parent),
    After(Slot),
}

/// The whole document: a title plus an ordered forest of columns
#[derive(Debug, Clone)]
pub struct Board {
    title: String,
    ids: IdAllocator,
    first: Option<Slot>,
    slots: Vec<Node>,
    free: Vec<Slot>,
    index: HashMap<NodeId, Slot>,
}

impl Board {
    /// Creates an empty board
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ids: IdAllocator::default(),
            first: None,
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// The id the next created node will receive
    pub fn next_id(&self) -> NodeId {
        self.ids.peek()
    }

    /// Number of live columns and tasks
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when the board has no columns (and therefore no tasks)
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Looks up a live node by id
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|slot| self.node_at(*slot))
    }

    /// Top-level columns in order
    pub fn columns(&self) -> Siblings<'_> {
        Siblings {
            board: self,
            next: self.first,
        }
    }

    /// Direct children of a node in order (tasks of a column, sub-tasks of a task)
    ///
    /// Empty when the id does not resolve.
    pub fn children(&self, id: NodeId) -> Siblings<'_> {
        let next = self
            .index
            .get(&id)
            .and_then(|slot| self.node_at(*slot).child);
        Siblings { board: self, next }
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Creates an unlinked node with the next id
    pub(crate) fn spawn(&mut self, kind: NodeKind, text: impl Into<String>) -> Slot {
        let node = Node {
            id: self.ids.allocate(),
            kind,
            text: text.into(),
            child: None,
            after: None,
        };
        let id = node.id;

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot.index()] = node;
                slot
            }
            None => {
                self.slots.push(node);
                Slot(self.slots.len() - 1)
            }
        };

        self.index.insert(id, slot);
        slot
    }

    /// Frees a detached node and its whole child subtree
    pub(crate) fn drop_subtree(&mut self, root: Slot) {
        debug_assert!(self.node_at(root).after.is_none(), "drop of attached node");

        let mut pending = vec![root];
        while let Some(slot) = pending.pop() {
            let node = self.node_mut(slot);
            let child = node.child.take();
            let after = node.after.take();
            let id = node.id;
            node.text.clear();

            pending.extend(child);
            pending.extend(after);

            self.index.remove(&id);
            self.free.push(slot);
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub(crate) fn node_at(&self, slot: Slot) -> &Node {
        &self.slots[slot.index()]
    }

    pub(crate) fn node_mut(&mut self, slot: Slot) -> &mut Node {
        &mut self.slots[slot.index()]
    }

    /// Resolves an id to a column
    pub(crate) fn find_column(&self, id: NodeId) -> Option<Slot> {
        self.find_kind(id, NodeKind::Column)
    }

    /// Resolves an id to a task
    pub(crate) fn find_task(&self, id: NodeId) -> Option<Slot> {
        self.find_kind(id, NodeKind::Task)
    }

    /// Resolves an id that may name either a column or a task (columns first)
    pub(crate) fn find_container(&self, id: NodeId) -> Option<Slot> {
        self.find_column(id).or_else(|| self.find_task(id))
    }

    fn find_kind(&self, id: NodeId, kind: NodeKind) -> Option<Slot> {
        self.index
            .get(&id)
            .copied()
            .filter(|slot| self.node_at(*slot).kind == kind)
    }

    /// True if `candidate` is `ancestor` or sits anywhere below it
    pub(crate) fn is_within(&self, ancestor: Slot, candidate: Slot) -> bool {
        if ancestor == candidate {
            return true;
        }

        let mut pending: Vec<Slot> = self.node_at(ancestor).child.into_iter().collect();
        while let Some(slot) = pending.pop() {
            if slot == candidate {
                return true;
            }
            let node = self.node_at(slot);
            pending.extend(node.child);
            pending.extend(node.after);
        }
        false
    }

    // ------------------------------------------------------------------
    // Surgery
    // ------------------------------------------------------------------

    fn child_of(&self, parent: Parent) -> Option<Slot> {
        match parent {
            Parent::Root => self.first,
            Parent::Node(slot) => self.node_at(slot).child,
        }
    }

    fn set_child(&mut self, parent: Parent, child: Option<Slot>) {
        match parent {
            Parent::Root => self.first = child,
            Parent::Node(slot) => self.node_mut(slot).child = child,
        }
    }

    fn link_target(&self, link: Link) -> Option<Slot> {
        match link {
            Link::Child(parent) => self.child_of(parent),
            Link::After(slot) => self.node_at(slot).after,
        }
    }

    fn set_link(&mut self, link: Link, target: Option<Slot>) {
        match link {
            Link::Child(parent) => self.set_child(parent, target),
            Link::After(slot) => self.node_mut(slot).after = target,
        }
    }

    fn last_sibling(&self, mut slot: Slot) -> Slot {
        while let Some(next) = self.node_at(slot).after {
            slot = next;
        }
        slot
    }

    /// Makes `node` the first child of `parent`, ahead of the current head
    pub(crate) fn insert_first_child(&mut self, parent: Parent, node: Slot) {
        let head = self.child_of(parent);
        self.node_mut(node).after = head;
        self.set_child(parent, Some(node));
    }

    /// Appends `node` to the end of `parent`'s child chain
    pub(crate) fn insert_last_child(&mut self, parent: Parent, node: Slot) {
        match self.child_of(parent) {
            None => self.set_child(parent, Some(node)),
            Some(head) => {
                let last = self.last_sibling(head);
                self.node_mut(last).after = Some(node);
            }
        }
    }

    /// Links `node` directly after `anchor`, ahead of whatever followed it
    pub(crate) fn insert_after(&mut self, anchor: Slot, node: Slot) {
        let next = self.node_at(anchor).after;
        self.node_mut(node).after = next;
        self.node_mut(anchor).after = Some(node);
    }

    /// Splices the node with id `target` out of whichever chain holds it
    ///
    /// Searches everything reachable from `root`'s child chain. The removed
    /// node's `after` is cleared; its `child` subtree stays attached to it.
    /// Returns `None` without touching any link when nothing matches.
    pub(crate) fn remove_by_id(&mut self, root: Parent, target: NodeId) -> Option<Slot> {
        let mut pending = vec![Link::Child(root)];

        while let Some(link) = pending.pop() {
            let Some(slot) = self.link_target(link) else {
                continue;
            };

            if self.node_at(slot).id == target {
                let after = self.node_mut(slot).after.take();
                self.set_link(link, after);
                return Some(slot);
            }

            pending.push(Link::After(slot));
            pending.push(Link::Child(Parent::Node(slot)));
        }

        None
    }
}

/// Iterator over a sibling chain
pub struct Siblings<'a> {
    board: &'a Board,
    next: Option<Slot>,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.next?;
        let node = self.board.node_at(slot);
        self.next = node.after;
        Some(node)
    }
}
