//! Arena-backed statement tree.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]. A node's
//! `parent` is a plain index: it never keeps anything alive, and it always
//! names the container whose child list currently holds the node. Detached
//! nodes stay in the arena until the tree is dropped.
//!
//! Iteration through [`Tree::each_child`] registers a live cursor. Every
//! insertion and removal on a container shifts the cursors walking that
//! container, so a traversal neither skips nor revisits a child when the
//! callback rewrites its siblings.

use crate::error::TreeError;
use crate::node::NodeKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// 1-based position supplied by the upstream parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    /// `Some` for containers, even when empty.
    children: Option<Vec<NodeId>>,
    pub location: Option<SourceLocation>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn is_container(&self) -> bool {
        self.children.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    container: NodeId,
    /// Index of the next child to visit.
    next: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    #[serde(skip)]
    cursors: Vec<Cursor>,
}

impl Tree {
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            cursors: Vec::new(),
        };
        tree.root = tree.alloc(NodeKind::Root);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of arena slots, detached nodes included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    /// Allocate a detached node.
    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let children = kind.is_container().then(Vec::new);
        self.nodes.push(Node {
            kind,
            parent: None,
            children,
            location: None,
        });
        id
    }

    pub fn alloc_at(&mut self, kind: NodeKind, location: Option<SourceLocation>) -> NodeId {
        let id = self.alloc(kind);
        self.nodes[id.index()].location = location;
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes.get(id.index()).ok_or(TreeError::UnknownNode(id))
    }

    pub fn kind(&self, id: NodeId) -> Result<&NodeKind, TreeError> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn kind_mut(&mut self, id: NodeId) -> Result<&mut NodeKind, TreeError> {
        self.nodes
            .get_mut(id.index())
            .map(|n| &mut n.kind)
            .ok_or(TreeError::UnknownNode(id))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children of a container; empty for leaves and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn location(&self, id: NodeId) -> Option<SourceLocation> {
        self.get(id).and_then(|n| n.location)
    }

    pub fn set_location(&mut self, id: NodeId, location: SourceLocation) -> Result<(), TreeError> {
        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or(TreeError::UnknownNode(id))?;
        node.location = Some(location);
        Ok(())
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// `true` when `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Pre-order walk of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            for child in self.children(next).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let at = self.container(parent)?.len();
        self.insert(parent, at, child)
    }

    /// Insert `child` at `index`, detaching it from any prior container.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), TreeError> {
        self.node(child)?;
        self.container(parent)?;
        if self.is_ancestor(child, parent) {
            return Err(TreeError::WouldCycle { parent, child });
        }
        let mut index = index;
        if let Some(old_parent) = self.parent(child) {
            if let Some(old_index) = self.index_of(child) {
                if old_parent == parent && old_index < index {
                    index -= 1;
                }
            }
            self.remove_child(old_parent, child)?;
        }
        let children = self.container_mut(parent)?;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
        self.shift_cursors(parent, index, 1);
        Ok(())
    }

    /// Insert `nodes` directly after `anchor`, keeping their order.
    pub fn insert_after(&mut self, anchor: NodeId, nodes: &[NodeId]) -> Result<(), TreeError> {
        let parent = self.parent(anchor).ok_or(TreeError::Detached(anchor))?;
        for node in nodes.iter().rev() {
            let at = self.index_of(anchor).ok_or(TreeError::Detached(anchor))? + 1;
            self.insert(parent, at, *node)?;
        }
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let children = self.container_mut(parent)?;
        let index = children
            .iter()
            .position(|c| *c == child)
            .ok_or(TreeError::Detached(child))?;
        children.remove(index);
        self.nodes[child.index()].parent = None;
        for cursor in self.cursors.iter_mut() {
            if cursor.container == parent && index < cursor.next {
                cursor.next -= 1;
            }
        }
        Ok(())
    }

    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        match self.parent(id) {
            Some(parent) => self.remove_child(parent, id),
            None => Ok(()),
        }
    }

    /// Put `new_nodes` where `node` was, then detach `node`.
    pub fn replace_with(&mut self, node: NodeId, new_nodes: &[NodeId]) -> Result<(), TreeError> {
        self.insert_after(node, new_nodes)?;
        self.detach(node)
    }

    /// Swap a container's whole child list. Cursors walking it finish.
    pub fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) -> Result<(), TreeError> {
        let old = std::mem::take(self.container_mut(parent)?);
        for child in old {
            self.nodes[child.index()].parent = None;
        }
        for child in &children {
            self.detach(*child)?;
        }
        for child in &children {
            if self.is_ancestor(*child, parent) {
                return Err(TreeError::WouldCycle {
                    parent,
                    child: *child,
                });
            }
            self.nodes[child.index()].parent = Some(parent);
        }
        let len = children.len();
        *self.container_mut(parent)? = children;
        for cursor in self.cursors.iter_mut() {
            if cursor.container == parent {
                cursor.next = len;
            }
        }
        Ok(())
    }

    /// Visit the children of `parent` in order while `f` is free to mutate
    /// the tree, including the container being walked.
    pub fn each_child<E, F>(&mut self, parent: NodeId, mut f: F) -> Result<(), E>
    where
        F: FnMut(&mut Tree, NodeId) -> Result<(), E>,
        E: From<TreeError>,
    {
        self.container(parent)?;
        let slot = self.cursors.len();
        self.cursors.push(Cursor {
            container: parent,
            next: 0,
        });
        let result = loop {
            let cursor = self.cursors[slot];
            let Some(child) = self.children(parent).get(cursor.next).copied() else {
                break Ok(());
            };
            self.cursors[slot].next += 1;
            if let Err(err) = f(self, child) {
                break Err(err);
            }
        };
        self.cursors.truncate(slot);
        result
    }

    /// Deep copy of `id` into a fresh detached node of this tree.
    pub fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId, TreeError> {
        let snapshot = self.fragment(&[id])?;
        let copied = snapshot.children(snapshot.root).to_vec();
        match copied.first() {
            Some(first) => self.copy_from(&snapshot, *first),
            None => Err(TreeError::UnknownNode(id)),
        }
    }

    /// Deep copy of a subtree of `other` into a detached node of this tree.
    pub fn copy_from(&mut self, other: &Tree, id: NodeId) -> Result<NodeId, TreeError> {
        let source = other.node(id)?;
        let copy = self.alloc_at(source.kind.clone(), source.location);
        for child in source.children() {
            let child_copy = self.copy_from(other, *child)?;
            self.nodes[child_copy.index()].parent = Some(copy);
            self.container_mut(copy)?.push(child_copy);
        }
        Ok(copy)
    }

    /// A standalone tree whose root holds deep copies of `ids`.
    pub fn fragment(&self, ids: &[NodeId]) -> Result<Tree, TreeError> {
        let mut out = Tree::new();
        let root = out.root;
        for id in ids {
            let copy = out.copy_from(self, *id)?;
            out.append(root, copy)?;
        }
        Ok(out)
    }

    /// A copy holding only the nodes reachable from the root.
    pub fn compacted(&self) -> Result<Tree, TreeError> {
        let mut out = self.fragment(self.children(self.root))?;
        let root = out.root;
        out.nodes[root.index()].location = self.location(self.root);
        Ok(out)
    }

    fn container(&self, id: NodeId) -> Result<&Vec<NodeId>, TreeError> {
        self.node(id)?
            .children
            .as_ref()
            .ok_or(TreeError::NotAContainer(id))
    }

    fn container_mut(&mut self, id: NodeId) -> Result<&mut Vec<NodeId>, TreeError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(TreeError::UnknownNode(id))?
            .children
            .as_mut()
            .ok_or(TreeError::NotAContainer(id))
    }

    fn shift_cursors(&mut self, container: NodeId, index: usize, by: usize) {
        for cursor in self.cursors.iter_mut() {
            if cursor.container == container && index < cursor.next {
                cursor.next += by;
            }
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Tree {
    /// Structural equality from the root, ignoring arena layout.
    fn eq(&self, other: &Self) -> bool {
        fn same(a: &Tree, ai: NodeId, b: &Tree, bi: NodeId) -> bool {
            match (a.get(ai), b.get(bi)) {
                (Some(x), Some(y)) => {
                    x.kind == y.kind
                        && x.children().len() == y.children().len()
                        && x
                            .children()
                            .iter()
                            .zip(y.children())
                            .all(|(c, d)| same(a, *c, b, *d))
                }
                _ => false,
            }
        }
        same(self, self.root, other, other.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Expr, Template};
    use crate::node::NodeKind;

    fn comment(tree: &mut Tree, text: &str) -> NodeId {
        tree.alloc(NodeKind::Comment {
            text: text.to_string(),
        })
    }

    fn texts(tree: &Tree, parent: NodeId) -> Vec<String> {
        tree.children(parent)
            .iter()
            .map(|id| match tree.kind(*id) {
                Ok(NodeKind::Comment { text }) => text.clone(),
                _ => String::new(),
            })
            .collect()
    }

    #[test]
    fn test_append_transfers_ownership() {
        let mut tree = Tree::new();
        let root = tree.root();
        let rule = tree.alloc(NodeKind::Root);
        let note = comment(&mut tree, "a");
        tree.append(root, rule).unwrap();
        tree.append(rule, note).unwrap();
        tree.append(root, note).unwrap();

        assert!(tree.children(rule).is_empty());
        assert_eq!(tree.children(root), &[rule, note]);
        assert_eq!(tree.parent(note), Some(root));
    }

    #[test]
    fn test_leaf_is_not_a_container() {
        let mut tree = Tree::new();
        let a = comment(&mut tree, "a");
        let b = comment(&mut tree, "b");
        assert_eq!(tree.append(a, b), Err(TreeError::NotAContainer(a)));
    }

    #[test]
    fn test_cannot_insert_into_own_descendant() {
        let mut tree = Tree::new();
        let root = tree.root();
        let outer = tree.alloc(NodeKind::Root);
        let inner = tree.alloc(NodeKind::Root);
        tree.append(root, outer).unwrap();
        tree.append(outer, inner).unwrap();
        assert_eq!(
            tree.append(inner, outer),
            Err(TreeError::WouldCycle {
                parent: inner,
                child: outer
            })
        );
    }

    #[test]
    fn test_replace_with_keeps_position() {
        let mut tree = Tree::new();
        let root = tree.root();
        for text in ["a", "b", "c"] {
            let id = comment(&mut tree, text);
            tree.append(root, id).unwrap();
        }
        let b = tree.children(root)[1];
        let x = comment(&mut tree, "x");
        let y = comment(&mut tree, "y");
        tree.replace_with(b, &[x, y]).unwrap();

        assert_eq!(texts(&tree, root), vec!["a", "x", "y", "c"]);
        assert_eq!(tree.parent(b), None);
    }

    #[test]
    fn test_cursor_survives_removal_of_current() {
        let mut tree = Tree::new();
        let root = tree.root();
        for text in ["a", "b", "c"] {
            let id = comment(&mut tree, text);
            tree.append(root, id).unwrap();
        }
        let mut seen = Vec::new();
        tree.each_child(root, |tree, id| -> Result<(), TreeError> {
            if let NodeKind::Comment { text } = tree.kind(id)? {
                seen.push(text.clone());
            }
            tree.detach(id)
        })
        .unwrap();

        assert_eq!(seen, vec!["a", "b", "c"]);
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn test_cursor_visits_inserted_followers_once() {
        let mut tree = Tree::new();
        let root = tree.root();
        for text in ["a", "b"] {
            let id = comment(&mut tree, text);
            tree.append(root, id).unwrap();
        }
        let mut seen = Vec::new();
        tree.each_child(root, |tree, id| -> Result<(), TreeError> {
            let text = match tree.kind(id)? {
                NodeKind::Comment { text } => text.clone(),
                _ => String::new(),
            };
            seen.push(text.clone());
            if text == "a" {
                let before = comment(tree, "before");
                tree.insert(root, 0, before)?;
                let after = comment(tree, "after");
                tree.insert_after(id, &[after])?;
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(seen, vec!["a", "after", "b"]);
        assert_eq!(texts(&tree, root), vec!["before", "a", "after", "b"]);
    }

    #[test]
    fn test_nested_cursors_on_same_container() {
        let mut tree = Tree::new();
        let root = tree.root();
        for text in ["a", "b", "c"] {
            let id = comment(&mut tree, text);
            tree.append(root, id).unwrap();
        }
        let mut outer_seen = Vec::new();
        tree.each_child(root, |tree, id| -> Result<(), TreeError> {
            outer_seen.push(id);
            if outer_seen.len() == 1 {
                // An inner walk removes the first child while the outer walk
                // is positioned after it.
                let first = tree.children(root)[0];
                tree.each_child(root, |tree, inner| -> Result<(), TreeError> {
                    if inner == first {
                        tree.detach(inner)?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(outer_seen.len(), 3);
        assert_eq!(tree.children(root).len(), 2);
    }

    #[test]
    fn test_clone_subtree_is_independent() {
        let mut tree = Tree::new();
        let root = tree.root();
        let block = tree.alloc(NodeKind::Root);
        let decl = tree.alloc(NodeKind::Declaration {
            property: Template::literal("color"),
            value: Expr::ident("red"),
            important: false,
        });
        tree.append(root, block).unwrap();
        tree.append(block, decl).unwrap();

        let copy = tree.clone_subtree(block).unwrap();
        assert_eq!(tree.parent(copy), None);
        let copied_decl = tree.children(copy)[0];
        assert_ne!(copied_decl, decl);
        assert_eq!(tree.parent(copied_decl), Some(copy));

        if let NodeKind::Declaration { value, .. } = tree.kind_mut(copied_decl).unwrap() {
            *value = Expr::ident("blue");
        }
        match tree.kind(decl).unwrap() {
            NodeKind::Declaration { value, .. } => assert_eq!(value, &Expr::ident("red")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_compacted_drops_detached_nodes() {
        let mut tree = Tree::new();
        let root = tree.root();
        let block = tree.alloc(NodeKind::Root);
        tree.append(root, block).unwrap();
        let a = comment(&mut tree, "a");
        tree.append(block, a).unwrap();
        let _copy = tree.clone_subtree(block).unwrap();
        let _stray = comment(&mut tree, "stray");
        assert_eq!(tree.len(), 6);

        let compact = tree.compacted().unwrap();
        assert_eq!(compact.len(), 3);
        assert_eq!(compact, tree);
        assert_eq!(texts(&compact, compact.children(compact.root())[0]), vec!["a"]);
    }

    #[test]
    fn test_fragment_equality_ignores_layout() {
        let mut tree = Tree::new();
        let root = tree.root();
        let _detached = comment(&mut tree, "unused");
        let a = comment(&mut tree, "a");
        tree.append(root, a).unwrap();

        let fragment = tree.fragment(&[a]).unwrap();
        let mut direct = Tree::new();
        let direct_root = direct.root();
        let copy = comment(&mut direct, "a");
        direct.append(direct_root, copy).unwrap();
        assert_eq!(fragment, direct);
    }
}
