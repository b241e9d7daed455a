use std::fmt;

use tracing::debug;

use crate::filter::SearchFilter;

/// Node key in the navigation tree.
///
/// Saved searches are keyed by their filter value, so an equal filter always
/// names the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeId {
    ShowAll,
    Search,
    Saved(SearchFilter),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::ShowAll => f.write_str("Show All"),
            NodeId::Search => f.write_str("Search"),
            NodeId::Saved(filter) => write!(f, "{}", filter),
        }
    }
}

#[derive(Debug, Clone)]
struct TreeNode {
    id: NodeId,
    parent: Option<NodeId>,
    children_allowed: bool,
    expanded: bool,
}

/// One rendered line of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub id: NodeId,
    pub depth: u16,
    pub caption: String,
    pub children_allowed: bool,
    pub expanded: bool,
    pub selected: bool,
}

/// Fixed `ShowAll` and `Search` entries plus saved searches under `Search`.
///
/// Nodes are kept in insertion order; fixed nodes come first and are never
/// removed.
#[derive(Debug, Clone)]
pub struct NavigationTree {
    nodes: Vec<TreeNode>,
    selected: Option<NodeId>,
}

impl Default for NavigationTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![
                TreeNode {
                    id: NodeId::ShowAll,
                    parent: None,
                    children_allowed: false,
                    expanded: false,
                },
                TreeNode {
                    id: NodeId::Search,
                    parent: None,
                    children_allowed: true,
                    expanded: false,
                },
            ],
            selected: Some(NodeId::ShowAll),
        }
    }

    /// Add `filter` as a leaf under `Search` and select it.
    ///
    /// An equal filter already in the tree is re-selected instead of being
    /// added twice. Returns true when a node was inserted.
    pub fn save_search(&mut self, filter: SearchFilter) -> bool {
        let id = NodeId::Saved(filter);
        let inserted = if self.contains(&id) {
            debug!(node = %id, "search already saved");
            false
        } else {
            self.nodes.push(TreeNode {
                id: id.clone(),
                parent: Some(NodeId::Search),
                children_allowed: false,
                expanded: false,
            });
            debug!(node = %id, "search saved");
            true
        };
        self.set_expanded(&NodeId::Search, true);
        self.selected = Some(id);
        inserted
    }

    /// Select `id`. Unknown ids leave the selection untouched.
    pub fn select(&mut self, id: &NodeId) -> bool {
        if !self.contains(id) {
            debug!(node = %id, "ignoring selection of unknown node");
            return false;
        }
        self.selected = Some(id.clone());
        true
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    pub fn children_allowed(&self, id: &NodeId) -> bool {
        self.node(id).map_or(false, |node| node.children_allowed)
    }

    #[cfg(test)]
    pub fn parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.node(id).and_then(|node| node.parent.as_ref())
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.node(id).map_or(false, |node| node.expanded)
    }

    /// Expand or collapse a node that may have children; leaves are ignored.
    pub fn set_expanded(&mut self, id: &NodeId, expanded: bool) {
        if let Some(node) = self.nodes.iter_mut().find(|node| &node.id == id) {
            if node.children_allowed {
                node.expanded = expanded;
            }
        }
    }

    pub fn toggle_expanded(&mut self, id: &NodeId) {
        let expanded = self.is_expanded(id);
        self.set_expanded(id, !expanded);
    }

    /// Saved searches in insertion order, regardless of expansion.
    #[cfg(test)]
    pub fn saved_searches(&self) -> impl Iterator<Item = &SearchFilter> + '_ {
        self.nodes.iter().filter_map(|node| match &node.id {
            NodeId::Saved(filter) => Some(filter),
            _ => None,
        })
    }

    /// Depth-first rows: roots in declaration order, each followed by its
    /// children when expanded.
    pub fn rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::with_capacity(self.nodes.len());
        for root in self.nodes.iter().filter(|node| node.parent.is_none()) {
            self.push_rows(root, 0, &mut rows);
        }
        rows
    }

    fn push_rows(&self, node: &TreeNode, depth: u16, rows: &mut Vec<TreeRow>) {
        rows.push(TreeRow {
            id: node.id.clone(),
            depth,
            caption: node.id.to_string(),
            children_allowed: node.children_allowed,
            expanded: node.expanded,
            selected: self.selected.as_ref() == Some(&node.id),
        });
        if !node.expanded {
            return;
        }
        for child in self
            .nodes
            .iter()
            .filter(|child| child.parent.as_ref() == Some(&node.id))
        {
            self.push_rows(child, depth + 1, rows);
        }
    }

    fn node(&self, id: &NodeId) -> Option<&TreeNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::FieldId;

    fn ids(rows: &[TreeRow]) -> Vec<NodeId> {
        rows.iter().map(|row| row.id.clone()).collect()
    }

    #[test]
    fn test_fixed_nodes_exist_from_start() {
        let tree = NavigationTree::new();
        assert_eq!(ids(&tree.rows()), vec![NodeId::ShowAll, NodeId::Search]);
        assert!(!tree.children_allowed(&NodeId::ShowAll));
        assert!(tree.children_allowed(&NodeId::Search));
        assert_eq!(tree.selected(), Some(&NodeId::ShowAll));
        assert!(!tree.is_expanded(&NodeId::Search));
    }

    #[test]
    fn test_save_search_adds_leaf_under_search_and_selects_it() {
        let mut tree = NavigationTree::new();
        let filter = SearchFilter::new(FieldId::LastName, "smi");
        assert!(tree.save_search(filter.clone()));

        let id = NodeId::Saved(filter);
        assert_eq!(tree.parent(&id), Some(&NodeId::Search));
        assert!(!tree.children_allowed(&id));
        assert!(tree.is_expanded(&NodeId::Search));
        assert_eq!(tree.selected(), Some(&id));
    }

    #[test]
    fn test_save_search_twice_keeps_one_node() {
        let mut tree = NavigationTree::new();
        let filter = SearchFilter::new(FieldId::Name, "smi");
        assert!(tree.save_search(filter.clone()));
        tree.select(&NodeId::ShowAll);
        assert!(!tree.save_search(SearchFilter::new(FieldId::Name, "smi")));

        assert_eq!(tree.saved_searches().count(), 1);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.selected(), Some(&NodeId::Saved(filter)));
    }

    #[test]
    fn test_select_unknown_node_keeps_selection() {
        let mut tree = NavigationTree::new();
        tree.select(&NodeId::Search);
        let unknown = NodeId::Saved(SearchFilter::new(FieldId::City, "nowhere"));
        assert!(!tree.select(&unknown));
        assert_eq!(tree.selected(), Some(&NodeId::Search));
    }

    #[test]
    fn test_rows_follow_declaration_then_insertion_order() {
        let mut tree = NavigationTree::new();
        let a = SearchFilter::new(FieldId::City, "oslo");
        let b = SearchFilter::new(FieldId::Email, "example");
        tree.save_search(a.clone());
        tree.save_search(b.clone());

        let rows = tree.rows();
        assert_eq!(
            ids(&rows),
            vec![
                NodeId::ShowAll,
                NodeId::Search,
                NodeId::Saved(a),
                NodeId::Saved(b.clone()),
            ]
        );
        assert_eq!(rows[2].depth, 1);
        assert_eq!(rows[2].caption, "city=*oslo*");
        assert!(rows[3].selected);
        assert!(rows.iter().filter(|row| row.selected).count() == 1);
        assert_eq!(tree.selected(), Some(&NodeId::Saved(b)));
    }

    #[test]
    fn test_collapse_hides_children_without_removing_them() {
        let mut tree = NavigationTree::new();
        tree.save_search(SearchFilter::new(FieldId::City, "oslo"));
        tree.toggle_expanded(&NodeId::Search);
        assert_eq!(tree.rows().len(), 2);
        assert_eq!(tree.saved_searches().count(), 1);

        tree.set_expanded(&NodeId::ShowAll, true);
        assert!(!tree.is_expanded(&NodeId::ShowAll));
    }
}
