//! The Universal Abstract Syntax Tree node this crate consumes.
//!
//! Production of this tree is a parser's job, entirely out of scope here
//! (§6 of the design doc). `Node` is the typed contract a parser hands us:
//! an owned, acyclic tree rather than the dynamically-typed map the
//! reference shape uses, so a "null child" is structurally impossible
//! instead of a runtime condition to guard against.

use std::collections::{HashMap, HashSet};

/// One node of a parsed syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    /// Node kind, e.g. `"Function"`, `"Block"`, `"Identifier"`.
    pub node_type: String,
    /// Role tags, e.g. `{"Function", "Declaration"}`.
    pub roles: HashSet<String>,
    /// Raw token text, if this node carries one (identifiers, literals).
    pub token: Option<String>,
    /// Arbitrary string properties, e.g. `{"name": "process"}`.
    pub properties: HashMap<String, String>,
    /// Children in their original, stored order.
    pub children: Vec<Node>,
}

impl Node {
    /// Build a leaf or interior node with no roles, token, or properties set.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            ..Default::default()
        }
    }

    /// Builder-style role addition.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Builder-style token assignment.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Builder-style property assignment.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Visit this subtree pre-order, invoking `visit(node, depth)` on
    /// entry to each node before descending into its children.
    ///
    /// This is the `visitPreOrder` helper the external contract names;
    /// the shingler and the per-file visitor both build on it.
    pub fn visit_pre_order<F: FnMut(&Node, usize)>(&self, visit: &mut F) {
        self.visit_pre_order_at(0, visit);
    }

    fn visit_pre_order_at<F: FnMut(&Node, usize)>(&self, depth: usize, visit: &mut F) {
        visit(self, depth);
        for child in &self.children {
            child.visit_pre_order_at(depth + 1, visit);
        }
    }

    /// `true` iff this node's `type`/`roles` mark it as a function per the
    /// detection rule in §4.4: `type ∈ {Function, Method}` OR roles contains
    /// both `Function` and `Declaration`.
    pub fn is_function(&self) -> bool {
        self.node_type == "Function"
            || self.node_type == "Method"
            || (self.roles.contains("Function") && self.roles.contains("Declaration"))
    }

    /// The name this function node reports: its `name` property, else its
    /// token, else the string form of its type. Applying this consistently
    /// to the same node always yields the same name.
    pub fn function_name(&self) -> String {
        if let Some(name) = self.properties.get("name") {
            if !name.is_empty() {
                return name.clone();
            }
        }
        if let Some(token) = &self.token {
            if !token.is_empty() {
                return token.clone();
            }
        }
        self.node_type.clone()
    }
}
