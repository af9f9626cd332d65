//! Arena-backed DOM tree.
//!
//! Every node lives in a single `Vec` owned by the [`Document`] and is
//! addressed by a [`NodeId`]. Detached nodes stay in the arena but are no
//! longer reachable from the root, so ids handed out during one pass stay
//! valid across later mutations. Cloning a whole document preserves every id,
//! which lets score maps computed on one snapshot be reused on its clones.

use std::fmt;

/// Stable index of a node inside its owning [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// Tag name and ordered attributes of an element.
///
/// Names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self { data, parent: None, children: Vec::new() }
    }
}

/// An HTML document.
///
/// Build one with [`crate::parse::parse_html`] or [`Document::parse`].
///
/// # Example
///
/// ```rust
/// use legible_core::Document;
///
/// let mut doc = Document::parse("<div class=\"a\"><p>Hello</p></div>").unwrap();
/// let div = doc.query_selector_all("div.a").unwrap()[0];
/// doc.add_class(div, "b");
/// assert_eq!(doc.outer_html(div), "<div class=\"a b\"><p>Hello</p></div>");
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document holding only the document node.
    pub fn new() -> Self {
        Self { nodes: vec![Node::new(NodeData::Document)] }
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub(crate) fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node::new(data));
        NodeId(self.nodes.len() - 1)
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData { name: name.to_ascii_lowercase(), attrs: Vec::new() }))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).iter().copied().filter(|c| self.is_element(*c)).collect()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).iter().copied().find(|c| self.is_element(*c))
    }

    fn sibling_index(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|c| *c == id)?;
        Some((parent, index))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.sibling_index(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.sibling_index(id)?;
        index.checked_sub(1).map(|i| self.children(parent)[i])
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.sibling_index(id)?;
        self.children(parent)[index + 1..].iter().copied().find(|c| self.is_element(*c))
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.sibling_index(id)?;
        self.children(parent)[..index].iter().rev().copied().find(|c| self.is_element(*c))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Element(_))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Text(_))
    }

    /// Lowercase tag name, or `None` for non-element nodes.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Element(el) => Some(el.name.as_str()),
            _ => None,
        }
    }

    /// Whether the node is an element with the given (lowercase) tag.
    pub fn is_tag(&self, id: NodeId, name: &str) -> bool {
        self.tag_name(id) == Some(name)
    }

    /// Payload of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: &str) {
        if let NodeData::Text(text) = &mut self.nodes[id.0].data {
            *text = value.to_string();
        }
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.data(id) {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Renames an element in place, keeping its id, attributes and children.
    pub fn set_tag(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.name = name.to_ascii_lowercase();
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        self.element(id).map(|el| el.attrs.as_slice()).unwrap_or(&[])
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(id) else { return };
        let name = name.to_ascii_lowercase();
        match el.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => el.attrs.push((name, value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.retain(|(key, _)| key != name);
        }
    }

    /// Value of the `class` attribute, or an empty string.
    pub fn class_name(&self, id: NodeId) -> &str {
        self.attr(id, "class").unwrap_or("")
    }

    /// Value of the `id` attribute, or an empty string.
    pub fn id_attr(&self, id: NodeId) -> &str {
        self.attr(id, "id").unwrap_or("")
    }

    pub fn class_list(&self, id: NodeId) -> Vec<&str> {
        self.class_name(id).split_whitespace().collect()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.class_name(id).split_whitespace().any(|c| c == class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.is_element(id) || self.has_class(id, class) {
            return;
        }
        let mut classes = self.class_list(id).join(" ");
        if !classes.is_empty() {
            classes.push(' ');
        }
        classes.push_str(class);
        self.set_attr(id, "class", &classes);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let classes: Vec<String> = self
            .class_list(id)
            .into_iter()
            .filter(|c| *c != class)
            .map(str::to_string)
            .collect();
        self.set_attr(id, "class", &classes.join(" "));
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Appends `child` to `parent`, moving it from its previous position.
    ///
    /// Moves that would create a cycle are ignored.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.contains(child, parent) {
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Inserts `child` into `parent` right before `reference`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        if child == reference || self.contains(child, parent) {
            return;
        }
        self.detach(child);
        let siblings = &mut self.nodes[parent.0].children;
        let index = siblings.iter().position(|c| *c == reference).unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Detaches a node from its parent.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
    }

    /// Puts `new` where `old` is and detaches `old`.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.parent(old) else { return };
        if old == new || self.contains(new, parent) {
            return;
        }
        self.detach(new);
        let Some(index) = self.children(parent).iter().position(|c| *c == old) else { return };
        self.nodes[parent.0].children[index] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
    }

    /// Moves every child of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        for child in self.children(from).to_vec() {
            self.append_child(to, child);
        }
    }

    /// Detaches every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
    }

    /// Copies a node into a new detached node of this document.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> NodeId {
        let copy = self.push(self.data(id).clone());
        if deep {
            let mut stack = vec![(id, copy)];
            while let Some((source, target)) = stack.pop() {
                for child in self.children(source).to_vec() {
                    let child_copy = self.push(self.data(child).clone());
                    self.nodes[child_copy.0].parent = Some(target);
                    self.nodes[target.0].children.push(child_copy);
                    stack.push((child, child_copy));
                }
            }
        }
        copy
    }

    /// Copies the subtree rooted at `id` of another document into this one.
    pub fn import_node(&mut self, other: &Document, id: NodeId) -> NodeId {
        let copy = self.push(other.data(id).clone());
        let mut stack = vec![(id, copy)];
        while let Some((source, target)) = stack.pop() {
            for &child in other.children(source) {
                let child_copy = self.push(other.data(child).clone());
                self.nodes[child_copy.0].parent = Some(target);
                self.nodes[target.0].children.push(child_copy);
                stack.push((child, child_copy));
            }
        }
        copy
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Element ancestors of `id`, nearest first. `max_depth` of 0 means no limit.
    pub fn ancestors(&self, id: NodeId, max_depth: usize) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if !self.is_element(ancestor) {
                break;
            }
            out.push(ancestor);
            if max_depth > 0 && out.len() == max_depth {
                break;
            }
            current = self.parent(ancestor);
        }
        out
    }

    /// Descendant elements of `id` whose tag is in `tags`; `"*"` matches any element.
    pub fn elements_by_tag(&self, id: NodeId, tags: &[&str]) -> Vec<NodeId> {
        let any = tags.contains(&"*");
        self.descendants(id)
            .into_iter()
            .filter(|d| match self.tag_name(*d) {
                Some(name) => any || tags.contains(&name),
                None => false,
            })
            .collect()
    }

    /// Whether some ancestor of `id` has the given tag.
    pub fn has_ancestor_tag(&self, id: NodeId, tag: &str) -> bool {
        self.ancestors(id, 0).into_iter().any(|a| self.is_tag(a, tag))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.data(id) {
            NodeData::Text(text) | NodeData::Comment(text) => text.clone(),
            _ => {
                let mut out = String::new();
                for node in self.descendants(id) {
                    if let NodeData::Text(text) = self.data(node) {
                        out.push_str(text);
                    }
                }
                out
            }
        }
    }

    pub fn html_element(&self) -> Option<NodeId> {
        self.children(self.root()).iter().copied().find(|c| self.is_tag(*c, "html"))
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.html_element()?;
        self.children(html).iter().copied().find(|c| self.is_tag(*c, "head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.html_element()?;
        self.children(html).iter().copied().find(|c| self.is_tag(*c, "body"))
    }

    /// Trimmed text of the first `<title>` element.
    pub fn title(&self) -> Option<String> {
        let title = self.elements_by_tag(self.root(), &["title"]).into_iter().next()?;
        Some(self.text_content(title).trim().to_string())
    }

    /// Number of elements reachable from the root.
    pub fn element_count(&self) -> usize {
        self.descendants(self.root()).into_iter().filter(|d| self.is_element(*d)).count()
    }

    /// Next element in a depth-first walk over elements.
    ///
    /// With `ignore_self_and_kids` the walk skips the subtree of `id`.
    pub fn next_element(&self, id: NodeId, ignore_self_and_kids: bool) -> Option<NodeId> {
        if !ignore_self_and_kids && let Some(child) = self.first_element_child(id) {
            return Some(child);
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(sibling) = self.next_element_sibling(node) {
                return Some(sibling);
            }
            current = self.parent(node);
        }
        None
    }

    /// Removes `id` and returns the element the walk continues with.
    pub fn remove_and_get_next(&mut self, id: NodeId) -> Option<NodeId> {
        let next = self.next_element(id, true);
        self.remove(id);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let div = doc.create_element("DIV");
        let p = doc.create_element("p");
        let text = doc.create_text("Hello");
        let root = doc.root();
        doc.append_child(root, div);
        doc.append_child(div, p);
        doc.append_child(p, text);
        (doc, div, p, text)
    }

    #[test]
    fn test_tag_names_are_lowercase() {
        let (doc, div, _, text) = sample();
        assert_eq!(doc.tag_name(div), Some("div"));
        assert_eq!(doc.tag_name(text), None);
    }

    #[test]
    fn test_attributes() {
        let (mut doc, div, _, _) = sample();
        doc.set_attr(div, "ID", "main");
        assert_eq!(doc.attr(div, "id"), Some("main"));
        doc.set_attr(div, "id", "other");
        assert_eq!(doc.attrs(div).len(), 1);
        doc.remove_attr(div, "id");
        assert!(!doc.has_attr(div, "id"));
    }

    #[test]
    fn test_class_list() {
        let (mut doc, div, _, _) = sample();
        doc.add_class(div, "a");
        doc.add_class(div, "b");
        doc.add_class(div, "a");
        assert_eq!(doc.class_list(div), vec!["a", "b"]);
        doc.remove_class(div, "a");
        assert!(!doc.has_class(div, "a"));
        assert!(doc.has_class(div, "b"));
    }

    #[test]
    fn test_remove_and_replace() {
        let (mut doc, div, p, _) = sample();
        let span = doc.create_element("span");
        doc.replace_with(p, span);
        assert_eq!(doc.children(div), &[span]);
        assert_eq!(doc.parent(p), None);

        doc.remove(span);
        assert!(doc.children(div).is_empty());
    }

    #[test]
    fn test_append_ignores_cycles() {
        let (mut doc, div, p, _) = sample();
        doc.append_child(p, div);
        assert_eq!(doc.parent(p), Some(div));
        assert_eq!(doc.parent(div), Some(doc.root()));
    }

    #[test]
    fn test_clone_node_deep_and_shallow() {
        let (mut doc, div, _, _) = sample();
        let shallow = doc.clone_node(div, false);
        assert!(doc.children(shallow).is_empty());

        let deep = doc.clone_node(div, true);
        assert_eq!(doc.text_content(deep), "Hello");
        assert_eq!(doc.parent(deep), None);
    }

    #[test]
    fn test_document_clone_keeps_ids() {
        let (doc, div, p, _) = sample();
        let mut copy = doc.clone();
        copy.remove(p);
        assert_eq!(copy.tag_name(p), Some("p"));
        assert!(copy.children(div).is_empty());
        assert_eq!(doc.children(div), &[p]);
    }

    #[test]
    fn test_next_element_walk() {
        let (mut doc, div, p, _) = sample();
        let sibling = doc.create_element("section");
        let root = doc.root();
        doc.append_child(root, sibling);

        assert_eq!(doc.next_element(div, false), Some(p));
        assert_eq!(doc.next_element(p, false), Some(sibling));
        assert_eq!(doc.next_element(div, true), Some(sibling));
        assert_eq!(doc.next_element(sibling, false), None);
    }

    #[test]
    fn test_ancestors_depth() {
        let (doc, div, p, text) = sample();
        assert_eq!(doc.ancestors(text, 0), vec![p, div]);
        assert_eq!(doc.ancestors(text, 1), vec![p]);
    }
}
