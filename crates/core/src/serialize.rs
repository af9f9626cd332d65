//! HTML serialization of arena nodes through html5ever's serializer.

use std::io;

use html5ever::serialize::{Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::{LocalName, QualName, ns};

use crate::dom_tree::{Document, NodeData, NodeId};

enum Step {
    Open(NodeId),
    Close(NodeId),
}

fn element_name(name: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(name))
}

fn attribute_name(name: &str) -> QualName {
    QualName::new(None, ns!(), LocalName::from(name))
}

/// A node of a [`Document`] and everything below it.
struct Subtree<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl Serialize for Subtree<'_> {
    fn serialize<S: Serializer>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()> {
        let skip_self = matches!(traversal_scope, TraversalScope::ChildrenOnly(_));
        let doc = self.doc;

        let mut stack = vec![Step::Open(self.id)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(node) => {
                    let emit = !(skip_self && node == self.id);
                    match doc.data(node) {
                        NodeData::Document => {}
                        NodeData::Doctype(name) if emit => serializer.write_doctype(name)?,
                        NodeData::Comment(text) if emit => serializer.write_comment(text)?,
                        NodeData::Text(text) if emit => serializer.write_text(text)?,
                        NodeData::Element(el) => {
                            if emit {
                                let attrs: Vec<(QualName, &str)> = el
                                    .attrs
                                    .iter()
                                    .map(|(name, value)| (attribute_name(name), value.as_str()))
                                    .collect();
                                serializer
                                    .start_elem(element_name(&el.name), attrs.iter().map(|(name, value)| (name, *value)))?;
                                stack.push(Step::Close(node));
                            }
                        }
                        _ => {}
                    }
                    stack.extend(doc.children(node).iter().rev().map(|c| Step::Open(*c)));
                }
                Step::Close(node) => {
                    if let Some(name) = doc.tag_name(node) {
                        serializer.end_elem(element_name(name))?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Document {
    fn serialize_node(&self, id: NodeId, traversal_scope: TraversalScope) -> String {
        let opts = SerializeOpts { traversal_scope, ..Default::default() };
        let mut out = Vec::new();
        match html5ever::serialize::serialize(&mut out, &Subtree { doc: self, id }, opts) {
            Ok(()) => String::from_utf8_lossy(&out).into_owned(),
            Err(_) => String::new(),
        }
    }

    /// Serialized markup of the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        self.serialize_node(id, TraversalScope::ChildrenOnly(self.tag_name(id).map(element_name)))
    }

    /// Serialized markup of `id` itself.
    pub fn outer_html(&self, id: NodeId) -> String {
        self.serialize_node(id, TraversalScope::IncludeNode)
    }

    /// Serializes the whole document, doctype included.
    pub fn to_html(&self) -> String {
        self.serialize_node(self.root(), TraversalScope::ChildrenOnly(None))
    }
}
