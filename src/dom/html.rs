//! A [`Dom`] over a parsed HTML document.
//!
//! Used by the CLI to annotate saved catalog pages and by the test-suite as a
//! stand-in for the browser. Elements are addressed by their id in the
//! document arena, which never moves: removed nodes are only detached.

use crate::dom::{Badge, Dom, DomError, Placement};
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use std::collections::VecDeque;

/// Stable handle of an element inside an [`HtmlPage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(NodeId);

pub struct HtmlPage {
    html: Html,
    ready: bool,
}

fn compile(selector: &str) -> Result<Selector, DomError> {
    Selector::parse(selector).map_err(|e| DomError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

impl HtmlPage {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
            ready: true,
        }
    }

    /// A document whose `DOMContentLoaded` has not fired yet
    pub fn loading(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
            ready: false,
        }
    }

    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Serialize the current tree, badges included
    pub fn to_html(&self) -> String {
        self.html.html()
    }

    /// Text of every element matching `selector`
    pub fn texts(&self, selector: &str) -> Result<Vec<String>, DomError> {
        let sel = compile(selector)?;
        Ok(self
            .html
            .select(&sel)
            .map(|el| el.text().collect::<String>())
            .collect())
    }

    /// Append parsed `markup` under `parent`; returns the inserted top-level elements
    /// (what a MutationObserver would report as added nodes).
    pub fn insert_html(&mut self, parent: &NodeKey, markup: &str) -> Result<Vec<NodeKey>, DomError> {
        self.graft(parent, markup, Placement::Append)
    }

    fn element(&self, key: &NodeKey) -> Result<ElementRef<'_>, DomError> {
        self.html
            .tree
            .get(key.0)
            .and_then(ElementRef::wrap)
            .ok_or(DomError::Detached)
    }

    fn keys_of<'a>(elements: impl IntoIterator<Item = ElementRef<'a>>) -> Vec<NodeKey> {
        elements.into_iter().map(|el| NodeKey((*el).id())).collect()
    }

    /// Copy the nodes of a parsed fragment under `parent`, breadth-first so
    /// siblings keep their order.
    fn graft(&mut self, parent: &NodeKey, markup: &str, placement: Placement) -> Result<Vec<NodeKey>, DomError> {
        let fragment = Html::parse_fragment(markup);
        let roots: Vec<_> = fragment.root_element().children().collect();
        if !roots.iter().any(|node| node.value().is_element()) {
            return Err(DomError::EmptyMarkup(markup.to_string()));
        }

        let parent_id = parent.0;

        // prepending one by one reverses order, so feed the roots backwards
        let ordered: Vec<_> = match placement {
            Placement::Append => roots,
            Placement::Prepend => roots.into_iter().rev().collect(),
        };

        let mut inserted = Vec::new();
        let mut queue = VecDeque::new();
        for source in ordered {
            let mut parent_mut = self.html.tree.get_mut(parent_id).ok_or(DomError::Detached)?;
            let new_id = match placement {
                Placement::Append => parent_mut.append(source.value().clone()).id(),
                Placement::Prepend => parent_mut.prepend(source.value().clone()).id(),
            };
            if source.value().is_element() {
                inserted.push(new_id);
            }
            queue.push_back((source, new_id));
        }

        while let Some((source, dest)) = queue.pop_front() {
            for child in source.children() {
                let mut dest_mut = self.html.tree.get_mut(dest).ok_or(DomError::Detached)?;
                let child_id = dest_mut.append(child.value().clone()).id();
                queue.push_back((child, child_id));
            }
        }

        if placement == Placement::Prepend {
            inserted.reverse();
        }

        Ok(inserted.into_iter().map(NodeKey).collect())
    }
}

impl Dom for HtmlPage {
    type Node = NodeKey;

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn query_all(&self, selector: &str) -> Result<Vec<NodeKey>, DomError> {
        let sel = compile(selector)?;
        Ok(Self::keys_of(self.html.select(&sel)))
    }

    fn query_within(&self, scope: &NodeKey, selector: &str) -> Result<Vec<NodeKey>, DomError> {
        let sel = compile(selector)?;
        let scope = self.element(scope)?;
        Ok(Self::keys_of(scope.select(&sel)))
    }

    fn matches(&self, node: &NodeKey, selector: &str) -> Result<bool, DomError> {
        let sel = compile(selector)?;
        Ok(sel.matches(&self.element(node)?))
    }

    fn closest(&self, node: &NodeKey, selector: &str) -> Result<Option<NodeKey>, DomError> {
        let sel = compile(selector)?;
        let el = self.element(node)?;
        let found = std::iter::once(el)
            .chain(el.ancestors().filter_map(ElementRef::wrap))
            .find(|candidate| sel.matches(candidate));
        Ok(found.map(|el| NodeKey((*el).id())))
    }

    fn text_content(&self, node: &NodeKey) -> String {
        self.element(node)
            .map(|el| el.text().collect())
            .unwrap_or_default()
    }

    fn attribute(&self, node: &NodeKey, name: &str) -> Option<String> {
        self.element(node)
            .ok()
            .and_then(|el| el.value().attr(name))
            .map(str::to_string)
    }

    fn remove(&mut self, node: &NodeKey) -> Result<(), DomError> {
        let mut target = self.html.tree.get_mut(node.0).ok_or(DomError::Detached)?;
        target.detach();
        Ok(())
    }

    fn insert_badge(&mut self, parent: &NodeKey, badge: &Badge) -> Result<NodeKey, DomError> {
        let markup = format!(
            r#"<span data-testid="{}" style="{}">{}</span>"#,
            escape(&badge.marker),
            escape(&badge.css),
            escape(&badge.text)
        );
        self.graft(parent, &markup, badge.placement)?
            .into_iter()
            .next()
            .ok_or(DomError::EmptyMarkup(markup))
    }
}
