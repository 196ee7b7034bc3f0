// The page boundary. The engine and adapters only see this trait; the browser
// (wasm32) and saved HTML documents (native) each provide an implementation.

pub mod error;
#[cfg(not(target_arch = "wasm32"))]
pub mod html;

pub use error::DomError;
#[cfg(not(target_arch = "wasm32"))]
pub use html::{HtmlPage, NodeKey};

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Where a badge goes relative to its parent's existing children
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Append,
    Prepend,
}

/// A fully built badge element, ready to be inserted in one step
#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    /// Value of the `data-testid` attribute; the adapter's badge selector matches on it
    pub marker: String,
    pub text: String,
    /// Inline `style` attribute
    pub css: String,
    pub placement: Placement,
}

/// Read/write access to one page's element tree.
///
/// Node handles are identities: equal handles refer to the same element for the
/// lifetime of the page. Selector arguments are CSS selector strings.
pub trait Dom {
    type Node: Clone + Eq + Hash + Debug;

    /// False while the document is still loading
    fn is_ready(&self) -> bool {
        true
    }

    /// All matching elements in the document, in document order
    fn query_all(&self, selector: &str) -> Result<Vec<Self::Node>, DomError>;

    /// Matching descendants of `scope`
    fn query_within(&self, scope: &Self::Node, selector: &str) -> Result<Vec<Self::Node>, DomError>;

    fn query_first(&self, scope: &Self::Node, selector: &str) -> Result<Option<Self::Node>, DomError> {
        Ok(self.query_within(scope, selector)?.into_iter().next())
    }

    fn matches(&self, node: &Self::Node, selector: &str) -> Result<bool, DomError>;

    /// `node` itself or its nearest ancestor matching `selector`
    fn closest(&self, node: &Self::Node, selector: &str) -> Result<Option<Self::Node>, DomError>;

    fn text_content(&self, node: &Self::Node) -> String;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn remove(&mut self, node: &Self::Node) -> Result<(), DomError>;

    /// Insert `badge` as a child of `parent` and return the new element
    fn insert_badge(&mut self, parent: &Self::Node, badge: &Badge) -> Result<Self::Node, DomError>;
}
