use serde::Serialize;
use std::fmt;

/// What caused a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// First scan after the document is ready
    #[default]
    Init,
    /// Nodes were added to the observed subtree
    Mutation,
    /// Scrolling settled after the debounce delay
    Scroll,
    /// Periodic safety net
    Poll,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::Init => "init",
            Trigger::Mutation => "mutation",
            Trigger::Scroll => "scroll",
            Trigger::Poll => "poll",
        };
        f.write_str(name)
    }
}
