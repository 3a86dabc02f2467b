//! Semantic identity of an asset, derived from its ancestry chain.

use super::Reference;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Ordered `(type, name)` pairs: one per ancestor, outermost first, then the asset itself.
///
/// Two identities are equal iff their rendered forms are identical, e.g.
/// `(category)=Finance::(term)=Customer`.
#[derive(Debug, Clone)]
pub struct Identity {
    segments: Vec<(String, String)>,
    rendered: String,
}

impl Identity {
    pub fn new(context: &[Reference], asset_type: &str, asset_name: &str) -> Self {
        let mut segments: Vec<(String, String)> = context
            .iter()
            .map(|r| (r.asset_type.clone(), r.name.clone()))
            .collect();
        segments.push((asset_type.to_string(), asset_name.to_string()));

        let rendered = segments
            .iter()
            .map(|(t, n)| format!("({})={}", t, n))
            .collect::<Vec<_>>()
            .join("::");

        Self { segments, rendered }
    }

    /// All pairs, ending with the asset's own.
    pub fn segments(&self) -> &[(String, String)] {
        &self.segments
    }

    /// The ancestor pairs only.
    pub fn ancestors(&self) -> &[(String, String)] {
        &self.segments[..self.segments.len() - 1]
    }

    pub fn asset_type(&self) -> &str {
        &self.segments[self.segments.len() - 1].0
    }

    pub fn asset_name(&self) -> &str {
        &self.segments[self.segments.len() - 1].1
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.rendered == other.rendered
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rendered.hash(state);
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}
