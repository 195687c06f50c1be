//! Highlight style resolution.

use std::fmt;
use std::sync::Arc;

use crate::feature::Feature;
use crate::map::Style;

/// Signature of a per-feature style callback: `(layer_name, feature)`.
pub type StyleFn = dyn Fn(&str, &Feature) -> Style + Send + Sync;

/// Chooses the highlight style of a selected or hovered feature.
#[derive(Clone)]
pub enum StyleResolver {
    /// Same style for every feature.
    Fixed(Style),
    /// Style computed from the owning layer's name and the feature.
    PerFeature(Arc<StyleFn>),
}

impl StyleResolver {
    /// Wraps a per-feature style callback.
    pub fn per_feature<F>(resolve: F) -> Self
    where
        F: Fn(&str, &Feature) -> Style + Send + Sync + 'static,
    {
        StyleResolver::PerFeature(Arc::new(resolve))
    }

    pub fn resolve(&self, layer_name: &str, feature: &Feature) -> Style {
        match self {
            StyleResolver::Fixed(style) => style.clone(),
            StyleResolver::PerFeature(resolve) => resolve(layer_name, feature),
        }
    }
}

impl Default for StyleResolver {
    fn default() -> Self {
        StyleResolver::Fixed(Style::highlight())
    }
}

impl From<Style> for StyleResolver {
    fn from(style: Style) -> Self {
        StyleResolver::Fixed(style)
    }
}

impl fmt::Debug for StyleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleResolver::Fixed(style) => f.debug_tuple("Fixed").field(style).finish(),
            StyleResolver::PerFeature(_) => f.write_str("PerFeature(..)"),
        }
    }
}
