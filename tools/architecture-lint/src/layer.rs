//! Layer inference and per-layer dependency rules.

use std::path::Path;

/// Architectural layer of a source file under `src/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layer {
    Domain,
    Inbound,
    Outbound,
}

/// Crates that reach storage directly.
const STORAGE_CRATES: &[&str] = &["diesel", "diesel_async", "diesel_migrations"];

/// Crates that belong to the operator surface.
const SURFACE_CRATES: &[&str] = &["clap", "ortho_config", "color_eyre", "tracing_subscriber"];

impl Layer {
    /// Layer of `relative_path`, judged by its first component.
    pub(crate) fn of(relative_path: &Path) -> Option<Self> {
        let first = relative_path.components().next()?.as_os_str().to_str()?;
        Self::named(first)
    }

    pub(crate) fn named(name: &str) -> Option<Self> {
        match name {
            "domain" => Some(Self::Domain),
            "inbound" => Some(Self::Inbound),
            "outbound" => Some(Self::Outbound),
            _ => None,
        }
    }

    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    /// Sibling layers this layer must not reach into.
    pub(crate) fn forbids_layer(self, other: Self) -> bool {
        match self {
            Self::Domain => other != Self::Domain,
            Self::Inbound => other == Self::Outbound,
            Self::Outbound => other == Self::Inbound,
        }
    }

    /// External crates this layer must not import.
    pub(crate) fn forbids_crate(self, root: &str) -> bool {
        match self {
            Self::Domain => STORAGE_CRATES.contains(&root) || SURFACE_CRATES.contains(&root),
            Self::Inbound => STORAGE_CRATES.contains(&root),
            Self::Outbound => matches!(root, "clap" | "ortho_config"),
        }
    }
}
