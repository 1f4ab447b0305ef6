//! Collection of every path a source file mentions.

use std::collections::BTreeSet;

use syn::visit::Visit;

/// Path segments as written, e.g. `["crate", "outbound", "persistence"]`.
pub(crate) type Segments = Vec<String>;

/// Gather the paths of `use` trees and of every other path expression.
pub(crate) fn mentioned_paths(file: &syn::File) -> BTreeSet<Segments> {
    let mut collector = Collector::default();
    collector.visit_file(file);
    collector.paths
}

#[derive(Default)]
struct Collector {
    paths: BTreeSet<Segments>,
}

impl Collector {
    fn walk_use(&mut self, tree: &syn::UseTree, prefix: &[String]) {
        let leaf = |ident: &syn::Ident| {
            let mut segments = prefix.to_vec();
            segments.push(ident.to_string());
            segments
        };
        match tree {
            syn::UseTree::Path(path) => self.walk_use(&path.tree, &leaf(&path.ident)),
            syn::UseTree::Name(name) => {
                self.paths.insert(leaf(&name.ident));
            }
            syn::UseTree::Rename(rename) => {
                self.paths.insert(leaf(&rename.ident));
            }
            syn::UseTree::Glob(_) => {
                self.paths.insert(prefix.to_vec());
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.walk_use(item, prefix);
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for Collector {
    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.walk_use(&node.tree, &[]);
    }

    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Segments = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        if !segments.is_empty() {
            self.paths.insert(segments);
        }
        syn::visit::visit_path(self, node);
    }
}
