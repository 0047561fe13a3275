use crate::data::DocumentNode;

/// Picks the file a document view opens on: the first `README.md` anywhere in
/// the tree, otherwise the first markdown file. Both names are compared
/// case-insensitively.
pub fn initial_file(nodes: &[DocumentNode]) -> Option<&DocumentNode> {
    find_file(nodes, &|node| node.name.eq_ignore_ascii_case("README.md"))
        .or_else(|| find_file(nodes, &is_markdown))
}

pub fn is_markdown(node: &DocumentNode) -> bool {
    node.name.to_ascii_lowercase().ends_with(".md")
}

/// Top-down scan: the files of a folder are checked in order before any of
/// its subfolders is entered.
pub fn find_file<'a>(
    nodes: &'a [DocumentNode],
    pred: &dyn Fn(&DocumentNode) -> bool,
) -> Option<&'a DocumentNode> {
    if let Some(found) = nodes.iter().find(|n| n.is_file() && pred(n)) {
        return Some(found);
    }
    nodes
        .iter()
        .filter(|n| n.is_folder())
        .find_map(|folder| find_file(folder.children(), pred))
}

pub fn find_by_path<'a>(nodes: &'a [DocumentNode], path: &str) -> Option<&'a DocumentNode> {
    let path = path.trim_matches('/');
    for node in nodes {
        if node.path.trim_matches('/') == path {
            return Some(node);
        }
        if node.is_folder() {
            if let Some(found) = find_by_path(node.children(), path) {
                return Some(found);
            }
        }
    }
    None
}

/// Every node in display order, paired with its depth.
pub fn walk(nodes: &[DocumentNode]) -> Vec<(usize, &DocumentNode)> {
    fn go<'a>(nodes: &'a [DocumentNode], depth: usize, out: &mut Vec<(usize, &'a DocumentNode)>) {
        for node in nodes {
            out.push((depth, node));
            if node.is_folder() {
                go(node.children(), depth + 1, out);
            }
        }
    }
    let mut out = Vec::new();
    go(nodes, 0, &mut out);
    out
}
