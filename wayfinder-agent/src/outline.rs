//! Compiles an accessibility snapshot into the indexed text outline the
//! decision policy reads.
//!
//! A depth-first walk from the snapshot root keeps only nodes that carry a
//! name, are not of a suppressed role and do not merely repeat the text of
//! their nearest kept ancestor. Kept nodes are numbered from 1 in visit order
//! and rendered one per line as `<indent><index> <role> '<name>'`.
use crate::error::CompileError;
use crate::snapshot::Snapshot;
use std::collections::{HashMap, HashSet};
use wayfinder_config::AgentSettings;
use wayfinder_drivers::{AxNode, BackendNodeId};

/// Roles whose text usually duplicates the enclosing control's label.
const REDUNDANT_ROLES: &[&str] = &["statictext", "heading", "image", "img", "generic"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineOptions {
    pub max_nodes: usize,
    /// Deepest retained depth that is still rendered; `None` is unlimited.
    pub max_depth: Option<usize>,
    pub indent: String,
    suppressed: HashSet<String>,
}

impl OutlineOptions {
    pub fn new(max_nodes: usize) -> Self {
        Self {
            max_nodes,
            max_depth: None,
            indent: "\t".to_string(),
            suppressed: HashSet::from([normalize_role("gridcell")]),
        }
    }

    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            max_depth: settings.max_depth,
            ..Self::new(settings.max_nodes)
        }
        .with_indent(settings.indent.unit())
        .with_suppressed_roles(&settings.suppressed_roles)
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_suppressed_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.suppressed = roles.into_iter().map(|r| normalize_role(r.as_ref())).collect();
        self
    }

    fn is_suppressed(&self, role: &str) -> bool {
        self.suppressed.contains(&normalize_role(role))
    }
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self::from_settings(&AgentSettings::default())
    }
}

/// One retained node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub index: usize,
    pub role: String,
    pub name: String,
    pub depth: usize,
    pub node_id: String,
    pub backend_node: Option<BackendNodeId>,
}

impl OutlineEntry {
    fn render(&self, indent: &str) -> String {
        format!(
            "{}{} {} '{}'",
            indent.repeat(self.depth),
            self.index,
            self.role,
            self.name
        )
    }
}

/// The rendered outline plus its index table.
///
/// Indices are only meaningful against the snapshot this outline was
/// compiled from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    text: String,
    entries: Vec<OutlineEntry>,
}

impl Outline {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    pub fn lookup(&self, index: usize) -> Option<&OutlineEntry> {
        index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for Outline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

struct Frame<'a> {
    id: &'a str,
    depth: usize,
    /// Position in `entries` of the nearest retained ancestor.
    ancestor: Option<usize>,
}

pub fn compile(snapshot: &Snapshot, options: &OutlineOptions) -> Result<Outline, CompileError> {
    let Some(root) = snapshot.root_id.as_deref() else {
        return Ok(Outline::empty());
    };

    let by_id: HashMap<&str, &AxNode> = snapshot
        .nodes
        .iter()
        .map(|n| (n.node_id.as_str(), n))
        .collect();
    if !by_id.contains_key(root) {
        return Err(CompileError::MissingRoot(root.to_string()));
    }

    let mut entries: Vec<OutlineEntry> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack = vec![Frame {
        id: root,
        depth: 0,
        ancestor: None,
    }];

    while let Some(frame) = stack.pop() {
        if entries.len() >= options.max_nodes {
            break;
        }
        if !visited.insert(frame.id) {
            continue;
        }
        // dangling ids are skipped
        let Some(node) = by_id.get(frame.id) else {
            continue;
        };
        if options.max_depth.is_some_and(|max| frame.depth > max) {
            continue;
        }

        let role = node.role();
        let name = node.name().trim();
        let ancestor_name = frame.ancestor.map(|i| entries[i].name.as_str());
        let retained = !name.is_empty()
            && !options.is_suppressed(role)
            && !is_redundant(role, name, ancestor_name);

        let (child_depth, child_ancestor) = if retained {
            entries.push(OutlineEntry {
                index: entries.len() + 1,
                role: role.to_string(),
                name: name.to_string(),
                depth: frame.depth,
                node_id: node.node_id.clone(),
                backend_node: node.backend_dom_node_id,
            });
            (frame.depth + 1, Some(entries.len() - 1))
        } else {
            (frame.depth, frame.ancestor)
        };

        for child in node.child_ids.iter().rev() {
            if !visited.contains(child.as_str()) {
                stack.push(Frame {
                    id: child.as_str(),
                    depth: child_depth,
                    ancestor: child_ancestor,
                });
            }
        }
    }

    let text = entries
        .iter()
        .map(|e| e.render(&options.indent))
        .collect::<Vec<_>>()
        .join("\n");

    tracing::debug!(
        target: "wayfinder.outline",
        nodes = snapshot.nodes.len(),
        retained = entries.len(),
        "compiled outline"
    );

    Ok(Outline { text, entries })
}

fn is_redundant(role: &str, name: &str, ancestor_name: Option<&str>) -> bool {
    let role = normalize_role(role);
    REDUNDANT_ROLES.contains(&role.as_str()) && ancestor_name.is_some_and(|a| a.contains(name))
}

/// `StaticText`, `static-text` and `static_text` all compare equal.
fn normalize_role(role: &str) -> String {
    role.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(nodes: Vec<AxNode>) -> Snapshot {
        Snapshot::from_nodes(nodes)
    }

    fn compile_default(nodes: Vec<AxNode>) -> Outline {
        compile(&snap(nodes), &OutlineOptions::new(300)).unwrap()
    }

    #[test]
    fn renders_indexed_indented_lines() {
        let outline = compile_default(vec![
            AxNode::new("1").with_role("RootWebArea").with_name("Home").with_children(["2", "3"]),
            AxNode::new("2").with_role("link").with_name("News"),
            AxNode::new("3").with_role("navigation").with_name("Menu").with_children(["4"]),
            AxNode::new("4").with_role("button").with_name("Open"),
        ]);

        assert_eq!(
            outline.text(),
            "1 RootWebArea 'Home'\n\t2 link 'News'\n\t3 navigation 'Menu'\n\t\t4 button 'Open'"
        );
        assert_eq!(outline.lookup(4).map(|e| e.node_id.as_str()), Some("4"));
        assert_eq!(outline.lookup(0), None);
        assert_eq!(outline.lookup(5), None);
    }

    #[test]
    fn indices_are_dense_and_follow_visit_order() {
        let outline = compile_default(vec![
            AxNode::new("r").with_role("RootWebArea").with_children(["a", "b", "c"]),
            AxNode::new("a").with_role("generic").with_children(["a1"]),
            AxNode::new("a1").with_role("link").with_name("A1"),
            AxNode::new("b").with_role("button").with_name("   "),
            AxNode::new("c").with_role("textbox").with_name("Search"),
        ]);

        let indices: Vec<_> = outline.entries().iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![1, 2]);
        let names: Vec<_> = outline.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A1", "Search"]);
        // unretained ancestors do not add depth
        assert!(outline.entries().iter().all(|e| e.depth == 0));
    }

    #[test]
    fn suppressed_roles_are_dropped_but_descended() {
        let outline = compile_default(vec![
            AxNode::new("r").with_role("grid").with_name("Results").with_children(["c"]),
            AxNode::new("c").with_role("gridcell").with_name("Cell").with_children(["l"]),
            AxNode::new("l").with_role("link").with_name("Row link"),
        ]);

        assert!(outline.entries().iter().all(|e| e.role != "gridcell"));
        assert_eq!(outline.len(), 2);
        assert_eq!(outline.lookup(2).unwrap().depth, 1);
    }

    #[test]
    fn redundant_text_under_matching_ancestor_is_dropped() {
        let outline = compile_default(vec![
            AxNode::new("g").with_role("generic").with_name("Submit").with_children(["t"]),
            AxNode::new("t").with_role("StaticText").with_name("Submit"),
        ]);
        assert_eq!(outline.len(), 1);
        assert_eq!(outline.text(), "1 generic 'Submit'");
    }

    #[test]
    fn longer_child_text_is_kept() {
        let outline = compile_default(vec![
            AxNode::new("g").with_role("generic").with_name("Submit").with_children(["t"]),
            AxNode::new("t").with_role("static-text").with_name("Submit now"),
        ]);
        assert_eq!(outline.len(), 2);
        assert_eq!(outline.lookup(2).unwrap().name, "Submit now");
    }

    #[test]
    fn proper_substring_is_dropped() {
        let outline = compile_default(vec![
            AxNode::new("g").with_role("generic").with_name("Submit").with_children(["t"]),
            AxNode::new("t").with_role("static_text").with_name("Sub"),
        ]);
        assert_eq!(outline.len(), 1);
    }

    #[test]
    fn redundancy_only_applies_to_text_like_roles() {
        let outline = compile_default(vec![
            AxNode::new("g").with_role("form").with_name("Submit").with_children(["b"]),
            AxNode::new("b").with_role("button").with_name("Submit"),
        ]);
        assert_eq!(outline.len(), 2);
    }

    #[test]
    fn image_alias_counts_as_redundant() {
        let outline = compile_default(vec![
            AxNode::new("a").with_role("link").with_name("Company logo").with_children(["i"]),
            AxNode::new("i").with_role("img").with_name("logo"),
        ]);
        assert_eq!(outline.len(), 1);
    }

    #[test]
    fn cap_limits_retained_lines() {
        let children: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
        let mut nodes = vec![AxNode::new("root").with_role("list").with_children(children.clone())];
        nodes.extend(
            children
                .iter()
                .map(|id| AxNode::new(id.clone()).with_role("listitem").with_name(id)),
        );

        let outline = compile(&snap(nodes), &OutlineOptions::new(5)).unwrap();
        assert_eq!(outline.len(), 5);
        assert_eq!(outline.text().lines().count(), 5);
        assert_eq!(outline.lookup(5).unwrap().name, "c4");
    }

    #[test]
    fn cycles_terminate() {
        let outline = compile_default(vec![
            AxNode::new("1").with_role("main").with_name("Main").with_children(["2"]),
            AxNode::new("2").with_role("link").with_name("Loop").with_children(["1", "2"]),
        ]);
        assert_eq!(outline.len(), 2);
    }

    #[test]
    fn dangling_children_are_skipped() {
        let outline = compile_default(vec![
            AxNode::new("1").with_role("main").with_name("Main").with_children(["404", "2"]),
            AxNode::new("2").with_role("link").with_name("Docs"),
        ]);
        assert_eq!(outline.len(), 2);
    }

    #[test]
    fn max_depth_prunes_deeper_entries() {
        let nodes = vec![
            AxNode::new("1").with_role("main").with_name("Main").with_children(["2"]),
            AxNode::new("2").with_role("list").with_name("List").with_children(["3"]),
            AxNode::new("3").with_role("link").with_name("Deep"),
        ];
        let outline = compile(&snap(nodes), &OutlineOptions::new(300).with_max_depth(1)).unwrap();
        let names: Vec<_> = outline.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Main", "List"]);
    }

    #[test]
    fn spaces_indent() {
        let nodes = vec![
            AxNode::new("1").with_role("main").with_name("Main").with_children(["2"]),
            AxNode::new("2").with_role("link").with_name("Docs"),
        ];
        let outline = compile(&snap(nodes), &OutlineOptions::new(300).with_indent("  ")).unwrap();
        assert_eq!(outline.text(), "1 main 'Main'\n  2 link 'Docs'");
    }

    #[test]
    fn missing_root_is_an_error() {
        let snapshot = Snapshot {
            nodes: vec![AxNode::new("1")],
            root_id: Some("0".into()),
        };
        assert_eq!(
            compile(&snapshot, &OutlineOptions::default()),
            Err(CompileError::MissingRoot("0".into()))
        );
    }

    #[test]
    fn empty_snapshot_compiles_to_empty_outline() {
        let outline = compile(&Snapshot::empty(), &OutlineOptions::default()).unwrap();
        assert!(outline.is_empty());
        assert_eq!(outline.text(), "");
    }

    #[test]
    fn options_follow_agent_settings() {
        let mut settings = AgentSettings::default();
        settings.suppressed_roles = vec!["Link".into()];
        settings.max_nodes = 7;
        let opts = OutlineOptions::from_settings(&settings);
        assert!(opts.is_suppressed("link"));
        assert!(!opts.is_suppressed("gridcell"));
        assert_eq!(opts.max_nodes, 7);
    }
}
