use crate::error::CaptureError;
use std::collections::HashSet;
use wayfinder_drivers::{AxNode, BrowserSession};

/// One observation of the page's accessibility graph.
///
/// Built fresh every iteration; the root is the first node after
/// deduplication.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub nodes: Vec<AxNode>,
    pub root_id: Option<String>,
}

impl Snapshot {
    pub fn from_nodes(nodes: Vec<AxNode>) -> Self {
        let nodes = dedup_nodes(nodes);
        let root_id = nodes.first().map(|n| n.node_id.clone());
        Self { nodes, root_id }
    }

    /// The "nothing actionable" snapshot used after a failed capture.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Drop repeated node ids, keeping the first occurrence and the original order.
pub fn dedup_nodes(nodes: Vec<AxNode>) -> Vec<AxNode> {
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes
        .into_iter()
        .filter(|n| seen.insert(n.node_id.clone()))
        .collect()
}

/// Fetch the full accessibility tree of the current page.
pub async fn capture<S: BrowserSession>(session: &mut S) -> Result<Snapshot, CaptureError> {
    let raw = session.accessibility_tree().await.map_err(CaptureError)?;
    let total = raw.len();
    let snapshot = Snapshot::from_nodes(raw);
    tracing::debug!(
        target: "wayfinder.snapshot",
        fetched = total,
        unique = snapshot.nodes.len(),
        "captured accessibility tree"
    );
    Ok(snapshot)
}
