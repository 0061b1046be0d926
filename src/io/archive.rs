use crate::types::{AttrValue, ElementType, SkimError, SkimResult, SkyImage};
use std::collections::BTreeMap;
use std::fmt;

/// Absolute path of a node inside an archive, e.g. "/Image001/skyData"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(String);

impl NodePath {
    pub fn root() -> Self {
        NodePath("/".to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn child(&self, name: &str) -> Self {
        if self.is_root() {
            NodePath(format!("/{}", name))
        } else {
            NodePath(format!("{}/{}", self.0, name))
        }
    }

    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(NodePath::root()),
            Some(pos) => Some(NodePath(self.0[..pos].to_string())),
            None => None,
        }
    }

    /// Last path component; "/" for the root
    pub fn name(&self) -> &str {
        if self.is_root() {
            "/"
        } else {
            self.0.rsplit('/').next().unwrap_or(&self.0)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hierarchical output archive
pub trait ArchiveWriter {
    fn root(&self) -> NodePath {
        NodePath::root()
    }

    /// Create a group under an existing group
    fn create_group(&mut self, parent: &NodePath, name: &str, title: &str) -> SkimResult<NodePath>;

    /// Create a fixed-shape 2-D dataset under an existing group
    fn create_dataset(
        &mut self,
        parent: &NodePath,
        name: &str,
        element: ElementType,
        shape: (usize, usize),
        title: &str,
    ) -> SkimResult<NodePath>;

    /// Fill a dataset; the data shape must equal the dataset shape
    fn write_dataset(&mut self, dataset: &NodePath, data: &SkyImage) -> SkimResult<()>;

    /// Set one named attribute on a group or dataset
    fn set_attribute(&mut self, node: &NodePath, key: &str, value: &AttrValue) -> SkimResult<()>;

    /// Release the archive. Later calls fail with `WriteTargetUnavailable`.
    fn close(&mut self) -> SkimResult<()>;

    fn is_open(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemoryNodeKind {
    Group,
    Dataset {
        element: ElementType,
        shape: (usize, usize),
        data: Option<SkyImage>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryNode {
    pub kind: MemoryNodeKind,
    pub title: String,
    /// Attributes in the order they were first set
    pub attributes: Vec<(String, AttrValue)>,
}

impl MemoryNode {
    fn group(title: &str) -> Self {
        Self {
            kind: MemoryNodeKind::Group,
            title: title.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, MemoryNodeKind::Group)
    }

    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn attribute_keys(&self) -> Vec<&str> {
        self.attributes.iter().map(|(k, _)| k.as_str()).collect()
    }
}

/// Archive kept in memory; the whole tree stays inspectable after close
#[derive(Debug, Clone)]
pub struct MemoryArchive {
    title: String,
    nodes: BTreeMap<NodePath, MemoryNode>,
    open: bool,
}

impl MemoryArchive {
    pub fn new(title: &str) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(NodePath::root(), MemoryNode::group(title));
        Self {
            title: title.to_string(),
            nodes,
            open: true,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn node(&self, path: &str) -> Option<&MemoryNode> {
        self.nodes.get(&NodePath(path.to_string()))
    }

    /// Direct children of a node, in name order
    pub fn children(&self, path: &str) -> Vec<&NodePath> {
        let parent = NodePath(path.to_string());
        self.nodes
            .keys()
            .filter(|node| node.parent().as_ref() == Some(&parent))
            .collect()
    }

    pub fn group_count(&self) -> usize {
        self.nodes.values().filter(|node| node.is_group()).count()
    }

    pub fn dataset_count(&self) -> usize {
        self.nodes.len() - self.group_count()
    }

    fn ensure_open(&self) -> SkimResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(SkimError::WriteTargetUnavailable(format!(
                "in-memory archive '{}' is closed",
                self.title
            )))
        }
    }

    fn new_child(&mut self, parent: &NodePath, name: &str, node: MemoryNode) -> SkimResult<NodePath> {
        self.ensure_open()?;
        match self.nodes.get(parent) {
            Some(p) if p.is_group() => {}
            Some(_) => return Err(SkimError::ArchiveWrite(format!("{} is not a group", parent))),
            None => return Err(SkimError::ArchiveWrite(format!("no such group {}", parent))),
        }

        let path = parent.child(name);
        if self.nodes.contains_key(&path) {
            return Err(SkimError::ArchiveWrite(format!("{} already exists", path)));
        }
        self.nodes.insert(path.clone(), node);
        Ok(path)
    }
}

impl ArchiveWriter for MemoryArchive {
    fn create_group(&mut self, parent: &NodePath, name: &str, title: &str) -> SkimResult<NodePath> {
        self.new_child(parent, name, MemoryNode::group(title))
    }

    fn create_dataset(
        &mut self,
        parent: &NodePath,
        name: &str,
        element: ElementType,
        shape: (usize, usize),
        title: &str,
    ) -> SkimResult<NodePath> {
        let node = MemoryNode {
            kind: MemoryNodeKind::Dataset {
                element,
                shape,
                data: None,
            },
            title: title.to_string(),
            attributes: Vec::new(),
        };
        self.new_child(parent, name, node)
    }

    fn write_dataset(&mut self, dataset: &NodePath, data: &SkyImage) -> SkimResult<()> {
        self.ensure_open()?;
        let node = self
            .nodes
            .get_mut(dataset)
            .ok_or_else(|| SkimError::ArchiveWrite(format!("no such dataset {}", dataset)))?;

        match &mut node.kind {
            MemoryNodeKind::Dataset { shape, data: slot, .. } => {
                if *shape != data.dim() {
                    return Err(SkimError::ArchiveWrite(format!(
                        "{}: data shape {:?} does not match dataset shape {:?}",
                        dataset,
                        data.dim(),
                        shape
                    )));
                }
                *slot = Some(data.clone());
                Ok(())
            }
            MemoryNodeKind::Group => Err(SkimError::ArchiveWrite(format!("{} is a group", dataset))),
        }
    }

    fn set_attribute(&mut self, node: &NodePath, key: &str, value: &AttrValue) -> SkimResult<()> {
        self.ensure_open()?;
        let node = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| SkimError::ArchiveWrite(format!("no such node {}", node)))?;

        match node.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.clone(),
            None => node.attributes.push((key.to_string(), value.clone())),
        }
        Ok(())
    }

    fn close(&mut self) -> SkimResult<()> {
        self.ensure_open()?;
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
