//! Folder tree assembly, remotely from listings or locally from walked paths.

use crate::error::{AppError, Result};
use crate::filter::DirectoryFilter;
use crate::path::normalize;
use crate::store::ContentStore;
use log;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Directory,
    File,
}

impl TreeNode {
    fn new(name: &str, path: String, node_type: NodeType) -> Self {
        Self {
            name: name.to_string(),
            path,
            node_type,
            children: Vec::new(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.node_type == NodeType::Directory
    }
}

/// Folders first, then by name.
fn sort_nodes(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.name.cmp(&b.name)));
}

/// Lists the remote tree under `root` breadth first, down to `max_depth`
/// levels (`None` for no limit).
///
/// Every entry is checked with its own listing since gateways rarely mark
/// directories: an entry with children is a folder.
pub async fn load_tree<S>(
    store: &S,
    filter: &DirectoryFilter,
    root: &str,
    max_depth: Option<usize>,
) -> Option<Vec<TreeNode>>
where
    S: ContentStore + ?Sized,
{
    let root = normalize(root);
    let root_entries = store.list_directory(&root).await?;

    let mut nodes: Vec<TreeNode> = Vec::new();
    // (index path into the tree, directory path, listed entries, depth)
    let mut queue = VecDeque::new();
    queue.push_back((Vec::<usize>::new(), root.clone(), root_entries, 1usize));

    while let Some((position, dir_path, entries, depth)) = queue.pop_front() {
        let mut level: Vec<(TreeNode, Option<Vec<_>>)> = Vec::new();
        for entry in filter.filter_entries(entries, &dir_path) {
            let full_path = normalize(&format!("{}/{}", dir_path, entry.name));
            let children = store
                .list_directory(&full_path)
                .await
                .filter(|c| !c.is_empty());
            let is_dir = entry.is_directory || children.is_some();
            let node_type = if is_dir { NodeType::Directory } else { NodeType::File };
            log::trace!("Tree entry {} ({:?})", full_path, node_type);
            level.push((TreeNode::new(&entry.name, full_path, node_type), children));
        }
        level.sort_by(|(a, _), (b, _)| {
            b.is_dir().cmp(&a.is_dir()).then_with(|| a.name.cmp(&b.name))
        });

        let mut placed = Vec::with_capacity(level.len());
        let mut pending = Vec::new();
        for (index, (node, children)) in level.into_iter().enumerate() {
            if let Some(children) = children {
                if max_depth.is_none_or(|max| depth < max) {
                    let mut child_position = position.clone();
                    child_position.push(index);
                    pending.push((child_position, node.path.clone(), children, depth + 1));
                }
            }
            placed.push(node);
        }

        match children_at(&mut nodes, &position) {
            Some(slot) => *slot = placed,
            None => log::warn!("Lost tree position for {}", dir_path),
        }
        queue.extend(pending);
    }

    Some(nodes)
}

fn children_at<'a>(nodes: &'a mut Vec<TreeNode>, position: &[usize]) -> Option<&'a mut Vec<TreeNode>> {
    let mut current = nodes;
    for index in position {
        current = &mut current.get_mut(*index)?.children;
    }
    Some(current)
}

/// Builds a tree from `(relative path, is_dir)` pairs such as the ones
/// gathered from a local walk.
pub fn build_tree_from_paths(relative_path_types: &[(String, bool)]) -> Result<Vec<TreeNode>> {
    log::debug!("Building tree structure from {} paths...", relative_path_types.len());
    let mut root_nodes: Vec<TreeNode> = Vec::new();

    for (rel_path_str, is_dir) in relative_path_types {
        let components: Vec<&str> = rel_path_str
            .split('/')
            .filter(|c| !c.is_empty() && *c != ".")
            .collect();
        if components.is_empty() {
            continue;
        }
        if let Err(e) = insert_node(&mut root_nodes, "", &components, *is_dir) {
            log::error!("Error inserting node into tree for path \"{}\": {}", rel_path_str, e);
        }
    }

    sort_recursive(&mut root_nodes);
    Ok(root_nodes)
}

fn insert_node(
    current_level_nodes: &mut Vec<TreeNode>,
    parent_path: &str,
    components: &[&str],
    is_dir_at_end: bool,
) -> Result<()> {
    let Some((component_name, remaining_components)) = components.split_first() else {
        return Ok(());
    };
    let is_last_component = remaining_components.is_empty();
    let node_path = format!("{}/{}", parent_path, component_name);

    let index = match current_level_nodes
        .iter()
        .position(|node| node.name == *component_name)
    {
        Some(index) => {
            let existing_node = &mut current_level_nodes[index];
            if !is_last_component && !existing_node.is_dir() {
                return Err(AppError::InvalidArgument(format!(
                    "Tree conflict: trying to create children within file {}",
                    node_path
                )));
            }
            if is_last_component && is_dir_at_end {
                existing_node.node_type = NodeType::Directory;
            }
            index
        }
        None => {
            let node_type = if !is_last_component || is_dir_at_end {
                NodeType::Directory
            } else {
                NodeType::File
            };
            current_level_nodes.push(TreeNode::new(component_name, node_path.clone(), node_type));
            current_level_nodes.len() - 1
        }
    };

    if !is_last_component {
        insert_node(
            &mut current_level_nodes[index].children,
            &node_path,
            remaining_components,
            is_dir_at_end,
        )?;
    }
    Ok(())
}

fn sort_recursive(nodes: &mut [TreeNode]) {
    sort_nodes(nodes);
    for node in nodes.iter_mut() {
        sort_recursive(&mut node.children);
    }
}

/// Renders `nodes` as an indented text tree.
pub fn render_text_tree(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    write_level(&mut out, nodes, "");
    out
}

fn write_level(out: &mut String, nodes: &[TreeNode], prefix: &str) {
    for (index, node) in nodes.iter().enumerate() {
        let last = index + 1 == nodes.len();
        let branch = if last { "└── " } else { "├── " };
        let suffix = if node.is_dir() { "/" } else { "" };
        out.push_str(&format!("{}{}{}{}\n", prefix, branch, node.name, suffix));
        if !node.children.is_empty() {
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            write_level(out, &node.children, &child_prefix);
        }
    }
}
