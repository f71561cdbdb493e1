use hashbrown::HashMap;
use petgraph::graphmap::DiGraphMap;
use urdf_rs::read_from_string;

use super::dfs::dfs_preorder;
use super::error::{ModelError, Result};
use super::utils::url_is_urdf_file;

/// Parses a URDF document.
pub fn read_robot_str(str: &str) -> Result<urdf_rs::Robot> {
    read_from_string(str).map_err(|e| ModelError::Urdf(e.to_string()))
}

/// Reads and parses a URDF file.
pub fn read_robot_file(path: impl AsRef<std::path::Path>) -> Result<urdf_rs::Robot> {
    let path = path.as_ref();
    if !url_is_urdf_file(&path.to_string_lossy()) {
        return Err(ModelError::Config(format!(
            "'{}' is not an existing .urdf file",
            path.display()
        )));
    }
    let contents = std::fs::read_to_string(path)?;
    read_robot_str(&contents)
}

/// Link/joint tree of a robot description.
///
/// Links keep their document order as ids; the graph maps parent link to
/// child link with the connecting joint's index (into `Robot::joints`) as
/// edge weight.
#[derive(Debug, Clone)]
pub struct LinkTree {
    links: Vec<String>,
    link_ids: HashMap<String, usize>,
    graph: DiGraphMap<usize, usize>,
    parent_joint: Vec<Option<usize>>,
    root: usize,
    preorder: Vec<usize>,
}

impl LinkTree {
    pub fn from_robot(robot: &urdf_rs::Robot) -> Result<Self> {
        let mut link_ids = HashMap::with_capacity(robot.links.len());
        for (index, link) in robot.links.iter().enumerate() {
            if link_ids.insert(link.name.clone(), index).is_some() {
                return Err(ModelError::MalformedTree(format!(
                    "duplicate link '{}'",
                    link.name
                )));
            }
        }

        // link_id -> link_id
        let mut graph = DiGraphMap::<usize, usize>::new();
        (0..robot.links.len()).for_each(|i| {
            graph.add_node(i);
        });

        let mut parent_joint = vec![None; robot.links.len()];
        for (joint_index, joint) in robot.joints.iter().enumerate() {
            let lookup = |name: &str| {
                link_ids.get(name).copied().ok_or_else(|| {
                    ModelError::MalformedTree(format!(
                        "joint '{}' references undefined link '{name}'",
                        joint.name
                    ))
                })
            };
            let parent = lookup(&joint.parent.link)?;
            let child = lookup(&joint.child.link)?;
            if parent_joint[child].replace(joint_index).is_some() {
                return Err(ModelError::MalformedTree(format!(
                    "link '{}' has more than one parent joint",
                    joint.child.link
                )));
            }
            graph.add_edge(parent, child, joint_index);
        }

        // find start that has no parent link
        let roots: Vec<usize> = (0..robot.links.len())
            .filter(|&i| parent_joint[i].is_none())
            .collect();
        let root = match roots.as_slice() {
            [root] => *root,
            [] => {
                return Err(ModelError::MalformedTree(
                    "no root link found (every link is a joint child)".into(),
                ))
            }
            _ => {
                let names: Vec<&str> =
                    roots.iter().map(|&i| robot.links[i].name.as_str()).collect();
                return Err(ModelError::MalformedTree(format!(
                    "multiple root links: {names:?}"
                )));
            }
        };

        let preorder = dfs_preorder(&graph, root);
        if preorder.len() != robot.links.len() {
            return Err(ModelError::MalformedTree(
                "kinematic loop detected (links unreachable from root)".into(),
            ));
        }

        Ok(Self {
            links: robot.links.iter().map(|l| l.name.clone()).collect(),
            link_ids,
            graph,
            parent_joint,
            root,
            preorder,
        })
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn link_name(&self, link: usize) -> &str {
        &self.links[link]
    }

    pub fn link_id(&self, name: &str) -> Option<usize> {
        self.link_ids.get(name).copied()
    }

    pub fn parent(&self, link: usize) -> Option<usize> {
        self.graph
            .neighbors_directed(link, petgraph::Direction::Incoming)
            .next()
    }

    /// Index into `Robot::joints` of the joint connecting `link` to its parent.
    pub fn parent_joint(&self, link: usize) -> Option<usize> {
        self.parent_joint[link]
    }

    /// Links in depth-first pre-order, root first.
    pub fn preorder(&self) -> &[usize] {
        &self.preorder
    }

    /// Every joint (fixed ones included) in depth-first pre-order.
    pub fn joints_preorder(&self) -> impl Iterator<Item = usize> + '_ {
        self.preorder.iter().filter_map(|&link| self.parent_joint[link])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{BRANCHED_URDF, SERIAL_URDF};

    #[test]
    fn from_urdf_test() {
        let robot = read_robot_str(SERIAL_URDF).unwrap();
        let tree = LinkTree::from_robot(&robot).unwrap();
        assert_eq!(tree.link_count(), 4);
        assert_eq!(tree.link_name(tree.root()), "base");
        assert_eq!(tree.parent(tree.link_id("l2").unwrap()), tree.link_id("l1"));
    }

    #[test]
    fn joints_follow_depth_first_preorder() {
        let robot = read_robot_str(BRANCHED_URDF).unwrap();
        let tree = LinkTree::from_robot(&robot).unwrap();
        let names: Vec<&str> = tree
            .joints_preorder()
            .map(|j| robot.joints[j].name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "floating_base",
                "left_hip",
                "left_knee",
                "left_foot_fixed",
                "right_hip",
                "right_slide",
                "head_fixed"
            ]
        );
    }

    #[test]
    fn rejects_undefined_link() {
        let robot = read_robot_str(
            r#"<robot name="r">
                <link name="a"/>
                <joint name="j" type="fixed">
                    <origin xyz="0 0 0" rpy="0 0 0"/>
                    <parent link="a"/>
                    <child link="ghost"/>
                </joint>
            </robot>"#,
        )
        .unwrap();
        let err = LinkTree::from_robot(&robot).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn rejects_multiple_roots() {
        let robot =
            read_robot_str(r#"<robot name="r"><link name="a"/><link name="b"/></robot>"#).unwrap();
        assert!(matches!(
            LinkTree::from_robot(&robot),
            Err(ModelError::MalformedTree(_))
        ));
    }

    #[test]
    fn rejects_missing_file() {
        assert!(read_robot_file("nowhere/robot.urdf").is_err());
    }
}
