//! Scene graph of an assembled scene.
//!
//! A scene is a tree of [`Node`]s. Nodes only carry a translation; the exported
//! geometry is already in model space and centering the model is the only
//! transform the viewer ever applies.
//!
//! # Key types
//! - [`Scene`]: root node plus its identity for renderer-side caching
//! - [`Node`]: a named, optionally annotated element of the tree
//! - [`NodeKind`]: what the renderer does with a node

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use cgmath::{InnerSpace, Vector3, Zero};

use super::{
    annotation::{Annotation, Color},
    geometry::{Aabb, Geometry},
    material::Material,
};

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub enum NodeKind {
    Group,
    Mesh {
        geometry: Rc<Geometry>,
        material: Rc<Material>,
    },
    /// Line segments such as the orientation grid.
    Lines {
        geometry: Rc<Geometry>,
        material: Rc<Material>,
    },
    /// Camera-facing quad centered on the node, sized in view units.
    Sprite {
        material: Rc<Material>,
        scale: [f32; 2],
    },
    DirectionalLight {
        /// Direction the light shines from, towards the origin.
        direction: Vector3<f32>,
        color: Color,
        intensity: f32,
    },
    AmbientLight {
        color: Color,
        intensity: f32,
    },
}

#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub translation: Vector3<f32>,
    pub visible: bool,
    /// Larger values draw later inside their pass.
    pub render_order: i32,
    /// Back-reference used to resolve tooltips on hit.
    pub annotation: Option<Rc<Annotation>>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            translation: Vector3::zero(),
            visible: true,
            render_order: 0,
            annotation: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, geometry: Rc<Geometry>, material: Rc<Material>) -> Self {
        Self::new(name, NodeKind::Mesh { geometry, material })
    }

    pub fn with_translation(mut self, translation: Vector3<f32>) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_annotation(mut self, annotation: Rc<Annotation>) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Visits this node and all descendants with their world translation.
    pub fn traverse<'a>(&'a self, parent: Vector3<f32>, f: &mut dyn FnMut(&'a Node, Vector3<f32>)) {
        let world = parent + self.translation;
        f(self, world);
        for child in &self.children {
            child.traverse(world, f);
        }
    }

    /// Like [`traverse`](Self::traverse) but skips hidden subtrees.
    pub fn traverse_visible<'a>(&'a self, parent: Vector3<f32>, f: &mut dyn FnMut(&'a Node, Vector3<f32>)) {
        if !self.visible {
            return;
        }
        let world = parent + self.translation;
        f(self, world);
        for child in &self.children {
            child.traverse_visible(world, f);
        }
    }

    /// World-space bounds of every mesh below this node.
    pub fn bounding_box(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        self.traverse(Vector3::zero(), &mut |node, world| {
            if let NodeKind::Mesh { geometry, .. } = &node.kind {
                bounds.union(&geometry.bounding_box().translated(world));
            }
        });
        bounds
    }

    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }
}

/// Light terms consumed by diffuse materials.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LightSetup {
    /// Normalized direction towards each light, with its colour scaled by intensity.
    pub directional: Vec<(Vector3<f32>, [f32; 3])>,
    pub ambient: [f32; 3],
}

#[derive(Debug)]
pub struct Scene {
    id: u64,
    pub root: Node,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            root: Node::group("scene"),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn add(&mut self, node: Node) {
        self.root.add_child(node);
    }

    pub fn traverse<'a>(&'a self, f: &mut dyn FnMut(&'a Node, Vector3<f32>)) {
        self.root.traverse(Vector3::zero(), f);
    }

    pub fn traverse_visible<'a>(&'a self, f: &mut dyn FnMut(&'a Node, Vector3<f32>)) {
        self.root.traverse_visible(Vector3::zero(), f);
    }

    pub fn lights(&self) -> LightSetup {
        let mut setup = LightSetup::default();
        self.traverse_visible(&mut |node, _| match &node.kind {
            NodeKind::DirectionalLight {
                direction,
                color,
                intensity,
            } => setup.directional.push((
                direction.normalize(),
                [color.r * intensity, color.g * intensity, color.b * intensity],
            )),
            NodeKind::AmbientLight { color, intensity } => {
                setup.ambient[0] += color.r * intensity;
                setup.ambient[1] += color.g * intensity;
                setup.ambient[2] += color.b * intensity;
            }
            _ => {}
        });
        setup
    }

    /// Number of nodes of a given kind, mostly useful for inspection.
    pub fn count(&self, predicate: impl Fn(&Node) -> bool) -> usize {
        let mut n = 0;
        self.traverse(&mut |node, _| {
            if predicate(node) {
                n += 1;
            }
        });
        n
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
