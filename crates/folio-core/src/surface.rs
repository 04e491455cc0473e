#![forbid(unsafe_code)]

//! Surface tree: the slice of the page document the components touch.
//!
//! # Design
//!
//! Components never reach into the host document directly. Each page hook
//! (and each element a component creates) is a [`Surface`] with exactly one
//! [`Owner`]. Mutations go through [`SurfaceTree`], which checks ownership,
//! refuses to touch detached surfaces, and records every effective change
//! as a [`SurfacePatch`] for the host to apply.
//!
//! # Invariants
//!
//! 1. Only the owner of a surface may mutate it. Creating or removing a
//!    child is allowed to the owner of the parent.
//! 2. A removed surface (and its subtree) is gone; later mutations fail with
//!    [`SurfaceError::Detached`].
//! 3. A mutation that does not change state emits no patch.
//! 4. Patches are emitted in mutation order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::viewport::Rect;

/// Stable handle to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u32);

impl SurfaceId {
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Component that owns a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Navigation,
    Typing,
    Counters,
    Reveal,
    Notifications,
    ScrollWatcher,
    Gallery,
    Contact,
    /// Read-only structure (sections) that nobody mutates.
    Page,
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Navigation => "navigation",
            Self::Typing => "typing",
            Self::Counters => "counters",
            Self::Reveal => "reveal",
            Self::Notifications => "notifications",
            Self::ScrollWatcher => "scroll-watcher",
            Self::Gallery => "gallery",
            Self::Contact => "contact",
            Self::Page => "page",
        };
        f.write_str(name)
    }
}

/// Errors from surface-tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The id was never issued by this tree.
    Unknown(SurfaceId),
    /// The surface was removed from the page.
    Detached(SurfaceId),
    /// The caller does not own the surface.
    NotOwner {
        key: String,
        owner: Owner,
        caller: Owner,
    },
    /// A surface with this key already exists.
    DuplicateKey(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "unknown surface #{}", id.0),
            Self::Detached(id) => write!(f, "surface #{} is detached", id.0),
            Self::NotOwner { key, owner, caller } => {
                write!(f, "surface {key:?} is owned by {owner}, not {caller}")
            }
            Self::DuplicateKey(key) => write!(f, "duplicate surface key {key:?}"),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// One inline style declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDecl {
    pub property: String,
    pub value: String,
}

impl StyleDecl {
    #[must_use]
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// A single document mutation, addressed by CSS selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SurfacePatch {
    SetText {
        target: String,
        text: String,
    },
    AddClass {
        target: String,
        class: String,
    },
    RemoveClass {
        target: String,
        class: String,
    },
    SetStyle {
        target: String,
        property: String,
        value: String,
    },
    /// Create a child element tagged with `data-folio-key = key`.
    Append {
        parent: String,
        key: String,
        tag: String,
        classes: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        html: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        styles: Vec<StyleDecl>,
    },
    Remove {
        target: String,
    },
    ClearChildren {
        target: String,
    },
    ScrollIntoView {
        target: String,
        smooth: bool,
    },
    ResetForm {
        target: String,
    },
}

impl SurfacePatch {
    /// Selector (or parent selector for `Append`) the patch addresses.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::SetText { target, .. }
            | Self::AddClass { target, .. }
            | Self::RemoveClass { target, .. }
            | Self::SetStyle { target, .. }
            | Self::Remove { target }
            | Self::ClearChildren { target }
            | Self::ScrollIntoView { target, .. }
            | Self::ResetForm { target } => target,
            Self::Append { parent, .. } => parent,
        }
    }
}

/// Description of an element a component creates.
#[derive(Debug, Clone, Default)]
pub struct NewSurface {
    pub key: String,
    pub tag: String,
    pub classes: Vec<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub styles: Vec<StyleDecl>,
}

impl NewSurface {
    #[must_use]
    pub fn new(key: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tag: tag.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    #[must_use]
    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.push(StyleDecl::new(property, value));
        self
    }
}

/// Mirror of one page element.
#[derive(Debug, Clone)]
pub struct Surface {
    key: String,
    selector: String,
    owner: Owner,
    text: String,
    html: Option<String>,
    classes: BTreeSet<String>,
    styles: BTreeMap<String, String>,
    attrs: BTreeMap<String, String>,
    parent: Option<SurfaceId>,
    children: Vec<SurfaceId>,
    rect: Option<Rect>,
}

impl Surface {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    #[must_use]
    pub fn owner(&self) -> Owner {
        self.owner
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    #[must_use]
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn parent(&self) -> Option<SurfaceId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[SurfaceId] {
        &self.children
    }

    #[must_use]
    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }
}

/// Owned mirror of the page hooks plus a patch log.
#[derive(Debug, Default)]
pub struct SurfaceTree {
    next_id: u32,
    surfaces: HashMap<SurfaceId, Surface>,
    by_key: HashMap<String, SurfaceId>,
    patches: Vec<SurfacePatch>,
}

impl SurfaceTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing page element.
    pub fn register_hook(
        &mut self,
        key: impl Into<String>,
        selector: impl Into<String>,
        owner: Owner,
    ) -> Result<SurfaceId, SurfaceError> {
        let key = key.into();
        if self.by_key.contains_key(&key) {
            return Err(SurfaceError::DuplicateKey(key));
        }
        let id = self.issue_id();
        self.by_key.insert(key.clone(), id);
        self.surfaces.insert(
            id,
            Surface {
                key,
                selector: selector.into(),
                owner,
                text: String::new(),
                html: None,
                classes: BTreeSet::new(),
                styles: BTreeMap::new(),
                attrs: BTreeMap::new(),
                parent: None,
                children: Vec::new(),
                rect: None,
            },
        );
        Ok(id)
    }

    /// Record a host attribute (e.g. `data-target`) on a hook. Not a mutation.
    pub fn set_attr(
        &mut self,
        id: SurfaceId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), SurfaceError> {
        let surface = self.get_mut(id)?;
        surface.attrs.insert(name.into(), value.into());
        Ok(())
    }

    /// Record host layout for a surface. Not a mutation.
    pub fn set_rect(&mut self, id: SurfaceId, rect: Rect) -> Result<(), SurfaceError> {
        self.get_mut(id)?.rect = Some(rect);
        Ok(())
    }

    #[must_use]
    pub fn find(&self, key: &str) -> Option<SurfaceId> {
        self.by_key.get(key).copied()
    }

    #[must_use]
    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    #[must_use]
    pub fn is_attached(&self, id: SurfaceId) -> bool {
        self.surfaces.contains_key(&id)
    }

    /// Number of live surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn set_text(
        &mut self,
        owner: Owner,
        id: SurfaceId,
        text: impl Into<String>,
    ) -> Result<bool, SurfaceError> {
        let text = text.into();
        let surface = self.owned_mut(owner, id)?;
        if surface.text == text {
            return Ok(false);
        }
        surface.text.clone_from(&text);
        let target = surface.selector.clone();
        self.patches.push(SurfacePatch::SetText { target, text });
        Ok(true)
    }

    pub fn add_class(&mut self, owner: Owner, id: SurfaceId, class: &str) -> Result<bool, SurfaceError> {
        let surface = self.owned_mut(owner, id)?;
        if !surface.classes.insert(class.to_owned()) {
            return Ok(false);
        }
        let target = surface.selector.clone();
        self.patches.push(SurfacePatch::AddClass {
            target,
            class: class.to_owned(),
        });
        Ok(true)
    }

    pub fn remove_class(
        &mut self,
        owner: Owner,
        id: SurfaceId,
        class: &str,
    ) -> Result<bool, SurfaceError> {
        let surface = self.owned_mut(owner, id)?;
        if !surface.classes.remove(class) {
            return Ok(false);
        }
        let target = surface.selector.clone();
        self.patches.push(SurfacePatch::RemoveClass {
            target,
            class: class.to_owned(),
        });
        Ok(true)
    }

    /// Flip a class. Returns whether the class is present afterwards.
    pub fn toggle_class(
        &mut self,
        owner: Owner,
        id: SurfaceId,
        class: &str,
    ) -> Result<bool, SurfaceError> {
        let present = self.owned_mut(owner, id)?.classes.contains(class);
        if present {
            self.remove_class(owner, id, class)?;
        } else {
            self.add_class(owner, id, class)?;
        }
        Ok(!present)
    }

    pub fn set_style(
        &mut self,
        owner: Owner,
        id: SurfaceId,
        property: &str,
        value: impl Into<String>,
    ) -> Result<bool, SurfaceError> {
        let value = value.into();
        let surface = self.owned_mut(owner, id)?;
        if surface.styles.get(property) == Some(&value) {
            return Ok(false);
        }
        surface.styles.insert(property.to_owned(), value.clone());
        let target = surface.selector.clone();
        self.patches.push(SurfacePatch::SetStyle {
            target,
            property: property.to_owned(),
            value,
        });
        Ok(true)
    }

    /// Create a child of `parent` (which `owner` must own). The child is
    /// handed to `child_owner`.
    pub fn append_child(
        &mut self,
        owner: Owner,
        parent: SurfaceId,
        child_owner: Owner,
        node: NewSurface,
    ) -> Result<SurfaceId, SurfaceError> {
        let parent_selector = self.owned_mut(owner, parent)?.selector.clone();
        if self.by_key.contains_key(&node.key) {
            return Err(SurfaceError::DuplicateKey(node.key));
        }

        let id = self.issue_id();
        let selector = format!("[data-folio-key=\"{}\"]", node.key);
        let surface = Surface {
            key: node.key.clone(),
            selector,
            owner: child_owner,
            text: node.text.clone().unwrap_or_default(),
            html: node.html.clone(),
            classes: node.classes.iter().cloned().collect(),
            styles: node
                .styles
                .iter()
                .map(|decl| (decl.property.clone(), decl.value.clone()))
                .collect(),
            attrs: BTreeMap::new(),
            parent: Some(parent),
            children: Vec::new(),
            rect: None,
        };
        self.by_key.insert(node.key.clone(), id);
        self.surfaces.insert(id, surface);
        if let Some(parent) = self.surfaces.get_mut(&parent) {
            parent.children.push(id);
        }

        self.patches.push(SurfacePatch::Append {
            parent: parent_selector,
            key: node.key,
            tag: node.tag,
            classes: node.classes,
            text: node.text,
            html: node.html,
            styles: node.styles,
        });
        Ok(id)
    }

    /// Detach a surface and its subtree. Allowed to the surface owner and
    /// to the owner of its parent.
    pub fn remove(&mut self, owner: Owner, id: SurfaceId) -> Result<(), SurfaceError> {
        let surface = self.lookup(id)?;
        let parent_owner = surface
            .parent
            .and_then(|p| self.surfaces.get(&p))
            .map(|p| p.owner);
        if surface.owner != owner && parent_owner != Some(owner) {
            return Err(SurfaceError::NotOwner {
                key: surface.key.clone(),
                owner: surface.owner,
                caller: owner,
            });
        }
        let target = surface.selector.clone();
        let parent = surface.parent;
        if let Some(parent) = parent.and_then(|p| self.surfaces.get_mut(&p)) {
            parent.children.retain(|child| *child != id);
        }
        self.drop_subtree(id);
        self.patches.push(SurfacePatch::Remove { target });
        Ok(())
    }

    /// Remove every child of `id`, including host content the tree never
    /// mirrored (placeholders).
    pub fn clear_children(&mut self, owner: Owner, id: SurfaceId) -> Result<usize, SurfaceError> {
        let surface = self.owned_mut(owner, id)?;
        let children = std::mem::take(&mut surface.children);
        let target = surface.selector.clone();
        for child in &children {
            self.drop_subtree(*child);
        }
        self.patches.push(SurfacePatch::ClearChildren { target });
        Ok(children.len())
    }

    /// Ask the host to scroll a surface into view. Read-only with respect to
    /// the surface, so any component may request it.
    pub fn scroll_into_view(&mut self, id: SurfaceId, smooth: bool) -> Result<(), SurfaceError> {
        let target = self.lookup(id)?.selector.clone();
        self.patches.push(SurfacePatch::ScrollIntoView { target, smooth });
        Ok(())
    }

    /// Ask the host to reset a form surface.
    pub fn reset_form(&mut self, owner: Owner, id: SurfaceId) -> Result<(), SurfaceError> {
        let target = self.owned_mut(owner, id)?.selector.clone();
        self.patches.push(SurfacePatch::ResetForm { target });
        Ok(())
    }

    /// Patches recorded since the last drain.
    #[must_use]
    pub fn pending_patches(&self) -> &[SurfacePatch] {
        &self.patches
    }

    /// Drain recorded patches.
    pub fn take_patches(&mut self) -> Vec<SurfacePatch> {
        std::mem::take(&mut self.patches)
    }

    fn issue_id(&mut self) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        id
    }

    fn lookup(&self, id: SurfaceId) -> Result<&Surface, SurfaceError> {
        match self.surfaces.get(&id) {
            Some(surface) => Ok(surface),
            None if id.0 < self.next_id => Err(SurfaceError::Detached(id)),
            None => Err(SurfaceError::Unknown(id)),
        }
    }

    fn get_mut(&mut self, id: SurfaceId) -> Result<&mut Surface, SurfaceError> {
        let issued = id.0 < self.next_id;
        self.surfaces.get_mut(&id).ok_or(if issued {
            SurfaceError::Detached(id)
        } else {
            SurfaceError::Unknown(id)
        })
    }

    fn owned_mut(&mut self, owner: Owner, id: SurfaceId) -> Result<&mut Surface, SurfaceError> {
        let surface = self.get_mut(id)?;
        if surface.owner != owner {
            return Err(SurfaceError::NotOwner {
                key: surface.key.clone(),
                owner: surface.owner,
                caller: owner,
            });
        }
        Ok(surface)
    }

    fn drop_subtree(&mut self, id: SurfaceId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(surface) = self.surfaces.remove(&next) {
                self.by_key.remove(&surface.key);
                stack.extend(surface.children);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree_with_hook(owner: Owner) -> (SurfaceTree, SurfaceId) {
        let mut tree = SurfaceTree::new();
        let id = tree.register_hook("grid", "#grid", owner).unwrap();
        (tree, id)
    }

    #[test]
    fn unchanged_mutations_emit_nothing() {
        let (mut tree, id) = tree_with_hook(Owner::Typing);
        assert!(tree.set_text(Owner::Typing, id, "H").unwrap());
        assert!(!tree.set_text(Owner::Typing, id, "H").unwrap());
        assert!(tree.add_class(Owner::Typing, id, "x").unwrap());
        assert!(!tree.add_class(Owner::Typing, id, "x").unwrap());
        assert_eq!(tree.take_patches().len(), 2);
    }

    #[test]
    fn non_owner_is_rejected() {
        let (mut tree, id) = tree_with_hook(Owner::Gallery);
        let err = tree.set_text(Owner::Typing, id, "nope").unwrap_err();
        assert_eq!(
            err,
            SurfaceError::NotOwner {
                key: "grid".into(),
                owner: Owner::Gallery,
                caller: Owner::Typing,
            }
        );
        assert!(tree.pending_patches().is_empty());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let (mut tree, _) = tree_with_hook(Owner::Gallery);
        let err = tree.register_hook("grid", "#other", Owner::Page).unwrap_err();
        assert_eq!(err, SurfaceError::DuplicateKey("grid".into()));
    }

    #[test]
    fn toggle_flips_membership() {
        let (mut tree, id) = tree_with_hook(Owner::Navigation);
        assert!(tree.toggle_class(Owner::Navigation, id, "active").unwrap());
        assert!(tree.get(id).unwrap().has_class("active"));
        assert!(!tree.toggle_class(Owner::Navigation, id, "active").unwrap());
        assert!(!tree.get(id).unwrap().has_class("active"));
    }

    #[test]
    fn appended_child_is_handed_to_child_owner() {
        let (mut tree, grid) = tree_with_hook(Owner::Gallery);
        let card = tree
            .append_child(
                Owner::Gallery,
                grid,
                Owner::Reveal,
                NewSurface::new("card-0", "div").with_class("project-card"),
            )
            .unwrap();
        assert_eq!(tree.get(card).unwrap().owner(), Owner::Reveal);
        assert_eq!(tree.get(card).unwrap().selector(), "[data-folio-key=\"card-0\"]");
        assert!(tree.add_class(Owner::Reveal, card, "animate-in").unwrap());
        assert!(tree.set_text(Owner::Gallery, card, "x").is_err());
        assert_eq!(tree.get(grid).unwrap().children(), &[card]);
    }

    #[test]
    fn removed_surfaces_report_detached() {
        let (mut tree, grid) = tree_with_hook(Owner::Gallery);
        let card = tree
            .append_child(Owner::Gallery, grid, Owner::Reveal, NewSurface::new("c", "div"))
            .unwrap();
        tree.remove(Owner::Gallery, card).unwrap();
        assert_eq!(
            tree.add_class(Owner::Reveal, card, "animate-in"),
            Err(SurfaceError::Detached(card))
        );
        assert!(tree.find("c").is_none());
        assert!(tree.get(grid).unwrap().children().is_empty());
    }

    #[test]
    fn clear_children_drops_subtree_and_emits_one_patch() {
        let (mut tree, grid) = tree_with_hook(Owner::Gallery);
        for i in 0..3 {
            tree.append_child(
                Owner::Gallery,
                grid,
                Owner::Reveal,
                NewSurface::new(format!("c{i}"), "div"),
            )
            .unwrap();
        }
        tree.take_patches();
        assert_eq!(tree.clear_children(Owner::Gallery, grid).unwrap(), 3);
        assert_eq!(
            tree.take_patches(),
            vec![SurfacePatch::ClearChildren {
                target: "#grid".into()
            }]
        );
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn unknown_id_is_distinct_from_detached() {
        let (mut tree, _) = tree_with_hook(Owner::Gallery);
        let bogus = SurfaceId(99);
        assert_eq!(tree.scroll_into_view(bogus, true), Err(SurfaceError::Unknown(bogus)));
    }

    #[test]
    fn patches_serialize_with_op_tag() {
        let patch = SurfacePatch::SetStyle {
            target: ".navbar".into(),
            property: "background".into(),
            value: "rgba(10, 10, 10, 0.98)".into(),
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(
            json,
            r#"{"op":"set_style","target":".navbar","property":"background","value":"rgba(10, 10, 10, 0.98)"}"#
        );
    }
}
