//! Minimal element tree with DOM-style event dispatch.
//!
//! # Design
//! Elements live in an arena owned by the `Document` and are addressed by
//! `ElementId`. Listeners are attached to a `Scope` (the document itself or
//! one element) for one event type and one phase. `dispatch` walks the path
//! from the document down to the target and back up:
//!
//! 1. capture: document, then each ancestor, outermost first
//! 2. target: capture listeners on the target, then its bubble listeners
//! 3. bubble: each ancestor innermost first, then the document
//!
//! All state sits behind `RefCell`s and no borrow is held while a listener
//! runs, so listeners may freely read or mutate the document.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Document,
    Element(ElementId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Capturing,
    AtTarget,
    Bubbling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Rc<dyn Fn(&Document, &Event)>;

/// A snapshot of one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    id: ElementId,
    tag: String,
    attributes: BTreeMap<String, String>,
    value: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Element {
    pub fn handle(&self) -> ElementId {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the whitespace-separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|value| value.split_ascii_whitespace().any(|token| token == class))
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: String,
    pub target: ElementId,
    pub current_target: Scope,
    pub phase: Phase,
}

struct Registered {
    id: ListenerId,
    scope: Scope,
    event_type: String,
    capture: bool,
    listener: Listener,
}

#[derive(Default)]
pub struct Document {
    elements: RefCell<Vec<Element>>,
    roots: RefCell<Vec<ElementId>>,
    listeners: RefCell<Vec<Registered>>,
    next_listener: Cell<u64>,
    active: Cell<Option<ElementId>>,
    cursor: Cell<Option<usize>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an element as a new top-level child of the document.
    pub fn create_element(&self, tag: &str) -> ElementId {
        let mut elements = self.elements.borrow_mut();
        let id = ElementId(elements.len());
        elements.push(Element {
            id,
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            value: String::new(),
            parent: None,
            children: Vec::new(),
        });
        self.roots.borrow_mut().push(id);
        id
    }

    /// Move `child` to the end of `parent`'s children.
    ///
    /// Returns false if either id is unknown or the move would create a cycle.
    pub fn append_child(&self, parent: ElementId, child: ElementId) -> bool {
        if !self.contains(parent) || !self.contains(child) {
            return false;
        }
        if self.ancestors(parent).contains(&child) || parent == child {
            return false;
        }
        self.detach(child);
        let mut elements = self.elements.borrow_mut();
        elements[child.0].parent = Some(parent);
        elements[parent.0].children.push(child);
        true
    }

    pub fn element(&self, id: ElementId) -> Option<Element> {
        self.elements.borrow().get(id.0).cloned()
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements.borrow().get(id.0).and_then(|e| e.parent)
    }

    pub fn attribute(&self, id: ElementId, name: &str) -> Option<String> {
        self.elements
            .borrow()
            .get(id.0)
            .and_then(|e| e.attributes.get(name).cloned())
    }

    pub fn set_attribute(&self, id: ElementId, name: &str, value: &str) {
        if let Some(element) = self.elements.borrow_mut().get_mut(id.0) {
            element.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attribute(&self, id: ElementId, name: &str) {
        if let Some(element) = self.elements.borrow_mut().get_mut(id.0) {
            element.attributes.remove(name);
        }
    }

    pub fn set_value(&self, id: ElementId, value: &str) {
        if let Some(element) = self.elements.borrow_mut().get_mut(id.0) {
            element.value = value.to_string();
        }
    }

    /// First element in document order whose `id` attribute equals `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<ElementId> {
        let elements = self.elements.borrow();
        let mut stack: Vec<ElementId> = self.roots.borrow().iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            let element = &elements[current.0];
            if element.attributes.get("id").map(String::as_str) == Some(id) {
                return Some(current);
            }
            stack.extend(element.children.iter().rev().copied());
        }
        None
    }

    pub fn add_event_listener(
        &self,
        scope: Scope,
        event_type: &str,
        capture: bool,
        listener: Listener,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push(Registered {
            id,
            scope,
            event_type: event_type.to_string(),
            capture,
            listener,
        });
        id
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|l| l.id == id) {
            Some(pos) => {
                listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Dispatch `event_type` at `target` through capture, target and bubble
    /// phases. Unknown targets dispatch nothing.
    pub fn dispatch(&self, event_type: &str, target: ElementId) {
        if !self.contains(target) {
            return;
        }
        let mut path = self.ancestors(target);
        path.reverse();

        let mut event = Event {
            event_type: event_type.to_string(),
            target,
            current_target: Scope::Document,
            phase: Phase::Capturing,
        };

        self.invoke(Scope::Document, &mut event, Phase::Capturing, true);
        for node in &path {
            self.invoke(Scope::Element(*node), &mut event, Phase::Capturing, true);
        }
        self.invoke(Scope::Element(target), &mut event, Phase::AtTarget, true);
        self.invoke(Scope::Element(target), &mut event, Phase::AtTarget, false);
        for node in path.iter().rev() {
            self.invoke(Scope::Element(*node), &mut event, Phase::Bubbling, false);
        }
        self.invoke(Scope::Document, &mut event, Phase::Bubbling, false);
    }

    /// Focus `id` and put the caret at `cursor`, clamped to the length of
    /// the element's value. Returns the caret actually set.
    pub fn focus_at(&self, id: ElementId, cursor: usize) -> Option<usize> {
        let len = self.elements.borrow().get(id.0)?.value.chars().count();
        let cursor = cursor.min(len);
        self.active.set(Some(id));
        self.cursor.set(Some(cursor));
        Some(cursor)
    }

    pub fn active_element(&self) -> Option<ElementId> {
        self.active.get()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor.get()
    }

    fn invoke(&self, scope: Scope, event: &mut Event, phase: Phase, capture: bool) {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.scope == scope && l.capture == capture && l.event_type == event.event_type)
            .map(|l| l.listener.clone())
            .collect();
        event.current_target = scope;
        event.phase = phase;
        for listener in listeners {
            listener(self, event);
        }
    }

    fn contains(&self, id: ElementId) -> bool {
        id.0 < self.elements.borrow().len()
    }

    /// Proper ancestors of `id`, nearest first.
    fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(node) = cursor {
            out.push(node);
            cursor = self.parent(node);
        }
        out
    }

    fn detach(&self, child: ElementId) {
        match self.parent(child) {
            Some(old) => self.elements.borrow_mut()[old.0].children.retain(|c| *c != child),
            None => self.roots.borrow_mut().retain(|c| *c != child),
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("elements", &self.elements.borrow().len())
            .field("listeners", &self.listener_count())
            .field("active", &self.active.get())
            .finish()
    }
}
