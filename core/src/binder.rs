//! Delegated event binding.
//!
//! # Design
//! Registrations are grouped by `(event type, scope)`. The first registration
//! for a group attaches one capturing listener to the document; every later
//! registration only adds an entry to the group. When the listener fires it
//! runs every entry whose filter accepts the event's source element, so the
//! number of real listeners never depends on how many handlers are bound.
//!
//! Class bindings share the document-scope group for their event type. Id
//! bindings resolve the element once, at bind time, and share a group
//! scoped to that element.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::console::Logger;
use crate::dom::{Document, Element, Event, ListenerId, Scope};
use crate::format::format;

/// Handler for a delegated event: the source element, then the event.
pub type Handler = Rc<dyn Fn(&Element, &Event)>;

/// Token returned by a successful bind; pass it to [`Binder::unbind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding(u64);

/// A parsed `#id` or `.class` selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Class(String),
}

impl Selector {
    /// `None` for anything not starting with `#` or `.`, or with nothing
    /// after the sigil.
    pub fn parse(selector: &str) -> Option<Self> {
        if let Some(id) = selector.strip_prefix('#') {
            (!id.is_empty()).then(|| Selector::Id(id.to_string()))
        } else {
            selector
                .strip_prefix('.')
                .filter(|class| !class.is_empty())
                .map(|class| Selector::Class(class.to_string()))
        }
    }
}

#[derive(Clone)]
enum Filter {
    Any,
    Class(String),
}

impl Filter {
    fn accepts(&self, source: &Element) -> bool {
        match self {
            Filter::Any => true,
            Filter::Class(class) => source.has_class(class),
        }
    }
}

struct Entry {
    binding: Binding,
    filter: Filter,
    handler: Handler,
}

struct Group {
    listener: ListenerId,
    entries: Vec<Entry>,
}

type Key = (String, Scope);
type Registry = Rc<RefCell<HashMap<Key, Group>>>;

pub struct Binder {
    document: Rc<Document>,
    registry: Registry,
    logger: Logger,
    next_binding: Cell<u64>,
}

impl Binder {
    pub fn new(document: Rc<Document>, logger: Logger) -> Self {
        Self {
            document,
            registry: Rc::default(),
            logger,
            next_binding: Cell::new(0),
        }
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    /// Bind by `#id` or `.class` selector. Any other selector is logged and
    /// nothing is bound.
    pub fn bind(
        &self,
        event_type: &str,
        selector: &str,
        handler: impl Fn(&Element, &Event) + 'static,
    ) -> Option<Binding> {
        match Selector::parse(selector) {
            Some(Selector::Id(id)) => self.bind_to_id(event_type, &id, handler),
            Some(Selector::Class(class)) => Some(self.bind_to_class(event_type, &class, handler)),
            None => {
                self.logger
                    .log(&format("bind: invalid selector '{0}', expected '#id' or '.class'", &[selector]));
                None
            }
        }
    }

    /// Run `handler` for every `event_type` event whose source element has
    /// `css_class` among its classes.
    pub fn bind_to_class(
        &self,
        event_type: &str,
        css_class: &str,
        handler: impl Fn(&Element, &Event) + 'static,
    ) -> Binding {
        self.register(
            event_type,
            Scope::Document,
            Filter::Class(css_class.to_string()),
            Rc::new(handler),
        )
    }

    /// Run `handler` for every `event_type` event reaching the element whose
    /// id is `id`. The element is looked up now; if it does not exist the
    /// condition is logged and nothing is bound.
    pub fn bind_to_id(
        &self,
        event_type: &str,
        id: &str,
        handler: impl Fn(&Element, &Event) + 'static,
    ) -> Option<Binding> {
        let Some(element) = self.document.get_element_by_id(id) else {
            self.logger
                .log(&format("bind: no element with id '{0}' for '{1}'", &[id, event_type]));
            return None;
        };
        Some(self.register(event_type, Scope::Element(element), Filter::Any, Rc::new(handler)))
    }

    /// Remove a binding. Detaches the underlying listener once its group is
    /// empty. Returns false if the binding is unknown or already removed.
    pub fn unbind(&self, binding: Binding) -> bool {
        let mut registry = self.registry.borrow_mut();
        let Some(key) = registry
            .iter()
            .find(|(_, group)| group.entries.iter().any(|e| e.binding == binding))
            .map(|(key, _)| key.clone())
        else {
            return false;
        };

        let emptied = match registry.get_mut(&key) {
            Some(group) => {
                group.entries.retain(|e| e.binding != binding);
                group.entries.is_empty()
            }
            None => false,
        };
        if emptied {
            if let Some(group) = registry.remove(&key) {
                self.document.remove_event_listener(group.listener);
                debug!(event_type = %key.0, scope = ?key.1, "detached delegated listener");
            }
        }
        true
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.registry.borrow().values().map(|g| g.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn register(&self, event_type: &str, scope: Scope, filter: Filter, handler: Handler) -> Binding {
        let binding = Binding(self.next_binding.get());
        self.next_binding.set(binding.0 + 1);

        let key: Key = (event_type.to_string(), scope);
        let mut registry = self.registry.borrow_mut();
        if !registry.contains_key(&key) {
            let listener = self.attach(key.clone());
            registry.insert(
                key.clone(),
                Group {
                    listener,
                    entries: Vec::new(),
                },
            );
            debug!(event_type, ?scope, "attached delegated listener");
        }
        if let Some(group) = registry.get_mut(&key) {
            group.entries.push(Entry {
                binding,
                filter,
                handler,
            });
        }
        binding
    }

    fn attach(&self, key: Key) -> ListenerId {
        let registry = Rc::downgrade(&self.registry);
        let (event_type, scope) = key.clone();
        self.document.add_event_listener(
            scope,
            &event_type,
            true,
            Rc::new(move |document: &Document, event: &Event| {
                let Some(registry) = registry.upgrade() else {
                    return;
                };
                let entries: Vec<(Filter, Handler)> = registry
                    .borrow()
                    .get(&key)
                    .map(|group| {
                        group
                            .entries
                            .iter()
                            .map(|e| (e.filter.clone(), e.handler.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                let Some(source) = document.element(event.target) else {
                    return;
                };
                for (filter, handler) in entries {
                    if filter.accepts(&source) {
                        handler(&source, event);
                    }
                }
            }),
        )
    }
}

impl Drop for Binder {
    fn drop(&mut self) {
        for ((event_type, scope), group) in self.registry.borrow_mut().drain() {
            self.document.remove_event_listener(group.listener);
            debug!(%event_type, ?scope, "detached delegated listener");
        }
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("bindings", &self.len())
            .field("logger", &self.logger)
            .finish()
    }
}
