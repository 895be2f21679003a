//! Widget registry: widget type -> renderer, defaults and footprint

use multidash_types::{DefaultLayout, WidgetType};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

use crate::renderer::SharedRenderer;

/// Everything the registry knows about one widget type
#[derive(Clone)]
pub struct WidgetDefinition {
    pub widget_type: WidgetType,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub renderer: SharedRenderer,
    /// Type-specific starting config (a JSON object)
    pub default_config: Value,
    pub default_layout: DefaultLayout,
}

impl WidgetDefinition {
    pub fn new(
        widget_type: impl Into<WidgetType>,
        name: impl Into<String>,
        renderer: SharedRenderer,
        default_layout: DefaultLayout,
    ) -> Self {
        Self {
            widget_type: widget_type.into(),
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            renderer,
            default_config: Value::Object(Map::new()),
            default_layout,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_default_config(mut self, config: Value) -> Self {
        self.default_config = config;
        self
    }
}

impl fmt::Debug for WidgetDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetDefinition")
            .field("widget_type", &self.widget_type)
            .field("name", &self.name)
            .field("icon", &self.icon)
            .field("renderer", &self.renderer.id())
            .field("default_layout", &self.default_layout)
            .finish()
    }
}

/// Catalog of widget types
///
/// Built once at start-up and shared read-only. Registration order is kept
/// so listings are stable.
#[derive(Default)]
pub struct WidgetRegistry {
    definitions: Vec<WidgetDefinition>,
    index: HashMap<WidgetType, usize>,
}

impl WidgetRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a widget definition.
    ///
    /// Returns false and leaves the registry unchanged when the type is
    /// already registered or the default layout violates its own bounds.
    pub fn register(&mut self, definition: WidgetDefinition) -> bool {
        if self.index.contains_key(&definition.widget_type) {
            log::warn!(
                "Widget type '{}' is already registered, ignoring new definition",
                definition.widget_type
            );
            return false;
        }
        if let Err(e) = definition.default_layout.validate() {
            log::warn!(
                "Rejecting widget type '{}': invalid default layout ({})",
                definition.widget_type,
                e
            );
            return false;
        }

        log::debug!("Registered widget type '{}'", definition.widget_type);
        self.index
            .insert(definition.widget_type.clone(), self.definitions.len());
        self.definitions.push(definition);
        true
    }

    /// Remove a widget type. Returns the removed definition.
    pub fn unregister(&mut self, widget_type: &str) -> Option<WidgetDefinition> {
        let pos = self.index.remove(&WidgetType::from(widget_type))?;
        let removed = self.definitions.remove(pos);
        for idx in self.index.values_mut() {
            if *idx > pos {
                *idx -= 1;
            }
        }
        Some(removed)
    }

    pub fn get(&self, widget_type: &str) -> Option<&WidgetDefinition> {
        self.index
            .get(&WidgetType::from(widget_type))
            .map(|&i| &self.definitions[i])
    }

    pub fn has(&self, widget_type: &str) -> bool {
        self.index.contains_key(&WidgetType::from(widget_type))
    }

    /// All definitions in registration order
    pub fn get_all(&self) -> Vec<&WidgetDefinition> {
        self.definitions.iter().collect()
    }

    /// Registered type identifiers in registration order
    pub fn types(&self) -> Vec<&WidgetType> {
        self.definitions.iter().map(|d| &d.widget_type).collect()
    }

    pub fn renderer(&self, widget_type: &str) -> Option<&SharedRenderer> {
        self.get(widget_type).map(|d| &d.renderer)
    }

    /// Default config for a type, or `{}` when unknown
    pub fn get_default_config(&self, widget_type: &str) -> Value {
        self.get(widget_type)
            .map(|d| d.default_config.clone())
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Default footprint for a type, or [`DefaultLayout::FALLBACK`] when unknown
    pub fn get_default_layout(&self, widget_type: &str) -> DefaultLayout {
        self.get(widget_type)
            .map(|d| d.default_layout)
            .unwrap_or(DefaultLayout::FALLBACK)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
