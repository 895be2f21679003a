//! Grid layout types (all values are grid-cell units)

use serde::{Deserialize, Serialize};

/// Default footprint of a widget type, with optional resize bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultLayout {
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<u32>,
}

impl DefaultLayout {
    /// Footprint used for widget types nobody registered
    pub const FALLBACK: DefaultLayout = DefaultLayout {
        w: 4,
        h: 3,
        min_w: Some(2),
        min_h: Some(2),
        max_w: None,
        max_h: None,
    };

    pub fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            min_w: None,
            min_h: None,
            max_w: None,
            max_h: None,
        }
    }

    pub fn with_min(mut self, min_w: u32, min_h: u32) -> Self {
        self.min_w = Some(min_w);
        self.min_h = Some(min_h);
        self
    }

    pub fn with_max(mut self, max_w: u32, max_h: u32) -> Self {
        self.max_w = Some(max_w);
        self.max_h = Some(max_h);
        self
    }

    /// Check `min <= size <= max` on both axes where bounds are present
    pub fn validate(&self) -> Result<(), String> {
        check_axis("width", self.w, self.min_w, self.max_w)?;
        check_axis("height", self.h, self.min_h, self.max_h)
    }

    /// Place this footprint at a grid position
    pub fn at(&self, x: u32, y: u32) -> LayoutConfig {
        LayoutConfig {
            x,
            y,
            w: self.w,
            h: self.h,
            min_w: self.min_w,
            min_h: self.min_h,
            max_w: self.max_w,
            max_h: self.max_h,
            is_static: None,
        }
    }
}

fn check_axis(axis: &str, size: u32, min: Option<u32>, max: Option<u32>) -> Result<(), String> {
    if let Some(min) = min {
        if size < min {
            return Err(format!("{} {} is below minimum {}", axis, size, min));
        }
    }
    if let Some(max) = max {
        if size > max {
            return Err(format!("{} {} exceeds maximum {}", axis, size, max));
        }
    }
    Ok(())
}

/// Position and size of a widget in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<u32>,
    /// Prevents dragging/resizing
    #[serde(rename = "static", default, skip_serializing_if = "Option::is_none")]
    pub is_static: Option<bool>,
}

impl LayoutConfig {
    /// First grid row below this widget, saturating on absurd stored values
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }
}

/// Responsive breakpoints in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Breakpoints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lg: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sm: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xs: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompactType {
    Vertical,
    Horizontal,
}

fn default_cols() -> u32 {
    12
}

fn default_row_height() -> u32 {
    80
}

/// Grid settings of one dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    #[serde(default = "default_cols")]
    pub cols: u32,
    /// Row height in pixels
    #[serde(default = "default_row_height")]
    pub row_height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoints: Option<Breakpoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<[u32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_padding: Option<[u32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact_type: Option<CompactType>,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            cols: default_cols(),
            row_height: default_row_height(),
            breakpoints: None,
            margin: Some([16, 16]),
            container_padding: Some([16, 16]),
            compact_type: Some(CompactType::Vertical),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_validation() {
        assert!(DefaultLayout::new(3, 3).with_min(2, 2).with_max(6, 4).validate().is_ok());
        assert!(DefaultLayout::new(1, 3).with_min(2, 2).validate().is_err());
        assert!(DefaultLayout::new(3, 5).with_max(6, 4).validate().is_err());
        assert!(DefaultLayout::FALLBACK.validate().is_ok());
    }

    #[test]
    fn test_static_flag_name() {
        let mut layout = DefaultLayout::new(2, 2).at(1, 4);
        layout.is_static = Some(true);
        let json = serde_json::to_value(layout).unwrap();
        assert_eq!(json["static"], serde_json::json!(true));
        assert_eq!(layout.bottom(), 6);
    }

    #[test]
    fn test_bottom_saturates() {
        let layout: LayoutConfig =
            serde_json::from_value(serde_json::json!({"x": 0, "y": u32::MAX - 1, "w": 4, "h": 3}))
                .unwrap();
        assert_eq!(layout.bottom(), u32::MAX);
    }
}
