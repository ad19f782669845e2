use serde::{ Deserialize, Serialize };

pub const DEFAULT_RANGE: [f64; 2] = [-10.0, 10.0];
pub const DEFAULT_COLORS: [&str; 5] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd"];

/// Graph parameters the model produces for `/render_graph`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub graph_config: GraphSettings,
    #[serde(default)]
    pub styling: Styling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSettings {
    #[serde(default = "default_range")]
    pub x_range: [f64; 2],
    #[serde(default = "default_range")]
    pub y_range: [f64; 2],
    #[serde(default = "default_grid_spacing")]
    pub grid_spacing: f64,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            x_range: DEFAULT_RANGE,
            y_range: DEFAULT_RANGE,
            grid_spacing: default_grid_spacing(),
        }
    }
}

fn default_range() -> [f64; 2] {
    DEFAULT_RANGE
}

fn default_grid_spacing() -> f64 {
    1.0
}

/// Colour and line-style cycles. Empty lists fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Styling {
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub line_styles: Vec<String>,
}

impl Styling {
    pub fn color_for(&self, index: usize) -> &str {
        if self.colors.is_empty() {
            DEFAULT_COLORS[index % DEFAULT_COLORS.len()]
        } else {
            &self.colors[index % self.colors.len()]
        }
    }

    pub fn line_style_for(&self, index: usize) -> &str {
        if self.line_styles.is_empty() {
            "solid"
        } else {
            &self.line_styles[index % self.line_styles.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_sections_take_defaults() {
        let config: GraphConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.graph_config.x_range, DEFAULT_RANGE);
        assert_eq!(config.graph_config.y_range, DEFAULT_RANGE);
        assert_eq!(config.styling.color_for(6), DEFAULT_COLORS[1]);
        assert_eq!(config.styling.line_style_for(3), "solid");
    }

    #[test]
    fn integer_ranges_are_accepted() {
        let config: GraphConfig = serde_json
            ::from_value(
                json!({
                "graph_config": {"x_range": [-5, 5], "y_range": [0, 25], "grid_spacing": 5},
                "styling": {"colors": ["red", "blue"], "line_styles": ["dashed"]}
            })
            )
            .unwrap();
        assert_eq!(config.graph_config.x_range, [-5.0, 5.0]);
        assert_eq!(config.graph_config.grid_spacing, 5.0);
        assert_eq!(config.styling.color_for(3), "blue");
        assert_eq!(config.styling.line_style_for(1), "dashed");
    }
}
