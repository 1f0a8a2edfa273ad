//! Chrome DevTools Protocol adapter for the tree widget
//!
//! Reads tree rows by evaluating a harvesting script in the page and parsing
//! the JSON it returns. The adapter is deliberately infallible at the trait
//! surface: a transient evaluation failure is logged and reported as an
//! empty/zero reading, which the controller's bounded waits and rescans
//! absorb on the next pass.

use std::sync::Arc;

use headless_chrome::Tab;
use serde_json::Value;

use crate::error::{DiscoveryError, Result};
use crate::ui::{RowSnapshot, TreeUi};

/// CSS selectors and attribute names locating the widget's parts
///
/// The defaults match a common virtualized tree layout; override them per
/// vendor via the builder methods.
#[derive(Debug, Clone)]
pub struct TreeSelectors {
    /// The scrollable container hosting the whole widget
    pub container: String,
    /// One rendered row
    pub row: String,
    /// Attribute carrying the row's stable id (also present on spacers)
    pub id_attr: String,
    /// Attribute carrying the row's indentation level
    pub depth_attr: String,
    /// The row's display label element
    pub label: String,
    /// The row's expander toggle
    pub expander: String,
    /// Class marking a row as collapsed
    pub collapsed_class: String,
    /// Indentation spacer elements forming the ancestor chain
    pub spacer: String,
    /// The row's icon element (type signal via background-image)
    pub icon: String,
}

impl Default for TreeSelectors {
    fn default() -> Self {
        Self {
            container: ".location-tree".to_string(),
            row: ".tree-row".to_string(),
            id_attr: "data-id".to_string(),
            depth_attr: "aria-level".to_string(),
            label: ".row-label".to_string(),
            expander: ".row-expander".to_string(),
            collapsed_class: "collapsed".to_string(),
            spacer: ".tree-spacer".to_string(),
            icon: ".row-icon".to_string(),
        }
    }
}

impl TreeSelectors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the container selector
    pub fn container(mut self, selector: impl Into<String>) -> Self {
        self.container = selector.into();
        self
    }

    /// Builder method: set the row selector
    pub fn row(mut self, selector: impl Into<String>) -> Self {
        self.row = selector.into();
        self
    }

    /// Builder method: set the id attribute name
    pub fn id_attr(mut self, attr: impl Into<String>) -> Self {
        self.id_attr = attr.into();
        self
    }
}

/// [`TreeUi`] implementation driving a live page over CDP
pub struct ChromeTreeUi {
    tab: Arc<Tab>,
    selectors: TreeSelectors,
}

impl ChromeTreeUi {
    /// Attach to a tab with default selectors
    pub fn new(tab: Arc<Tab>) -> Self {
        Self::with_selectors(tab, TreeSelectors::default())
    }

    /// Attach to a tab with vendor-specific selectors
    pub fn with_selectors(tab: Arc<Tab>, selectors: TreeSelectors) -> Self {
        Self { tab, selectors }
    }

    /// Navigate the tab to the page hosting the widget
    pub fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| DiscoveryError::NavigationFailed { url: url.to_string(), reason: e.to_string() })?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| DiscoveryError::NavigationFailed { url: url.to_string(), reason: e.to_string() })?;
        Ok(())
    }

    /// Evaluate a script and return its value
    fn evaluate(&self, js: &str) -> Result<Value> {
        let result = self
            .tab
            .evaluate(js, false)
            .map_err(|e| DiscoveryError::RowHarvestFailed(format!("script evaluation failed: {}", e)))?;

        result
            .value
            .ok_or_else(|| DiscoveryError::RowHarvestFailed("script returned no value".to_string()))
    }

    fn evaluate_f64(&self, js: &str) -> Result<f64> {
        match self.evaluate(js)? {
            Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
            other => Err(DiscoveryError::RowHarvestFailed(format!("expected number, got {}", other))),
        }
    }

    /// Harvest all rendered rows from the page
    fn harvest_rows(&self) -> Result<Vec<RowSnapshot>> {
        let s = &self.selectors;
        let js = format!(
            r#"
            (function() {{
                const container = document.querySelector({container});
                if (!container) return "[]";
                const rows = Array.from(container.querySelectorAll({row}));
                const out = rows.map(function(row) {{
                    const labelEl = row.querySelector({label});
                    const iconEl = row.querySelector({icon});
                    let icon = iconEl ? getComputedStyle(iconEl).backgroundImage : null;
                    if (icon === 'none' || icon === '') icon = null;
                    const level = parseInt(row.getAttribute({depth_attr}) || '0', 10);
                    return {{
                        id: row.getAttribute({id_attr}) || '',
                        name: labelEl ? labelEl.textContent.trim() : '',
                        depth: isNaN(level) ? 0 : level,
                        class_tokens: Array.from(row.classList),
                        icon_ref: icon,
                        is_collapsed: row.classList.contains({collapsed_class}),
                        ancestor_chain: Array.from(row.querySelectorAll({spacer}))
                            .map(function(sp) {{ return sp.getAttribute({id_attr}) || ''; }})
                    }};
                }});
                return JSON.stringify(out);
            }})()
            "#,
            container = js_str(&s.container),
            row = js_str(&s.row),
            label = js_str(&s.label),
            icon = js_str(&s.icon),
            depth_attr = js_str(&s.depth_attr),
            id_attr = js_str(&s.id_attr),
            collapsed_class = js_str(&s.collapsed_class),
            spacer = js_str(&s.spacer),
        );

        let json_str: String = serde_json::from_value(self.evaluate(&js)?)
            .map_err(|e| DiscoveryError::RowHarvestFailed(format!("expected JSON string: {}", e)))?;

        serde_json::from_str(&json_str)
            .map_err(|e| DiscoveryError::RowHarvestFailed(format!("failed to parse rows: {}", e)))
    }
}

/// Quote a string as a JS string literal
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

impl TreeUi for ChromeTreeUi {
    fn container_ready(&self) -> bool {
        let js = format!("!!document.querySelector({})", js_str(&self.selectors.container));
        match self.evaluate(&js) {
            Ok(Value::Bool(ready)) => ready,
            Ok(_) => false,
            Err(e) => {
                log::debug!("container probe failed: {}", e);
                false
            }
        }
    }

    fn visible_rows(&self) -> Vec<RowSnapshot> {
        match self.harvest_rows() {
            Ok(rows) => rows,
            Err(e) => {
                log::debug!("row harvest failed: {}", e);
                Vec::new()
            }
        }
    }

    fn expand(&self, id: &str) {
        let s = &self.selectors;
        let js = format!(
            r#"
            (function() {{
                const target = {id};
                const rows = document.querySelectorAll({row});
                for (const row of rows) {{
                    if (row.getAttribute({id_attr}) === target) {{
                        const toggle = row.querySelector({expander}) || row;
                        toggle.click();
                        return true;
                    }}
                }}
                return false;
            }})()
            "#,
            id = js_str(id),
            row = js_str(&s.row),
            id_attr = js_str(&s.id_attr),
            expander = js_str(&s.expander),
        );

        match self.evaluate(&js) {
            Ok(Value::Bool(true)) => {}
            Ok(_) => log::debug!("expander for {:?} not found in current window", id),
            Err(e) => log::debug!("expand click on {:?} failed: {}", id, e),
        }
    }

    fn scroll_to_max(&self) -> f64 {
        let js = format!(
            r#"
            (function() {{
                const c = document.querySelector({container});
                if (!c) return 0;
                c.scrollTop = c.scrollHeight;
                return c.scrollTop;
            }})()
            "#,
            container = js_str(&self.selectors.container),
        );

        self.evaluate_f64(&js).unwrap_or_else(|e| {
            log::debug!("scroll failed: {}", e);
            0.0
        })
    }

    fn content_extent(&self) -> f64 {
        let js = format!(
            r#"
            (function() {{
                const c = document.querySelector({container});
                return c ? c.scrollHeight : 0;
            }})()
            "#,
            container = js_str(&self.selectors.container),
        );

        self.evaluate_f64(&js).unwrap_or_else(|e| {
            log::debug!("extent probe failed: {}", e);
            0.0
        })
    }

    fn report_progress(&self, message: &str) {
        log::info!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{DiscoveryConfig, discover_hierarchy};
    use headless_chrome::{Browser, LaunchOptions};
    use std::time::Duration;

    #[test]
    fn test_selectors_builder() {
        let selectors = TreeSelectors::new()
            .container("#tree")
            .row("[role=treeitem]")
            .id_attr("data-node-id");

        assert_eq!(selectors.container, "#tree");
        assert_eq!(selectors.row, "[role=treeitem]");
        assert_eq!(selectors.id_attr, "data-node-id");
        // Untouched fields keep their defaults
        assert_eq!(selectors.collapsed_class, "collapsed");
    }

    #[test]
    fn test_js_str_escapes() {
        assert_eq!(js_str(".tree-row"), "\".tree-row\"");
        assert_eq!(js_str("a\"b"), "\"a\\\"b\"");
    }

    // Integration tests (require Chrome to be installed)
    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_discover_static_page() {
        let html = concat!(
            "<div class='location-tree'>",
            "<div class='tree-row' data-id='root' aria-level='0'>",
            "<span class='tree-spacer' data-id='root'></span>",
            "<span class='row-label'>HQ</span></div>",
            "<div class='tree-row node-campus' data-id='c1' aria-level='1'>",
            "<span class='tree-spacer' data-id='root'></span>",
            "<span class='tree-spacer' data-id='c1'></span>",
            "<span class='row-label'>East Campus</span></div>",
            "</div>"
        );

        let browser = Browser::new(LaunchOptions::default_builder().headless(true).build().unwrap())
            .expect("Failed to launch browser");
        let tab = browser.new_tab().expect("Failed to create tab");

        let ui = ChromeTreeUi::new(tab);
        ui.navigate(&format!("data:text/html,{}", html)).expect("Failed to navigate");

        let config = DiscoveryConfig::new()
            .initial_load_wait(Duration::from_secs(5))
            .max_iterations(5);
        let report = discover_hierarchy(&ui, config).expect("Discovery failed");

        assert!(report.converged);
        assert_eq!(report.total_tracked, 2);
        assert_eq!(report.roots.len(), 1);
        assert_eq!(report.roots[0].children[0].name, "East Campus");
    }
}
