//! WebAssembly bindings for the border authoring tool.
//!
//! This module exposes an authoring session to JavaScript through
//! wasm-bindgen. Structured values cross the boundary as JSON strings.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::allegiance::AllegianceRules;
#[cfg(feature = "wasm")]
use crate::grid::AllegianceGrid;
#[cfg(feature = "wasm")]
use crate::hex::parse_hex_label;
#[cfg(feature = "wasm")]
use crate::output::{BorderFormat, BorderRecord};
#[cfg(feature = "wasm")]
use crate::path::border_path_for_labels;
#[cfg(feature = "wasm")]
use crate::process::MapProcessor;
#[cfg(feature = "wasm")]
use crate::sector::{self, ExtractOptions, WorldRecord};

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed authoring session over one sector
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmBorderSession {
    grid: AllegianceGrid,
    rules: AllegianceRules,
    options: ExtractOptions,
    processor: Option<MapProcessor>,
}

#[cfg(feature = "wasm")]
impl WasmBorderSession {
    fn load(&mut self, worlds_json: &str) -> Result<(), String> {
        let worlds: Vec<WorldRecord> =
            serde_json::from_str(worlds_json).map_err(|e| format!("Invalid worlds: {}", e))?;
        sector::load_worlds(&mut self.grid, &worlds, &self.rules).map_err(|e| e.to_string())?;
        self.processor = None;
        Ok(())
    }

    fn step_once(&mut self) -> Result<String, String> {
        if self.processor.is_none() {
            self.processor = Some(MapProcessor::new(&self.grid).map_err(|e| e.to_string())?);
        }
        let Some(processor) = self.processor.as_mut() else {
            return Ok("null".to_string());
        };
        let step = processor.step(&mut self.grid).map_err(|e| e.to_string())?;
        if step.is_none() {
            self.processor = None;
        }
        serde_json::to_string(&step).map_err(|e| e.to_string())
    }

    fn records(&self) -> Result<Vec<BorderRecord>, String> {
        let borders = sector::extract_borders(&self.grid, self.options).map_err(|e| e.to_string())?;
        Ok(borders.iter().map(|b| b.to_record()).collect())
    }
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmBorderSession {
    /// Create an empty session using the default allegiance rules
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmBorderSession {
        WasmBorderSession {
            grid: sector::sector_grid(),
            rules: AllegianceRules::default(),
            options: ExtractOptions::default(),
            processor: None,
        }
    }

    /// Replace the allegiance rules from JSON
    #[wasm_bindgen(js_name = setRules)]
    pub fn set_rules(&mut self, rules_json: &str) -> Result<(), JsValue> {
        self.rules = AllegianceRules::from_json(rules_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(())
    }

    #[wasm_bindgen(js_name = setFilterHoles)]
    pub fn set_filter_holes(&mut self, filter: bool) {
        self.options.filter_holes = filter;
    }

    /// Load worlds from a JSON array of `{hex, allegiance}`
    #[wasm_bindgen(js_name = loadWorlds)]
    pub fn load_worlds(&mut self, worlds_json: &str) -> Result<(), JsValue> {
        self.load(worlds_json).map_err(|e| JsValue::from_str(&e))
    }

    /// Load worlds from tab-delimited sector data
    #[wasm_bindgen(js_name = loadTabDelimited)]
    pub fn load_tab_delimited(&mut self, text: &str) -> Result<(), JsValue> {
        let worlds = sector::parse_tab_delimited(text).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let json = serde_json::to_string(&worlds).unwrap_or_else(|_| "[]".to_string());
        self.load(&json).map_err(|e| JsValue::from_str(&e))
    }

    /// Process the next allegiance; returns the step as JSON, or `null`
    /// once the map is done
    #[wasm_bindgen(js_name = step)]
    pub fn step(&mut self) -> Result<String, JsValue> {
        self.step_once().map_err(|e| JsValue::from_str(&e))
    }

    /// Process every remaining allegiance
    #[wasm_bindgen(js_name = processAll)]
    pub fn process_all(&mut self) -> Result<(), JsValue> {
        while self.step_once().map_err(|e| JsValue::from_str(&e))? != "null" {}
        Ok(())
    }

    /// Toggle a hex by label, returns whether the grid changed
    #[wasm_bindgen(js_name = toggleHex)]
    pub fn toggle_hex(&mut self, label: &str) -> Result<bool, JsValue> {
        let hex = parse_hex_label(label).map_err(|e| JsValue::from_str(&e.to_string()))?;
        sector::toggle_allegiance(&mut self.grid, hex).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = claimEdges)]
    pub fn claim_edges(&mut self) -> Result<bool, JsValue> {
        sector::claim_edges(&mut self.grid).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Get the grid as JSON
    #[wasm_bindgen(js_name = getGrid)]
    pub fn get_grid(&self) -> String {
        serde_json::to_string(&self.grid).unwrap_or_else(|_| "{}".to_string())
    }

    /// Borders rendered as `"xml"`, `"msec"` or `"json"`
    #[wasm_bindgen(js_name = getBorders)]
    pub fn get_borders(&self, format: &str) -> Result<String, JsValue> {
        let format: BorderFormat = serde_json::from_value(serde_json::Value::String(format.to_string()))
            .map_err(|_| JsValue::from_str(&format!("Unknown format: {}", format)))?;
        let records = self.records().map_err(|e| JsValue::from_str(&e))?;
        Ok(format.render(&records))
    }

    /// Render a border given as a JSON array of hex labels
    #[wasm_bindgen(js_name = renderBorder)]
    pub fn render_border(&self, labels_json: &str, line_width: f64) -> Result<String, JsValue> {
        let labels: Vec<String> = serde_json::from_str(labels_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid labels: {}", e)))?;
        let path = border_path_for_labels(&labels, line_width).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(serde_json::to_string(&path).unwrap_or_else(|_| "{}".to_string()))
    }
}

#[cfg(feature = "wasm")]
impl Default for WasmBorderSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "wasm"))]
mod tests {
    use super::*;

    #[test]
    fn test_session_runs_to_completion() {
        let mut session = WasmBorderSession::new();
        session
            .load(r#"[{"hex":"0505","allegiance":"ImDd"},{"hex":"0506","allegiance":"ImDd"},{"hex":"0607","allegiance":"ImDd"}]"#)
            .unwrap();

        let first = session.step_once().unwrap();
        assert!(first.contains("Processed"));
        assert_eq!(session.step_once().unwrap(), "null");

        let records = session.records().unwrap();
        assert!(!records.is_empty());
        assert!(records.iter().all(|r| r.allegiance == "Im"));
    }

    #[test]
    fn test_bad_worlds_json() {
        let mut session = WasmBorderSession::new();
        assert!(session.load("not json").is_err());
        assert!(session.load(r#"[{"hex":"zz","allegiance":"Im"}]"#).is_err());
    }
}
