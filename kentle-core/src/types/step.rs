#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Step {
    pub name: String,

    /// Plugin id of the step, e.g. `TableInput` or `RowGenerator`.
    #[serde(rename = "type")]
    pub step_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Number of parallel copies the engine starts for this step.
    pub copies: u32,

    /// Round-robin rows to the next steps instead of copying them to all.
    pub distribute: bool,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            name: String::new(),
            step_type: String::new(),
            description: None,
            copies: 1,
            distribute: true,
        }
    }
}

/// A directed link between two steps (`<order><hop>`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Hop {
    pub from: String,
    pub to: String,
    pub enabled: bool,
}
