use parley_protocol::{ConfigOptions, PermissionMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub model: Option<String>,
    pub permission_mode: PermissionMode,
    pub plan_mode: bool,
    pub thinking: bool,
}

/// Which settings the connected agent supports. Empty lists allow anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub models: Vec<String>,
    pub permission_modes: Vec<PermissionMode>,
    pub plan_mode: bool,
    pub thinking: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            permission_modes: Vec::new(),
            plan_mode: true,
            thinking: true,
        }
    }
}

impl Capabilities {
    pub fn allows_model(&self, model: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| m == model)
    }

    pub fn allows_permission_mode(&self, mode: PermissionMode) -> bool {
        self.permission_modes.is_empty() || self.permission_modes.contains(&mode)
    }
}

impl ChatSettings {
    /// Apply a partial update, keeping the previous value of every field the
    /// capabilities do not allow. Returns the fields that were applied.
    pub fn apply(&mut self, update: &ConfigOptions, capabilities: &Capabilities) -> ConfigOptions {
        let mut applied = ConfigOptions::default();

        if let Some(model) = &update.model {
            if capabilities.allows_model(model) {
                self.model = Some(model.clone());
                applied.model = Some(model.clone());
            } else {
                rejected("model", model);
            }
        }

        if let Some(mode) = update.permission_mode {
            if capabilities.allows_permission_mode(mode) {
                self.permission_mode = mode;
                applied.permission_mode = Some(mode);
            } else {
                rejected("permission_mode", &mode.to_string());
            }
        }

        if let Some(plan_mode) = update.plan_mode {
            if !plan_mode || capabilities.plan_mode {
                self.plan_mode = plan_mode;
                applied.plan_mode = Some(plan_mode);
            } else {
                rejected("plan_mode", "true");
            }
        }

        if let Some(thinking) = update.thinking {
            if !thinking || capabilities.thinking {
                self.thinking = thinking;
                applied.thinking = Some(thinking);
            } else {
                rejected("thinking", "true");
            }
        }

        applied
    }

    /// Bring existing settings inside `capabilities`.
    pub fn clamp(&mut self, capabilities: &Capabilities) {
        if let Some(model) = &self.model
            && !capabilities.allows_model(model)
        {
            self.model = capabilities.models.first().cloned();
        }
        if !capabilities.allows_permission_mode(self.permission_mode) {
            self.permission_mode = capabilities
                .permission_modes
                .first()
                .copied()
                .unwrap_or_default();
        }
        self.plan_mode &= capabilities.plan_mode;
        self.thinking &= capabilities.thinking;
    }
}

fn rejected(field: &str, value: &str) {
    tracing::warn!(
        target: "parley.settings",
        "Setting {}={} not supported by this agent; keeping previous value",
        field,
        value
    );
}
