use opencli_config::AssistantConfig;
use opencli_core::ApprovalMode;

/// Values given on the command line. They win over the config file and the
/// `OPENCLI_*` environment overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub history_limit: Option<usize>,
    pub approval: Option<ApprovalMode>,
}

impl CliOverrides {
    pub fn apply(self, mut config: AssistantConfig) -> AssistantConfig {
        if let Some(model) = self.model {
            config.model = Some(model);
        }
        if let Some(limit) = self.history_limit {
            config.history_limit = Some(limit);
        }
        if let Some(mode) = self.approval {
            config.approval = Some(mode);
        }
        config
    }
}
