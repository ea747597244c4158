use std::{collections::HashMap, fs, time::Duration};

/// Coordinator tuning. Debounce windows are component-specific: member
/// search settles faster than discrete channel actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub member_search_debounce: Duration,
    pub channel_action_debounce: Duration,
    pub items_per_page: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            member_search_debounce: Duration::from_millis(300),
            channel_action_debounce: Duration::from_millis(500),
            items_per_page: 10,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("coordinator.toml") {
        apply_file_overrides(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("APP__BASE_URL") {
        settings.base_url = v;
    }
    if let Ok(v) = std::env::var("APP__MEMBER_SEARCH_DEBOUNCE_MS") {
        if let Ok(ms) = v.parse::<u64>() {
            settings.member_search_debounce = Duration::from_millis(ms);
        }
    }
    if let Ok(v) = std::env::var("APP__CHANNEL_ACTION_DEBOUNCE_MS") {
        if let Ok(ms) = v.parse::<u64>() {
            settings.channel_action_debounce = Duration::from_millis(ms);
        }
    }
    if let Ok(v) = std::env::var("APP__ITEMS_PER_PAGE") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.items_per_page = parsed;
        }
    }

    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("base_url") {
        settings.base_url = v.clone();
    }
    if let Some(ms) = file_cfg
        .get("member_search_debounce_ms")
        .and_then(|v| v.parse::<u64>().ok())
    {
        settings.member_search_debounce = Duration::from_millis(ms);
    }
    if let Some(ms) = file_cfg
        .get("channel_action_debounce_ms")
        .and_then(|v| v.parse::<u64>().ok())
    {
        settings.channel_action_debounce = Duration::from_millis(ms);
    }
    if let Some(size) = file_cfg
        .get("items_per_page")
        .and_then(|v| v.parse::<u32>().ok())
    {
        settings.items_per_page = size;
    }
}
