use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::task::TaskStatus;

pub const CONFIG_FILE: &str = "config.json";

/// How the viewer draws one status: icon and colors, plus whether the
/// title is struck through and whether the icon animates as a spinner.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct StatusStyle {
    pub icon: String,
    pub icon_color: String,
    pub text_color: String,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub use_spinner: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ViewerConfig {
    pub status_display: BTreeMap<TaskStatus, StatusStyle>,
}

impl ViewerConfig {
    pub fn style_for(&self, status: TaskStatus) -> StatusStyle {
        self.status_display
            .get(&status)
            .cloned()
            .unwrap_or_else(|| default_style(status))
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            status_display: TaskStatus::ALL
                .into_iter()
                .map(|status| (status, default_style(status)))
                .collect(),
        }
    }
}

fn default_style(status: TaskStatus) -> StatusStyle {
    match status {
        TaskStatus::Pending => StatusStyle {
            icon: "◯".to_string(),
            icon_color: "gray".to_string(),
            text_color: "gray".to_string(),
            strikethrough: false,
            use_spinner: false,
        },
        TaskStatus::InProgress => StatusStyle {
            icon: String::new(),
            icon_color: "yellow".to_string(),
            text_color: "white".to_string(),
            strikethrough: false,
            use_spinner: true,
        },
        TaskStatus::Check => StatusStyle {
            icon: "👀".to_string(),
            icon_color: "magenta".to_string(),
            text_color: "magenta".to_string(),
            strikethrough: false,
            use_spinner: false,
        },
        TaskStatus::Done => StatusStyle {
            icon: "✔".to_string(),
            icon_color: "green".to_string(),
            text_color: "gray".to_string(),
            strikethrough: true,
            use_spinner: false,
        },
        TaskStatus::Error => StatusStyle {
            icon: "✖".to_string(),
            icon_color: "red".to_string(),
            text_color: "red".to_string(),
            strikethrough: false,
            use_spinner: false,
        },
    }
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_covers_every_status() {
        let config = ViewerConfig::default();
        for status in TaskStatus::ALL {
            assert!(config.status_display.contains_key(&status));
        }
        assert!(config.style_for(TaskStatus::InProgress).use_spinner);
        assert!(config.style_for(TaskStatus::Done).strikethrough);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = ViewerConfig::default();
        let raw = serde_json::to_string_pretty(&config).expect("serialize");
        let parsed: ViewerConfig = serde_json::from_str(&raw).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_style_fields_default_off() {
        let raw = r#"{"status_display":{"pending":{"icon":"*","icon_color":"blue","text_color":"white"}}}"#;
        let config: ViewerConfig = serde_json::from_str(raw).expect("parse");
        let style = config.style_for(TaskStatus::Pending);
        assert_eq!(style.icon, "*");
        assert!(!style.strikethrough);
        assert!(!style.use_spinner);
        // Statuses absent from the file still get a style.
        assert_eq!(
            config.style_for(TaskStatus::Done),
            ViewerConfig::default().style_for(TaskStatus::Done)
        );
    }
}
