/// Configuration for the routine client, the grid shape and edit rights
use super::auth::Role;
use super::error::{TimetableError, TimetableResult};
use super::slot::{Day, TimeSlot};
use super::types::ScopeKind;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const API_URL_ENV: &str = "TIMETABLE_API_URL";
/// Environment variable carrying the bearer token for the binary.
pub const TOKEN_ENV: &str = "TIMETABLE_TOKEN";

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub edit_policy: EditPolicy,
}

impl AppConfig {
    /// Loads a JSON configuration file and validates it.
    pub fn load(path: &Path) -> TimetableResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| TimetableError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: AppConfig =
            serde_json::from_str(&content).map_err(|e| TimetableError::Config {
                message: format!("cannot parse {}: {e}", path.display()),
            })?;
        config.grid.validate()?;
        Ok(config)
    }

    /// Applies environment overrides on top of this configuration.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.client.base_url = url.trim().to_string();
            }
        }
        self
    }
}

/// Settings for the HTTP client talking to the routine API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the routine API
    pub base_url: String,
    /// User agent string
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Page size used when listing subjects
    pub subjects_page_size: u32,
    /// Page size used when listing rooms
    pub rooms_page_size: u32,
    /// Upper bound on pages fetched per listing
    pub max_pages: u32,
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            user_agent: format!("timetable/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            subjects_page_size: 50,
            rooms_page_size: 100,
            max_pages: 20,
        }
    }
}

/// Days and time slots making up the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub days: Vec<Day>,
    pub time_slots: Vec<TimeSlot>,
}

impl GridConfig {
    /// Rejects empty or duplicated days and slots.
    pub fn validate(&self) -> TimetableResult<()> {
        if self.days.is_empty() || self.time_slots.is_empty() {
            return Err(TimetableError::Config {
                message: "grid needs at least one day and one time slot".to_string(),
            });
        }

        let unique_days: HashSet<_> = self.days.iter().collect();
        if unique_days.len() != self.days.len() {
            return Err(TimetableError::Config {
                message: "grid days contain duplicates".to_string(),
            });
        }

        let unique_slots: HashSet<_> = self.time_slots.iter().collect();
        if unique_slots.len() != self.time_slots.len() {
            return Err(TimetableError::Config {
                message: "grid time slots contain duplicates".to_string(),
            });
        }

        if let Some(bad) = self.time_slots.iter().find(|s| s.end <= s.start) {
            return Err(TimetableError::Config {
                message: format!("time slot {bad} does not end after it starts"),
            });
        }

        Ok(())
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
        Self {
            days: Day::ALL.to_vec(),
            time_slots: vec![
                TimeSlot {
                    start: at(16, 15),
                    end: at(17, 55),
                },
                TimeSlot {
                    start: at(17, 55),
                    end: at(19, 35),
                },
            ],
        }
    }
}

/// Who may edit which views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditPolicy {
    /// View scopes in which cells can be opened for editing
    pub editable_scopes: Vec<ScopeKind>,
    /// Role the signed-in user must hold
    pub required_role: Role,
}

impl EditPolicy {
    /// Read-only everywhere.
    pub fn read_only() -> Self {
        Self {
            editable_scopes: Vec::new(),
            required_role: Role::Admin,
        }
    }

    pub fn allows(&self, scope: ScopeKind, role: Option<Role>) -> bool {
        self.editable_scopes.contains(&scope) && role == Some(self.required_role)
    }
}

impl Default for EditPolicy {
    fn default() -> Self {
        Self {
            editable_scopes: vec![ScopeKind::Group],
            required_role: Role::Admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"client": {"base_url": "http://api.example"}}"#).unwrap();
        assert_eq!(config.client.base_url, "http://api.example");
        assert_eq!(config.client.subjects_page_size, 50);
        assert_eq!(config.grid, GridConfig::default());
        assert_eq!(config.edit_policy, EditPolicy::default());
    }

    #[test]
    fn test_grid_from_json() {
        let grid: GridConfig = serde_json::from_str(
            r#"{"days": ["MON", "TUE"], "time_slots": [{"start_time": "08:00", "end_time": "09:40"}]}"#,
        )
        .unwrap();
        assert!(grid.validate().is_ok());
        assert_eq!(grid.days, vec![Day::Mon, Day::Tue]);
    }

    #[test]
    fn test_grid_validation() {
        let mut grid = GridConfig::default();
        grid.days.push(Day::Sun);
        assert!(grid.validate().is_err());

        let grid = GridConfig {
            days: vec![Day::Mon],
            time_slots: vec![],
        };
        assert!(grid.validate().is_err());
    }

    #[test]
    fn test_default_policy_is_group_admin_only() {
        let policy = EditPolicy::default();
        assert!(policy.allows(ScopeKind::Group, Some(Role::Admin)));
        assert!(!policy.allows(ScopeKind::Room, Some(Role::Admin)));
        assert!(!policy.allows(ScopeKind::Teacher, Some(Role::Admin)));
        assert!(!policy.allows(ScopeKind::Group, Some(Role::Teacher)));
        assert!(!policy.allows(ScopeKind::Group, None));
        assert!(!EditPolicy::read_only().allows(ScopeKind::Group, Some(Role::Admin)));
    }
}
