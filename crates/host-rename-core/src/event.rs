//! Lifecycle events and host records
//!
//! Foreman runs a hook once per host lifecycle transition, passing the
//! event name as the first argument and the host object as JSON on stdin:
//!
//! ```json
//! { "host": { "id": 42, "name": "web01.example.com", ... } }
//! ```
//!
//! [`LifecycleEvent::from_hook`] turns that pair into one immutable value
//! that is handed to the reconciler.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Maximum length of a host name, in bytes
pub const MAX_NAME_LEN: usize = 254;

/// One row of the identity table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Inventory identifier (stable, unique)
    #[serde(deserialize_with = "deserialize_host_id")]
    pub id: i64,

    /// Fully-qualified host name
    #[serde(default)]
    pub name: String,
}

impl HostRecord {
    /// Create a new host record
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Check that the record can be stored
    pub fn validate(&self) -> Result<()> {
        validate_id(self.id)?;
        validate_name(&self.name)
    }
}

/// Check that a host id is usable as a table key
pub fn validate_id(id: i64) -> Result<()> {
    if id <= 0 {
        return Err(Error::invalid_event(format!(
            "host id must be positive, got {}",
            id
        )));
    }
    Ok(())
}

/// Check that a host name fits the identity table
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_event("host name cannot be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::invalid_event(format!(
            "host name too long: {} bytes (max {})",
            name.len(),
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

/// Foreman sends ids as numbers, older plugins as numeric strings
fn deserialize_host_id<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid host id: {:?}", text))),
    }
}

/// Hook action passed by Foreman
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookAction {
    /// A host was created
    Create,
    /// A host was saved (possibly renamed)
    Update,
    /// A host was deleted
    Destroy,
}

impl HookAction {
    /// Name used on the command line and in hook directories
    pub fn as_str(&self) -> &'static str {
        match self {
            HookAction::Create => "create",
            HookAction::Update => "update",
            HookAction::Destroy => "destroy",
        }
    }

    /// All actions a hook is installed for
    pub const ALL: [HookAction; 3] = [HookAction::Create, HookAction::Update, HookAction::Destroy];
}

impl FromStr for HookAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(HookAction::Create),
            "update" => Ok(HookAction::Update),
            "destroy" => Ok(HookAction::Destroy),
            other => Err(Error::unsupported_action(other)),
        }
    }
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle event, immutable for the whole reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// What happened to the host
    pub action: HookAction,
    /// Host id and the name carried by the event
    pub host: HostRecord,
}

/// Wire format of the hook payload
#[derive(Debug, Deserialize)]
struct HookPayload {
    host: HostRecord,
}

impl LifecycleEvent {
    /// Create a new event
    pub fn new(action: HookAction, id: i64, name: impl Into<String>) -> Self {
        Self {
            action,
            host: HostRecord::new(id, name),
        }
    }

    /// Build an event from the hook's action argument and stdin payload
    ///
    /// The action is checked before the payload is parsed, so an unknown
    /// action is always reported as [`Error::UnsupportedAction`].
    pub fn from_hook(action: &str, payload: &str) -> Result<Self> {
        let action = action.parse::<HookAction>()?;
        let payload: HookPayload = serde_json::from_str(payload)?;
        Ok(Self {
            action,
            host: payload.host,
        })
    }

    /// Host id the event refers to
    pub fn host_id(&self) -> i64 {
        self.host.id
    }

    /// Name carried by the event
    pub fn new_name(&self) -> &str {
        &self.host.name
    }
}
