//! AssistiveTouch toggle

use crate::session::{LockdownSession, SessionError};
use plist::Value;

pub const ACCESSIBILITY_DOMAIN: &str = "com.apple.Accessibility";
pub const ASSISTIVE_TOUCH_KEY: &str = "AssistiveTouchEnabledByiTunes";

/// lockdownd label used for the AssistiveTouch requests
pub const ASSISTIVE_LABEL: &str = "oa";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistiveAction {
    Enable,
    Disable,
    Get,
}

impl AssistiveAction {
    /// Value to write, or None for a read
    pub fn desired_value(self) -> Option<bool> {
        match self {
            AssistiveAction::Enable => Some(true),
            AssistiveAction::Disable => Some(false),
            AssistiveAction::Get => None,
        }
    }
}

/// Result of an AssistiveTouch request
#[derive(Debug, Clone, PartialEq)]
pub enum AssistiveResult {
    /// The setting was written
    Set,
    /// The current setting
    Value(Value),
}

pub async fn run(
    session: &mut LockdownSession,
    action: AssistiveAction,
) -> Result<AssistiveResult, SessionError> {
    match action.desired_value() {
        Some(enabled) => {
            session
                .set_value(ACCESSIBILITY_DOMAIN, ASSISTIVE_TOUCH_KEY, Value::Boolean(enabled))
                .await?;
            Ok(AssistiveResult::Set)
        }
        None => {
            let value = session
                .get_value(Some(ACCESSIBILITY_DOMAIN), Some(ASSISTIVE_TOUCH_KEY))
                .await?;
            Ok(AssistiveResult::Value(value))
        }
    }
}
