use crate::errors::ErrorResponseHandler;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnackKind {
    Info,
    Error,
}

/// Transient message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnackMessage {
    pub kind: SnackKind,
    pub message: String,
    pub detailed_message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemState {
    pub snack: Option<SnackMessage>,
}

impl SystemState {
    pub fn set_snack_bar_message(&mut self, message: &str) -> SnackMessage {
        let snack = SnackMessage {
            kind: SnackKind::Info,
            message: message.to_string(),
            detailed_message: String::new(),
        };
        self.snack = Some(snack.clone());
        snack
    }

    pub fn set_error_snack_message(&mut self, error: &ErrorResponseHandler) -> SnackMessage {
        let snack = SnackMessage {
            kind: SnackKind::Error,
            message: error.error_message.clone(),
            detailed_message: error.detailed_error.clone(),
        };
        self.snack = Some(snack.clone());
        snack
    }
}
