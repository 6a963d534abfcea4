use crate::channel::MessageHandler;
use crate::error::negotiation::NegotiationError;
use crate::error::reply::MalformedReply;
use crate::negotiation::config_state::ConfigState;
use crate::protocol::{BASE_URL_RESPONSE, NegotiatedConfig, message_type};

use log::{debug, error, warn};
use serde_json::Value;

/// What became of one inbound channel message.
#[derive(Debug, PartialEq)]
pub(crate) enum HandledMessage {
    Resolved,
    Ignored,
    Rejected(MalformedReply),
}

/// Inspect one inbound payload and resolve `state` if it is a config answer.
///
/// Unknown message types are ignored so newer frontends can add messages.
pub(crate) fn handle_frontend_message(
    state: &ConfigState,
    payload: Value,
) -> Result<HandledMessage, NegotiationError> {
    match message_type(&payload) {
        Some(BASE_URL_RESPONSE) => {}
        other => {
            debug!("Ignoring frontend message of type {other:?}");
            return Ok(HandledMessage::Ignored);
        }
    }

    match NegotiatedConfig::from_payload(payload) {
        Ok(config) => {
            state.resolve(config)?;
            Ok(HandledMessage::Resolved)
        }
        Err(reason) => {
            warn!("Ignoring malformed {BASE_URL_RESPONSE}: {reason}");
            Ok(HandledMessage::Rejected(reason))
        }
    }
}

/// Channel callback bound to `state`.
pub(crate) fn message_handler(state: ConfigState) -> MessageHandler {
    Box::new(move |payload| {
        if let Err(e) = handle_frontend_message(&state, payload) {
            error!("{e}");
        }
    })
}
