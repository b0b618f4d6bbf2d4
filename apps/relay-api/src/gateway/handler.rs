//! Inbound event dispatch for an authenticated session.
//!
//! Handlers never await: registry updates stay atomic on the dispatch path,
//! and anything slow (persistence) is spawned by the relay itself.

use serde_json::json;
use tracing::debug;

use super::events::{
    CallAnswerPayload, CallControlPayload, CallOfferPayload, ClientEvent, EventName,
    IceCandidatePayload, SendMessagePayload, StatusUpdatePayload,
};
use super::fanout::Recipient;
use super::session::GatewaySession;
use crate::models::user::Status;
use crate::AppState;

pub fn handle_event(state: &AppState, session: &GatewaySession, event: ClientEvent) {
    match event.event.as_str() {
        "send-message" => send_message(state, session, event.data),
        "get-messages" => get_messages(state, session),
        "typing" => typing(state, session, true),
        "stop-typing" => typing(state, session, false),
        "status-update" => status_update(state, session, event.data),
        "call-offer" => call_offer(state, session, event.data),
        "call-answer" => call_answer(state, session, event.data),
        "ice-candidate" => ice_candidate(state, session, event.data),
        "call-declined" => call_declined(state, session, event.data),
        "end-call" => end_call(state, session, event.data),
        "authenticate" => error_to(state, &session.connection_id, "already authenticated"),
        other => {
            debug!(event = other, connection_id = %session.connection_id, "unknown event");
            error_to(state, &session.connection_id, "unknown event");
        }
    }
}

/// The session's registry-resolved username. `None` means the connection is
/// no longer registered (e.g. evicted by a newer login) and must not act.
fn resolve_sender(state: &AppState, session: &GatewaySession) -> Option<String> {
    state.presence.resolve_connection(&session.connection_id)
}

fn send_message(state: &AppState, session: &GatewaySession, data: serde_json::Value) {
    let payload: SendMessagePayload = match serde_json::from_value(data) {
        Ok(p) => p,
        Err(_) => return error_to(state, &session.connection_id, "invalid message payload"),
    };

    let Some(sender) = resolve_sender(state, session) else {
        return error_to(state, &session.connection_id, "not authenticated");
    };

    let content = payload.content.as_deref().map(str::trim);
    let content = match content {
        None | Some("") => {
            return error_to(state, &session.connection_id, "message content is required")
        }
        Some(c) => c,
    };

    state.relay.send(&sender, content, payload.encrypted);
}

fn get_messages(state: &AppState, session: &GatewaySession) {
    let history = state.relay.history();
    state.broadcast.dispatch(
        Recipient::Connection(session.connection_id.clone()),
        EventName::MESSAGE_HISTORY,
        json!({ "messages": history }),
    );
}

fn typing(state: &AppState, session: &GatewaySession, started: bool) {
    // Ephemeral, best-effort; an unresolvable originator is simply ignored.
    let Some(username) = resolve_sender(state, session) else {
        return;
    };
    let event = if started {
        EventName::USER_TYPING
    } else {
        EventName::USER_STOPPED_TYPING
    };
    state.broadcast.dispatch(
        Recipient::AllExcept(session.connection_id.clone()),
        event,
        json!({ "username": username }),
    );
}

fn status_update(state: &AppState, session: &GatewaySession, data: serde_json::Value) {
    let payload: StatusUpdatePayload = match serde_json::from_value(data) {
        Ok(p) => p,
        Err(_) => return error_to(state, &session.connection_id, "invalid status payload"),
    };

    let Some(status) = Status::parse(&payload.status) else {
        return error_to(state, &session.connection_id, "unrecognized status");
    };

    let Some(username) = resolve_sender(state, session) else {
        return error_to(state, &session.connection_id, "not authenticated");
    };

    state.presence.set_status(&username, status);
    state.broadcast.dispatch(
        Recipient::AllExcept(session.connection_id.clone()),
        EventName::USER_STATUS_CHANGE,
        json!({ "username": username, "status": status }),
    );
}

// ---------------------------------------------------------------------------
// Call signaling
// ---------------------------------------------------------------------------

fn call_offer(state: &AppState, session: &GatewaySession, data: serde_json::Value) {
    let payload: CallOfferPayload = match serde_json::from_value(data) {
        Ok(p) => p,
        Err(_) => return error_to(state, &session.connection_id, "invalid call-offer payload"),
    };

    let Some(caller) = resolve_sender(state, session) else {
        return error_to(state, &session.connection_id, "not authenticated");
    };

    // Target offline is a normal outcome, surfaced explicitly to the caller.
    let Some(target_conn) = state.presence.resolve(&payload.target) else {
        return call_error(
            state,
            &session.connection_id,
            &format!("{} is offline", payload.target),
        );
    };

    if !state.calls.offer(&caller, &payload.target) {
        return call_error(state, &session.connection_id, "call already in progress");
    }

    state.broadcast.dispatch(
        Recipient::Connection(target_conn),
        EventName::CALL_OFFER,
        json!({ "from": caller, "offer": payload.offer }),
    );
}

fn call_answer(state: &AppState, session: &GatewaySession, data: serde_json::Value) {
    let payload: CallAnswerPayload = match serde_json::from_value(data) {
        Ok(p) => p,
        Err(_) => return error_to(state, &session.connection_id, "invalid call-answer payload"),
    };

    let Some(callee) = resolve_sender(state, session) else {
        return error_to(state, &session.connection_id, "not authenticated");
    };

    let Some(target_conn) = state.presence.resolve(&payload.target) else {
        state.calls.clear(&callee, &payload.target);
        return call_error(
            state,
            &session.connection_id,
            &format!("{} is offline", payload.target),
        );
    };

    // An answer with no ringing attempt for the pair is a stray frame.
    if !state.calls.answer(&callee, &payload.target) {
        return call_error(state, &session.connection_id, "no active call");
    }

    state.broadcast.dispatch(
        Recipient::Connection(target_conn),
        EventName::CALL_ANSWER,
        json!({ "from": callee, "answer": payload.answer }),
    );
}

fn ice_candidate(state: &AppState, session: &GatewaySession, data: serde_json::Value) {
    let payload: IceCandidatePayload = match serde_json::from_value(data) {
        Ok(p) => p,
        Err(_) => return error_to(state, &session.connection_id, "invalid ice-candidate payload"),
    };

    let Some(from) = resolve_sender(state, session) else {
        return error_to(state, &session.connection_id, "not authenticated");
    };

    // Candidates are forwarded verbatim, any number of times; the only check
    // is that the target is still connected.
    let Some(target_conn) = state.presence.resolve(&payload.target) else {
        return call_error(
            state,
            &session.connection_id,
            &format!("{} is offline", payload.target),
        );
    };

    state.broadcast.dispatch(
        Recipient::Connection(target_conn),
        EventName::ICE_CANDIDATE,
        json!({ "from": from, "candidate": payload.candidate }),
    );
}

fn call_declined(state: &AppState, session: &GatewaySession, data: serde_json::Value) {
    let payload: CallControlPayload = match serde_json::from_value(data) {
        Ok(p) => p,
        Err(_) => return error_to(state, &session.connection_id, "invalid call-declined payload"),
    };

    let Some(from) = resolve_sender(state, session) else {
        return error_to(state, &session.connection_id, "not authenticated");
    };

    state.calls.clear(&from, &payload.target);

    let Some(target_conn) = state.presence.resolve(&payload.target) else {
        return call_error(
            state,
            &session.connection_id,
            &format!("{} is offline", payload.target),
        );
    };

    state.broadcast.dispatch(
        Recipient::Connection(target_conn),
        EventName::CALL_DECLINED,
        json!({ "from": from, "reason": payload.reason }),
    );
}

fn end_call(state: &AppState, session: &GatewaySession, data: serde_json::Value) {
    let payload: CallControlPayload = match serde_json::from_value(data) {
        Ok(p) => p,
        Err(_) => return error_to(state, &session.connection_id, "invalid end-call payload"),
    };

    let Some(from) = resolve_sender(state, session) else {
        return error_to(state, &session.connection_id, "not authenticated");
    };

    state.calls.clear(&from, &payload.target);

    let Some(target_conn) = state.presence.resolve(&payload.target) else {
        return call_error(
            state,
            &session.connection_id,
            &format!("{} is offline", payload.target),
        );
    };

    state.broadcast.dispatch(
        Recipient::Connection(target_conn),
        EventName::CALL_ENDED,
        json!({ "from": from, "reason": payload.reason }),
    );
}

// ---------------------------------------------------------------------------
// Error replies always go to the caller only, never broadcast.
// ---------------------------------------------------------------------------

fn error_to(state: &AppState, connection_id: &str, message: &str) {
    state.broadcast.dispatch(
        Recipient::Connection(connection_id.to_string()),
        EventName::ERROR,
        json!({ "message": message }),
    );
}

fn call_error(state: &AppState, connection_id: &str, message: &str) {
    state.broadcast.dispatch(
        Recipient::Connection(connection_id.to_string()),
        EventName::CALL_ERROR,
        json!({ "message": message }),
    );
}
