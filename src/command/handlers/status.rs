//! Status request handler

use super::HandlerContext;
use crate::command::CommandResult;

/// Handle STATUS: report the current state without changing it
pub fn handle_status_request(ctx: &HandlerContext) -> CommandResult {
    CommandResult::Completed {
        message: ctx.current_state.to_string(),
        state: ctx.current_state,
    }
}
