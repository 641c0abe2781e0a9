use anyhow::bail;
use guard_dispatch::InboundEvent;

use crate::config::DispatchArgs;

/// Build the one [`InboundEvent`] a `dispatch` invocation carries. Clap's
/// `requires`/`conflicts_with` already rule out the ambiguous
/// combinations; this only has to pick between the two valid shapes.
pub(crate) fn into_inbound_event(args: DispatchArgs) -> anyhow::Result<InboundEvent> {
    match (args.callback_id, args.payload, args.text) {
        (Some(callback_id), Some(payload), None) => Ok(InboundEvent::callback(args.chat_id, callback_id, payload)),
        (None, None, Some(text)) => Ok(InboundEvent::text(args.chat_id, text)),
        _ => bail!("dispatch requires either --text or both --callback-id and --payload"),
    }
}
