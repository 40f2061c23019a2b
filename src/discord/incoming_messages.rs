// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::broadcast::replies::ReplyWaiters;
use twilight_model::channel::message::Message;

/// Passes user messages on to any command or confirmation waiting for them.
pub fn handle_message(message: &Message, reply_waiters: &ReplyWaiters) {
	if message.author.bot {
		return;
	}

	if reply_waiters.offer(message.channel_id, message.author.id, &message.content) {
		tracing::debug!(channel = %message.channel_id, user = %message.author.id, "Message resolved a pending reply");
	}
}
