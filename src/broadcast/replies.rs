// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, UserMarker};

/// Which messages are accepted as the reply.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReplyFilter {
	Any,
	/// Only "yes" or "no", ignoring case and surrounding whitespace. Other messages are ignored and the wait goes on.
	YesNo,
}

impl ReplyFilter {
	fn accepts(&self, content: &str) -> bool {
		match self {
			Self::Any => true,
			Self::YesNo => parse_yes_no(content).is_some(),
		}
	}
}

pub fn parse_yes_no(content: &str) -> Option<bool> {
	let content = content.trim();
	if content.eq_ignore_ascii_case("yes") {
		Some(true)
	} else if content.eq_ignore_ascii_case("no") {
		Some(false)
	} else {
		None
	}
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
struct ReplyKey {
	channel_id: Id<ChannelMarker>,
	user_id: Id<UserMarker>,
}

#[derive(Debug)]
struct PendingReply {
	wait_id: u64,
	filter: ReplyFilter,
	sender: oneshot::Sender<String>,
}

/// Registry of users the bot is waiting on for a message in a particular channel.
///
/// Several waits may be pending for the same user and channel; each message goes to the oldest one that accepts it.
/// Each wait resolves at most once: the pending slot is taken out of the registry by the first accepted message,
/// and a wait that ends (by reply, timeout, or being dropped) always clears its own slot.
#[derive(Clone, Debug, Default)]
pub struct ReplyWaiters {
	pending: Arc<Mutex<HashMap<ReplyKey, VecDeque<PendingReply>>>>,
	next_wait_id: Arc<AtomicU64>,
}

impl ReplyWaiters {
	/// Starts waiting for a message from `user_id` in `channel_id`, behind any waits already pending there.
	pub fn register(&self, channel_id: Id<ChannelMarker>, user_id: Id<UserMarker>, filter: ReplyFilter) -> ReplyWait {
		let key = ReplyKey { channel_id, user_id };
		let wait_id = self.next_wait_id.fetch_add(1, Ordering::Relaxed);
		let (sender, receiver) = oneshot::channel();
		self.lock().entry(key).or_default().push_back(PendingReply {
			wait_id,
			filter,
			sender,
		});
		ReplyWait {
			waiters: self.clone(),
			key,
			wait_id,
			receiver,
		}
	}

	/// Hands an incoming message to whoever is waiting on it. Returns whether the message resolved a wait.
	pub fn offer(&self, channel_id: Id<ChannelMarker>, user_id: Id<UserMarker>, content: &str) -> bool {
		let key = ReplyKey { channel_id, user_id };
		let pending = {
			let mut pending_replies = self.lock();
			let Some(queue) = pending_replies.get_mut(&key) else {
				return false;
			};
			let pending = queue
				.iter()
				.position(|pending| pending.filter.accepts(content))
				.and_then(|position| queue.remove(position));
			if queue.is_empty() {
				pending_replies.remove(&key);
			}
			pending
		};
		match pending {
			Some(pending) => pending.sender.send(content.to_string()).is_ok(),
			None => false,
		}
	}

	#[cfg(test)]
	pub(crate) fn is_waiting(&self, channel_id: Id<ChannelMarker>, user_id: Id<UserMarker>) -> bool {
		self.pending_count(channel_id, user_id) > 0
	}

	/// Number of waits pending for the user in the channel.
	#[cfg(test)]
	pub(crate) fn pending_count(&self, channel_id: Id<ChannelMarker>, user_id: Id<UserMarker>) -> usize {
		self.lock()
			.get(&ReplyKey { channel_id, user_id })
			.map(VecDeque::len)
			.unwrap_or(0)
	}

	fn release(&self, key: &ReplyKey, wait_id: u64) {
		let mut pending_replies = self.lock();
		let Some(queue) = pending_replies.get_mut(key) else {
			return;
		};
		queue.retain(|pending| pending.wait_id != wait_id);
		if queue.is_empty() {
			pending_replies.remove(key);
		}
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<ReplyKey, VecDeque<PendingReply>>> {
		self.pending.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

/// A registered wait for one reply.
#[derive(Debug)]
pub struct ReplyWait {
	waiters: ReplyWaiters,
	key: ReplyKey,
	wait_id: u64,
	receiver: oneshot::Receiver<String>,
}

impl ReplyWait {
	/// Waits for the reply, giving up after `limit`. Replies arriving after that are ignored.
	pub async fn wait(mut self, limit: Duration) -> Option<String> {
		match timeout(limit, &mut self.receiver).await {
			Ok(Ok(reply)) => Some(reply),
			_ => None,
		}
	}
}

impl Drop for ReplyWait {
	fn drop(&mut self) {
		self.waiters.release(&self.key, self.wait_id);
	}
}
