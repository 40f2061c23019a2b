// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An in-memory platform for exercising the broadcast workflow in tests.

use super::error::{BoxedError, SpreeError};
use super::job::Requester;
use super::platform::{BroadcastPlatform, CategoryAccess, ConfirmationRequest, GuildSummary, OwnerReply, Report};
use super::replies::{ReplyFilter, ReplyWaiters, parse_yes_no};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

/// Everything the workflow did, in order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Recorded {
	Confirmation(Id<UserMarker>),
	ChannelCreated {
		guild_id: Id<GuildMarker>,
		category_id: Id<ChannelMarker>,
		name: String,
	},
	AdPosted {
		channel_id: Id<ChannelMarker>,
		role_id: Id<RoleMarker>,
		ad_message: String,
	},
	Reported(Report),
	Notified(Report),
}

#[derive(Default)]
pub struct MockPlatform {
	guilds: Mutex<HashMap<Id<GuildMarker>, GuildSummary>>,
	owner_replies: Mutex<HashMap<Id<UserMarker>, OwnerReply>>,
	undeliverable_owners: Mutex<HashSet<Id<UserMarker>>>,
	silent_owners: Mutex<HashSet<Id<UserMarker>>>,
	panicking_guilds: Mutex<HashSet<Id<GuildMarker>>>,
	reply_waiters: ReplyWaiters,
	category_access: Mutex<HashMap<Id<GuildMarker>, CategoryAccess>>,
	failing_channel_guilds: Mutex<HashSet<Id<GuildMarker>>>,
	deleted_roles: Mutex<HashSet<Id<RoleMarker>>>,
	requests: Mutex<Vec<ConfirmationRequest>>,
	recorded: Mutex<Vec<Recorded>>,
	next_channel_id: AtomicU64,
}

impl MockPlatform {
	pub fn add_guild(&self, guild_id: u64, name: &str, member_count: u64, owner_id: Option<u64>) {
		let summary = GuildSummary {
			guild_id: Id::new(guild_id),
			name: name.to_string(),
			member_count,
			owner_id: owner_id.map(Id::new),
		};
		self.guilds.lock().unwrap().insert(summary.guild_id, summary);
	}

	pub fn set_owner_reply(&self, owner_id: u64, reply: OwnerReply) {
		self.owner_replies.lock().unwrap().insert(Id::new(owner_id), reply);
	}

	/// The owner gets the request but never answers, so the request waits out its whole limit.
	pub fn set_silent_owner(&self, owner_id: u64) {
		self.silent_owners.lock().unwrap().insert(Id::new(owner_id));
	}

	/// Looking the guild up panics.
	pub fn set_panicking_guild(&self, guild_id: u64) {
		self.panicking_guilds.lock().unwrap().insert(Id::new(guild_id));
	}

	/// Waits still registered for the owner's direct messages.
	pub fn pending_replies(&self, owner_id: u64) -> usize {
		self.reply_waiters.pending_count(direct_channel(Id::new(owner_id)), Id::new(owner_id))
	}

	pub fn fail_delivery_to(&self, owner_id: u64) {
		self.undeliverable_owners.lock().unwrap().insert(Id::new(owner_id));
	}

	pub fn set_category_access(&self, guild_id: u64, access: CategoryAccess) {
		self.category_access.lock().unwrap().insert(Id::new(guild_id), access);
	}

	pub fn fail_channel_creation_in(&self, guild_id: u64) {
		self.failing_channel_guilds.lock().unwrap().insert(Id::new(guild_id));
	}

	pub fn delete_role(&self, role_id: u64) {
		self.deleted_roles.lock().unwrap().insert(Id::new(role_id));
	}

	pub fn confirmation_requests(&self) -> Vec<ConfirmationRequest> {
		self.requests.lock().unwrap().clone()
	}

	pub fn recorded(&self) -> Vec<Recorded> {
		self.recorded.lock().unwrap().clone()
	}

	fn record(&self, event: Recorded) {
		self.recorded.lock().unwrap().push(event);
	}
}

fn direct_channel(user_id: Id<UserMarker>) -> Id<ChannelMarker> {
	user_id.cast()
}

#[async_trait]
impl BroadcastPlatform for MockPlatform {
	async fn guild_summary(&self, guild_id: Id<GuildMarker>) -> Result<Option<GuildSummary>, SpreeError> {
		if self.panicking_guilds.lock().unwrap().contains(&guild_id) {
			panic!("looking up guild {} blew up", guild_id);
		}
		Ok(self.guilds.lock().unwrap().get(&guild_id).cloned())
	}

	async fn request_confirmation(
		&self,
		request: &ConfirmationRequest,
		limit: Duration,
	) -> Result<OwnerReply, SpreeError> {
		self.requests.lock().unwrap().push(request.clone());
		self.record(Recorded::Confirmation(request.owner_id));
		if self.undeliverable_owners.lock().unwrap().contains(&request.owner_id) {
			return Err(SpreeError::infrastructure("sending a direct message", "cannot send messages to this user"));
		}
		if self.silent_owners.lock().unwrap().contains(&request.owner_id) {
			let wait = self.reply_waiters.register(
				direct_channel(request.owner_id),
				request.owner_id,
				ReplyFilter::YesNo,
			);
			return Ok(match wait.wait(limit).await.as_deref().and_then(parse_yes_no) {
				Some(true) => OwnerReply::Approved,
				Some(false) => OwnerReply::Declined,
				None => OwnerReply::NoReply,
			});
		}
		let reply = self.owner_replies.lock().unwrap().get(&request.owner_id).copied();
		Ok(reply.unwrap_or(OwnerReply::Approved))
	}

	async fn category_access(
		&self,
		guild_id: Id<GuildMarker>,
		_category_id: Id<ChannelMarker>,
	) -> Result<CategoryAccess, SpreeError> {
		let access = self.category_access.lock().unwrap().get(&guild_id).copied();
		Ok(access.unwrap_or(CategoryAccess::Ready))
	}

	async fn missing_roles(
		&self,
		_guild_id: Id<GuildMarker>,
		role_ids: &[Id<RoleMarker>],
	) -> Result<Vec<Id<RoleMarker>>, SpreeError> {
		let deleted_roles = self.deleted_roles.lock().unwrap();
		Ok(role_ids.iter().copied().filter(|role_id| deleted_roles.contains(role_id)).collect())
	}

	async fn create_text_channel(
		&self,
		guild_id: Id<GuildMarker>,
		category_id: Id<ChannelMarker>,
		name: &str,
	) -> Result<Id<ChannelMarker>, BoxedError> {
		if self.failing_channel_guilds.lock().unwrap().contains(&guild_id) {
			return Err("missing access".into());
		}
		self.record(Recorded::ChannelCreated {
			guild_id,
			category_id,
			name: name.to_string(),
		});
		Ok(Id::new(5000 + self.next_channel_id.fetch_add(1, Ordering::Relaxed)))
	}

	async fn post_ad(
		&self,
		channel_id: Id<ChannelMarker>,
		role_id: Id<RoleMarker>,
		ad_message: &str,
	) -> Result<(), BoxedError> {
		self.record(Recorded::AdPosted {
			channel_id,
			role_id,
			ad_message: ad_message.to_string(),
		});
		Ok(())
	}

	async fn report(&self, _requester: &Requester, report: &Report) -> Result<(), SpreeError> {
		self.record(Recorded::Reported(report.clone()));
		Ok(())
	}

	async fn notify_directly(&self, _requester: &Requester, report: &Report) -> Result<(), SpreeError> {
		self.record(Recorded::Notified(report.clone()));
		Ok(())
	}
}
