// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::error::{BoxedError, SpreeError};
use super::job::Requester;
use async_trait::async_trait;
use std::time::Duration;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

/// What the broadcast workflow needs to know about a server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GuildSummary {
	pub guild_id: Id<GuildMarker>,
	pub name: String,
	pub member_count: u64,
	pub owner_id: Option<Id<UserMarker>>,
}

/// A request sent to one owner covering every target server they own.
#[derive(Clone, Debug)]
pub struct ConfirmationRequest {
	pub owner_id: Id<UserMarker>,
	pub servers: Vec<GuildSummary>,
	pub ad_message: String,
	pub total_member_count: u64,
}

impl ConfirmationRequest {
	pub fn server_names(&self) -> Vec<String> {
		self.servers.iter().map(|server| server.name.clone()).collect()
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OwnerReply {
	Approved,
	Declined,
	NoReply,
}

/// Whether ad channels can be created in a server's configured category.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CategoryAccess {
	Ready,
	Missing,
	MissingPermission,
}

/// A message for the user who requested a broadcast.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Report {
	Notice(String),
	Results { channel_name: String, posted_count: usize },
}

/// The chat platform as seen by the broadcast workflow.
#[async_trait]
pub trait BroadcastPlatform: Send + Sync + 'static {
	/// Looks up a server. `Ok(None)` means the bot can't see the server.
	async fn guild_summary(&self, guild_id: Id<GuildMarker>) -> Result<Option<GuildSummary>, SpreeError>;

	/// Sends the request to the owner directly and waits up to `limit` for their yes or no.
	async fn request_confirmation(
		&self,
		request: &ConfirmationRequest,
		limit: Duration,
	) -> Result<OwnerReply, SpreeError>;

	async fn category_access(
		&self,
		guild_id: Id<GuildMarker>,
		category_id: Id<ChannelMarker>,
	) -> Result<CategoryAccess, SpreeError>;

	/// Lists which of the given roles no longer exist in the server.
	async fn missing_roles(
		&self,
		guild_id: Id<GuildMarker>,
		role_ids: &[Id<RoleMarker>],
	) -> Result<Vec<Id<RoleMarker>>, SpreeError>;

	async fn create_text_channel(
		&self,
		guild_id: Id<GuildMarker>,
		category_id: Id<ChannelMarker>,
		name: &str,
	) -> Result<Id<ChannelMarker>, BoxedError>;

	/// Posts the ad in the channel, pinging only the given role.
	async fn post_ad(&self, channel_id: Id<ChannelMarker>, role_id: Id<RoleMarker>, ad_message: &str)
	-> Result<(), BoxedError>;

	/// Reports to the requester where they ran the command.
	async fn report(&self, requester: &Requester, report: &Report) -> Result<(), SpreeError>;

	/// Reports to the requester in a direct message.
	async fn notify_directly(&self, requester: &Requester, report: &Report) -> Result<(), SpreeError>;
}
