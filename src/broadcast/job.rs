// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::setup::ServerSetup;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};

/// The user who asked for a broadcast and where they asked for it.
#[derive(Clone, Debug)]
pub struct Requester {
	pub user_id: Id<UserMarker>,
	pub guild_id: Id<GuildMarker>,
	pub channel_id: Id<ChannelMarker>,
	/// Member count of the requesting server when the broadcast was submitted.
	pub member_count: u64,
	/// Token of the command interaction, used to send follow-up messages to the requester.
	pub interaction_token: String,
}

/// One submitted broadcast. Jobs aren't changed after they're queued.
#[derive(Clone, Debug)]
pub struct BroadcastJob {
	pub id: String,
	pub requester: Requester,
	pub channel_name: String,
	pub ad_message: String,
	pub target_guild_ids: Vec<Id<GuildMarker>>,
	/// Sum of the member counts of the requesting server and every target server.
	pub total_member_count: u64,
	/// The setup of each target server, in the order the targets were given.
	pub setups: Vec<ServerSetup>,
}

impl BroadcastJob {
	pub fn new(
		requester: Requester,
		channel_name: String,
		ad_message: String,
		target_guild_ids: Vec<Id<GuildMarker>>,
		total_member_count: u64,
		setups: Vec<ServerSetup>,
	) -> Self {
		Self {
			id: cuid2::create_id(),
			requester,
			channel_name,
			ad_message,
			target_guild_ids,
			total_member_count,
			setups,
		}
	}
}
