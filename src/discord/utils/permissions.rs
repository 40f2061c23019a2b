// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::broadcast::error::{BoxedError, SpreeError};
use std::collections::HashMap;
use std::future::IntoFuture;
use twilight_http::client::Client;
use twilight_model::channel::Channel;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker};
use twilight_util::permission_calculator::PermissionCalculator;

// The bot needs these in a server's ad category to create ad channels in it.
pub fn ad_category_permissions() -> Permissions {
	Permissions::VIEW_CHANNEL | Permissions::MANAGE_CHANNELS
}

/// Gets the list of permissions the bot has in the passed-in channel. The channel must be on the passed-in guild.
pub async fn channel_permissions(
	guild_id: Id<GuildMarker>,
	channel: &Channel,
	http_client: &Client,
) -> Result<Permissions, SpreeError> {
	let infrastructure = |error: BoxedError| SpreeError::infrastructure("checking channel permissions", error);
	let self_user = http_client
		.current_user()
		.await
		.map_err(|error| infrastructure(error.into()))?
		.model()
		.await
		.map_err(|error| infrastructure(error.into()))?;

	let self_member_future = http_client.guild_member(guild_id, self_user.id).into_future();
	let guild_roles_future = http_client.roles(guild_id).into_future();
	let (self_member, guild_roles) = tokio::join!(self_member_future, guild_roles_future);

	let self_member = self_member
		.map_err(|error| infrastructure(error.into()))?
		.model()
		.await
		.map_err(|error| infrastructure(error.into()))?;
	let guild_roles = guild_roles
		.map_err(|error| infrastructure(error.into()))?
		.models()
		.await
		.map_err(|error| infrastructure(error.into()))?;

	let guild_everyone_role_id: Id<RoleMarker> = guild_id.cast();
	let role_permissions: HashMap<Id<RoleMarker>, Permissions> =
		guild_roles.iter().map(|role| (role.id, role.permissions)).collect();
	let everyone_role_permissions = role_permissions
		.get(&guild_everyone_role_id)
		.copied()
		.unwrap_or_else(Permissions::empty);
	let member_roles: Vec<(Id<RoleMarker>, Permissions)> = self_member
		.roles
		.iter()
		.map(|role_id| {
			(
				*role_id,
				role_permissions
					.get(role_id)
					.copied()
					.unwrap_or_else(Permissions::empty),
			)
		})
		.collect();
	let channel_permission_overwrites = channel.permission_overwrites.clone().unwrap_or_default();

	let calculator = PermissionCalculator::new(guild_id, self_user.id, everyone_role_permissions, &member_roles);
	Ok(calculator.in_channel(channel.kind, &channel_permission_overwrites))
}
