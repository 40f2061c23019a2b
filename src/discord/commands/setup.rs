// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::string_option;
use crate::broadcast::error::{ConfigurationError, SpreeError};
use crate::broadcast::resolver::RoleCandidate;
use crate::broadcast::setup::configure_server;
use crate::discord::context::BotContext;
use crate::discord::utils::embeds::setup_result_embed;
use crate::discord::utils::errors::follow_up_with_error;
use crate::discord::utils::members::role_member_counts;
use miette::{IntoDiagnostic, bail};
use std::fmt::Display;
use twilight_model::application::command::{Command, CommandType};
use twilight_model::application::interaction::InteractionContextType;
use twilight_model::application::interaction::application_command::CommandData;
use twilight_model::channel::ChannelType;
use twilight_model::channel::message::Embed;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker};
use twilight_util::builder::command::{CommandBuilder, StringBuilder};

pub fn command_definition() -> Command {
	let category = StringBuilder::new(
		"category",
		"The category where setup will be configured. You can provide the category name or ID.",
	)
	.required(true)
	.build();
	let roles = StringBuilder::new(
		"roles",
		"The roles to consider for assigning ranges. Mention or provide role IDs separated by /",
	)
	.required(true)
	.build();
	CommandBuilder::new(
		"setup",
		"Sets up the server with specified category and roles.",
		CommandType::ChatInput,
	)
	.contexts([InteractionContextType::Guild])
	.default_member_permissions(Permissions::MANAGE_GUILD)
	.option(category)
	.option(roles)
	.build()
}

pub async fn handle_command(
	interaction: &InteractionCreate,
	command_data: &CommandData,
	context: &BotContext,
) -> miette::Result<()> {
	let Some(guild_id) = interaction.guild_id else {
		bail!("Setup command was used outside of a guild");
	};
	let category_query = string_option(&command_data.options, "category")?;
	let roles_query = string_option(&command_data.options, "roles")?;

	let interaction_client = context.http_client.interaction(context.application_id);

	match set_up_server(context, guild_id, category_query, roles_query).await {
		Ok(embed) => {
			interaction_client
				.create_followup(&interaction.token)
				.embeds(&[embed])
				.await
				.into_diagnostic()?;
		}
		Err(error) => follow_up_with_error(&interaction_client, &interaction.token, &error).await?,
	}

	Ok(())
}

async fn set_up_server(
	context: &BotContext,
	guild_id: Id<GuildMarker>,
	category_query: &str,
	roles_query: &str,
) -> Result<Embed, SpreeError> {
	let channels = context
		.http_client
		.guild_channels(guild_id)
		.await
		.map_err(|error| SpreeError::infrastructure("loading the server's channels", error))?
		.models()
		.await
		.map_err(|error| SpreeError::infrastructure("loading the server's channels", error))?;
	let Some(category) = channels.iter().find(|channel| {
		channel.kind == ChannelType::GuildCategory
			&& matches_reference(channel.id, channel.name.as_deref().unwrap_or_default(), category_query)
	}) else {
		return Err(ConfigurationError::CategoryNotFound.into());
	};

	let roles = context
		.http_client
		.roles(guild_id)
		.await
		.map_err(|error| SpreeError::infrastructure("loading the server's roles", error))?
		.models()
		.await
		.map_err(|error| SpreeError::infrastructure("loading the server's roles", error))?;
	let references = parse_role_references(roles_query);
	let selected_roles: Vec<Id<RoleMarker>> = roles
		.iter()
		.filter(|role| {
			references
				.iter()
				.any(|reference| matches_reference(role.id, &role.name, reference))
		})
		.map(|role| role.id)
		.collect();
	if selected_roles.is_empty() {
		return Err(ConfigurationError::NoValidRoles.into());
	}

	let member_counts = role_member_counts(&context.http_client, guild_id).await?;
	let candidates: Vec<RoleCandidate> = selected_roles
		.into_iter()
		.map(|role_id| RoleCandidate {
			role_id,
			member_count: member_counts.get(&role_id).copied().unwrap_or_default(),
		})
		.collect();

	let configured = configure_server(context.setup_store.as_ref(), guild_id, category.id, &candidates).await?;
	let category_name = category.name.as_deref().unwrap_or_default();
	Ok(setup_result_embed(
		configured.kind,
		category_name,
		&configured.setup,
		&configured.excluded,
	))
}

/// Splits a `/`-separated role list, reducing role mentions to their IDs.
fn parse_role_references(input: &str) -> Vec<String> {
	input
		.split('/')
		.map(|reference| reference.trim().replace("<@&", "").replace('>', ""))
		.filter(|reference| !reference.is_empty())
		.collect()
}

/// Whether a user-supplied reference names the object with this ID or name.
fn matches_reference(id: impl Display, name: &str, reference: &str) -> bool {
	name == reference || id.to_string() == reference
}
