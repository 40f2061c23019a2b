// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::string_option;
use crate::broadcast::error::{SpreeError, ValidationError};
use crate::broadcast::job::{BroadcastJob, Requester};
use crate::broadcast::replies::{ReplyFilter, parse_yes_no};
use crate::broadcast::targets::{parse_server_ids, prepare_targets};
use crate::discord::context::BotContext;
use crate::discord::utils::embeds::requester_confirmation_embed;
use crate::discord::utils::errors::follow_up_with_error;
use crate::discord::utils::responses::{AD_QUEUED, ad_prompt_message};
use miette::bail;
use twilight_http::client::InteractionClient;
use twilight_model::application::command::{Command, CommandType};
use twilight_model::application::interaction::InteractionContextType;
use twilight_model::application::interaction::application_command::{CommandData, CommandOptionValue};
use twilight_model::channel::message::{AllowedMentions, Embed, MessageFlags};
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};
use twilight_util::builder::command::{CommandBuilder, StringBuilder, SubCommandBuilder};

pub fn command_definition() -> Command {
	let channel_name = StringBuilder::new("channel_name", "The name of the channel created in each server")
		.required(true)
		.build();
	let servers = StringBuilder::new("servers", "The IDs of the servers to post in, separated by /")
		.required(true)
		.build();
	let post = SubCommandBuilder::new("post", "Posts an ad into the chosen servers")
		.option(channel_name)
		.option(servers)
		.build();
	CommandBuilder::new("broadcast", "Broadcast ads to other servers", CommandType::ChatInput)
		.contexts([InteractionContextType::Guild])
		.option(post)
		.build()
}

/// Where the ad request came from.
struct RequestOrigin<'a> {
	guild_id: Id<GuildMarker>,
	channel_id: Id<ChannelMarker>,
	user_id: Id<UserMarker>,
	interaction_token: &'a str,
}

pub async fn handle_command(
	interaction: &InteractionCreate,
	command_data: &CommandData,
	context: &BotContext,
) -> miette::Result<()> {
	let Some(guild_id) = interaction.guild_id else {
		bail!("Broadcast command was used outside of a guild");
	};
	let Some(channel_id) = interaction.channel.as_ref().map(|channel| channel.id) else {
		bail!("Broadcast command was used without a channel");
	};
	let Some(user_id) = interaction.author_id() else {
		bail!("Broadcast command was used without a user");
	};

	let Some(subcommand) = command_data.options.first() else {
		bail!("Broadcast command received without a subcommand");
	};
	if subcommand.name != "post" {
		bail!("Unknown broadcast subcommand: {}", subcommand.name);
	}
	let CommandOptionValue::SubCommand(options) = &subcommand.value else {
		bail!("Broadcast post subcommand wasn't a subcommand");
	};
	let channel_name = string_option(options, "channel_name")?;
	let servers = string_option(options, "servers")?;

	let interaction_client = context.http_client.interaction(context.application_id);

	let origin = RequestOrigin {
		guild_id,
		channel_id,
		user_id,
		interaction_token: &interaction.token,
	};
	if let Err(error) = submit_ad(context, &interaction_client, &origin, channel_name, servers).await {
		tracing::info!(user = %user_id, guild = %guild_id, reason = %error, "Ad request was not queued");
		follow_up_with_error(&interaction_client, &interaction.token, &error).await?;
	}

	Ok(())
}

/// Walks the requester through submitting an ad and queues it once they confirm it.
async fn submit_ad(
	context: &BotContext,
	interaction_client: &InteractionClient<'_>,
	origin: &RequestOrigin<'_>,
	channel_name: &str,
	servers: &str,
) -> Result<(), SpreeError> {
	if twilight_validate::channel::name(channel_name).is_err() {
		return Err(ValidationError::InvalidChannelName(channel_name.to_string()).into());
	}
	let target_guild_ids = parse_server_ids(servers, origin.guild_id)?;
	let prepared = prepare_targets(
		context.platform.as_ref(),
		context.setup_store.as_ref(),
		origin.guild_id,
		&target_guild_ids,
	)
	.await?;

	// Waits are registered before the prompt goes out so a quick reply can't slip past them.
	let ad_wait = context
		.reply_waiters
		.register(origin.channel_id, origin.user_id, ReplyFilter::Any);
	follow_up(
		interaction_client,
		origin.interaction_token,
		&ad_prompt_message(context.settings.ad_prompt_timeout),
		&[],
	)
	.await?;
	let Some(ad_message) = ad_wait.wait(context.settings.ad_prompt_timeout).await else {
		return Err(ValidationError::AdNotProvided.into());
	};

	if let Some(violation) = context.moderator.moderate(&ad_message) {
		tracing::info!(
			user = %origin.user_id,
			reason = violation.reason(),
			matched_term = violation.matched_term(),
			"Ad rejected by moderation"
		);
		return Err(ValidationError::Moderation(violation).into());
	}

	let confirmation_wait = context
		.reply_waiters
		.register(origin.channel_id, origin.user_id, ReplyFilter::Any);
	follow_up(
		interaction_client,
		origin.interaction_token,
		&format!("**Ad Message:**\n{}", ad_message),
		&[requester_confirmation_embed()],
	)
	.await?;
	let confirmed = confirmation_wait
		.wait(context.settings.requester_confirmation_timeout)
		.await
		.and_then(|reply| parse_yes_no(&reply))
		.unwrap_or(false);
	if !confirmed {
		return Err(ValidationError::RequesterDeclined.into());
	}

	let requester = Requester {
		user_id: origin.user_id,
		guild_id: origin.guild_id,
		channel_id: origin.channel_id,
		member_count: prepared.requester_member_count,
		interaction_token: origin.interaction_token.to_string(),
	};
	let job = BroadcastJob::new(
		requester,
		channel_name.to_string(),
		ad_message,
		target_guild_ids,
		prepared.total_member_count,
		prepared.setups,
	);
	tracing::info!(job = %job.id, user = %origin.user_id, targets = job.target_guild_ids.len(), "Queueing ad");

	follow_up(interaction_client, origin.interaction_token, AD_QUEUED, &[]).await?;
	// The drain task runs on its own; its outcome reaches the requester through reports.
	let _ = context.broadcast_queue.enqueue(job);
	Ok(())
}

async fn follow_up(
	interaction_client: &InteractionClient<'_>,
	interaction_token: &str,
	content: &str,
	embeds: &[Embed],
) -> Result<(), SpreeError> {
	interaction_client
		.create_followup(interaction_token)
		.content(content)
		.embeds(embeds)
		.allowed_mentions(Some(&AllowedMentions::default()))
		.flags(MessageFlags::EPHEMERAL)
		.await
		.map_err(|error| SpreeError::infrastructure("replying to the command", error))?;
	Ok(())
}
