// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::utils::embeds::{owner_confirmation_embed, report_parts};
use super::utils::permissions::{ad_category_permissions, channel_permissions};
use crate::broadcast::error::{BoxedError, SpreeError};
use crate::broadcast::job::Requester;
use crate::broadcast::platform::{BroadcastPlatform, CategoryAccess, ConfirmationRequest, GuildSummary, OwnerReply, Report};
use crate::broadcast::replies::{ReplyFilter, ReplyWaiters, parse_yes_no};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use twilight_cache_inmemory::DefaultInMemoryCache;
use twilight_http::client::{Client, InteractionClient};
use twilight_http::request::application::interaction::CreateFollowup;
use twilight_http::request::channel::message::CreateMessage;
use twilight_http::error::{Error as HttpError, ErrorType};
use twilight_http::response::StatusCode;
use twilight_mention::fmt::Mention;
use twilight_model::channel::message::{AllowedMentions, Embed, MessageFlags};
use twilight_model::channel::{Channel, ChannelType};
use twilight_model::id::Id;
use twilight_model::id::marker::{ApplicationMarker, ChannelMarker, GuildMarker, RoleMarker, UserMarker};

/// The broadcast workflow's view of Discord.
pub struct DiscordPlatform {
	http_client: Arc<Client>,
	application_id: Id<ApplicationMarker>,
	cache: Arc<DefaultInMemoryCache>,
	reply_waiters: ReplyWaiters,
}

impl DiscordPlatform {
	pub fn new(
		http_client: Arc<Client>,
		application_id: Id<ApplicationMarker>,
		cache: Arc<DefaultInMemoryCache>,
		reply_waiters: ReplyWaiters,
	) -> Self {
		Self {
			http_client,
			application_id,
			cache,
			reply_waiters,
		}
	}

	async fn direct_message_channel(&self, user_id: Id<UserMarker>) -> Result<Id<ChannelMarker>, SpreeError> {
		let channel = self
			.http_client
			.create_private_channel(user_id)
			.await
			.map_err(|error| SpreeError::infrastructure("opening a direct message", error))?
			.model()
			.await
			.map_err(|error| SpreeError::infrastructure("opening a direct message", error))?;
		Ok(channel.id)
	}

	/// Gets a channel, treating channels the bot can't see as missing.
	async fn visible_channel(&self, channel_id: Id<ChannelMarker>) -> Result<Option<Channel>, SpreeError> {
		match self.http_client.channel(channel_id).await {
			Ok(response) => {
				let channel = response
					.model()
					.await
					.map_err(|error| SpreeError::infrastructure("loading a channel", error))?;
				Ok(Some(channel))
			}
			Err(error) if is_missing_or_forbidden(&error) => Ok(None),
			Err(error) => Err(SpreeError::infrastructure("loading a channel", error)),
		}
	}
}

fn is_missing_or_forbidden(error: &HttpError) -> bool {
	match error.kind() {
		ErrorType::Response { status, .. } => *status == StatusCode::NOT_FOUND || *status == StatusCode::FORBIDDEN,
		_ => false,
	}
}

#[async_trait]
impl BroadcastPlatform for DiscordPlatform {
	async fn guild_summary(&self, guild_id: Id<GuildMarker>) -> Result<Option<GuildSummary>, SpreeError> {
		if let Some(guild) = self.cache.guild(guild_id) {
			if let Some(member_count) = guild.member_count() {
				return Ok(Some(GuildSummary {
					guild_id,
					name: guild.name().to_string(),
					member_count,
					owner_id: Some(guild.owner_id()),
				}));
			}
		}

		let guild = match self.http_client.guild(guild_id).with_counts(true).await {
			Ok(response) => response
				.model()
				.await
				.map_err(|error| SpreeError::infrastructure("loading a server", error))?,
			Err(error) if is_missing_or_forbidden(&error) => return Ok(None),
			Err(error) => return Err(SpreeError::infrastructure("loading a server", error)),
		};
		Ok(Some(GuildSummary {
			guild_id,
			name: guild.name,
			member_count: guild.approximate_member_count.or(guild.member_count).unwrap_or(0),
			owner_id: Some(guild.owner_id),
		}))
	}

	async fn request_confirmation(
		&self,
		request: &ConfirmationRequest,
		limit: Duration,
	) -> Result<OwnerReply, SpreeError> {
		let channel_id = self.direct_message_channel(request.owner_id).await?;

		// Registered before sending so a quick answer isn't missed
		let reply_wait = self
			.reply_waiters
			.register(channel_id, request.owner_id, ReplyFilter::YesNo);

		let embed = owner_confirmation_embed(request);
		self.http_client
			.create_message(channel_id)
			.embeds(&[embed])
			.allowed_mentions(Some(&AllowedMentions::default()))
			.await
			.map_err(|error| SpreeError::infrastructure("asking a server owner for confirmation", error))?;

		let reply = reply_wait.wait(limit).await;
		Ok(match reply.as_deref().and_then(parse_yes_no) {
			Some(true) => OwnerReply::Approved,
			Some(false) => OwnerReply::Declined,
			None => OwnerReply::NoReply,
		})
	}

	async fn category_access(
		&self,
		guild_id: Id<GuildMarker>,
		category_id: Id<ChannelMarker>,
	) -> Result<CategoryAccess, SpreeError> {
		let Some(category) = self.visible_channel(category_id).await? else {
			return Ok(CategoryAccess::Missing);
		};
		if category.kind != ChannelType::GuildCategory || category.guild_id != Some(guild_id) {
			return Ok(CategoryAccess::Missing);
		}

		let permissions = channel_permissions(guild_id, &category, &self.http_client).await?;
		if permissions.contains(ad_category_permissions()) {
			Ok(CategoryAccess::Ready)
		} else {
			Ok(CategoryAccess::MissingPermission)
		}
	}

	async fn missing_roles(
		&self,
		guild_id: Id<GuildMarker>,
		role_ids: &[Id<RoleMarker>],
	) -> Result<Vec<Id<RoleMarker>>, SpreeError> {
		let roles = self
			.http_client
			.roles(guild_id)
			.await
			.map_err(|error| SpreeError::infrastructure("loading server roles", error))?
			.models()
			.await
			.map_err(|error| SpreeError::infrastructure("loading server roles", error))?;
		let existing: HashSet<Id<RoleMarker>> = roles.iter().map(|role| role.id).collect();
		Ok(role_ids
			.iter()
			.copied()
			.filter(|role_id| !existing.contains(role_id))
			.collect())
	}

	async fn create_text_channel(
		&self,
		guild_id: Id<GuildMarker>,
		category_id: Id<ChannelMarker>,
		name: &str,
	) -> Result<Id<ChannelMarker>, BoxedError> {
		let channel = self
			.http_client
			.create_guild_channel(guild_id, name)
			.kind(ChannelType::GuildText)
			.parent_id(category_id)
			.await?
			.model()
			.await?;
		Ok(channel.id)
	}

	async fn post_ad(
		&self,
		channel_id: Id<ChannelMarker>,
		role_id: Id<RoleMarker>,
		ad_message: &str,
	) -> Result<(), BoxedError> {
		let content = format!("{} {}", role_id.mention(), ad_message);
		let mut allowed_mentions = AllowedMentions::default();
		allowed_mentions.roles.push(role_id);
		self.http_client
			.create_message(channel_id)
			.content(&content)
			.allowed_mentions(Some(&allowed_mentions))
			.await?;
		Ok(())
	}

	async fn report(&self, requester: &Requester, report: &Report) -> Result<(), SpreeError> {
		let (content, embed) = report_parts(report);
		let embeds: Vec<Embed> = embed.into_iter().collect();
		let no_mentions = AllowedMentions::default();
		let interaction_client = self.http_client.interaction(self.application_id);
		report_followup(
			&interaction_client,
			&requester.interaction_token,
			content.as_deref(),
			&embeds,
			&no_mentions,
		)
		.await
		.map_err(|error| SpreeError::infrastructure("reporting to the requester", error))?;
		Ok(())
	}

	async fn notify_directly(&self, requester: &Requester, report: &Report) -> Result<(), SpreeError> {
		let channel_id = self.direct_message_channel(requester.user_id).await?;
		let (content, embed) = report_parts(report);
		let embeds: Vec<Embed> = embed.into_iter().collect();
		let no_mentions = AllowedMentions::default();
		report_message(&self.http_client, channel_id, content.as_deref(), &embeds, &no_mentions)
			.await
			.map_err(|error| SpreeError::infrastructure("messaging the requester", error))?;
		Ok(())
	}
}

/// Builds the ephemeral follow-up carrying a report to the requester.
fn report_followup<'a>(
	interaction_client: &'a InteractionClient<'_>,
	interaction_token: &'a str,
	content: Option<&'a str>,
	embeds: &'a [Embed],
	no_mentions: &'a AllowedMentions,
) -> CreateFollowup<'a> {
	let mut followup = interaction_client
		.create_followup(interaction_token)
		.embeds(embeds)
		.allowed_mentions(Some(no_mentions))
		.flags(MessageFlags::EPHEMERAL);
	if let Some(content) = content {
		followup = followup.content(content);
	}
	followup
}

/// Builds the direct message carrying a report to the requester.
fn report_message<'a>(
	http_client: &'a Client,
	channel_id: Id<ChannelMarker>,
	content: Option<&'a str>,
	embeds: &'a [Embed],
	no_mentions: &'a AllowedMentions,
) -> CreateMessage<'a> {
	let mut message = http_client
		.create_message(channel_id)
		.embeds(embeds)
		.allowed_mentions(Some(no_mentions));
	if let Some(content) = content {
		message = message.content(content);
	}
	message
}
