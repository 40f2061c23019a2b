// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::commands::{command_definitions, route_command};
use super::context::BotContext;
use super::cooldowns::CommandCooldowns;
use super::incoming_messages::handle_message;
use super::platform::DiscordPlatform;
use crate::broadcast::moderation::{ContentModerator, load_blocked_words};
use crate::broadcast::platform::BroadcastPlatform;
use crate::broadcast::queue::BroadcastQueue;
use crate::broadcast::replies::ReplyWaiters;
use crate::config::ConfigData;
use crate::database::{DbPool, PgSetupStore};
use miette::IntoDiagnostic;
use std::sync::Arc;
use twilight_cache_inmemory::{DefaultInMemoryCache, ResourceType};
use twilight_gateway::{EventTypeFlags, Intents, Shard, ShardId, StreamExt};
use twilight_http::client::Client;
use twilight_model::application::interaction::InteractionData;
use twilight_model::gateway::event::Event;

pub fn set_up_client(config: &ConfigData) -> Arc<Client> {
	Arc::new(Client::new(config.discord.bot_token.clone()))
}

pub async fn run_bot(db_connection_pool: DbPool, config: Arc<ConfigData>, http_client: Arc<Client>) -> miette::Result<()> {
	let intents = Intents::GUILDS
		| Intents::GUILD_MEMBERS
		| Intents::GUILD_MESSAGES
		| Intents::DIRECT_MESSAGES
		| Intents::MESSAGE_CONTENT;

	let mut shard = Shard::new(ShardId::ONE, config.discord.bot_token.clone(), intents);

	let cache = Arc::new(
		DefaultInMemoryCache::builder()
			.resource_types(ResourceType::GUILD)
			.build(),
	);

	let application_id = {
		let application_response = http_client.current_user_application().await.into_diagnostic()?;
		application_response.model().await.into_diagnostic()?.id
	};

	{
		let interaction_client = http_client.interaction(application_id);
		let commands = command_definitions();
		interaction_client
			.set_global_commands(&commands)
			.await
			.into_diagnostic()?;
	}

	let blocked_words = match &config.spree.blocked_words_file {
		Some(path) => load_blocked_words(path).await?,
		None => Vec::new(),
	};
	let moderator = ContentModerator::new(&blocked_words, &config.spree.invite_domain).into_diagnostic()?;
	tracing::info!(blocked_words = blocked_words.len(), "Loaded content moderation rules");

	let reply_waiters = ReplyWaiters::default();
	let platform = Arc::new(DiscordPlatform::new(
		Arc::clone(&http_client),
		application_id,
		Arc::clone(&cache),
		reply_waiters.clone(),
	));
	let queue_platform: Arc<dyn BroadcastPlatform> = platform.clone();
	let broadcast_queue = Arc::new(BroadcastQueue::new(
		queue_platform,
		config.spree.owner_confirmation_timeout,
	));

	let context = Arc::new(BotContext {
		http_client: Arc::clone(&http_client),
		application_id,
		platform,
		setup_store: Arc::new(PgSetupStore::new(db_connection_pool)),
		broadcast_queue,
		reply_waiters,
		moderator,
		cooldowns: CommandCooldowns::new(config.spree.command_cooldown),
		settings: config.spree.clone(),
	});

	while let Some(event) = shard.next_event(EventTypeFlags::all()).await {
		let event = match event {
			Ok(event) => event,
			Err(error) => {
				tracing::warn!(source = ?error, "error receiving event");
				continue;
			}
		};
		cache.update(&event);

		tokio::spawn(handle_event(event, Arc::clone(&context)));
	}

	Ok(())
}

async fn handle_event(event: Event, context: Arc<BotContext>) {
	let event_result = handle_event_route(event, &context).await;
	if let Err(error) = event_result {
		tracing::error!(source = ?error, "An error occurred handling a gateway event");
	}
}

async fn handle_event_route(event: Event, context: &Arc<BotContext>) -> miette::Result<()> {
	tracing::debug!("Incoming gateway message: {:?}", event);
	match event {
		Event::InteractionCreate(interaction) => {
			if let Some(InteractionData::ApplicationCommand(command_data)) = &interaction.data {
				route_command(&interaction, command_data, context).await?;
			}
		}
		Event::MessageCreate(message) => handle_message(&message, &context.reply_waiters),
		Event::Ready(_) => {
			tracing::info!("Discord gateway is ready");
		}
		_ => (),
	}
	Ok(())
}
