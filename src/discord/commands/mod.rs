// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::context::BotContext;
use super::cooldowns::cooldown_message;
use super::utils::responses::COMMAND_FAILED;
use miette::{IntoDiagnostic, bail};
use std::sync::Arc;
use twilight_model::application::command::Command;
use twilight_model::application::interaction::application_command::{
	CommandData, CommandDataOption, CommandOptionValue,
};
use twilight_model::channel::message::MessageFlags;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_util::builder::InteractionResponseDataBuilder;

mod broadcast;
mod setup;

pub fn command_definitions() -> Vec<Command> {
	vec![broadcast::command_definition(), setup::command_definition()]
}

pub async fn route_command(
	interaction: &InteractionCreate,
	command_data: &CommandData,
	context: &Arc<BotContext>,
) -> miette::Result<()> {
	let Some(user_id) = interaction.author_id() else {
		bail!("Command received without a user: {:?}", command_data);
	};

	if let Err(remaining) = context.cooldowns.check(&command_data.name, user_id) {
		let response = InteractionResponseDataBuilder::new()
			.content(cooldown_message(&command_data.name, remaining))
			.flags(MessageFlags::EPHEMERAL)
			.build();
		let response = InteractionResponse {
			kind: InteractionResponseType::ChannelMessageWithSource,
			data: Some(response),
		};
		context
			.http_client
			.interaction(context.application_id)
			.create_response(interaction.id, &interaction.token, &response)
			.await
			.into_diagnostic()?;
		return Ok(());
	}

	let Some(response) = deferred_response(&command_data.name) else {
		bail!("Unknown command encountered: {}\n{:?}", command_data.name, command_data);
	};
	let interaction_client = context.http_client.interaction(context.application_id);
	interaction_client
		.create_response(interaction.id, &interaction.token, &response)
		.await
		.into_diagnostic()?;

	let result = match command_data.name.as_str() {
		"broadcast" => broadcast::handle_command(interaction, command_data, context).await,
		_ => setup::handle_command(interaction, command_data, context).await,
	};

	if result.is_err() {
		let followup_result = interaction_client
			.create_followup(&interaction.token)
			.content(COMMAND_FAILED)
			.flags(MessageFlags::EPHEMERAL)
			.await;
		if let Err(error) = followup_result {
			tracing::warn!(source = ?error, command = %command_data.name, "Failed to tell the user their command failed");
		}
	}
	result
}

/// The acknowledgement sent for a command before its handler runs. Handlers answer with follow-ups only, so
/// anything they report (including failures) has an acknowledged interaction to attach to.
fn deferred_response(command_name: &str) -> Option<InteractionResponse> {
	let flags = match command_name {
		"broadcast" => Some(MessageFlags::EPHEMERAL),
		"setup" => None,
		_ => return None,
	};
	Some(InteractionResponse {
		kind: InteractionResponseType::DeferredChannelMessageWithSource,
		data: flags.map(|flags| InteractionResponseDataBuilder::new().flags(flags).build()),
	})
}

/// Finds a required string option by name.
fn string_option<'a>(options: &'a [CommandDataOption], name: &str) -> miette::Result<&'a str> {
	let Some(option) = options.iter().find(|option| option.name == name) else {
		bail!("Command received without required option {}", name);
	};
	let CommandOptionValue::String(value) = &option.value else {
		bail!("Command option {} wasn't a string", name);
	};
	Ok(value.as_str())
}
