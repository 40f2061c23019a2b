// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::broadcast::platform::{ConfirmationRequest, Report};
use crate::broadcast::setup::{ServerSetup, SetupKind};
use twilight_mention::fmt::Mention;
use twilight_model::channel::message::Embed;
use twilight_model::id::Id;
use twilight_model::id::marker::RoleMarker;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder};

const INFO_COLOR: u32 = 0x0099ff;

pub fn setup_result_embed(
	kind: SetupKind,
	category_name: &str,
	setup: &ServerSetup,
	excluded: &[Id<RoleMarker>],
) -> Embed {
	let chosen: Vec<String> = setup
		.role_ranges
		.iter()
		.map(|(bracket, range)| format!("{} ({})", range.role_id.mention(), bracket))
		.collect();
	let excluded = if excluded.is_empty() {
		String::from("None")
	} else {
		let excluded: Vec<String> = excluded.iter().map(|role_id| role_id.mention().to_string()).collect();
		excluded.join("\n")
	};

	EmbedBuilder::new()
		.color(INFO_COLOR)
		.title(format!("{} Server Setup Configuration", kind.label()))
		.description("||*If there is more than a role with same range, 1 is saved and rest are excluded*||")
		.field(EmbedFieldBuilder::new("Category Chosen", category_name))
		.field(EmbedFieldBuilder::new("Roles Chosen", chosen.join("\n")))
		.field(EmbedFieldBuilder::new("Roles Excluded", excluded))
		.build()
}

pub fn owner_confirmation_embed(request: &ConfirmationRequest) -> Embed {
	let server_list: Vec<String> = request
		.servers
		.iter()
		.map(|server| format!("**{}** (Member Count: {})", server.name, server.member_count))
		.collect();

	EmbedBuilder::new()
		.color(INFO_COLOR)
		.title("Ad Confirmation Required")
		.description(format!(
			"Do you approve the following ad message for your servers? Reply with **\"yes\"** or **\"no\"**.\n\n**Ad Message:**\n{}",
			request.ad_message
		))
		.field(EmbedFieldBuilder::new("Servers:", server_list.join("\n")))
		.field(EmbedFieldBuilder::new(
			"Total Member Count:",
			request.total_member_count.to_string(),
		))
		.build()
}

pub fn requester_confirmation_embed() -> Embed {
	EmbedBuilder::new()
		.color(INFO_COLOR)
		.title("Confirmation Required")
		.description("Are you sure you want to proceed with this ad message? Reply with **\"yes\"** or **\"no\"**.")
		.build()
}

/// Renders a report as either plain content or an embed.
pub fn report_parts(report: &Report) -> (Option<String>, Option<Embed>) {
	match report {
		Report::Notice(text) => (Some(text.clone()), None),
		Report::Results {
			channel_name,
			posted_count,
		} => {
			let embed = EmbedBuilder::new()
				.color(INFO_COLOR)
				.title("Ad Posting Results")
				.description(format!(
					"The channel '{}' has been posted to {} servers with your ad message.",
					channel_name, posted_count
				))
				.build();
			(None, Some(embed))
		}
	}
}
