// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

pub const COMMAND_FAILED: &str = "An error occurred while executing this command.";

pub const AD_QUEUED: &str = "Your ad has been queued. The owners of the servers you picked will be asked to approve it, and you'll be sent the results.";

pub fn ad_prompt_message(limit: Duration) -> String {
	format!("Please send your ad in one message within {} seconds.", limit.as_secs())
}
