// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

type CooldownKey = (String, Id<UserMarker>);

// Past this many tracked users, expired entries are dropped on the next check.
const SHRINK_THRESHOLD: usize = 4096;

/// Per-command, per-user cooldowns. Each user may use each command once per cooldown window.
pub struct CommandCooldowns {
	limiter: RateLimiter<CooldownKey, DefaultKeyedStateStore<CooldownKey>, DefaultClock>,
	clock: DefaultClock,
}

impl CommandCooldowns {
	pub fn new(cooldown: Duration) -> Self {
		let quota = Quota::with_period(cooldown)
			.unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
			.allow_burst(NonZeroU32::MIN);
		let clock = DefaultClock::default();
		Self {
			limiter: RateLimiter::new(quota, DefaultKeyedStateStore::default(), clock.clone()),
			clock,
		}
	}

	/// Records a use of the command by the user, or returns how much longer they have to wait if they used it too
	/// recently. A rejected use doesn't restart the window.
	pub fn check(&self, command: &str, user_id: Id<UserMarker>) -> Result<(), Duration> {
		if self.limiter.len() > SHRINK_THRESHOLD {
			self.limiter.retain_recent();
		}
		self.limiter
			.check_key(&(command.to_string(), user_id))
			.map_err(|not_until| not_until.wait_time_from(self.clock.now()))
	}
}

pub fn cooldown_message(command: &str, remaining: Duration) -> String {
	format!(
		"Please wait {:.1} more seconds before reusing the `{}` command.",
		remaining.as_secs_f64(),
		command
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn repeated_use_is_rejected_with_remaining_time() {
		let cooldowns = CommandCooldowns::new(Duration::from_secs(10));
		let user = Id::new(1);
		assert!(cooldowns.check("broadcast", user).is_ok());
		let remaining = cooldowns.check("broadcast", user).unwrap_err();
		assert!(remaining > Duration::ZERO);
		assert!(remaining <= Duration::from_secs(10));
	}

	#[test]
	fn cooldowns_are_per_user_and_command() {
		let cooldowns = CommandCooldowns::new(Duration::from_secs(10));
		assert!(cooldowns.check("broadcast", Id::new(1)).is_ok());
		assert!(cooldowns.check("broadcast", Id::new(2)).is_ok());
		assert!(cooldowns.check("setup", Id::new(1)).is_ok());
		assert!(cooldowns.check("setup", Id::new(1)).is_err());
	}

	#[test]
	fn message_shows_one_decimal() {
		assert_eq!(
			cooldown_message("setup", Duration::from_millis(4300)),
			"Please wait 4.3 more seconds before reusing the `setup` command."
		);
	}
}
