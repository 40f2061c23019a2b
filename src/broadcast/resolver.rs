// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::bracket::Bracket;
use super::setup::RoleRange;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use twilight_model::id::Id;
use twilight_model::id::marker::RoleMarker;

/// A role selected for tiering, with its live member count.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoleCandidate {
	pub role_id: Id<RoleMarker>,
	pub member_count: u64,
}

#[derive(Debug, Default, Eq, PartialEq)]
pub struct ResolvedRoles {
	pub ranges: BTreeMap<Bracket, RoleRange>,
	/// Roles that lost their bracket to another role, in the order they were dropped.
	pub excluded: Vec<Id<RoleMarker>>,
}

/// Assigns at most one role to each bracket.
///
/// Candidates are ordered by role ID before anything else, so the result doesn't depend on the order the caller
/// collected them in. Within a bracket, a role only replaces the one already assigned if it has strictly more
/// members; on a tie the role with the lower ID stays. Every role that isn't kept is listed as excluded.
pub fn resolve_role_ranges(candidates: &[RoleCandidate]) -> ResolvedRoles {
	let mut ordered = candidates.to_vec();
	ordered.sort_by_key(|candidate| candidate.role_id);
	ordered.dedup_by_key(|candidate| candidate.role_id);

	let mut resolved = ResolvedRoles::default();
	for candidate in ordered {
		let new_range = RoleRange {
			role_id: candidate.role_id,
			member_count: candidate.member_count,
		};
		match resolved.ranges.entry(Bracket::classify(candidate.member_count)) {
			Entry::Vacant(entry) => {
				entry.insert(new_range);
			}
			Entry::Occupied(mut entry) => {
				if entry.get().member_count < candidate.member_count {
					let replaced = entry.insert(new_range);
					resolved.excluded.push(replaced.role_id);
				} else {
					resolved.excluded.push(candidate.role_id);
				}
			}
		}
	}
	resolved
}
