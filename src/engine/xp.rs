use chrono::{DateTime, Utc};

use crate::constants::{DIVISIONS_PER_LEAGUE, RANKS_PER_DIVISION, XP_LEVEL_THRESHOLDS};
use crate::engine::ProgressEngine;
use crate::store::operations::progress::{League, LeagueState, XpState};
use crate::store::StoreError;

/// League ladder in ascending order with the XP cost of one sub-rank.
const LEAGUE_TABLE: [(League, i64); 6] = [
    (League::Bronze, 50),
    (League::Silver, 75),
    (League::Gold, 100),
    (League::Sapphire, 150),
    (League::Ruby, 200),
    (League::Emerald, 250),
];

#[derive(Debug, Clone)]
pub struct XpOutcome {
    pub xp: XpState,
    pub league: LeagueState,
    pub leveled_up: bool,
}

/// Level is a step function of cumulative XP over the fixed threshold table.
pub fn xp_state_for(total: i64) -> XpState {
    let mut level = 1u32;
    for (index, threshold) in XP_LEVEL_THRESHOLDS.iter().enumerate() {
        if total >= *threshold {
            level = (index + 1) as u32;
        } else {
            break;
        }
    }

    let next_level_at = XP_LEVEL_THRESHOLDS
        .get(level as usize)
        .copied()
        .unwrap_or(XP_LEVEL_THRESHOLDS[XP_LEVEL_THRESHOLDS.len() - 1]);

    XpState {
        current: total,
        level,
        next_level_at,
    }
}

/// Walks the ladder consuming whole leagues until the remaining XP fits within
/// one, then derives rank and division from the sub-ranks consumed inside it.
/// XP past the top of emerald saturates at emerald rank 5, division 3.
pub fn league_state_for(total: i64) -> LeagueState {
    let ranks_per_league = RANKS_PER_DIVISION * DIVISIONS_PER_LEAGUE;
    let mut remaining = total.max(0);

    let last = LEAGUE_TABLE.len() - 1;
    let mut current = LEAGUE_TABLE[last];
    for (name, xp_per_rank) in &LEAGUE_TABLE[..last] {
        let league_capacity = ranks_per_league * xp_per_rank;
        if remaining >= league_capacity {
            remaining -= league_capacity;
            continue;
        }
        current = (*name, *xp_per_rank);
        break;
    }

    let (name, xp_per_rank) = current;
    let ranks_consumed = (remaining / xp_per_rank).min(ranks_per_league - 1);
    LeagueState {
        name,
        rank: (ranks_consumed % RANKS_PER_DIVISION + 1) as u32,
        division: (ranks_consumed / RANKS_PER_DIVISION + 1) as u32,
        xp: remaining,
        next_rank_at: xp_per_rank,
    }
}

impl ProgressEngine {
    /// Credits XP and recomputes level and league standing from the new
    /// cumulative total. XP is additive only; a negative amount is rejected
    /// before any write.
    pub fn add_xp(
        &self,
        user_id: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<XpOutcome, StoreError> {
        if amount < 0 {
            return Err(StoreError::Validation(format!(
                "XP amount must be non-negative, got {amount}"
            )));
        }

        let init = self.initial_progress(user_id, now);
        let previous_level = self.store().get_or_init_user_progress(user_id, &init)?.xp.level;

        let updated = self.store().update_user_progress(user_id, &init, |p| {
            let total = p.xp.current + amount;
            p.xp = xp_state_for(total);
            p.league = league_state_for(total);
        })?;

        let leveled_up = updated.xp.level > previous_level;
        if leveled_up {
            tracing::info!(
                user_id,
                level = updated.xp.level,
                xp = updated.xp.current,
                "User leveled up"
            );
        }

        Ok(XpOutcome {
            xp: updated.xp,
            league: updated.league,
            leveled_up,
        })
    }
}
