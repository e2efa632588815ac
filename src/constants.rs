/// Spaced-repetition review intervals in days, indexed by mastery level.
pub const SRS_INTERVAL_DAYS: [i64; 6] = [1, 3, 7, 14, 30, 90];

/// Cumulative XP required to reach each level (level = index + 1).
pub const XP_LEVEL_THRESHOLDS: [i64; 10] =
    [0, 100, 300, 600, 1000, 1500, 2100, 2800, 3600, 4500];

/// Ranks per league division.
pub const RANKS_PER_DIVISION: i64 = 5;

/// Divisions per league.
pub const DIVISIONS_PER_LEAGUE: i64 = 3;

/// XP awarded for a correct practice attempt.
pub const XP_CORRECT_ATTEMPT: i64 = 10;

/// XP awarded for an incorrect practice attempt.
pub const XP_INCORRECT_ATTEMPT: i64 = 1;

/// Gems granted per XP level reached on level-up.
pub const GEMS_PER_LEVEL: u64 = 5;

/// Default daily words goal for newly created user progress documents.
pub const DEFAULT_DAILY_GOAL: u32 = 20;

/// Upper bound on lesson completion percent.
pub const MAX_LESSON_PERCENT: u8 = 100;
