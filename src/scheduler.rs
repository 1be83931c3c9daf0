//! Command scheduler.
//!
//! Holds up to [`MAX_ENTRIES`] triggers of two kinds and yields at most one
//! due command per query:
//!
//! ```text
//!  RelativeOnce   fires once when uptime reaches `due_at_ms`, then frees its slot
//!  DailyWallClock fires once per local date at hh:mm:ss on the days in its mask
//! ```
//!
//! When a relative and a daily entry are both due, the relative one wins
//! the call and the daily one stays due for the next call.

use log::info;
use serde::{Deserialize, Serialize};

use crate::clock::{WallClockSnapshot, deadline_reached};
use crate::error::ScheduleError;
use crate::ir::command::Command;

// ═══════════════════════════════════════════════════════════════
//  Schedule types
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrent entries (stack-allocated).
pub const MAX_ENTRIES: usize = 16;

const SECONDS_PER_DAY: u32 = 24 * 3600;
/// Furthest day offset searched by the lookahead (same weekday next week).
const LOOKAHEAD_DAYS: u32 = 7;

/// Set of weekdays; bit `i` is weekday `i`, 0 = Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayMask(pub u8);

impl WeekdayMask {
    pub const ALL: Self = Self(0x7F);
    /// Monday to Friday.
    pub const WEEKDAYS: Self = Self(0x3E);
    /// Saturday and Sunday.
    pub const WEEKEND: Self = Self(0x41);

    pub const fn contains(self, weekday: u8) -> bool {
        weekday < 7 && self.0 & (1 << weekday) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 & 0x7F == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleEntry {
    /// One-shot at an absolute uptime.
    RelativeOnce { due_at_ms: u32, command: Command },
    /// Recurring at a local time of day.
    DailyWallClock {
        hour: u8,
        minute: u8,
        second: u8,
        weekdays: WeekdayMask,
        command: Command,
        /// Date key of the last firing, 0 if never fired.
        last_fired_date_key: u32,
    },
}

impl ScheduleEntry {
    pub const fn command(&self) -> Command {
        match self {
            Self::RelativeOnce { command, .. } | Self::DailyWallClock { command, .. } => *command,
        }
    }
}

/// An entry as written in configuration, registered at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleSpec {
    /// One-shot, `delay_ms` after registration.
    AfterBoot { delay_ms: u32, command: Command },
    Daily {
        hour: u8,
        minute: u8,
        second: u8,
        weekdays: WeekdayMask,
        command: Command,
    },
}

impl ScheduleSpec {
    /// The checks `add_spec` applies, short of a full table.
    pub fn check(&self) -> Result<(), ScheduleError> {
        match *self {
            Self::AfterBoot { command, .. } => check_command(command),
            Self::Daily {
                hour,
                minute,
                second,
                weekdays,
                command,
            } => check_daily(hour, minute, second, weekdays, command),
        }
    }
}

fn check_command(command: Command) -> Result<(), ScheduleError> {
    if command == Command::None {
        return Err(ScheduleError::NoCommand);
    }
    Ok(())
}

fn check_daily(hour: u8, minute: u8, second: u8, weekdays: WeekdayMask, command: Command) -> Result<(), ScheduleError> {
    if hour >= 24 || minute >= 60 || second >= 60 {
        return Err(ScheduleError::InvalidTime);
    }
    if weekdays.is_empty() {
        return Err(ScheduleError::EmptyWeekdayMask);
    }
    check_command(command)
}

/// Result of the read-only lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedCommand {
    pub command: Command,
    /// Seconds until due; 0 if already due.
    pub due_in_secs: u32,
    /// Planned from a daily wall-clock entry.
    pub uses_wall_clock: bool,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

pub struct CommandScheduler {
    entries: [Option<ScheduleEntry>; MAX_ENTRIES],
    /// Global enable flag.
    enabled: bool,
}

impl Default for CommandScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandScheduler {
    pub const fn new() -> Self {
        Self {
            entries: [None; MAX_ENTRIES],
            enabled: true,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        info!("Scheduler {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Add a one-shot entry due at uptime `at_ms`. Returns the slot index.
    pub fn add_entry(&mut self, at_ms: u32, command: Command) -> Result<usize, ScheduleError> {
        check_command(command)?;
        let slot = self.insert(ScheduleEntry::RelativeOnce { due_at_ms: at_ms, command })?;
        info!("Schedule[{}]: {} at +{}ms", slot, command, at_ms);
        Ok(slot)
    }

    /// Add a daily entry at `hour:minute:second` local time on `weekdays`.
    pub fn add_daily_entry(
        &mut self,
        hour: u8,
        minute: u8,
        second: u8,
        command: Command,
        weekdays: WeekdayMask,
    ) -> Result<usize, ScheduleError> {
        check_daily(hour, minute, second, weekdays, command)?;
        let slot = self.insert(ScheduleEntry::DailyWallClock {
            hour,
            minute,
            second,
            weekdays,
            command,
            last_fired_date_key: 0,
        })?;
        info!(
            "Schedule[{}]: {} daily at {:02}:{:02}:{:02} (days=0b{:07b})",
            slot, command, hour, minute, second, weekdays.0
        );
        Ok(slot)
    }

    /// Register a configured entry; relative delays count from `now_ms`.
    pub fn add_spec(&mut self, spec: ScheduleSpec, now_ms: u32) -> Result<usize, ScheduleError> {
        match spec {
            ScheduleSpec::AfterBoot { delay_ms, command } => self.add_entry(now_ms.wrapping_add(delay_ms), command),
            ScheduleSpec::Daily {
                hour,
                minute,
                second,
                weekdays,
                command,
            } => self.add_daily_entry(hour, minute, second, command, weekdays),
        }
    }

    /// Deactivate the entry in `slot`.
    pub fn remove(&mut self, slot: usize) -> Option<ScheduleEntry> {
        self.entries.get_mut(slot).and_then(Option::take)
    }

    pub fn clear(&mut self) {
        self.entries = [None; MAX_ENTRIES];
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn entries(&self) -> impl Iterator<Item = (usize, &ScheduleEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i, e)))
    }

    fn insert(&mut self, entry: ScheduleEntry) -> Result<usize, ScheduleError> {
        let slot = self
            .entries
            .iter()
            .position(Option::is_none)
            .ok_or(ScheduleError::TableFull)?;
        self.entries[slot] = Some(entry);
        Ok(slot)
    }

    // ── Firing ────────────────────────────────────────────────

    /// Return and consume the command that is due now, if any.
    ///
    /// A fired relative entry frees its slot; a fired daily entry records
    /// today's date key and re-arms for the next permitted day. A disabled
    /// scheduler yields nothing and keeps its entries.
    pub fn next_due_command(&mut self, now_ms: u32, wall: &WallClockSnapshot) -> Option<Command> {
        if !self.enabled {
            return None;
        }
        if let Some(slot) = self.most_overdue_relative(now_ms) {
            return self.entries[slot].take().map(|e| e.command());
        }

        let slot = self.earliest_due_daily(wall)?;
        match &mut self.entries[slot] {
            Some(ScheduleEntry::DailyWallClock { last_fired_date_key, command, .. }) => {
                *last_fired_date_key = wall.date_key;
                Some(*command)
            }
            _ => None,
        }
    }

    fn most_overdue_relative(&self, now_ms: u32) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e {
                Some(ScheduleEntry::RelativeOnce { due_at_ms, .. }) if deadline_reached(*due_at_ms, now_ms) => {
                    Some((i, now_ms.wrapping_sub(*due_at_ms)))
                }
                _ => None,
            })
            // Largest lateness is the earliest due time; first slot wins ties.
            .fold(None, |best: Option<(usize, u32)>, (i, late)| match best {
                Some((_, best_late)) if best_late >= late => best,
                _ => Some((i, late)),
            })
            .map(|(i, _)| i)
    }

    fn earliest_due_daily(&self, wall: &WallClockSnapshot) -> Option<usize> {
        if !wall.is_usable() {
            return None;
        }
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e {
                Some(ScheduleEntry::DailyWallClock {
                    hour,
                    minute,
                    second,
                    weekdays,
                    last_fired_date_key,
                    ..
                }) => {
                    let target = seconds_of_day(*hour, *minute, *second);
                    let due = weekdays.contains(wall.weekday)
                        && wall.seconds_of_day >= target
                        && *last_fired_date_key != wall.date_key;
                    due.then_some((i, target))
                }
                _ => None,
            })
            .min_by_key(|&(i, target)| (target, i))
            .map(|(i, _)| i)
    }

    // ── Lookahead ─────────────────────────────────────────────

    /// The soonest entry across both kinds, without firing anything.
    ///
    /// Relative entries win ties, matching [`next_due_command`](Self::next_due_command).
    pub fn next_planned_command(&self, now_ms: u32, wall: &WallClockSnapshot) -> Option<PlannedCommand> {
        let mut best: Option<PlannedCommand> = None;

        for entry in self.entries.iter().flatten() {
            let candidate = match *entry {
                ScheduleEntry::RelativeOnce { due_at_ms, command } => {
                    let due_in_ms = if deadline_reached(due_at_ms, now_ms) {
                        0
                    } else {
                        due_at_ms.wrapping_sub(now_ms)
                    };
                    Some(PlannedCommand {
                        command,
                        due_in_secs: due_in_ms / 1000,
                        uses_wall_clock: false,
                    })
                }
                ScheduleEntry::DailyWallClock {
                    hour,
                    minute,
                    second,
                    weekdays,
                    command,
                    last_fired_date_key,
                } => daily_due_in_secs(wall, seconds_of_day(hour, minute, second), weekdays, last_fired_date_key)
                    .map(|due_in_secs| PlannedCommand {
                        command,
                        due_in_secs,
                        uses_wall_clock: true,
                    }),
            };

            if let Some(c) = candidate {
                let better = match best {
                    None => true,
                    Some(b) => {
                        c.due_in_secs < b.due_in_secs
                            || (c.due_in_secs == b.due_in_secs && b.uses_wall_clock && !c.uses_wall_clock)
                    }
                };
                if better {
                    best = Some(c);
                }
            }
        }
        best
    }
}

const fn seconds_of_day(hour: u8, minute: u8, second: u8) -> u32 {
    hour as u32 * 3600 + minute as u32 * 60 + second as u32
}

/// Seconds from `wall` until the next permitted firing of a daily entry.
fn daily_due_in_secs(wall: &WallClockSnapshot, target: u32, weekdays: WeekdayMask, last_fired: u32) -> Option<u32> {
    if !wall.is_usable() {
        return None;
    }
    (0..=LOOKAHEAD_DAYS).find_map(|offset| {
        let weekday = ((u32::from(wall.weekday) + offset) % 7) as u8;
        if !weekdays.contains(weekday) {
            return None;
        }
        if offset == 0 {
            if last_fired == wall.date_key {
                return None;
            }
            return Some(target.saturating_sub(wall.seconds_of_day));
        }
        Some(offset * SECONDS_PER_DAY + target - wall.seconds_of_day)
    })
}
