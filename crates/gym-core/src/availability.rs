//! Availability grid composition.
//!
//! [`compose`] merges occurrences (with their booked counts) and unavailable
//! blocks into a grid of fixed-length cells. It is a pure function of its
//! inputs: the caller reads a snapshot from the store and passes it in, so a
//! grid can never be stale relative to the rows it was built from.

use chrono::{Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::block::UnavailableBlock;
use crate::clock::GymTime;
use crate::error::{BookingError, Result};
use crate::ids::{BlockId, OccurrenceId, TemplateId, TrainerId};
use crate::occurrence::OccurrenceView;
use crate::template::SessionKind;

/// Days shown when a query does not say.
pub const DEFAULT_DAYS: u32 = 7;

/// Longest range a single query may cover.
pub const MAX_DAYS: u32 = 62;

/// Daily opening hours and cell length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    /// First cell start.
    pub open: NaiveTime,
    /// End of the last cell.
    pub close: NaiveTime,
    /// Cell length in minutes.
    pub slot_minutes: u32,
}

impl GridShape {
    /// Create a validated grid shape.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidInput` when `close` is not after `open`
    /// or the slot length is zero or longer than the opening hours.
    pub fn new(open: NaiveTime, close: NaiveTime, slot_minutes: u32) -> Result<Self> {
        if close <= open {
            return Err(BookingError::InvalidInput(
                "grid close must be after open".into(),
            ));
        }
        let span = (close - open).num_minutes();
        if slot_minutes == 0 || i64::from(slot_minutes) > span {
            return Err(BookingError::InvalidInput(format!(
                "slot length {slot_minutes} does not fit {span} opening minutes"
            )));
        }
        Ok(Self {
            open,
            close,
            slot_minutes,
        })
    }

    fn cells(&self, date: NaiveDate) -> impl Iterator<Item = (NaiveDateTime, NaiveDateTime)> {
        let close = date.and_time(self.close);
        let step = Duration::minutes(i64::from(self.slot_minutes));
        let mut cursor = date.and_time(self.open);
        std::iter::from_fn(move || {
            if cursor >= close {
                return None;
            }
            let start = cursor;
            let end = (start + step).min(close);
            cursor = end;
            Some((start, end))
        })
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 30,
        }
    }
}

/// Which rendering of the grid to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Labelled, for staff.
    Admin,
    /// Anonymised, for members.
    #[default]
    Member,
}

/// An availability request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    /// First day; defaults to gym-local today.
    pub from: Option<NaiveDate>,
    /// Number of days; defaults to [`DEFAULT_DAYS`].
    pub days: Option<u32>,
    /// Restrict to one trainer's occurrences and blocks.
    pub trainer: Option<TrainerId>,
    /// Rendering.
    #[serde(default)]
    pub view: View,
}

impl AvailabilityQuery {
    /// Resolve the half-open date range `[from, until)`.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidRange` for zero days or more than
    /// [`MAX_DAYS`].
    pub fn range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let days = self.days.unwrap_or(DEFAULT_DAYS);
        if days == 0 || days > MAX_DAYS {
            return Err(BookingError::InvalidRange(format!(
                "days must be between 1 and {MAX_DAYS}, got {days}"
            )));
        }
        let from = self.from.unwrap_or(today);
        let until = from
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| BookingError::InvalidRange(format!("{from} plus {days} days")))?;
        Ok((from, until))
    }
}

/// Staff rendering of one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum AdminStatus {
    /// Covered by an unavailable block and holding no booking.
    Blocked {
        /// The block.
        block_id: BlockId,
        /// Its description.
        description: String,
    },
    /// A class occurrence.
    Class {
        /// Occurrence.
        occurrence_id: OccurrenceId,
        /// Source template, if recurring.
        template_id: Option<TemplateId>,
        /// Assigned trainer.
        trainer_id: Option<TrainerId>,
        /// Seats taken.
        booked: u32,
        /// Seats total.
        capacity: u32,
        /// Also covered by a block; existing bookings stand, new ones are not offered.
        blocked: bool,
    },
    /// A booked personal-training session.
    PersonalTraining {
        /// Occurrence.
        occurrence_id: OccurrenceId,
        /// Trainer.
        trainer_id: Option<TrainerId>,
        /// Seats taken.
        booked: u32,
        /// Seats total.
        capacity: u32,
        /// Also covered by a block.
        blocked: bool,
    },
    /// Nothing scheduled, or only an unbooked PT slot.
    Free {
        /// A PT occurrence that may be booked into this cell.
        open_occurrence: Option<OccurrenceId>,
    },
}

/// Member rendering of one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum MemberStatus {
    /// A class that can be looked at and possibly booked.
    Class {
        /// Occurrence.
        occurrence_id: OccurrenceId,
        /// Seats left.
        spots_left: u32,
    },
    /// Not available, for a reason members do not see.
    Busy,
    /// Open.
    Free {
        /// A PT occurrence that may be booked into this cell.
        open_occurrence: Option<OccurrenceId>,
    },
}

impl From<AdminStatus> for MemberStatus {
    fn from(status: AdminStatus) -> Self {
        match status {
            AdminStatus::Class {
                occurrence_id,
                booked,
                capacity,
                blocked: false,
                ..
            } => Self::Class {
                occurrence_id,
                spots_left: capacity.saturating_sub(booked),
            },
            AdminStatus::Class { .. }
            | AdminStatus::PersonalTraining { .. }
            | AdminStatus::Blocked { .. } => Self::Busy,
            AdminStatus::Free { open_occurrence } => Self::Free { open_occurrence },
        }
    }
}

/// One grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot<S> {
    /// Gym-local date.
    pub date: NaiveDate,
    /// Gym-local cell start.
    pub start: NaiveTime,
    /// Gym-local cell end.
    pub end: NaiveTime,
    /// What occupies the cell.
    #[serde(flatten)]
    pub status: S,
}

/// A composed grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityGrid<S> {
    /// IANA zone the grid is expressed in.
    pub timezone: String,
    /// First day.
    pub from: NaiveDate,
    /// First day after the range.
    pub until: NaiveDate,
    /// Trainer filter, if any.
    pub trainer: Option<TrainerId>,
    /// Cells in date then time order.
    pub slots: Vec<Slot<S>>,
}

impl AvailabilityGrid<AdminStatus> {
    /// Strip staff-only detail.
    #[must_use]
    pub fn anonymize(self) -> AvailabilityGrid<MemberStatus> {
        AvailabilityGrid {
            timezone: self.timezone,
            from: self.from,
            until: self.until,
            trainer: self.trainer,
            slots: self
                .slots
                .into_iter()
                .map(|slot| Slot {
                    date: slot.date,
                    start: slot.start,
                    end: slot.end,
                    status: slot.status.into(),
                })
                .collect(),
        }
    }
}

/// Either rendering, as returned to callers that pick a view at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Availability {
    /// Staff grid.
    Admin(AvailabilityGrid<AdminStatus>),
    /// Member grid.
    Member(AvailabilityGrid<MemberStatus>),
}

/// Compose the staff grid for `[from, until)`.
///
/// `occurrences` may include rows outside the range (for example one that
/// started the evening before and runs past midnight); only overlap with a
/// cell matters. Cells whose start is not after `at.now()` are omitted.
#[must_use]
pub fn compose(
    shape: &GridShape,
    (from, until): (NaiveDate, NaiveDate),
    trainer: Option<TrainerId>,
    occurrences: &[OccurrenceView],
    blocks: &[UnavailableBlock],
    at: &GymTime,
) -> AvailabilityGrid<AdminStatus> {
    let occurrences: Vec<&OccurrenceView> = occurrences
        .iter()
        .filter(|o| trainer.is_none() || o.occurrence.trainer_id == trainer)
        .collect();
    let blocks: Vec<&UnavailableBlock> = blocks.iter().filter(|b| b.applies_to(trainer)).collect();

    let mut slots = Vec::new();
    for date in from.iter_days().take_while(|d| *d < until) {
        for (start, end) in shape.cells(date) {
            if at.starts_at(date, start.time()) <= at.now() {
                continue;
            }
            let status = cell_status(date, start, end, &occurrences, &blocks);
            slots.push(Slot {
                date,
                start: start.time(),
                end: end.time(),
                status,
            });
        }
    }

    AvailabilityGrid {
        timezone: at.timezone().name().to_string(),
        from,
        until,
        trainer,
        slots,
    }
}

fn cell_status(
    date: NaiveDate,
    start: NaiveDateTime,
    end: NaiveDateTime,
    occurrences: &[&OccurrenceView],
    blocks: &[&UnavailableBlock],
) -> AdminStatus {
    let block = blocks.iter().find(|b| b.overlaps(date, start, end));
    let mut here: Vec<&OccurrenceView> = occurrences
        .iter()
        .copied()
        .filter(|o| {
            let (o_start, o_end) = o.occurrence.local_span();
            o_start < end && start < o_end
        })
        .collect();
    // Classes first, then earliest start.
    here.sort_by_key(|o| {
        (
            o.occurrence.kind != SessionKind::Class,
            o.occurrence.local_span().0,
        )
    });

    let booked = here.iter().find(|o| o.booked_count > 0);
    if let Some(block) = block {
        return match booked {
            Some(view) => occupied(view, true),
            None => AdminStatus::Blocked {
                block_id: block.id,
                description: block.description.clone(),
            },
        };
    }

    // A class stays visible even when a PT session shares the cell.
    let shown = here
        .iter()
        .find(|o| o.occurrence.kind == SessionKind::Class)
        .or(booked);
    match shown {
        Some(view) => occupied(view, false),
        None => AdminStatus::Free {
            open_occurrence: here.first().map(|view| view.occurrence.id),
        },
    }
}

fn occupied(view: &OccurrenceView, blocked: bool) -> AdminStatus {
    let occ = &view.occurrence;
    match occ.kind {
        SessionKind::Class => AdminStatus::Class {
            occurrence_id: occ.id,
            template_id: occ.template_id(),
            trainer_id: occ.trainer_id,
            booked: view.booked_count,
            capacity: occ.capacity,
            blocked,
        },
        SessionKind::PersonalTraining => AdminStatus::PersonalTraining {
            occurrence_id: occ.id,
            trainer_id: occ.trainer_id,
            booked: view.booked_count,
            capacity: occ.capacity,
            blocked,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::OfferingId;
    use crate::occurrence::Occurrence;

    // 2026-10-19 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn shape() -> GridShape {
        GridShape::new(t(9, 0), t(12, 0), 60).unwrap()
    }

    fn early() -> GymTime {
        GymTime::new(chrono_tz::UTC, "2026-10-18T00:00:00Z".parse().unwrap())
    }

    fn one_day() -> (NaiveDate, NaiveDate) {
        (monday(), monday().succ_opt().unwrap())
    }

    fn occ(
        kind: SessionKind,
        trainer: Option<TrainerId>,
        start: NaiveTime,
        booked: u32,
    ) -> OccurrenceView {
        OccurrenceView {
            occurrence: Occurrence::one_off(
                OfferingId::generate(),
                kind,
                trainer,
                monday(),
                start,
                60,
                if kind == SessionKind::Class { 10 } else { 1 },
            )
            .unwrap(),
            booked_count: booked,
        }
    }

    fn status_at(grid: &AvailabilityGrid<AdminStatus>, start: NaiveTime) -> &AdminStatus {
        &grid.slots.iter().find(|s| s.start == start).unwrap().status
    }

    #[test]
    fn empty_grid_is_all_free() {
        let grid = compose(&shape(), one_day(), None, &[], &[], &early());
        assert_eq!(grid.slots.len(), 3);
        assert!(grid
            .slots
            .iter()
            .all(|s| s.status == AdminStatus::Free { open_occurrence: None }));
        assert_eq!(grid.timezone, "UTC");
    }

    #[test]
    fn started_cells_are_omitted() {
        let at = GymTime::new(chrono_tz::UTC, "2026-10-19T10:00:00Z".parse().unwrap());
        let grid = compose(&shape(), one_day(), None, &[], &[], &at);
        let starts: Vec<_> = grid.slots.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![t(11, 0)]);
    }

    #[test]
    fn booked_occurrence_wins_over_block() {
        let block = UnavailableBlock::new(None, 1, t(9, 0), t(12, 0), "maintenance").unwrap();
        let class = occ(SessionKind::Class, None, t(10, 0), 3);
        let grid = compose(&shape(), one_day(), None, &[class.clone()], &[block], &early());

        assert!(matches!(status_at(&grid, t(9, 0)), AdminStatus::Blocked { .. }));
        assert!(matches!(
            status_at(&grid, t(10, 0)),
            AdminStatus::Class { booked: 3, blocked: true, .. }
        ));

        let member = grid.anonymize();
        let cell = member.slots.iter().find(|s| s.start == t(10, 0)).unwrap();
        assert_eq!(cell.status, MemberStatus::Busy);
    }

    #[test]
    fn block_wins_over_unbooked_occurrence() {
        let block = UnavailableBlock::new(None, 1, t(10, 0), t(11, 0), "cleaning").unwrap();
        let class = occ(SessionKind::Class, None, t(10, 0), 0);
        let grid = compose(&shape(), one_day(), None, &[class], &[block], &early());
        assert!(matches!(
            status_at(&grid, t(10, 0)),
            AdminStatus::Blocked { description, .. } if description == "cleaning"
        ));
    }

    #[test]
    fn class_wins_over_personal_training() {
        let trainer = TrainerId::generate();
        let class = occ(SessionKind::Class, Some(trainer), t(10, 0), 0);
        let pt = occ(SessionKind::PersonalTraining, Some(trainer), t(10, 0), 0);
        let grid = compose(&shape(), one_day(), None, &[pt, class.clone()], &[], &early());
        assert!(matches!(
            status_at(&grid, t(10, 0)),
            AdminStatus::Class { occurrence_id, .. } if *occurrence_id == class.occurrence.id
        ));
    }

    #[test]
    fn open_class_wins_over_booked_personal_training() {
        let trainer = TrainerId::generate();
        let class = occ(SessionKind::Class, None, t(10, 0), 2);
        let pt = occ(SessionKind::PersonalTraining, Some(trainer), t(10, 0), 1);
        let grid = compose(&shape(), one_day(), None, &[pt, class.clone()], &[], &early());

        assert!(matches!(
            status_at(&grid, t(10, 0)),
            AdminStatus::Class { occurrence_id, booked: 2, .. }
                if *occurrence_id == class.occurrence.id
        ));
        let member = grid.anonymize();
        let cell = member.slots.iter().find(|s| s.start == t(10, 0)).unwrap();
        assert_eq!(
            cell.status,
            MemberStatus::Class {
                occurrence_id: class.occurrence.id,
                spots_left: 8
            }
        );
    }

    #[test]
    fn unbooked_pt_is_free_and_bookable() {
        let pt = occ(SessionKind::PersonalTraining, None, t(11, 0), 0);
        let booked_pt = occ(SessionKind::PersonalTraining, None, t(9, 0), 1);
        let grid = compose(
            &shape(),
            one_day(),
            None,
            &[pt.clone(), booked_pt],
            &[],
            &early(),
        );
        assert_eq!(
            status_at(&grid, t(11, 0)),
            &AdminStatus::Free {
                open_occurrence: Some(pt.occurrence.id)
            }
        );
        assert!(matches!(
            status_at(&grid, t(9, 0)),
            AdminStatus::PersonalTraining { booked: 1, .. }
        ));

        let member = grid.anonymize();
        assert_eq!(member.slots[0].status, MemberStatus::Busy);
    }

    #[test]
    fn member_view_shows_spots_left() {
        let class = occ(SessionKind::Class, None, t(9, 0), 4);
        let grid = compose(&shape(), one_day(), None, &[class.clone()], &[], &early()).anonymize();
        assert_eq!(
            grid.slots[0].status,
            MemberStatus::Class {
                occurrence_id: class.occurrence.id,
                spots_left: 6
            }
        );
    }

    #[test]
    fn trainer_filter_scopes_occurrences_and_blocks() {
        let alice = TrainerId::generate();
        let bob = TrainerId::generate();
        let alice_class = occ(SessionKind::Class, Some(alice), t(9, 0), 0);
        let bob_class = occ(SessionKind::Class, Some(bob), t(10, 0), 0);
        let bob_off = UnavailableBlock::new(Some(bob), 1, t(11, 0), t(12, 0), "dentist").unwrap();
        let all = [alice_class, bob_class];
        let blocks = [bob_off];

        let alice_grid = compose(&shape(), one_day(), Some(alice), &all, &blocks, &early());
        assert!(matches!(status_at(&alice_grid, t(9, 0)), AdminStatus::Class { .. }));
        assert!(matches!(status_at(&alice_grid, t(10, 0)), AdminStatus::Free { .. }));
        assert!(matches!(status_at(&alice_grid, t(11, 0)), AdminStatus::Free { .. }));

        let bob_grid = compose(&shape(), one_day(), Some(bob), &all, &blocks, &early());
        assert!(matches!(status_at(&bob_grid, t(11, 0)), AdminStatus::Blocked { .. }));

        let facility = compose(&shape(), one_day(), None, &all, &blocks, &early());
        assert!(matches!(status_at(&facility, t(11, 0)), AdminStatus::Free { .. }));
    }

    #[test]
    fn query_range_defaults_and_bounds() {
        let today = monday();
        let (from, until) = AvailabilityQuery::default().range(today).unwrap();
        assert_eq!(from, today);
        assert_eq!((until - from).num_days(), 7);

        let too_long = AvailabilityQuery {
            days: Some(MAX_DAYS + 1),
            ..AvailabilityQuery::default()
        };
        assert!(matches!(
            too_long.range(today),
            Err(BookingError::InvalidRange(_))
        ));
    }

    #[test]
    fn last_cell_is_clipped_to_close() {
        let shape = GridShape::new(t(9, 0), t(10, 15), 30).unwrap();
        let grid = compose(&shape, one_day(), None, &[], &[], &early());
        let last = grid.slots.last().unwrap();
        assert_eq!((last.start, last.end), (t(10, 0), t(10, 15)));
        assert!(GridShape::new(t(10, 0), t(9, 0), 30).is_err());
        assert!(GridShape::new(t(9, 0), t(10, 0), 0).is_err());
    }
}
