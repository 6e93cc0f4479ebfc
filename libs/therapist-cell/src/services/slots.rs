use chrono::{Days, NaiveDate};
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{
    AvailableSlot, BookedSlot, CalendarEntry, CalendarEntryKind, SlotGranularity, SlotKind,
};
use crate::services::availability::{at_hour, start_of_day, AvailabilityModel, OpenInterval};

/// Expands weekly availability into concrete bookable windows.
///
/// Holds no cursor: every call walks the horizon from scratch, so two calls
/// over the same inputs yield the same slots in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGenerator {
    granularity: SlotGranularity,
    horizon_days: u32,
}

impl SlotGenerator {
    pub fn new(granularity: SlotGranularity, horizon_days: u32) -> Self {
        Self { granularity, horizon_days }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let granularity = config.slot_granularity.parse().unwrap_or_else(|e| {
            tracing::warn!("{}, falling back to hourly", e);
            SlotGranularity::Hourly
        });
        Self::new(granularity, config.slot_horizon_days)
    }

    pub fn granularity(&self) -> SlotGranularity {
        self.granularity
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    pub fn with_granularity(self, granularity: SlotGranularity) -> Self {
        Self { granularity, ..self }
    }

    pub fn with_horizon_days(self, horizon_days: u32) -> Self {
        Self { horizon_days, ..self }
    }

    /// Lazily yields slots for the `horizon_days` days starting at `from`,
    /// ordered by start time.
    ///
    /// In hourly mode a candidate is dropped only when a booking starts at
    /// exactly the same instant. This is a display pre-filter; the conflict
    /// validator does the real overlap check at booking time. Block mode does
    /// not subtract bookings at all.
    pub fn slots<'a>(
        &self,
        model: Option<&'a AvailabilityModel>,
        booked: &'a [BookedSlot],
        from: NaiveDate,
    ) -> impl Iterator<Item = AvailableSlot> + 'a {
        let granularity = self.granularity;
        let horizon = u64::from(self.horizon_days);

        model.into_iter().flat_map(move |model| {
            (0..horizon)
                .filter_map(move |offset| from.checked_add_days(Days::new(offset)))
                .filter_map(move |date| model.interval_on(date).map(|interval| (date, interval)))
                .flat_map(move |(date, interval)| day_slots(granularity, date, interval, booked))
        })
    }

    pub fn generate(
        &self,
        model: Option<&AvailabilityModel>,
        booked: &[BookedSlot],
        from: NaiveDate,
    ) -> Vec<AvailableSlot> {
        let slots: Vec<AvailableSlot> = self.slots(model, booked, from).collect();
        debug!(
            "Generated {} {} slots over {} days from {}",
            slots.len(),
            self.granularity,
            self.horizon_days,
            from
        );
        slots
    }

    /// Calendar view: block availability plus every booking inside the
    /// horizon as its own entry. Bookings may overlap the available blocks.
    pub fn calendar(
        &self,
        model: Option<&AvailabilityModel>,
        booked: &[BookedSlot],
        from: NaiveDate,
    ) -> Vec<CalendarEntry> {
        let window_start = start_of_day(from);
        let window_end = from
            .checked_add_days(Days::new(u64::from(self.horizon_days)))
            .map(start_of_day);

        let available = self
            .with_granularity(SlotGranularity::Block)
            .slots(model, booked, from)
            .map(|slot| CalendarEntry {
                start_time: slot.start_time,
                end_time: slot.end_time,
                kind: CalendarEntryKind::Available,
                appointment_id: None,
            });

        let bookings = booked
            .iter()
            .filter(|b| b.end_time > window_start)
            .filter(|b| window_end.map_or(true, |end| b.start_time < end))
            .map(|b| CalendarEntry {
                start_time: b.start_time,
                end_time: b.end_time,
                kind: CalendarEntryKind::Booked,
                appointment_id: Some(b.appointment_id),
            });

        let mut entries: Vec<CalendarEntry> = available.chain(bookings).collect();
        // Stable: an available block sorts ahead of a booking with the same start.
        entries.sort_by_key(|entry| entry.start_time);
        entries
    }
}

impl Default for SlotGenerator {
    fn default() -> Self {
        Self::new(SlotGranularity::Hourly, shared_config::DEFAULT_SLOT_HORIZON_DAYS)
    }
}

fn day_slots(
    granularity: SlotGranularity,
    date: NaiveDate,
    interval: OpenInterval,
    booked: &[BookedSlot],
) -> Vec<AvailableSlot> {
    match granularity {
        // A day whose hours run past the last representable instant yields nothing.
        SlotGranularity::Block => match (interval.start_on(date), interval.end_on(date)) {
            (Some(start_time), Some(end_time)) => vec![AvailableSlot {
                start_time,
                end_time,
                kind: SlotKind::Available,
            }],
            _ => vec![],
        },
        SlotGranularity::Hourly => interval
            .hours()
            .filter_map(|hour| Some((at_hour(date, hour)?, at_hour(date, hour + 1)?)))
            .filter(|(start, _)| !booked.iter().any(|b| b.start_time == *start))
            .map(|(start_time, end_time)| AvailableSlot {
                start_time,
                end_time,
                kind: SlotKind::Available,
            })
            .collect(),
    }
}
