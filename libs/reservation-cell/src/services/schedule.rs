// libs/reservation-cell/src/services/schedule.rs
//
// Static slot templates for the salon week. Slots are minutes from local
// midnight, half-open, and never persisted; availability and booking both
// read the same tables so a client can only name a start the generator
// produced.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::models::Slot;

const fn hm(hora: i32, minuto: i32) -> i32 {
    hora * 60 + minuto
}

/// Monday through Saturday: eight 30-minute slots in the morning block
/// (09:15–13:15), lunch break, five 45-minute slots in the afternoon block
/// (14:30–18:15).
pub static PLANTILLA_SEMANA: &[Slot] = &[
    Slot::new(hm(9, 15), hm(9, 45)),
    Slot::new(hm(9, 45), hm(10, 15)),
    Slot::new(hm(10, 15), hm(10, 45)),
    Slot::new(hm(10, 45), hm(11, 15)),
    Slot::new(hm(11, 15), hm(11, 45)),
    Slot::new(hm(11, 45), hm(12, 15)),
    Slot::new(hm(12, 15), hm(12, 45)),
    Slot::new(hm(12, 45), hm(13, 15)),
    Slot::new(hm(14, 30), hm(15, 15)),
    Slot::new(hm(15, 15), hm(16, 0)),
    Slot::new(hm(16, 0), hm(16, 45)),
    Slot::new(hm(16, 45), hm(17, 30)),
    Slot::new(hm(17, 30), hm(18, 15)),
];

/// Sunday short day: six 30-minute slots, 09:15–12:15.
pub static PLANTILLA_DOMINGO: &[Slot] = &[
    Slot::new(hm(9, 15), hm(9, 45)),
    Slot::new(hm(9, 45), hm(10, 15)),
    Slot::new(hm(10, 15), hm(10, 45)),
    Slot::new(hm(10, 45), hm(11, 15)),
    Slot::new(hm(11, 15), hm(11, 45)),
    Slot::new(hm(11, 45), hm(12, 15)),
];

/// Template for a calendar date, keyed by weekday only. Deterministic and
/// pure; holidays are modelled as absences, not as template changes.
pub fn slots_for_date(fecha: NaiveDate) -> &'static [Slot] {
    match fecha.weekday() {
        Weekday::Sun => PLANTILLA_DOMINGO,
        _ => PLANTILLA_SEMANA,
    }
}

/// The template slot starting exactly at `inicio_min` on `fecha`, if any.
/// Booking requests must name one of these starts.
pub fn slot_que_inicia(fecha: NaiveDate, inicio_min: i32) -> Option<Slot> {
    slots_for_date(fecha)
        .iter()
        .copied()
        .find(|slot| slot.start_min == inicio_min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::time::format_minutes;

    fn fecha(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_template_has_thirteen_ordered_slots() {
        assert_eq!(PLANTILLA_SEMANA.len(), 13);
        for pair in PLANTILLA_SEMANA.windows(2) {
            assert!(pair[0].end_min <= pair[1].start_min);
        }
        for slot in PLANTILLA_SEMANA {
            assert!(slot.start_min < slot.end_min);
        }
    }

    #[test]
    fn morning_block_is_contiguous_half_hours() {
        let manana = &PLANTILLA_SEMANA[..8];
        assert_eq!(format_minutes(manana[0].start_min), "09:15");
        assert_eq!(format_minutes(manana[7].end_min), "13:15");
        for pair in manana.windows(2) {
            assert_eq!(pair[0].end_min, pair[1].start_min);
        }
        for slot in manana {
            assert_eq!(slot.end_min - slot.start_min, 30);
        }
    }

    #[test]
    fn afternoon_block_is_contiguous_45_minute_slots() {
        let tarde = &PLANTILLA_SEMANA[8..];
        assert_eq!(tarde.len(), 5);
        assert_eq!(format_minutes(tarde[0].start_min), "14:30");
        assert_eq!(format_minutes(tarde[4].end_min), "18:15");
        for pair in tarde.windows(2) {
            assert_eq!(pair[0].end_min, pair[1].start_min);
        }
        for slot in tarde {
            assert_eq!(slot.end_min - slot.start_min, 45);
        }
    }

    #[test]
    fn lunch_gap_separates_blocks() {
        assert_eq!(format_minutes(PLANTILLA_SEMANA[7].end_min), "13:15");
        assert_eq!(format_minutes(PLANTILLA_SEMANA[8].start_min), "14:30");
    }

    #[test]
    fn sunday_uses_short_template() {
        // 2025-03-09 is a Sunday, 2025-03-10 a Monday
        let domingo = slots_for_date(fecha(2025, 3, 9));
        assert_eq!(domingo.len(), 6);
        assert_eq!(format_minutes(domingo[0].start_min), "09:15");
        assert_eq!(format_minutes(domingo[5].end_min), "12:15");

        let lunes = slots_for_date(fecha(2025, 3, 10));
        assert_eq!(lunes.len(), 13);
    }

    #[test]
    fn same_weekday_always_yields_same_template() {
        assert_eq!(
            slots_for_date(fecha(2025, 3, 10)),
            slots_for_date(fecha(2025, 3, 17))
        );
    }

    #[test]
    fn slot_lookup_only_accepts_template_starts() {
        let lunes = fecha(2025, 3, 10);
        assert_eq!(
            slot_que_inicia(lunes, hm(9, 15)),
            Some(Slot::new(hm(9, 15), hm(9, 45)))
        );
        assert_eq!(
            slot_que_inicia(lunes, hm(14, 30)),
            Some(Slot::new(hm(14, 30), hm(15, 15)))
        );
        // 09:30 falls inside a slot but starts none
        assert_eq!(slot_que_inicia(lunes, hm(9, 30)), None);
        // Afternoon starts do not exist on Sundays
        assert_eq!(slot_que_inicia(fecha(2025, 3, 9), hm(14, 30)), None);
    }
}
