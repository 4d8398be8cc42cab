// Optimal start time selection over the 48-hour price horizon.
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use std::collections::BTreeMap;

use crate::oracle::PriceCurve;

/// Pick the hour-aligned start time minimising the summed hourly price
/// over the job's integer-hour footprint, subject to finishing by the
/// deadline. Candidates are today's remaining hours plus tomorrow's,
/// excluding the current hour window. Sub-hour remainders of the duration
/// do not contribute to the cost. Returns None when no admissible hour
/// remains.
pub fn find_optimal_start_time(
    current_time: NaiveDateTime,
    prices: &PriceCurve,
    job_duration_minutes: i64,
    deadline: NaiveDateTime,
) -> Option<NaiveDateTime> {
    let ref_prices = prices.merged();
    let mut candidates = ref_prices.clone();

    // Past hours of today, and the hour we are currently inside, are not
    // eligible start times.
    let today = current_time.date();
    candidates.retain(|t, _| !(t.date() == today && t.hour() <= current_time.hour()));

    // The horizon ends 48 hours after the top of today. When the latest
    // admissible start falls inside the horizon, drop every hour from
    // which the job could not finish by the deadline.
    let final_time = today.and_time(NaiveTime::MIN) + Duration::hours(48);
    let latest_start = deadline - Duration::minutes(job_duration_minutes);
    if latest_start < final_time {
        let cutoff = ceil_to_hour(latest_start);
        candidates.retain(|t, _| *t < cutoff);
    }

    let slots = job_duration_minutes / 60;

    let mut best: Option<(NaiveDateTime, f64)> = None;
    'candidates: for start in candidates.keys() {
        let mut cost = 0.0;
        for i in 0..slots {
            match ref_prices.get(&(*start + Duration::hours(i))) {
                Some(price) => cost += price,
                None => continue 'candidates,
            }
        }

        // Strict comparison keeps the earliest hour on ties.
        match best {
            Some((_, best_cost)) if cost >= best_cost => {}
            _ => best = Some((*start, cost)),
        }
    }

    best.map(|(start, _)| start)
}

fn truncate_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    t.date().and_time(NaiveTime::MIN) + Duration::hours(t.hour() as i64)
}

fn ceil_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    let floor = truncate_to_hour(t);
    if floor == t {
        t
    } else {
        floor + Duration::hours(1)
    }
}
