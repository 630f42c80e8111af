use chrono::Timelike;

use crate::models::Slot;

const SPELLED_HOURS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
];

/// Match a caller's own words against the slots they were just offered.
///
/// Purely heuristic: an explicit clock time wins, then ordinal and day-part
/// keywords. Returns `None` rather than guessing when nothing recognizable is
/// present, so the agent can re-prompt.
pub fn resolve<'a>(utterance: &str, slots: &'a [Slot]) -> Option<&'a Slot> {
    if slots.is_empty() {
        return None;
    }
    let text = utterance.to_lowercase();

    if let Some((hour, minute)) = parse_clock_time(&text) {
        if let Some(slot) = slots
            .iter()
            .find(|s| s.starts_at.hour() == hour && s.starts_at.minute() == minute)
        {
            return Some(slot);
        }
        if let Some(slot) = slots.iter().find(|s| s.starts_at.hour() == hour) {
            return Some(slot);
        }
    }

    if contains_word(&text, "first") || text.contains("1st") {
        return slots.first();
    }
    if contains_word(&text, "second") || text.contains("2nd") {
        return slots.get(1).or_else(|| slots.first());
    }
    if contains_word(&text, "last") {
        return slots.last();
    }
    if text.contains("morning") {
        return slots.iter().find(|s| (6..12).contains(&s.starts_at.hour()));
    }
    if text.contains("afternoon") {
        return slots.iter().find(|s| (12..17).contains(&s.starts_at.hour()));
    }

    None
}

/// Pull the first recognizable clock time out of free text, normalized to
/// 24-hour hour+minute. Accepts "2", "2:30", "2pm", "2:30 pm", "p.m.",
/// and spelled hours "one" through "twelve". A bare 1-7 with no meridiem is
/// taken as afternoon, which is how callers say appointment times.
fn parse_clock_time(text: &str) -> Option<(u32, u32)> {
    let cleaned: String = text.chars().filter(|c| *c != '.').collect();
    let tokens: Vec<&str> = cleaned
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '?' | '!' | ';'))
        .filter(|t| !t.is_empty())
        .collect();

    for (i, token) in tokens.iter().enumerate() {
        let (core, mut meridiem) = split_meridiem(token);

        let parsed = if let Some((h, m)) = core.split_once(':') {
            match (h.parse::<u32>(), m.parse::<u32>()) {
                (Ok(h), Ok(m)) if m <= 59 => Some((h, m)),
                _ => None,
            }
        } else if !core.is_empty() && core.chars().all(|c| c.is_ascii_digit()) {
            core.parse::<u32>().ok().map(|h| (h, 0))
        } else {
            SPELLED_HOURS
                .iter()
                .find(|(word, _)| *word == core)
                .map(|(_, h)| (*h, 0))
        };

        let Some((hour, minute)) = parsed else {
            continue;
        };

        if meridiem.is_none() {
            meridiem = tokens.get(i + 1).and_then(|next| match *next {
                "am" => Some("am"),
                "pm" => Some("pm"),
                _ => None,
            });
        }

        let hour = match meridiem {
            Some("pm") if hour <= 12 => hour % 12 + 12,
            Some("am") if hour <= 12 => hour % 12,
            Some(_) => continue,
            // No meridiem: low hours are how people say afternoon times.
            None if (1..=7).contains(&hour) => hour + 12,
            None => hour,
        };

        if hour <= 23 {
            return Some((hour, minute));
        }
    }

    None
}

fn split_meridiem(token: &str) -> (&str, Option<&'static str>) {
    if let Some(core) = token.strip_suffix("pm") {
        (core, Some("pm"))
    } else if let Some(core) = token.strip_suffix("am") {
        (core, Some("am"))
    } else {
        (token, None)
    }
}

fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|t| t == word)
}
