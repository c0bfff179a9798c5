use std::io::{self, IsTerminal};

use time::UtcOffset;

use crate::app::ScheduleSummary;
use crate::cancel::CancelOutcome;
use crate::clock;
use crate::delivery::Notification;
use crate::domain::registration::Registration;
use crate::plan::AlarmKind;
use crate::reconcile::ReconcileSummary;
use crate::store::StoredAlarm;

pub fn print_alarm_list(alarms: &[StoredAlarm], offset: UtcOffset) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Reminders"));
    if alarms.is_empty() {
        println!("{}", palette.dim("no pending reminders"));
        return;
    }

    for alarm in alarms {
        println!("{}", format_alarm_row(alarm, offset, &palette));
    }
    println!("{}", palette.dim(&format!("{} reminder(s)", alarms.len())));
}

fn format_alarm_row(alarm: &StoredAlarm, offset: UtcOffset, palette: &Palette) -> String {
    let record = &alarm.record;
    let mut line = format!(
        "{} {} @ {}",
        palette.handle(&record.handle.to_string()),
        record.title,
        clock::format_label(record.fire_time, offset)
    );
    if !record.message.is_empty() {
        line.push(' ');
        line.push_str(&palette.dim(&format!("- {}", record.message)));
    }
    if !alarm.registration.is_active() {
        line.push(' ');
        line.push_str(&palette.registration(alarm.registration));
    }
    line
}

pub fn print_schedule_summary(summary: &ScheduleSummary, offset: UtcOffset) {
    let palette = Palette::auto();
    for alarm in &summary.alarms {
        let label = match alarm.kind {
            AlarmKind::Primary => "scheduled",
            AlarmKind::Medication => "scheduled medication",
        };
        println!(
            "{} {} {} @ {} {}",
            label,
            palette.handle(&alarm.record.handle.to_string()),
            alarm.record.title,
            clock::format_label(alarm.record.fire_time, offset),
            palette.registration(alarm.registration)
        );
    }
}

pub fn print_cancel_outcome(outcome: &CancelOutcome) {
    let palette = Palette::auto();
    for record in &outcome.cancelled {
        println!(
            "cancelled {} {}",
            palette.handle(&record.handle.to_string()),
            record.title
        );
    }
    for handle in &outcome.not_found {
        println!("{}", palette.dim(&format!("no pending reminder with handle {handle}")));
    }
    println!("Canceled {} alarms", outcome.cancelled.len());
}

pub fn print_reconcile_summary(summary: &ReconcileSummary) {
    println!(
        "reconciled: {} registered, {} denied, {} failed, {} pruned",
        summary.registered, summary.denied, summary.failed, summary.pruned
    );
}

pub fn print_notifications(notifications: &[Notification], offset: UtcOffset) {
    for notification in notifications {
        println!("{}", notification.render(offset));
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn handle(&self, text: &str) -> String {
        self.paint("1;94", &format!("#{text}"))
    }

    fn registration(&self, registration: Registration) -> String {
        let upper = registration.as_str().to_ascii_uppercase();
        self.paint(registration_color_code(registration), &format!("[{upper}]"))
    }
}

fn registration_color_code(registration: Registration) -> &'static str {
    match registration {
        Registration::Registered => "32",
        Registration::Pending => "33",
        Registration::Denied => "31",
    }
}

#[cfg(test)]
mod tests {
    use time::UtcOffset;

    use super::{format_alarm_row, Palette};
    use crate::domain::record::{AlarmRecord, Handle};
    use crate::domain::registration::Registration;
    use crate::store::StoredAlarm;

    fn plain() -> Palette {
        Palette { enabled: false }
    }

    #[test]
    fn registered_rows_show_handle_title_and_time() {
        let alarm = StoredAlarm {
            record: AlarmRecord::new(1_792_400_400_000, "Meeting", "Standup", Handle(7)),
            registration: Registration::Registered,
        };
        let row = format_alarm_row(&alarm, UtcOffset::UTC, &plain());
        assert_eq!(row, "#7 Meeting @ 2026-10-19 09:00 - Standup");
    }

    #[test]
    fn unregistered_rows_flag_their_state() {
        let alarm = StoredAlarm {
            record: AlarmRecord::new(1_792_400_400_000, "Meeting", "", Handle(7)),
            registration: Registration::Denied,
        };
        let row = format_alarm_row(&alarm, UtcOffset::UTC, &plain());
        assert_eq!(row, "#7 Meeting @ 2026-10-19 09:00 [DENIED]");
    }

    #[test]
    fn colors_wrap_text_when_enabled() {
        let palette = Palette { enabled: true };
        assert_eq!(palette.dim("x"), "\x1b[2mx\x1b[0m");
    }
}
