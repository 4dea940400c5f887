use std::convert::Infallible;
use std::time::Duration;

use tokio::time::sleep;

/// Local outputs: the audible alert and the status indicator
pub trait AlertOutput: Send {
    fn set_alert(&mut self, on: bool);
    fn set_indicator(&mut self, on: bool);
}

/// On/off duty cycle of the audible alert
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlertPattern {
    pub on: Duration,
    pub off: Duration,
}

impl Default for AlertPattern {
    fn default() -> Self {
        Self {
            on: Duration::from_millis(500),
            off: Duration::from_millis(500),
        }
    }
}

/// Run `cycles` on/off periods of the alert, leaving it silent.
pub async fn alert_cycles(output: &mut dyn AlertOutput, pattern: AlertPattern, cycles: u64) {
    for _ in 0..cycles {
        pulse(output, pattern).await;
    }
}

/// Sound the alert until the process is restarted. Never returns.
pub async fn alert_forever(output: &mut dyn AlertOutput, pattern: AlertPattern) -> Infallible {
    log::warn!(
        "Alerting ({}ms on / {}ms off) until restart",
        pattern.on.as_millis(),
        pattern.off.as_millis()
    );
    loop {
        pulse(output, pattern).await;
    }
}

async fn pulse(output: &mut dyn AlertOutput, pattern: AlertPattern) {
    output.set_alert(true);
    sleep(pattern.on).await;
    output.set_alert(false);
    sleep(pattern.off).await;
}

/// Host stand-in for the buzzer and LED, reports edges through the log
#[derive(Debug, Default)]
pub struct LogAlert {
    alert_on: bool,
    indicator_on: bool,
}

impl LogAlert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_alerting(&self) -> bool {
        self.alert_on
    }

    pub fn is_indicating(&self) -> bool {
        self.indicator_on
    }
}

impl AlertOutput for LogAlert {
    fn set_alert(&mut self, on: bool) {
        if on != self.alert_on {
            log::debug!("Buzzer {}", if on { "ON" } else { "off" });
        }
        self.alert_on = on;
    }

    fn set_indicator(&mut self, on: bool) {
        if on != self.indicator_on {
            log::info!("Indicator {}", if on { "ON" } else { "off" });
        }
        self.indicator_on = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{OutputEvent, RecordingAlert};
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_alert_cycles_duty_pattern() {
        let mut alert = RecordingAlert::default();
        let pattern = AlertPattern {
            on: Duration::from_millis(5),
            off: Duration::from_millis(5),
        };

        let start = Instant::now();
        alert_cycles(&mut alert, pattern, 3).await;

        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(
            alert.events(),
            vec![
                OutputEvent::Alert(true),
                OutputEvent::Alert(false),
                OutputEvent::Alert(true),
                OutputEvent::Alert(false),
                OutputEvent::Alert(true),
                OutputEvent::Alert(false),
            ]
        );
    }

    #[tokio::test]
    async fn test_alert_forever_keeps_cycling() {
        let mut alert = RecordingAlert::default();
        let pattern = AlertPattern {
            on: Duration::from_millis(2),
            off: Duration::from_millis(2),
        };

        let recorder = alert.clone();
        let forever = alert_forever(&mut alert, pattern);
        let outcome = tokio::time::timeout(Duration::from_millis(50), forever).await;

        assert!(outcome.is_err());
        let pulses = recorder
            .events()
            .iter()
            .filter(|e| **e == OutputEvent::Alert(true))
            .count();
        assert!(pulses >= 2, "expected repeated pulses, got {}", pulses);
    }

    #[test]
    fn test_log_alert_tracks_state() {
        let mut alert = LogAlert::new();
        assert!(!alert.is_alerting());

        alert.set_alert(true);
        alert.set_indicator(true);
        assert!(alert.is_alerting());
        assert!(alert.is_indicating());

        alert.set_alert(false);
        assert!(!alert.is_alerting());
    }

    #[test]
    fn test_default_pattern_is_half_second_duty() {
        let pattern = AlertPattern::default();
        assert_eq!(pattern.on, Duration::from_millis(500));
        assert_eq!(pattern.off, Duration::from_millis(500));
    }
}
