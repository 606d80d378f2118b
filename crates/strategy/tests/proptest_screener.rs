use chrono::{Duration, TimeZone, Utc};
use common::{Bar, ScreenResult};
use proptest::prelude::*;
use strategy::{BreakoutScreener, ScreenerConfig, SignalConfig, SignalGenerator};

fn bars_from(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| Bar {
            timestamp: start + Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume,
        })
        .collect()
}

proptest! {
    /// Screening arbitrary price paths must never panic, and a pass always
    /// carries metrics that satisfy every threshold.
    #[test]
    fn screen_is_total_and_consistent(
        closes in prop::collection::vec(0.01f64..10_000.0, 0..200),
        volume in 0.0f64..5_000_000.0,
    ) {
        let volumes = vec![volume; closes.len()];
        let window = bars_from(&closes, &volumes);
        let cfg = ScreenerConfig::default();
        let screener = BreakoutScreener::new(cfg.clone());
        let result: ScreenResult = screener.screen("PROP", &window);

        if window.len() < cfg.required_history() {
            prop_assert!(result.metrics.is_none());
        }
        if result.pass {
            let m = result.metrics.unwrap();
            prop_assert!(m.prior_move_pct >= cfg.min_prior_move_pct);
            prop_assert!(m.retracement_pct < cfg.max_retracement_pct);
            prop_assert!(m.consolidation_days >= cfg.min_consolidation_days);
            prop_assert!(m.consolidation_days <= cfg.max_consolidation_days);
        }
    }

    /// A signal is only ever produced for a passing screen, at the current close.
    #[test]
    fn signal_implies_pass(
        closes in prop::collection::vec(50.0f64..150.0, 64..120),
        last_volume in 0.0f64..5_000_000.0,
    ) {
        let mut volumes = vec![400_000.0; closes.len()];
        if let Some(v) = volumes.last_mut() {
            *v = last_volume;
        }
        let window = bars_from(&closes, &volumes);
        let screen = BreakoutScreener::new(ScreenerConfig::default()).screen("PROP", &window);
        let signal = SignalGenerator::new(SignalConfig::default()).evaluate(&window, &screen);
        if let Some(sig) = signal {
            prop_assert!(screen.pass);
            prop_assert_eq!(sig.trigger_price, *closes.last().unwrap());
        }
    }
}
