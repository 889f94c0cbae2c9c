//! Indicator controller: solid exclusivity, escalation and flashing.

use edge_executor::LocalExecutor;
use futures_lite::future::block_on;

use fluidctl::app::shutdown::Shutdown;
use fluidctl::indicators::{BLINK_INTERVAL, Color, IndicatorController, IndicatorStatus};
use fluidctl::lines::IndicatorLines;

use crate::mock_hw::*;

const OFF: IndicatorStatus = IndicatorStatus {
    solid_on: false,
    flashing: false,
};
const SOLID: IndicatorStatus = IndicatorStatus {
    solid_on: true,
    flashing: false,
};

#[test]
fn at_most_one_colour_is_solid() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, lights());

    block_on(indicators.set_solid(Color::Green)).unwrap();
    block_on(indicators.set_solid(Color::Yellow)).unwrap();
    block_on(indicators.set_solid(Color::Red)).unwrap();

    assert_eq!(block_on(indicators.snapshot()), [OFF, OFF, SOLID]);
    assert!(!lines.level(GREEN));
    assert!(!lines.level(YELLOW));
    assert!(lines.level(RED));
    assert_eq!(lines.history(GREEN), vec![(0, true), (0, false)]);
}

#[test]
fn solid_clears_other_flashing_but_flashing_does_not() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, lights());

    block_on(indicators.start_flashing(Color::Red));
    block_on(indicators.start_flashing(Color::Green));
    assert!(block_on(indicators.status(Color::Red)).flashing);
    assert!(block_on(indicators.status(Color::Green)).flashing);

    block_on(indicators.set_solid(Color::Yellow)).unwrap();
    assert_eq!(block_on(indicators.snapshot()), [OFF, SOLID, OFF]);
}

#[test]
fn failed_light_escalates_to_red_once() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, lights());
    lines.fail(YELLOW, Fault::Open);

    assert!(block_on(indicators.set_solid(Color::Yellow)).is_err());
    assert_eq!(block_on(indicators.snapshot()), [OFF, OFF, SOLID]);
    assert_eq!(lines.history(RED), vec![(0, true)]);
}

#[test]
fn failed_alarm_is_not_escalated_again() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, lights());
    lines.fail(GREEN, Fault::Open);
    lines.fail(RED, Fault::StuckLow);

    assert!(block_on(indicators.set_solid(Color::Green)).is_err());
    assert_eq!(block_on(indicators.snapshot()), [OFF, OFF, OFF]);
    // One red attempt, no retry storm.
    assert_eq!(lines.history(RED), vec![(0, true)]);

    block_on(indicators.raise_alarm());
    assert_eq!(lines.history(RED).len(), 2);
}

#[test]
fn unwired_lights_only_track_flags() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, IndicatorLines::default());

    block_on(indicators.set_solid(Color::Green)).unwrap();
    block_on(indicators.clear(Color::Green)).unwrap();
    block_on(indicators.set_solid(Color::Red)).unwrap();

    assert_eq!(block_on(indicators.snapshot()), [OFF, OFF, SOLID]);
    assert!(lines.events().is_empty());
}

#[test]
fn flashing_toggles_every_interval_until_stopped() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, lights());
    let shutdown = Shutdown::new();
    let interval = BLINK_INTERVAL.as_secs();

    let ex: LocalExecutor = LocalExecutor::new();
    for color in Color::ALL {
        ex.spawn(indicators.run_flasher(color, &clock, &shutdown))
            .detach();
    }
    block_on(indicators.start_flashing(Color::Yellow));
    drive_until(&ex, &clock, secs(60), || clock.now() >= secs(20));

    let history = lines.history(YELLOW);
    for (i, (at, high)) in history.iter().enumerate() {
        assert_eq!(*at, i as u64 * interval);
        assert_eq!(*high, i % 2 == 0);
    }

    let stopped_at = clock.now().as_secs();
    block_on(indicators.stop_flashing(Color::Yellow));
    // Past the next cycle head the flasher has gone idle.
    drive_until(&ex, &clock, secs(60), || {
        clock.now() >= secs(stopped_at + interval)
    });

    let history = lines.history(YELLOW);
    let (last_at, last_high) = *history.last().unwrap();
    assert!(last_at <= stopped_at + interval, "{last_at} > {stopped_at} + {interval}");
    assert!(!last_high);
    assert!(lines.history(GREEN).is_empty());
}

#[test]
fn flashing_colours_run_concurrently() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, lights());
    let shutdown = Shutdown::new();

    let ex: LocalExecutor = LocalExecutor::new();
    for color in Color::ALL {
        ex.spawn(indicators.run_flasher(color, &clock, &shutdown))
            .detach();
    }
    block_on(indicators.start_flashing(Color::Green));
    block_on(indicators.start_flashing(Color::Red));
    drive_until(&ex, &clock, secs(30), || clock.now() >= secs(12));

    assert_eq!(lines.history(GREEN), lines.history(RED));
    assert!(lines.history(RED).len() >= 4);
}

#[test]
fn flasher_failure_abandons_flash_and_escalates() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, lights());
    let shutdown = Shutdown::new();
    lines.fail(GREEN, Fault::Open);

    let ex: LocalExecutor = LocalExecutor::new();
    ex.spawn(indicators.run_flasher(Color::Green, &clock, &shutdown))
        .detach();
    block_on(indicators.start_flashing(Color::Green));
    drive_until(&ex, &clock, secs(1), || {
        !block_on(indicators.status(Color::Green)).flashing
    });

    assert!(block_on(indicators.status(Color::Red)).solid_on);
    assert_eq!(lines.history(RED), vec![(0, true)]);
}

#[test]
fn flashers_exit_on_shutdown() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, lights());
    let shutdown = Shutdown::new();

    let ex: LocalExecutor = LocalExecutor::new();
    let tasks: Vec<_> = Color::ALL
        .into_iter()
        .map(|color| ex.spawn(indicators.run_flasher(color, &clock, &shutdown)))
        .collect();
    block_on(indicators.start_flashing(Color::Red));
    drive_until(&ex, &clock, secs(10), || clock.now() >= secs(6));

    shutdown.trigger();
    drive_until(&ex, &clock, secs(10), || tasks.iter().all(|t| t.is_finished()));
}

#[test]
fn alarm_raised_while_flashing_stays_lit() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, lights());
    let shutdown = Shutdown::new();

    let ex: LocalExecutor = LocalExecutor::new();
    ex.spawn(indicators.run_flasher(Color::Red, &clock, &shutdown))
        .detach();
    block_on(indicators.start_flashing(Color::Red));
    drive_until(&ex, &clock, secs(1), || lines.level(RED));

    block_on(indicators.raise_alarm());
    // The off half of the blink keeps a solid red lit.
    drive_until(&ex, &clock, secs(10), || clock.now() >= BLINK_INTERVAL);
    assert!(lines.level(RED));

    block_on(indicators.stop_flashing(Color::Red));
    drive_until(&ex, &clock, secs(10), || clock.now() >= BLINK_INTERVAL * 2);

    assert_eq!(block_on(indicators.status(Color::Red)), SOLID);
    assert!(lines.level(RED));
    let red = lines.history(RED);
    assert!(red.iter().all(|(_, high)| *high), "red went dark: {red:?}");
}
