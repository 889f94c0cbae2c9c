//! Connectivity watchdog: prober → channel → reporter → red flashing.

use std::cell::Cell;

use edge_executor::LocalExecutor;
use futures_lite::future::block_on;

use fluidctl::app::shutdown::Shutdown;
use fluidctl::indicators::{Color, IndicatorController};
use fluidctl::watchdog::{self, Connectivity, ConnectivityChannel, POLL_INTERVAL};

use crate::mock_hw::*;

#[test]
fn prober_pushes_once_per_poll() {
    let clock = SimClock::new();
    let shutdown = Shutdown::new();
    let channel = ConnectivityChannel::new();
    let probe = ScriptedProbe::new([ScriptedProbe::down()], ScriptedProbe::ok());
    let received = Cell::new(Vec::new());

    let ex: LocalExecutor = LocalExecutor::new();
    ex.spawn(watchdog::run_prober(&probe, &clock, &channel, &shutdown))
        .detach();
    ex.spawn(async {
        loop {
            let observed = channel.receive().await;
            let mut seen = received.take();
            seen.push((clock.now(), observed));
            received.set(seen);
        }
    })
    .detach();

    drive_until(&ex, &clock, secs(100), || probe.calls.get() >= 3);

    let seen = received.take();
    assert_eq!(
        seen,
        vec![
            (secs(0), Connectivity::Disconnected),
            (POLL_INTERVAL, Connectivity::Connected),
            (POLL_INTERVAL * 2, Connectivity::Connected),
        ]
    );
}

#[test]
fn disconnects_flash_red_until_connectivity_returns() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, lights());
    let shutdown = Shutdown::new();
    let channel = ConnectivityChannel::new();
    let probe = ScriptedProbe::new(
        [ScriptedProbe::down(), ScriptedProbe::down(), ScriptedProbe::down()],
        ScriptedProbe::ok(),
    );

    let ex: LocalExecutor = LocalExecutor::new();
    for color in Color::ALL {
        ex.spawn(indicators.run_flasher(color, &clock, &shutdown))
            .detach();
    }
    ex.spawn(watchdog::run_reporter(&channel, &indicators, &shutdown))
        .detach();
    ex.spawn(watchdog::run_prober(&probe, &clock, &channel, &shutdown))
        .detach();

    drive_until(&ex, &clock, secs(200), || clock.now() >= secs(150));

    let red = lines.history(RED);
    assert_eq!(red.first(), Some(&(0, true)));
    assert!(red.windows(2).all(|w| w[0].1 != w[1].1), "red did not alternate: {red:?}");
    let (last_at, last_high) = *red.last().unwrap();
    assert!(last_at <= 93, "red still flashing at {last_at}");
    assert!(!last_high);
    assert!(!block_on(indicators.status(Color::Red)).flashing);
    assert!(lines.history(GREEN).is_empty());
}

#[test]
fn reporter_and_prober_stop_on_shutdown() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, lights());
    let shutdown = Shutdown::new();
    let channel = ConnectivityChannel::new();
    let probe = ScriptedProbe::new([], ScriptedProbe::ok());

    let ex: LocalExecutor = LocalExecutor::new();
    let reporter = ex.spawn(watchdog::run_reporter(&channel, &indicators, &shutdown));
    let prober = ex.spawn(watchdog::run_prober(&probe, &clock, &channel, &shutdown));

    drive_until(&ex, &clock, secs(100), || probe.calls.get() >= 2);
    shutdown.trigger();
    drive_until(&ex, &clock, secs(100), || {
        reporter.is_finished() && prober.is_finished()
    });
    assert_eq!(probe.calls.get(), 2);
}

#[test]
fn red_flash_restarts_after_another_light_clears_it() {
    let clock = SimClock::new();
    let lines = MockLines::new(&clock);
    let indicators = IndicatorController::new(&lines, lights());
    let shutdown = Shutdown::new();
    let channel = ConnectivityChannel::new();
    let red_flashing = || block_on(indicators.status(Color::Red)).flashing;

    let ex: LocalExecutor = LocalExecutor::new();
    ex.spawn(watchdog::run_reporter(&channel, &indicators, &shutdown))
        .detach();

    block_on(channel.send(Connectivity::Disconnected));
    drive_until(&ex, &clock, secs(0), red_flashing);

    // Pump-on lights green solid, which clears every other flash.
    block_on(indicators.set_solid(Color::Green)).unwrap();
    assert!(!red_flashing());

    for _ in 0..3 {
        block_on(channel.send(Connectivity::Disconnected));
    }
    drive_until(&ex, &clock, secs(0), red_flashing);
    assert!(block_on(indicators.status(Color::Green)).solid_on);

    block_on(channel.send(Connectivity::Connected));
    drive_until(&ex, &clock, secs(0), || !red_flashing());
}
