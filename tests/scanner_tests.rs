//! Integration tests for the scanner: animation, speed control and lifecycle

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rs_cylon::{
    hal::{LineEvent, MockClock, MockEdgeInput, MockLines},
    AnimationEngine, EdgeAck, EdgeHandler, Heading, LineRole, RateState, ScaleFactor, Scanner,
    ScannerConfig, ScannerError, StopReport,
};

// ============================================================================
// Helpers
// ============================================================================

fn configured_lines(n: usize) -> MockLines {
    use rs_cylon::OutputLines;
    let lines = MockLines::new(n);
    let mut setup = lines.clone();
    for i in 0..n {
        setup.configure_output(i).unwrap();
    }
    lines
}

fn fast_config(n: usize) -> ScannerConfig {
    ScannerConfig::default()
        .with_line_count(n)
        .with_base_period_ms(2)
        .with_max_level(10)
}

fn start(
    config: ScannerConfig,
    lines: &MockLines,
    button: &MockEdgeInput,
    clock: &Arc<MockClock>,
) -> Scanner<MockLines, MockEdgeInput> {
    Scanner::start(config, lines.clone(), button.clone(), Arc::clone(clock)).unwrap()
}

fn wait_for_ticks(lines: &MockLines, n: usize) {
    for _ in 0..500 {
        if lines.lit_sequence().len() >= n {
            return;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("engine never reached {n} ticks");
}

// ============================================================================
// Animation Without Edges
// ============================================================================

#[test]
fn ten_lines_bounce_with_pause_at_each_end() {
    let lines = configured_lines(10);
    let rate = Arc::new(RateState::new(10));
    let mut engine = AnimationEngine::new(lines.clone(), 10, rate, Duration::from_millis(100));

    let mut sleeps = Vec::new();
    for _ in 0..23 {
        sleeps.push(engine.tick().sleep);
    }

    let expected: Vec<usize> = (0..10)
        .chain([9])
        .chain((0..9).rev())
        .chain([0, 1, 2])
        .collect();
    assert_eq!(lines.lit_sequence(), expected);
    assert!(sleeps.iter().all(|s| *s == Duration::from_millis(100)));
}

#[test]
fn previous_line_goes_off_before_next_comes_on() {
    let lines = configured_lines(3);
    let rate = Arc::new(RateState::new(10));
    let mut engine = AnimationEngine::new(lines.clone(), 3, rate, Duration::from_millis(100));

    engine.tick();
    engine.tick();

    let sets: Vec<LineEvent> = lines
        .history()
        .into_iter()
        .filter(|e| matches!(e, LineEvent::Set(..)))
        .collect();
    assert_eq!(
        sets,
        vec![
            LineEvent::Set(0, true),
            LineEvent::Set(0, false),
            LineEvent::Set(1, true),
        ]
    );
}

// ============================================================================
// Speed Control
// ============================================================================

#[test]
fn three_edges_triple_the_speed() {
    let lines = configured_lines(10);
    let rate = Arc::new(RateState::new(10));
    let handler = EdgeHandler::new(Arc::clone(&rate), Arc::new(MockClock::new()));
    let mut engine = AnimationEngine::new(lines, 10, Arc::clone(&rate), Duration::from_millis(300));

    let mut levels = vec![rate.snapshot().level];
    for _ in 0..3 {
        assert_eq!(handler.handle(), EdgeAck::Handled);
        levels.push(rate.snapshot().level);
    }
    assert_eq!(levels, vec![0, -1, -2, -3]);

    let outcome = engine.tick();
    assert_eq!(outcome.factor, ScaleFactor::Faster(3));
    assert_eq!(outcome.sleep, Duration::from_millis(100));
}

#[test]
fn level_turns_around_after_max_edges() {
    let rate = RateState::new(10);
    let levels: Vec<i32> = (0..11).map(|t| rate.apply_edge(t).level).collect();

    assert_eq!(&levels[8..], &[-9, -10, -9]);
    assert_eq!(rate.snapshot().direction, Heading::Up);
}

#[test]
fn positive_level_slows_the_sweep() {
    let rate = RateState::new(3);
    // Down to -3, then back up through 0 to +2
    for t in 0..8 {
        rate.apply_edge(t);
    }
    assert_eq!(rate.snapshot().level, 2);
    assert_eq!(rate.read_sleep_factor(), ScaleFactor::Slower(2));
    assert_eq!(
        rate.read_sleep_factor().apply(Duration::from_millis(100)),
        Duration::from_millis(200)
    );
}

#[test]
fn button_presses_reach_running_scanner() {
    let lines = MockLines::new(5);
    let button = MockEdgeInput::new();
    let clock = Arc::new(MockClock::new());
    let mut scanner = start(fast_config(5), &lines, &button, &clock);

    for _ in 0..4 {
        clock.advance(300);
        assert_eq!(button.trigger(), Some(EdgeAck::Handled));
    }
    assert_eq!(scanner.rate().snapshot().level, -4);
    assert_eq!(scanner.rate().last_event_ms(), Some(1_200));

    scanner.stop().unwrap();
}

#[test]
fn debounced_presses_count_once() {
    let lines = MockLines::new(3);
    let button = MockEdgeInput::new();
    let clock = Arc::new(MockClock::new());
    let mut scanner = start(fast_config(3).with_debounce_ms(200), &lines, &button, &clock);

    assert_eq!(button.debounce_ms(), Some(200));
    assert!(button.press_at(1_000).is_some());
    assert!(button.press_at(1_050).is_none());
    assert!(button.press_at(1_199).is_none());
    assert!(button.press_at(1_200).is_some());

    assert_eq!(scanner.rate().snapshot().level, -2);
    scanner.stop().unwrap();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn engine_runs_and_stop_clears_every_line() {
    let lines = MockLines::new(4);
    let button = MockEdgeInput::new();
    let clock = Arc::new(MockClock::new());
    let mut scanner = start(fast_config(4), &lines, &button, &clock);

    wait_for_ticks(&lines, 6);
    let report = scanner.stop().unwrap();

    assert!(matches!(report, StopReport::Stopped { ticks } if ticks >= 6));
    assert!(lines.lit().is_empty());
    assert_eq!(lines.configured_count(), 0);
    assert!(!button.is_configured());
    assert!(!button.is_subscribed());
}

#[test]
fn second_stop_is_a_no_op() {
    let lines = MockLines::new(2);
    let button = MockEdgeInput::new();
    let clock = Arc::new(MockClock::new());
    let mut scanner = start(fast_config(2), &lines, &button, &clock);

    assert!(matches!(scanner.stop().unwrap(), StopReport::Stopped { .. }));
    let events = lines.history().len();

    assert_eq!(scanner.stop().unwrap(), StopReport::AlreadyStopped);
    assert_eq!(lines.history().len(), events);
    assert_eq!(button.removal_count(), 1);
    assert_eq!(button.release_count(), 1);
}

#[test]
fn no_edges_after_stop() {
    let lines = MockLines::new(2);
    let button = MockEdgeInput::new();
    let clock = Arc::new(MockClock::new());
    let mut scanner = start(fast_config(2), &lines, &button, &clock);

    button.trigger();
    scanner.stop().unwrap();
    assert_eq!(button.trigger(), None);
    assert_eq!(scanner.rate().snapshot().level, -1);
}

#[test]
fn output_failure_unwinds_configured_lines() {
    let lines = MockLines::new(10).failing_configure_at(6);
    let button = MockEdgeInput::new();
    let result = Scanner::start(
        fast_config(10),
        lines.clone(),
        button.clone(),
        Arc::new(MockClock::new()),
    );

    assert!(matches!(
        result,
        Err(ScannerError::Acquisition {
            role: LineRole::Output,
            index: 6,
            ..
        })
    ));
    assert_eq!(lines.released(), vec![5, 4, 3, 2, 1, 0]);
    assert_eq!(lines.configured_count(), 0);
    assert!(!button.is_configured());
}

#[test]
fn input_failure_unwinds_all_outputs() {
    let lines = MockLines::new(4);
    let button = MockEdgeInput::new().failing_configure();
    let result = Scanner::start(
        fast_config(4),
        lines.clone(),
        button.clone(),
        Arc::new(MockClock::new()),
    );

    assert!(matches!(
        result,
        Err(ScannerError::Acquisition {
            role: LineRole::Input,
            ..
        })
    ));
    assert_eq!(lines.released(), vec![3, 2, 1, 0]);
    assert!(lines.lit_sequence().is_empty());
}

#[test]
fn registration_failure_runs_at_base_speed() {
    let lines = MockLines::new(3);
    let button = MockEdgeInput::new().failing_registration();
    let clock = Arc::new(MockClock::new());
    let mut scanner = start(fast_config(3), &lines, &button, &clock);

    assert!(matches!(
        scanner.degraded(),
        Some(ScannerError::Registration { index: 0, .. })
    ));
    assert!(scanner.is_running());
    assert_eq!(button.trigger(), None);
    assert_eq!(scanner.rate().read_sleep_factor(), ScaleFactor::Baseline);

    wait_for_ticks(&lines, 2);
    scanner.stop().unwrap();
    assert_eq!(button.removal_count(), 0);
    assert_eq!(button.release_count(), 1);
    assert!(lines.lit().is_empty());
}

#[test]
fn release_failure_still_releases_the_rest() {
    let lines = MockLines::new(4).failing_release_at(1);
    let button = MockEdgeInput::new();
    let clock = Arc::new(MockClock::new());
    let mut scanner = start(fast_config(4), &lines, &button, &clock);

    let err = scanner.stop().unwrap_err();
    assert!(matches!(
        err,
        ScannerError::Release {
            role: LineRole::Output,
            index: 1,
            ..
        }
    ));
    assert!(!err.is_fatal_shutdown());
    assert_eq!(lines.released(), vec![0, 2, 3]);
    assert!(lines.lit().is_empty());
}
