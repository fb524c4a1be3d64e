use chrono::TimeDelta;
use utc_clock::{registry, Clock, TestClock, UtcTime};

use std::sync::{Arc, Mutex, MutexGuard};

/// The registry is process-wide state and the test harness runs tests on
/// parallel threads, so every test here serializes through this lock.
static GLOBAL_CLOCK: Mutex<()> = Mutex::new(());

fn lock_global() -> MutexGuard<'static, ()> {
    GLOBAL_CLOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[test]
fn default_now_is_the_real_clock() {
    let _lock = lock_global();

    let before = UtcTime::system_now();
    let now = utc_clock::now();
    let after = UtcTime::system_now();

    assert!(now.has_monotonic());
    assert!(!now.before(before));
    assert!(!now.after(after));
}

#[test]
fn registered_clock_drives_global_now() {
    let _lock = lock_global();

    let clock = TestClock::wall(None);
    clock.register();
    assert!(clock.is_mocking());

    // unset: still tracking the real clock
    assert!(!utc_clock::now().is_zero());

    let d2020 = UtcTime::must_parse("2020-01-01T00:00:00.000Z");
    clock.set(d2020);
    assert_eq!(utc_clock::now(), d2020);
    assert_eq!(clock.get(), d2020);

    let next = clock.add(TimeDelta::hours(1));
    assert_eq!(next, d2020 + TimeDelta::hours(1));
    assert_eq!(utc_clock::now(), clock.now());
    assert_eq!(utc_clock::now(), next);

    // back to passthrough, previous value returned
    assert_eq!(clock.set(UtcTime::zero()), next);
    assert_real_clock_restored();

    clock.deregister();
    assert!(!clock.is_mocking());
    assert_real_clock_restored();
}

#[test]
fn set_does_not_toggle_the_mocking_flag() {
    let _lock = lock_global();

    let clock = TestClock::wall(None);
    let _guard = clock.register_guard();

    clock.set(UtcTime::zero());
    assert!(clock.is_mocking());
    assert_real_clock_restored(); // now() reverts to tracking the real clock
}

#[test]
fn superseding_clock_lowers_previous_flag() {
    let _lock = lock_global();

    let a = TestClock::wall(UtcTime::must_parse("2020-01-01T00:00:00.000Z"));
    let b = TestClock::wall(UtcTime::must_parse("2021-01-01T00:00:00.000Z"));

    a.register();
    assert!(a.is_mocking());

    // a was never deregistered, but b superseding it lowers its flag
    b.register();
    assert!(!a.is_mocking());
    assert!(b.is_mocking());
    assert_eq!(utc_clock::now(), b.now());

    // deregister is safe for a superseded clock and resets the registry
    // regardless of who is active
    a.deregister();
    assert!(!a.is_mocking());
    assert!(!b.is_mocking());
    assert_real_clock_restored();
}

#[test]
fn deregister_is_idempotent() {
    let _lock = lock_global();

    let clock = TestClock::wall(UtcTime::must_parse("2020-01-01T00:00:00.000Z"));
    clock.register();
    clock.deregister();
    clock.deregister();
    assert!(!clock.is_mocking());
    assert_real_clock_restored();
}

#[test]
fn guard_deregisters_on_drop() {
    let _lock = lock_global();

    let clock = TestClock::wall(UtcTime::must_parse("2020-01-01T00:00:00.000Z"));
    {
        let _guard = clock.register_guard();
        assert!(clock.is_mocking());
        assert_eq!(utc_clock::now().year(), 2020);
    }
    assert!(!clock.is_mocking());
    assert_real_clock_restored();
}

#[test]
fn since_with_mocked_clock() {
    let _lock = lock_global();

    let start = utc_clock::now();
    let clock = TestClock::wall(start);
    let _guard = clock.register_guard();

    clock.add(TimeDelta::minutes(1));
    assert_eq!(utc_clock::since(start), TimeDelta::minutes(1));
}

#[test]
fn until_with_mocked_clock() {
    let _lock = lock_global();

    let then = utc_clock::now() + TimeDelta::seconds(1);
    let clock = TestClock::wall(then);
    let _guard = clock.register_guard();

    clock.add(-TimeDelta::minutes(1));
    assert_eq!(utc_clock::until(then), TimeDelta::minutes(1));
}

#[test]
fn since_and_until_against_the_real_clock() {
    let _lock = lock_global();

    let now = utc_clock::now();
    let since1 = utc_clock::since(now);
    let since2 = utc_clock::since(now);
    assert!(since1 >= TimeDelta::zero());
    assert!(since2 >= since1);

    let then = utc_clock::now() + TimeDelta::seconds(1);
    let until1 = utc_clock::until(then);
    let until2 = utc_clock::until(then);
    assert!(until1 <= TimeDelta::seconds(1));
    assert!(until2 <= until1);
}

#[test]
fn closures_can_be_installed_directly() {
    let _lock = lock_global();

    let fixed = UtcTime::must_parse("2001-09-09T01:46:40.000Z");
    let previous = registry::install(Arc::new(move || fixed));
    assert!(previous.is_none());

    assert_eq!(utc_clock::now(), fixed);

    let replaced = registry::uninstall();
    assert!(replaced.is_some());
    assert_real_clock_restored();
}

#[test]
fn settable_clock_can_be_installed_as_dyn_clock() {
    let _lock = lock_global();

    let clock = utc_clock::SettableClock::wall_ms(None);
    clock.set(UtcTime::must_parse("2020-01-01T00:00:00.000Z"));

    registry::install(Arc::new(clock.clone()) as Arc<dyn Clock>);
    assert_eq!(utc_clock::now(), clock.now());
    registry::uninstall();
    assert_real_clock_restored();
}

#[test]
fn concurrent_readers_survive_installs() {
    let _lock = lock_global();

    let fixed = UtcTime::must_parse("2020-01-01T00:00:00.000Z");
    let readers: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(move || {
                // every read sees either the real clock or the fully
                // installed mock, never a torn state
                for _ in 0..1_000 {
                    let now = utc_clock::now();
                    assert!(now == fixed || now.year() >= 2020);
                }
            })
        })
        .collect();

    for _ in 0..100 {
        let clock = TestClock::wall(fixed);
        clock.register();
        clock.deregister();
    }

    for reader in readers {
        reader.join().unwrap();
    }
    registry::uninstall();
}

/// The global accessor answers from the real clock again: no earlier than a
/// system sample taken just before, by wall reading.
fn assert_real_clock_restored() {
    let before = UtcTime::system_now();
    let now = utc_clock::now();
    // wall comparison: the reading may be policy-stripped of its
    // monotonic reading when a passthrough clock is still registered
    assert!(now >= before.strip_mono());
    assert!(now.year() >= 2024);
}
