//! Integration tests for the countdown.
//!
//! Uses `tokio::test(start_paused = true)` to control time
//! deterministically: sleeps resolve instantly when the paused clock is
//! auto-advanced, so no test ever actually waits.

use std::time::Duration;

use faceoff_timer::Countdown;
use tokio::time::timeout;

/// Awaits `expired()` with a cap, returning whether it fired.
async fn fires_within(cd: &mut Countdown, cap: Duration) -> bool {
    timeout(cap, cd.expired()).await.is_ok()
}

#[tokio::test(start_paused = true)]
async fn test_armed_countdown_fires_after_duration() {
    let mut cd = Countdown::new();
    cd.arm(Duration::from_secs(60));

    assert!(fires_within(&mut cd, Duration::from_secs(61)).await);
}

#[tokio::test(start_paused = true)]
async fn test_expired_pends_forever_while_disarmed() {
    let mut cd = Countdown::new();

    assert!(
        !fires_within(&mut cd, Duration::from_secs(3600)).await,
        "a disarmed countdown must never fire"
    );
}

#[tokio::test(start_paused = true)]
async fn test_disarm_cancels_pending_expiry() {
    let mut cd = Countdown::new();
    cd.arm(Duration::from_secs(10));
    cd.disarm();

    assert!(!cd.is_armed());
    assert!(!fires_within(&mut cd, Duration::from_secs(60)).await);
}

#[tokio::test(start_paused = true)]
async fn test_rearm_replaces_pending_expiry() {
    // Re-arming always disarms first: only the newest deadline exists.
    let mut cd = Countdown::new();
    cd.arm(Duration::from_secs(3600));
    cd.arm(Duration::from_secs(1));

    assert!(
        fires_within(&mut cd, Duration::from_secs(2)).await,
        "the replacement deadline should fire"
    );
    // And exactly once — nothing left pending from the first arm.
    assert!(!cd.is_armed());
    assert!(!fires_within(&mut cd, Duration::from_secs(7200)).await);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_self_disarms_after_firing() {
    let mut cd = Countdown::new();
    cd.arm(Duration::from_millis(100));

    cd.expired().await;

    assert!(!cd.is_armed());
    assert_eq!(cd.time_left(), None);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_can_be_rearmed_after_firing() {
    // The turn timer's self-sustaining cycle: fire, advance turn, re-arm.
    let mut cd = Countdown::new();
    for _ in 0..3 {
        cd.arm(Duration::from_secs(30));
        assert!(fires_within(&mut cd, Duration::from_secs(31)).await);
    }
}

#[tokio::test(start_paused = true)]
async fn test_time_left_tracks_the_deadline() {
    let mut cd = Countdown::new();
    cd.arm(Duration::from_secs(60));

    let left = cd.time_left().expect("armed");
    assert!(left <= Duration::from_secs(60));

    tokio::time::advance(Duration::from_secs(45)).await;
    let left = cd.time_left().expect("still armed");
    assert!(left <= Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn test_select_loop_can_disarm_between_iterations() {
    // Models the actor race: the deadline passes, but another select!
    // branch runs first and disarms (a guess resolved the turn). The
    // dropped expired() future must not have consumed the deadline, and
    // the disarm must win — no late fire.
    let mut cd = Countdown::new();
    cd.arm(Duration::from_millis(10));

    // The deadline passes while we're busy elsewhere.
    tokio::time::advance(Duration::from_millis(20)).await;

    // The "other branch" disarms before expired() is polled again.
    cd.disarm();

    assert!(!fires_within(&mut cd, Duration::from_secs(60)).await);
}
