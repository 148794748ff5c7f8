use super::*;
use std::sync::mpsc;

#[test]
fn tasks_run_in_post_order() {
    let pool = LanePool::new(1);
    let lane = pool.acquire().unwrap();
    let (tx, rx) = mpsc::channel();
    for i in 0..10 {
        let tx = tx.clone();
        assert!(lane.post(move || tx.send(i).unwrap()));
    }
    let got: Vec<i32> = (0..10).map(|_| rx.recv().unwrap()).collect();
    assert_eq!(got, (0..10).collect::<Vec<_>>());
}

#[test]
fn delayed_tasks_fire_by_deadline() {
    let pool = LanePool::new(1);
    let lane = pool.acquire().unwrap();
    let (tx, rx) = mpsc::channel();
    let late = tx.clone();
    lane.post_delayed(Duration::from_millis(60), move || late.send("late").unwrap());
    let early = tx.clone();
    lane.post_delayed(Duration::from_millis(10), move || early.send("early").unwrap());
    lane.post(move || tx.send("now").unwrap());

    let order: Vec<_> = (0..3).map(|_| rx.recv().unwrap()).collect();
    assert_eq!(order, vec!["now", "early", "late"]);
}

#[test]
fn slow_due_task_does_not_delay_later_timers() {
    let pool = LanePool::new(1);
    let lane = pool.acquire().unwrap();
    let (tx, rx) = mpsc::channel();
    let t0 = Instant::now();
    lane.post_delayed(Duration::from_millis(10), || {
        thread::sleep(Duration::from_millis(300));
    });
    lane.post_delayed(Duration::from_millis(400), move || tx.send(t0.elapsed()).unwrap());

    let fired = rx.recv().unwrap();
    assert!(fired >= Duration::from_millis(400), "fired early at {fired:?}");
    assert!(fired < Duration::from_millis(550), "fired late at {fired:?}");
}

#[test]
fn execute_blocks_for_the_result_and_runs_inline_on_lane() {
    let pool = LanePool::new(1);
    let lane = pool.acquire().unwrap();
    assert_eq!(lane.execute(|| 21 * 2), Some(42));

    let inner = lane.clone();
    let nested = lane.execute(move || inner.execute(|| thread::current().name().map(str::to_owned)));
    assert_eq!(nested.flatten().flatten().as_deref(), Some("frameseq-lane-0"));
}

#[test]
fn panicking_task_does_not_kill_the_lane() {
    let pool = LanePool::new(1);
    let lane = pool.acquire().unwrap();
    assert_eq!(lane.execute(|| -> u8 { panic!("boom") }), None);
    assert_eq!(lane.execute(|| 7), Some(7));
}

#[test]
fn acquire_is_round_robin() {
    let pool = LanePool::new(2);
    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    let c = pool.acquire().unwrap();
    assert_eq!((a.id(), b.id(), c.id()), (0, 1, 0));
    assert!(!a.is_current());
}
