// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Listener batching on a handler task.

use std::sync::{Arc, Mutex};

use rtsync::config::TaskConfig;
use rtsync::handler::{Handler, HandlerListener};
use rtsync::sys::busy_wait;
use rtsync::time::Duration;

struct Recorder {
    id: usize,
    /// Time spent in each update, in microseconds.
    work_us: u32,
    log: Arc<Mutex<Vec<usize>>>,
}

impl HandlerListener for Recorder {
    fn update(&self) {
        if self.work_us > 0 {
            busy_wait(self.work_us);
        }
        self.log.lock().unwrap().push(self.id);
    }
}

fn recorders(count: usize, slow: Option<usize>) -> (Vec<Arc<Recorder>>, Arc<Mutex<Vec<usize>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let listeners = (0..count)
        .map(|id| {
            Arc::new(Recorder {
                id,
                work_us: if Some(id) == slow { 5_000 } else { 0 },
                log: log.clone(),
            })
        })
        .collect();
    (listeners, log)
}

fn check_passes(log: &[usize], listeners: usize, passes: u64) {
    assert_eq!(log.len() as u64, passes * listeners as u64);
    for pass in log.chunks(listeners) {
        assert_eq!(pass, (0..listeners).collect::<Vec<_>>().as_slice());
    }
}

#[test]
fn listeners_run_in_order_once_per_period() {
    let (listeners, log) = recorders(10, Some(4));
    let mut handler: Handler<10> = Handler::with_batch(
        TaskConfig::new("batched"),
        Duration::millis(1000),
        Duration::micros(3000),
    )
    .unwrap();
    for l in &listeners {
        handler.add_listener(l.clone());
    }
    // Registering again changes nothing.
    handler.add_listener(listeners[0].clone());
    assert_eq!(handler.nof_listeners(), 10);

    let running = handler.start().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(2500));
    let passes = running.stats().passes();
    let yields = running.stats().yields();
    let overruns = running.stats().overruns();
    running.stop().unwrap();

    assert_eq!(passes, 3);
    assert!(yields >= passes, "{} yields in {} passes", yields, passes);
    assert_eq!(overruns, 0);
    check_passes(&log.lock().unwrap(), 10, passes);
}

#[test]
fn no_budget_never_yields() {
    let (listeners, log) = recorders(5, Some(2));
    let mut handler: Handler<5> =
        Handler::new(TaskConfig::new("unbatched"), Duration::millis(50)).unwrap();
    for l in &listeners {
        handler.add_listener(l.clone());
    }
    let running = handler.start().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(180));
    let stats_yields = running.stats().yields();
    running.stop().unwrap();

    assert_eq!(stats_yields, 0);
    let log = log.lock().unwrap();
    let passes = (log.len() / 5) as u64;
    assert!(passes >= 2);
    check_passes(&log, 5, passes);
}

#[test]
fn overrun_is_counted_and_handler_keeps_going() {
    let (listeners, _log) = recorders(1, Some(0));
    let mut handler: Handler<1> =
        Handler::new(TaskConfig::new("overrun"), Duration::millis(2)).unwrap();
    handler.add_listener(listeners[0].clone());
    let running = handler.start().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(40));
    let overruns = running.stats().overruns();
    let passes = running.stats().passes();
    running.stop().unwrap();

    assert!(overruns >= 2);
    assert!(passes >= overruns);
}
