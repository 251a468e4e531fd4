// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Lock ordering between tasks.

use std::sync::Arc;

use rand::Rng;
use rand_pcg::Pcg32;
use rtsync::config::TaskConfig;
use rtsync::sync::{LockStrategy, Mutex, MutexSection, Pool};
use rtsync::sys::busy_wait;
use rtsync::task::Task;

#[test]
fn ordered_tasks_do_not_deadlock() {
    let outer = Mutex::new(1);
    let inner = Mutex::with_strategy(2, LockStrategy::Block);
    let total = Arc::new(Pool::new(0u32));

    let workers: Vec<_> = (0..4u64)
        .map(|n| {
            let (outer, inner, total) = (outer.clone(), inner.clone(), total.clone());
            Task::new(TaskConfig::new(format!("worker{}", n)))
                .start(move |task: &mut Task| {
                    let mut rng = Pcg32::new(n, 1);
                    for _ in 0..200 {
                        let _a = MutexSection::new(&outer, task);
                        let _b = MutexSection::new(&inner, task);
                        let value = total.read();
                        busy_wait(rng.gen_range(0..10));
                        total.write(value + 1);
                    }
                    assert_eq!(task.locks_held(), 0);
                })
                .unwrap()
        })
        .collect();

    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(total.read(), 800);
    assert!(!outer.is_locked() && !inner.is_locked());
}

#[test]
fn order_violation_panics_inside_task() {
    let m1 = Mutex::new(1);
    let m2 = Mutex::new(2);
    let handle = Task::new(TaskConfig::new("reversed"))
        .start(move |task: &mut Task| {
            m2.lock(task);
            m1.lock(task);
        })
        .unwrap();
    assert!(handle.join().is_err());
}

#[test]
fn each_task_has_its_own_stack() {
    // The same id order is checked per task, not globally.
    let high = Mutex::new(10);
    let low = Mutex::new(5);
    let holder = Task::new(TaskConfig::new("holder"));
    high.lock(&holder);

    let low2 = low.clone();
    let other = Task::new(TaskConfig::new("other"))
        .start(move |task: &mut Task| {
            low2.lock(task);
            low2.unlock(task);
        })
        .unwrap();
    other.join().unwrap();
    high.unlock(&holder);
}
