// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

//! Producers and a consumer multiplexing two queues.
//!
//! Two producer tasks each alternate between writing the two queues owned by a consumer task.
//! The consumer waits on both queues at once and must see every value exactly once, in the order
//! each producer wrote it to each queue.

use std::collections::BTreeSet;
use std::sync::mpsc;

use rand::Rng;
use rand_pcg::Pcg32;
use rtsync::config::TaskConfig;
use rtsync::flag::Flag;
use rtsync::queue::Queue;
use rtsync::sys::{busy_wait, yield_now};
use rtsync::task::{Task, TaskMain};
use rtsync::waitable::Waitable;

const TOTAL: u32 = 10_000;
const PER_PRODUCER: u32 = TOTAL / 2;

type Msg = (u32, u32);

struct Consumer {
    a: Queue<Msg, 8>,
    b: Queue<Msg, 8>,
    results: mpsc::Sender<(char, Msg)>,
}

impl TaskMain for Consumer {
    fn main(self, task: &mut Task) {
        let mut seen = 0;
        while seen < TOTAL {
            task.wait_any(self.a.mask() | &self.b);
            if task.has_fired(&self.a) {
                self.results.send(('a', self.a.read())).unwrap();
                seen += 1;
            }
            if task.has_fired(&self.b) {
                self.results.send(('b', self.b.read())).unwrap();
                seen += 1;
            }
        }
    }
}

fn produce(id: u32, a: Queue<Msg, 8>, b: Queue<Msg, 8>, seed: u64) -> rtsync::task::TaskHandle {
    Task::new(TaskConfig::new(format!("producer{}", id)))
        .start(move |_task: &mut Task| {
            let mut rng = Pcg32::new(seed, 1);
            for seq in 0..PER_PRODUCER {
                busy_wait(rng.gen_range(0..20));
                if seq % 2 == 0 {
                    // Non-blocking queue: retry until there is room.
                    while !a.write((id, seq)) {
                        yield_now();
                    }
                } else {
                    assert!(b.write((id, seq)));
                }
            }
        })
        .unwrap()
}

#[test]
fn every_value_seen_once() {
    let mut task = Task::new(TaskConfig::new("consumer"));
    let a: Queue<Msg, 8> = Queue::new(&mut task);
    let b: Queue<Msg, 8> = Queue::with_blocking_write(&mut task);
    let (tx, rx) = mpsc::channel();

    let consumer = task
        .start(Consumer {
            a: a.clone(),
            b: b.clone(),
            results: tx,
        })
        .unwrap();
    let p1 = produce(1, a.clone(), b.clone(), 1);
    let p2 = produce(2, a.clone(), b.clone(), 2);

    p1.join().unwrap();
    p2.join().unwrap();
    consumer.join().unwrap();

    let results: Vec<(char, Msg)> = rx.iter().collect();
    assert_eq!(results.len(), TOTAL as usize);

    let unique: BTreeSet<Msg> = results.iter().map(|(_, m)| *m).collect();
    assert_eq!(unique.len(), TOTAL as usize);

    for queue in ['a', 'b'] {
        for producer in [1, 2] {
            let seqs: Vec<u32> = results
                .iter()
                .filter(|(q, (p, _))| *q == queue && *p == producer)
                .map(|(_, (_, s))| *s)
                .collect();
            assert!(seqs.windows(2).all(|w| w[0] < w[1]), "out of order on {}", queue);
        }
    }

    assert!(a.is_empty() && b.is_empty());
}

#[test]
fn wait_all_needs_flag_and_queue() {
    let mut task = Task::new(TaskConfig::new("all"));
    let go = Flag::new(&mut task);
    let q: Queue<u32, 4> = Queue::new(&mut task);
    let (tx, rx) = mpsc::channel();

    let (go2, q2) = (go.clone(), q.clone());
    let handle = task
        .start(move |task: &mut Task| {
            task.wait_all(go2.mask() | &q2);
            tx.send(q2.read()).unwrap();
        })
        .unwrap();

    assert!(q.write(42));
    std::thread::sleep(std::time::Duration::from_millis(20));
    assert!(rx.try_recv().is_err());
    go.set();
    handle.join().unwrap();
    assert_eq!(rx.recv().unwrap(), 42);
    assert!(!go.is_set());
}
