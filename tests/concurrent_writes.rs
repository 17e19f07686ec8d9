//! Behavior-driven tests for concurrent use of one document
//!
//! Leaf writes from many threads must land as whole lines, never torn or
//! interleaved at the byte level.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use dfxml_core::{DfxmlWriter, SharedBuffer};

const THREADS: usize = 8;
const WRITES_PER_THREAD: usize = 250;

#[test]
fn concurrent_leaf_writes_are_never_torn() {
    // Given: One document shared by several worker threads
    let buffer = SharedBuffer::new();
    let writer = Arc::new(DfxmlWriter::from_writer(buffer.clone()).unwrap());
    writer.push("dfxml", "").unwrap();

    // When: Each thread mixes the three leaf writers
    let handles: Vec<_> = (0..THREADS)
        .map(|worker| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || {
                let padding = "x".repeat(64 * (worker + 1));
                for seq in 0..WRITES_PER_THREAD {
                    match seq % 3 {
                        0 => writer
                            .write_element("sector", &format!("{worker}-{seq}-{padding}"), "")
                            .unwrap(),
                        1 => writer
                            .write_formatted(
                                "offset",
                                format!("worker='{worker}'"),
                                format_args!("{}-{}-{}", worker, seq, padding),
                            )
                            .unwrap(),
                        _ => writer.comment(&format!("{worker}-{seq}-{padding}")).unwrap(),
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker finished");
    }

    writer.pop().unwrap();
    Arc::into_inner(writer)
        .expect("all workers dropped their handles")
        .close()
        .unwrap();

    // Then: Every call produced exactly one intact line
    let document = buffer.contents();
    let body: Vec<&str> = document.lines().skip(2).collect();
    let (last, calls) = body.split_last().unwrap();
    assert_eq!(*last, "</dfxml>");
    assert_eq!(calls.len(), THREADS * WRITES_PER_THREAD);

    let mut seen = HashSet::new();
    for line in calls {
        let payload = if let Some(rest) = line.strip_prefix("  <sector>") {
            rest.strip_suffix("</sector>").expect("sector closes on its own line")
        } else if let Some(rest) = line.strip_prefix("  <offset worker='") {
            let (_, rest) = rest.split_once("'>").expect("attribute closes");
            rest.strip_suffix("</offset>").expect("offset closes on its own line")
        } else if let Some(rest) = line.strip_prefix("<!-- ") {
            rest.strip_suffix(" -->").expect("comment closes on its own line")
        } else {
            panic!("torn or unexpected line: {line}");
        };

        let mut parts = payload.splitn(3, '-');
        let worker: usize = parts.next().unwrap().parse().unwrap();
        let seq: usize = parts.next().unwrap().parse().unwrap();
        let padding = parts.next().unwrap();
        assert_eq!(padding.len(), 64 * (worker + 1), "payload intact");
        assert!(padding.bytes().all(|b| b == b'x'));
        assert!(seen.insert((worker, seq)), "each call appears once");
    }
}

#[test]
fn concurrent_timestamps_keep_totals_ordered() {
    let buffer = SharedBuffer::new();
    let writer = Arc::new(DfxmlWriter::from_writer(buffer.clone()).unwrap());

    thread::scope(|scope| {
        for worker in 0..4 {
            let writer = &writer;
            scope.spawn(move || {
                for seq in 0..50 {
                    writer.add_timestamp(&format!("w{worker}s{seq}")).unwrap();
                }
            });
        }
    });

    let document = buffer.contents();
    let totals: Vec<f64> = document
        .lines()
        .skip(1)
        .map(|line| {
            let (_, rest) = line.split_once("total='").expect("total attribute");
            rest.split('\'').next().unwrap().parse().unwrap()
        })
        .collect();
    assert_eq!(totals.len(), 200);
    assert!(totals.windows(2).all(|pair| pair[0] <= pair[1]));
}
