//! Fuzz target for sketch operation sequences.
//!
//! Drives the sliding sketch with arbitrary interleavings of adds, ticks,
//! and queries, checking the structural invariants hold throughout.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tw_sketch::{Sketch, SketchParams};

#[derive(Arbitrary, Debug)]
enum Op {
    Add { item: u8, delta: u8 },
    Ticks { n: u8 },
    Count { item: u8 },
    History { item: u8 },
    Sorted,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut sketch = Sketch::new(SketchParams {
        k: 4,
        width: 32,
        depth: 3,
        decay: 0.9,
        decay_lut_size: 64,
        history_len: 6,
    });
    for op in ops {
        match op {
            Op::Add { item, delta } => {
                sketch.add(&format!("item-{item}"), u32::from(delta));
            }
            Op::Ticks { n } => sketch.ticks(usize::from(n)),
            Op::Count { item } => {
                let _ = sketch.count(&format!("item-{item}"));
            }
            Op::History { item } => {
                let series = sketch.history_for(&format!("item-{item}"));
                assert_eq!(series.len(), sketch.history_len());
            }
            Op::Sorted => {
                let top = sketch.sorted_items();
                assert!(top.len() <= 4);
                for pair in top.windows(2) {
                    assert!(
                        pair[0].count > pair[1].count
                            || (pair[0].count == pair[1].count && pair[0].item <= pair[1].item)
                    );
                }
            }
        }
    }
});
