//! Property tests for LIFO and page accounting invariants.

use proptest::prelude::*;
use ustack::{AllocError, ReservedHeap, StackAllocator, StackConfig};

const PAGE: usize = 4096;

#[derive(Debug, Clone)]
enum Op {
    Alloc(usize),
    Free,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..=600).prop_map(Op::Alloc),
        2 => Just(Op::Free),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn lifo_lengths_and_page_bounds_hold(ops in proptest::collection::vec(op(), 1..200)) {
        let heap = ReservedHeap::new(32).unwrap();
        let mut stack = StackAllocator::with_config(heap, StackConfig::debug()).unwrap();
        let mut model: Vec<usize> = Vec::new();

        for op in ops {
            match op {
                Op::Alloc(length) => {
                    let before = stack.arena();
                    match stack.allocate(length) {
                        Ok(buffer) => {
                            prop_assert!(length.next_multiple_of(4) <= 512);
                            prop_assert_eq!(buffer.len(), length);
                            let start = buffer.cast::<u8>().as_ptr() as usize;
                            prop_assert_eq!(start % 4, 0);
                            model.push(length);
                        }
                        Err(AllocError::TooLarge { .. }) => {
                            prop_assert!(length > 512);
                            prop_assert_eq!(stack.arena(), before);
                        }
                        Err(other) => {
                            prop_assert!(false, "unexpected error: {}", other);
                        }
                    }
                }
                Op::Free => match model.pop() {
                    Some(expected) => {
                        prop_assert_eq!(stack.deallocate().unwrap(), expected);
                    }
                    None => {
                        prop_assert!(stack.deallocate().is_err());
                    }
                },
            }

            let used: usize = model.iter().map(|length| length.next_multiple_of(4)).sum();
            prop_assert_eq!(stack.used(), used);
            prop_assert_eq!(stack.depth(), model.len());

            let pages = stack.pages_held();
            prop_assert_eq!(pages, stack.heap().pages_in_use());
            if pages > 0 {
                prop_assert!(stack.used() >= (pages - 1) * PAGE);
                prop_assert!(stack.used() <= pages * PAGE);
            }
        }
    }

    #[test]
    fn marker_release_restores_position(
        before in proptest::collection::vec(0usize..=512, 0..20),
        after in proptest::collection::vec(0usize..=512, 0..40),
    ) {
        let heap = ReservedHeap::new(16).unwrap();
        let mut stack = StackAllocator::with_config(heap, StackConfig::production()).unwrap();
        for length in &before {
            stack.allocate(*length).unwrap();
        }
        let marker = stack.mark();
        let used = stack.used();

        for length in &after {
            stack.allocate(*length).unwrap();
        }

        prop_assert_eq!(stack.release(marker).unwrap(), after.len());
        prop_assert_eq!(stack.used(), used);
        prop_assert_eq!(stack.depth(), before.len());
        prop_assert_eq!(stack.pages_held(), stack.heap().pages_in_use());
    }
}
