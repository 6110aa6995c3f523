//! # ABI Contract Test
//!
//! Drives [`GridEngine`] purely through the public ABI, the way a host
//! would: size, grow, init, then read and write records in linear memory.

use hshg_engine::abi::{field_radius, FIELD_POSITION, FIELD_REFERENCE};
use hshg_engine::{
    record_stride, EngineImports, EngineModule, GridEngine, LinearMemory, POSITION_CHANGED,
    REMOVE,
};

/// Host stand-in that moves record 1 on its first update and removes
/// record 2.
#[derive(Default)]
struct Host {
    head: usize,
    updates: Vec<(u32, u32, f32)>,
    queried: Vec<u32>,
}

impl Host {
    fn word(&self, id: u32, field: usize) -> usize {
        self.head / 4 + id as usize * record_stride(2) + field
    }
}

impl EngineImports for Host {
    fn on_update(&mut self, memory: &mut LinearMemory, id: u32) -> u32 {
        let reference = memory.word(self.word(id, FIELD_REFERENCE));
        let x = memory.float(self.word(id, FIELD_POSITION));
        self.updates.push((id, reference, x));
        match reference {
            100 => {
                memory.set_float(self.word(id, FIELD_POSITION), 50.0);
                POSITION_CHANGED
            }
            200 => REMOVE,
            _ => 0,
        }
    }

    fn on_collision(&mut self, _memory: &mut LinearMemory, _a: u32, _b: u32) {}

    fn on_query(&mut self, memory: &mut LinearMemory, id: u32) {
        self.queried.push(memory.word(self.word(id, FIELD_REFERENCE)));
    }
}

#[test]
fn test_host_sees_records_at_the_returned_offset() {
    let mut engine = GridEngine::<2>::new();
    let bytes = engine.sizing(16, 8);
    engine
        .memory_mut()
        .grow(LinearMemory::pages_for(bytes))
        .unwrap();
    let head = engine.init(16, 4, 8).unwrap();
    assert_eq!(head % 4, 0);
    assert!(head + 9 * record_stride(2) * 4 <= bytes);

    engine.insert([10.0, 12.0], 1.5, 100).unwrap();
    engine.insert([30.0, 12.0], 1.5, 200).unwrap();

    let mut host = Host {
        head,
        ..Host::default()
    };
    let radius = engine.memory().float(host.word(1, field_radius(2)));
    assert_eq!(radius, 1.5);

    engine.update(&mut host).unwrap();
    assert_eq!(host.updates, vec![(1, 100, 10.0), (2, 200, 30.0)]);
    assert_eq!(engine.len(), 1);

    engine.query([48.0, 10.0], [52.0, 14.0], &mut host).unwrap();
    assert_eq!(host.queried, vec![100]);

    host.queried.clear();
    engine.query([0.0, 0.0], [64.0, 64.0], &mut host).unwrap();
    assert_eq!(host.queried, vec![100]);
}

#[test]
fn test_sizing_grows_with_side_and_capacity() {
    let engine = GridEngine::<2>::new();
    let base = engine.sizing(32, 50);
    assert_eq!(engine.sizing(32, 51) - base, record_stride(2) * 4);
    assert!(engine.sizing(64, 50) > base);
    assert!(GridEngine::<3>::new().sizing(32, 50) > base);
}
