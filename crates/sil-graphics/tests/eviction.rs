// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use sil_core::config::{DeferredDeleteSettings, ShaderCacheSettings};
use sil_core::renderer::ProgramId;
use sil_core::{GpuObject, GpuObjectKind};
use sil_graphics::{DeferredDeleteQueue, RecordingRenderer, ShaderCache};
use std::num::NonZeroU32;

fn program(raw: u32) -> ProgramId {
    ProgramId::from_raw(NonZeroU32::new(raw).unwrap())
}

#[test]
fn fixed_cache_evicts_and_queues_the_stale_program() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut renderer = RecordingRenderer::default();
    let mut queue = DeferredDeleteQueue::new(&DeferredDeleteSettings::default());
    let mut cache = ShaderCache::new(&ShaderCacheSettings {
        initial_capacity: 4,
        dynamic_resize: false,
    })
    .unwrap();

    for (key, raw) in [(1, 10), (2, 20), (3, 30), (4, 40)] {
        let lookup = cache.lookup(key, &mut queue, &mut renderer).unwrap();
        lookup.entry.set_program(program(raw));
    }
    for key in [1, 2, 3] {
        cache.lookup(key, &mut queue, &mut renderer).unwrap();
    }

    let lookup = cache.lookup(5, &mut queue, &mut renderer).unwrap();
    assert!(lookup.invalidated);
    assert_eq!(lookup.entry.key(), 5);
    assert!(lookup.entry.program().is_none());
    lookup.entry.set_program(program(50));
    assert_eq!(cache.used(), 4);
    assert_eq!(queue.len(), 1);

    queue.free_dead_resources(&mut renderer, false);
    assert_eq!(renderer.released_of(GpuObjectKind::Program), vec![40]);
    assert_eq!(renderer.finishes, 1);

    let again = cache.lookup(5, &mut queue, &mut renderer).unwrap();
    assert!(!again.invalidated);
    assert_eq!(again.entry.program().map(|p| p.raw().get()), Some(50));

    cache.clear(&mut queue, &mut renderer);
    queue.free_dead_resources(&mut renderer, false);
    let mut released = renderer.released_of(GpuObjectKind::Program);
    released.sort_unstable();
    assert_eq!(released, vec![10, 20, 30, 40, 50]);
}
