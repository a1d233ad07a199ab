use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_utils::thread;
use hp_reclaim::{AtomicLink, Config, Domain, Owned, Registry};
use rand::prelude::*;

mod common;

/// An object whose reclamation is observable.
///
/// Reclaimed probes are parked instead of freed, so a reader that still
/// sees one after reclamation detects it without touching freed memory.
struct Probe {
    id: usize,
    reclaimed: AtomicBool,
}

#[derive(Clone, Default)]
struct Graveyard(Arc<Mutex<Vec<Box<Probe>>>>);

impl Graveyard {
    fn bury(&self, probe: Box<Probe>) {
        assert!(!probe.reclaimed.swap(true, Ordering::SeqCst), "reclaimed twice");
        self.0.lock().unwrap().push(probe);
    }

    fn ids(&self) -> Vec<usize> {
        let mut ids: Vec<_> = self.0.lock().unwrap().iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids
    }
}

fn probe(id: usize) -> Owned<Probe> {
    Owned::new(Probe {
        id,
        reclaimed: AtomicBool::new(false),
    })
}

const READERS: usize = 6;
const WRITERS: usize = 2;
const SWAPS_PER_WRITER: usize = 2000;

#[test]
fn protected_objects_are_never_reclaimed() {
    common::init_logger();
    let graveyard = Graveyard::default();
    let sink = graveyard.clone();
    let domain = Domain::with_registry(
        Registry::new(READERS + WRITERS + 1),
        Config::new().with_slots_per_thread(2),
        move |probe| sink.bury(probe),
    );
    let link = AtomicLink::from(probe(0).into_shared());
    let next_id = AtomicUsize::new(1);
    let done = AtomicBool::new(false);
    let writers_left = AtomicUsize::new(WRITERS);

    thread::scope(|s| {
        for _ in 0..READERS {
            s.spawn(|_| {
                let handle = domain.register();
                let mut rng = rand::thread_rng();
                while !done.load(Ordering::Acquire) {
                    let slot = rng.gen_range(0..2);
                    let ptr = domain.protect(handle, slot, &link);
                    let probe = unsafe { ptr.deref() };
                    assert!(!probe.reclaimed.load(Ordering::SeqCst));
                    for _ in 0..rng.gen_range(0..16) {
                        std::hint::spin_loop();
                    }
                    assert!(!probe.reclaimed.load(Ordering::SeqCst));
                    domain.clear(handle, slot);
                }
                domain.clear_all(handle);
            });
        }

        for _ in 0..WRITERS {
            s.spawn(|_| {
                let handle = domain.register();
                for _ in 0..SWAPS_PER_WRITER {
                    let id = next_id.fetch_add(1, Ordering::Relaxed);
                    let old = link.swap(probe(id).into_shared(), Ordering::AcqRel);
                    unsafe { domain.retire(handle, old) };
                }
                if writers_left.fetch_sub(1, Ordering::AcqRel) == 1 {
                    done.store(true, Ordering::Release);
                }
            });
        }
    })
    .unwrap();

    // Every retired probe is reclaimed once the domain goes away.
    let handle = domain.register();
    let last = link.swap(probe(usize::MAX).into_shared(), Ordering::AcqRel);
    unsafe { domain.retire(handle, last) };
    drop(domain);
    assert_eq!(
        graveyard.ids(),
        (0..=WRITERS * SWAPS_PER_WRITER).collect::<Vec<_>>()
    );

    drop(unsafe { link.into_inner().into_owned() });
}

#[test]
fn retire_after_readers_leave_reclaims_everything() {
    common::init_logger();
    let graveyard = Graveyard::default();
    let sink = graveyard.clone();
    let domain = Domain::with_registry(
        Registry::new(READERS + 1),
        Config::default(),
        move |probe| sink.bury(probe),
    );
    let links: Vec<_> = (0..READERS)
        .map(|id| AtomicLink::from(probe(id).into_shared()))
        .collect();

    // Each reader protects one probe and leaves without clearing.
    thread::scope(|s| {
        for link in &links {
            let domain = &domain;
            s.spawn(move |_| {
                domain.protect(domain.register(), 0, link);
            });
        }
    })
    .unwrap();

    let handle = domain.register();
    for link in &links {
        let old = link.swap(probe(usize::MAX).into_shared(), Ordering::AcqRel);
        unsafe { domain.retire(handle, old) };
    }
    assert_eq!(domain.pending(handle), READERS);
    assert!(graveyard.ids().is_empty());

    drop(domain);
    assert_eq!(graveyard.ids(), (0..READERS).collect::<Vec<_>>());
    for link in links {
        drop(unsafe { link.into_inner().into_owned() });
    }
}

const PROTECTS: usize = 1000;

#[test]
fn protect_against_tight_swap_loop_stays_valid() {
    common::init_logger();
    let graveyard = Graveyard::default();
    let sink = graveyard.clone();
    let domain = Domain::with_registry(
        Registry::new(2),
        Config::new().with_slots_per_thread(1),
        move |probe| sink.bury(probe),
    );
    let link = AtomicLink::from(probe(0).into_shared());
    let retired = AtomicUsize::new(0);
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|_| {
            let handle = domain.register();
            let mut id = 1;
            while !done.load(Ordering::Acquire) {
                let old = link.swap(probe(id).into_shared(), Ordering::AcqRel);
                unsafe { domain.retire(handle, old) };
                retired.fetch_add(1, Ordering::Release);
                id += 1;
            }
        });

        let handle = domain.register();
        for _ in 0..PROTECTS {
            let ptr = domain.protect(handle, 0, &link);
            let seen = retired.load(Ordering::Acquire);
            // At most one retire can be in flight past `seen`; after two
            // more the object has been unlinked, retired and scanned.
            while retired.load(Ordering::Acquire) < seen + 2 {
                std::hint::spin_loop();
            }
            assert_ne!(link.load(Ordering::Acquire), ptr);
            assert!(!unsafe { ptr.deref() }.reclaimed.load(Ordering::SeqCst));
            domain.clear(handle, 0);
        }
        done.store(true, Ordering::Release);
    })
    .unwrap();

    let handle = domain.register();
    let last = link.swap(probe(usize::MAX).into_shared(), Ordering::AcqRel);
    unsafe { domain.retire(handle, last) };
    drop(domain);
    let ids = graveyard.ids();
    assert_eq!(ids, (0..ids.len()).collect::<Vec<_>>());

    drop(unsafe { link.into_inner().into_owned() });
}
