#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use hp_reclaim::{Config, Domain, Registry};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Ids of reclaimed objects, in reclamation order.
#[derive(Clone, Default)]
pub struct Reclaimed(Arc<Mutex<Vec<u32>>>);

impl Reclaimed {
    pub fn ids(&self) -> Vec<u32> {
        self.0.lock().unwrap().clone()
    }

    pub fn record(&self, id: u32) {
        self.0.lock().unwrap().push(id);
    }
}

/// A domain over `u32` ids on its own registry, recording every
/// reclaimed id.
pub fn recording_domain(threads: usize, config: Config) -> (Domain<u32>, Reclaimed) {
    init_logger();
    let reclaimed = Reclaimed::default();
    let sink = reclaimed.clone();
    let domain = Domain::with_registry(Registry::new(threads), config, move |id: Box<u32>| {
        sink.record(*id)
    });
    (domain, reclaimed)
}
